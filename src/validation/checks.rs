//! Validation checks for map records.
//!
//! Each check takes a `&MapRecord` and returns a `ValidationResult`.

use std::collections::HashMap;

use crate::geometry::{
    compute_slice_geometry, encode_column, legacy_column_index, CropThreshold, GridExtent,
};
use crate::map::MapRecord;
use crate::types::{GridConfig, SlicePartition, Unit, MAX_ZOOM, MIN_ZOOM};

use super::warning::{Diagnostic, ValidationResult};

fn grid_config(record: &MapRecord) -> GridConfig {
    GridConfig {
        cell_size: record.cell_size,
        unit: record.unit,
        dpi: record.dpi,
        grid_offset: record.grid_offset,
    }
}

fn partition(record: &MapRecord) -> SlicePartition {
    SlicePartition::new(record.split_cols, record.split_rows)
}

/// Cell size, unit and DPI must give a positive pixel cell size.
pub fn check_cell_size(record: &MapRecord) -> ValidationResult {
    let mut result = ValidationResult::new();

    if !record.cell_size.is_finite() || record.cell_size <= 0.0 {
        result.push(
            Diagnostic::error(
                "gridslice::validate::cell-size",
                format!("Cell size must be a positive number, got {}", record.cell_size),
            )
            .with_help("Set cellSize above 0"),
        );
    } else if record.unit == Unit::Mm && (!record.dpi.is_finite() || record.dpi <= 0.0) {
        result.push(
            Diagnostic::error(
                "gridslice::validate::dpi",
                format!("DPI must be positive for millimetre cells, got {}", record.dpi),
            )
            .with_help("Set dpi to the scan resolution of the image"),
        );
    }

    result
}

/// Split counts must be at least 1x1.
pub fn check_partition(record: &MapRecord) -> ValidationResult {
    let mut result = ValidationResult::new();

    if !partition(record).is_valid() {
        result.push(
            Diagnostic::error(
                "gridslice::validate::split",
                format!(
                    "Split must be at least 1x1, got {}x{}",
                    record.split_cols, record.split_rows
                ),
            )
            .with_help("Set splitCols and splitRows to 1 or more"),
        );
    }

    result
}

/// Image dimensions are needed for any geometry.
pub fn check_image_dimensions(record: &MapRecord) -> ValidationResult {
    let mut result = ValidationResult::new();

    match &record.image_dimensions {
        None => result.push(
            Diagnostic::warning(
                "gridslice::validate::missing-dimensions",
                "Record has no imageDimensions; slice geometry cannot be checked",
            )
            .with_help("Dimensions are filled in from the image when exporting"),
        ),
        Some(dims) if !dims.is_valid() => result.push(Diagnostic::error(
            "gridslice::validate::dimensions",
            format!("Image dimensions must be positive, got {}x{}", dims.width, dims.height),
        )),
        Some(dims) => {
            let offset = record.grid_offset;
            if offset.x >= dims.width || offset.y >= dims.height {
                result.push(
                    Diagnostic::warning(
                        "gridslice::validate::offset-outside-image",
                        format!(
                            "Grid origin ({}, {}) lies beyond the {}x{} image; no cells are visible",
                            offset.x, offset.y, dims.width, dims.height
                        ),
                    )
                    .with_help("Move gridOffset inside the image"),
                );
            }
        }
    }

    result
}

/// Warn about slices whose edges cut through grid cells.
pub fn check_cropped_slices(record: &MapRecord, threshold: CropThreshold) -> ValidationResult {
    let mut result = ValidationResult::new();
    let Some(dims) = &record.image_dimensions else {
        return result;
    };
    let config = grid_config(record);
    let partition = partition(record);

    for id in partition.ids() {
        let Some(geometry) = compute_slice_geometry(&config, dims, partition, id, threshold, 1.0) else {
            continue;
        };
        if geometry.is_cropped {
            let message = if geometry.num_cols == 0 || geometry.num_rows == 0 {
                format!("Slice {} is too small to hold a whole cell", id)
            } else {
                format!(
                    "Slice {} cuts through cells ({}x{} whole cells)",
                    id, geometry.num_cols, geometry.num_rows
                )
            };
            result.push(
                Diagnostic::warning("gridslice::validate::cropped-slice", message)
                    .with_help("Adjust the cell size or split so slice edges fall on grid lines"),
            );
        }
    }

    result
}

/// Slice overrides and names keyed by an index outside the split.
pub fn check_stale_slice_entries(record: &MapRecord) -> ValidationResult {
    let mut result = ValidationResult::new();
    let partition = partition(record);
    let in_range = |key: &str| key.trim().parse::<usize>().ok().and_then(|i| partition.id_at(i)).is_some();

    for key in record.slice_image_settings.keys().filter(|k| !in_range(k)) {
        result.push(
            Diagnostic::warning(
                "gridslice::validate::stale-slice-override",
                format!(
                    "Slice image setting '{}' does not match any slice in the {}x{} split",
                    key, record.split_cols, record.split_rows
                ),
            )
            .with_help("It is dropped when the record is loaded"),
        );
    }

    for key in record.slice_names.keys().filter(|k| !in_range(k)) {
        result.push(
            Diagnostic::warning(
                "gridslice::validate::stale-slice-name",
                format!(
                    "Slice name '{}' does not match any slice in the {}x{} split",
                    key, record.split_cols, record.split_rows
                ),
            )
            .with_help("It is dropped when the record is loaded"),
        );
    }

    result
}

/// Zoom values outside the adjustable range get clamped on load.
pub fn check_zoom_range(record: &MapRecord) -> ValidationResult {
    let mut result = ValidationResult::new();
    let out_of_range = |z: f64| !z.is_finite() || !(MIN_ZOOM..=MAX_ZOOM).contains(&z);

    if out_of_range(record.image_zoom) {
        result.push(Diagnostic::warning(
            "gridslice::validate::zoom-range",
            format!(
                "Image zoom {} is outside {}..={} and will be clamped",
                record.image_zoom, MIN_ZOOM, MAX_ZOOM
            ),
        ));
    }
    for (key, settings) in &record.slice_image_settings {
        if out_of_range(settings.zoom) {
            result.push(Diagnostic::warning(
                "gridslice::validate::zoom-range",
                format!(
                    "Slice '{}' zoom {} is outside {}..={} and will be clamped",
                    key, settings.zoom, MIN_ZOOM, MAX_ZOOM
                ),
            ));
        }
    }

    result
}

/// Flag grids wider than 26 columns while centre coordinates are shown.
///
/// Older viewers read only the first letter of a column label when placing
/// the centre badge, so any two-letter column lands on the wrong cell there.
pub fn check_center_label_columns(record: &MapRecord) -> ValidationResult {
    let mut result = ValidationResult::new();
    if !record.show_center_coords {
        return result;
    }
    let Some(dims) = &record.image_dimensions else {
        return result;
    };
    let Some(extent) = GridExtent::compute(&grid_config(record), dims) else {
        return result;
    };

    if extent.total_cols > 26 {
        let example = encode_column(26);
        let misread = legacy_column_index(&example)
            .map(encode_column)
            .unwrap_or_default();
        result.push(
            Diagnostic::warning(
                "gridslice::validate::center-label-columns",
                format!(
                    "Grid has {} columns; single-letter readers place the centre badge for {} at {}",
                    extent.total_cols, example, misread
                ),
            )
            .with_help("Keep the grid within 26 columns or turn off showCenterCoords for such viewers"),
        );
    }

    result
}

/// Two slices with the same name export to numbered files.
pub fn check_duplicate_slice_names(record: &MapRecord) -> ValidationResult {
    let mut result = ValidationResult::new();
    let mut seen: HashMap<String, &str> = HashMap::new();

    for (key, name) in &record.slice_names {
        let normalized = name.trim().to_lowercase();
        if normalized.is_empty() {
            continue;
        }
        if let Some(first) = seen.get(&normalized) {
            result.push(
                Diagnostic::warning(
                    "gridslice::validate::duplicate-slice-name",
                    format!("Slices '{}' and '{}' are both named '{}'", first, key, name.trim()),
                )
                .with_help("Exported files get a numeric suffix; rename one slice to avoid it"),
            );
        } else {
            seen.insert(normalized, key.as_str());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImageDimensions, Offset, SliceImageSettings};

    fn record() -> MapRecord {
        MapRecord {
            cell_size: 100.0,
            image_dimensions: Some(ImageDimensions::new(1000.0, 1000.0)),
            split_cols: 2,
            ..MapRecord::default()
        }
    }

    fn override_with_zoom(zoom: f64) -> SliceImageSettings {
        SliceImageSettings {
            zoom,
            pan_offset: Offset::ZERO,
            rotation: None,
        }
    }

    #[test]
    fn test_cell_size() {
        assert!(check_cell_size(&record()).is_ok());

        let bad = MapRecord { cell_size: 0.0, ..record() };
        assert!(check_cell_size(&bad).has_errors());

        let mm = MapRecord {
            unit: Unit::Mm,
            dpi: 0.0,
            ..record()
        };
        assert!(check_cell_size(&mm).contains_code("gridslice::validate::dpi"));
    }

    #[test]
    fn test_partition() {
        assert!(check_partition(&record()).is_ok());
        let bad = MapRecord { split_rows: 0, ..record() };
        assert!(check_partition(&bad).has_errors());
    }

    #[test]
    fn test_image_dimensions() {
        let missing = MapRecord {
            image_dimensions: None,
            ..record()
        };
        let result = check_image_dimensions(&missing);
        assert!(!result.has_errors());
        assert!(result.has_warnings());

        let outside = MapRecord {
            grid_offset: Offset::new(1200.0, 0.0),
            ..record()
        };
        assert!(check_image_dimensions(&outside).contains_code("gridslice::validate::offset-outside-image"));
    }

    #[test]
    fn test_cropped_slices() {
        assert!(check_cropped_slices(&record(), CropThreshold::default()).is_ok());

        // Leftovers of 32px and 12px stay under 0.9 * 52
        let small_leftover = MapRecord {
            cell_size: 52.0,
            ..record()
        };
        assert!(check_cropped_slices(&small_leftover, CropThreshold::default()).is_ok());

        // First slice leaves 80px: under 0.9 * 105 but over 0.5 * 105
        let cropped = MapRecord {
            cell_size: 105.0,
            ..record()
        };
        assert!(check_cropped_slices(&cropped, CropThreshold::default()).is_ok());
        assert!(check_cropped_slices(&cropped, CropThreshold::new(0.5)).has_warnings());

        let tiny = MapRecord {
            cell_size: 600.0,
            ..record()
        };
        let result = check_cropped_slices(&tiny, CropThreshold::default());
        assert_eq!(result.warning_count(), 2);
    }

    #[test]
    fn test_stale_slice_entries() {
        let mut r = record();
        r.slice_image_settings.insert("1".to_string(), override_with_zoom(2.0));
        r.slice_image_settings.insert("5".to_string(), override_with_zoom(2.0));
        r.slice_names.insert("x".to_string(), "Nope".to_string());

        let result = check_stale_slice_entries(&r);
        assert_eq!(result.warning_count(), 2);
        assert!(result.contains_code("gridslice::validate::stale-slice-override"));
        assert!(result.contains_code("gridslice::validate::stale-slice-name"));
    }

    #[test]
    fn test_zoom_range() {
        let mut r = record();
        assert!(check_zoom_range(&r).is_ok());
        r.image_zoom = 0.01;
        r.slice_image_settings.insert("0".to_string(), override_with_zoom(25.0));
        assert_eq!(check_zoom_range(&r).warning_count(), 2);
    }

    #[test]
    fn test_center_label_columns() {
        assert!(check_center_label_columns(&record()).is_ok());

        let wide = MapRecord {
            cell_size: 10.0,
            ..record()
        };
        let result = check_center_label_columns(&wide);
        assert!(result.contains_code("gridslice::validate::center-label-columns"));
        let message = &result.iter().next().unwrap().message;
        assert!(message.contains("100 columns"), "{}", message);
        assert!(message.contains("AA at A"), "{}", message);

        let hidden = MapRecord {
            show_center_coords: false,
            ..wide
        };
        assert!(check_center_label_columns(&hidden).is_ok());
    }

    #[test]
    fn test_duplicate_slice_names() {
        let mut r = record();
        r.slice_names.insert("0".to_string(), "Field".to_string());
        r.slice_names.insert("1".to_string(), " field ".to_string());
        let result = check_duplicate_slice_names(&r);
        assert_eq!(result.warning_count(), 1);
    }
}

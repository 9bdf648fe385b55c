//! Per-slice grid geometry.
//!
//! Given the grid configuration, the image size and a partition, works out
//! where grid lines fall inside one slice, how many whole cells it holds,
//! which logical column/row its first cell is, and whether the slice edge
//! cuts through cells.
//!
//! Both the on-screen overlay and the export rasterizer call
//! [`compute_slice_geometry`]; the export path passes its DPI ratio as
//! `scale`, so the two outputs differ only by that factor.

use serde::Serialize;

use crate::types::{GridConfig, ImageDimensions, SliceId, SlicePartition};

use super::label::encode_column;

/// Fraction of a cell that leftover space must reach for a slice to count
/// as cropped.
pub const DEFAULT_CROP_THRESHOLD: f64 = 0.9;

/// Tunable near-miss threshold for crop detection, as a fraction of a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropThreshold(f64);

impl CropThreshold {
    /// Out-of-range or non-finite fractions fall back to the default.
    pub fn new(fraction: f64) -> Self {
        if fraction.is_finite() && fraction > 0.0 && fraction <= 1.0 {
            Self(fraction)
        } else {
            Self::default()
        }
    }

    pub fn fraction(self) -> f64 {
        self.0
    }
}

impl Default for CropThreshold {
    fn default() -> Self {
        Self(DEFAULT_CROP_THRESHOLD)
    }
}

/// Layout of the grid inside one slice. All lengths are pixels, multiplied
/// by the scale factor the geometry was computed with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceGeometry {
    pub slice: SliceId,
    pub slice_left: f64,
    pub slice_top: f64,
    pub slice_width: f64,
    pub slice_height: f64,
    pub cell_size_px: f64,
    /// Distance from the slice's left edge to the first vertical grid line.
    pub first_col_offset: f64,
    /// Distance from the slice's top edge to the first horizontal grid line.
    pub first_row_offset: f64,
    /// Whole cells that fit after the first line.
    pub num_cols: u32,
    pub num_rows: u32,
    /// Logical index of the cell that starts at the first vertical line.
    pub start_col_index: u32,
    pub start_row_index: u32,
    pub is_cropped: bool,
}

/// A label placed along one axis of a slice.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisLabel {
    pub text: String,
    /// Centre of the label along the axis, relative to the slice origin.
    pub position: f64,
}

impl SliceGeometry {
    /// X positions of the vertical grid lines, relative to the slice.
    /// There is always one more line than whole cells.
    pub fn column_lines(&self) -> Vec<f64> {
        axis_lines(self.first_col_offset, self.cell_size_px, self.num_cols)
    }

    /// Y positions of the horizontal grid lines, relative to the slice.
    pub fn row_lines(&self) -> Vec<f64> {
        axis_lines(self.first_row_offset, self.cell_size_px, self.num_rows)
    }

    /// Column labels for every cell that starts at a grid line and has
    /// visible width inside the slice. A trailing partial cell is labelled
    /// at the centre of its visible part.
    pub fn column_labels(&self) -> Vec<AxisLabel> {
        axis_labels(
            self.first_col_offset,
            self.cell_size_px,
            self.num_cols,
            self.slice_width,
            |i| encode_column(self.start_col_index as i64 + i as i64),
        )
    }

    /// Row labels, 1-based.
    pub fn row_labels(&self) -> Vec<AxisLabel> {
        axis_labels(
            self.first_row_offset,
            self.cell_size_px,
            self.num_rows,
            self.slice_height,
            |i| (self.start_row_index as u64 + i as u64 + 1).to_string(),
        )
    }

    /// Whether a point relative to the slice lies inside it.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.slice_width && y < self.slice_height
    }
}

fn axis_lines(first: f64, cell: f64, count: u32) -> Vec<f64> {
    (0..=count).map(|i| first + i as f64 * cell).collect()
}

fn axis_labels<F>(first: f64, cell: f64, count: u32, extent: f64, text: F) -> Vec<AxisLabel>
where
    F: Fn(u32) -> String,
{
    let mut labels = Vec::with_capacity(count as usize + 1);
    for i in 0..=count {
        let start = first + i as f64 * cell;
        let end = (start + cell).min(extent);
        if end - start <= f64::EPSILON * extent.max(1.0) {
            continue;
        }
        labels.push(AxisLabel {
            text: text(i),
            position: (start + end) / 2.0,
        });
    }
    labels
}

/// Offset from a slice edge to the first grid line at or after it.
///
/// `grid_start` is the grid origin relative to the slice edge and may be
/// negative when the origin lies before the slice.
fn first_line_offset(grid_start: f64, cell: f64) -> f64 {
    let offset = if grid_start < 0.0 {
        (grid_start.abs() / cell).ceil() * cell + grid_start
    } else {
        grid_start % cell
    };
    // Rounding can leave a tiny negative remainder when the origin sits
    // exactly on a line before the slice
    offset.max(0.0)
}

/// Floor that treats values within rounding noise of an integer as that
/// integer, so `4.999999999999` cells counts as 5.
///
/// Used in place of a plain `floor` for the whole-cell count and the start
/// index. Millimetre cells are rarely exact in binary: 3 mm at 254 dpi is
/// `30.000000000000004` px, so a plain floor fits only 9 of them across a
/// 300 px slice.
fn snapped_floor(v: f64) -> f64 {
    let nearest = v.round();
    if (v - nearest).abs() < SNAP_EPSILON {
        nearest
    } else {
        v.floor()
    }
}

const SNAP_EPSILON: f64 = 1e-9;

/// Compute the grid layout of one slice.
///
/// Returns `None` instead of failing for any input that cannot produce a
/// finite layout: non-positive or non-finite cell size, image size, split
/// counts or scale, a slice outside the partition, or a NaN grid offset.
/// Callers render nothing for such a slice.
pub fn compute_slice_geometry(
    config: &GridConfig,
    image: &ImageDimensions,
    partition: SlicePartition,
    slice: SliceId,
    threshold: CropThreshold,
    scale: f64,
) -> Option<SliceGeometry> {
    let cell = config.cell_size_px()?;
    if !image.is_valid() || !partition.is_valid() || !partition.contains(slice) {
        return None;
    }
    if !config.grid_offset.x.is_finite() || !config.grid_offset.y.is_finite() {
        return None;
    }
    if !scale.is_finite() || scale <= 0.0 {
        return None;
    }

    let slice_width = image.width / partition.cols as f64;
    let slice_height = image.height / partition.rows as f64;
    let slice_left = slice.col as f64 * slice_width;
    let slice_top = slice.row as f64 * slice_height;

    let offset = config.grid_offset;
    let first_col_offset = first_line_offset(offset.x - slice_left, cell);
    let first_row_offset = first_line_offset(offset.y - slice_top, cell);

    let cols_fit = snapped_floor((slice_width - first_col_offset) / cell).max(0.0);
    let rows_fit = snapped_floor((slice_height - first_row_offset) / cell).max(0.0);

    let start_col = snapped_floor((slice_left - offset.x + first_col_offset) / cell).max(0.0);
    let start_row = snapped_floor((slice_top - offset.y + first_row_offset) / cell).max(0.0);

    if [cols_fit, rows_fit, start_col, start_row, first_col_offset, first_row_offset]
        .iter()
        .any(|v| !v.is_finite())
    {
        return None;
    }

    let remaining_width = (slice_width - first_col_offset) - cols_fit * cell;
    let remaining_height = (slice_height - first_row_offset) - rows_fit * cell;
    let near_miss = threshold.fraction() * cell;
    let is_cropped = cols_fit == 0.0
        || rows_fit == 0.0
        || remaining_width >= near_miss
        || remaining_height >= near_miss;

    Some(SliceGeometry {
        slice,
        slice_left: slice_left * scale,
        slice_top: slice_top * scale,
        slice_width: slice_width * scale,
        slice_height: slice_height * scale,
        cell_size_px: cell * scale,
        first_col_offset: first_col_offset * scale,
        first_row_offset: first_row_offset * scale,
        num_cols: saturating_u32(cols_fit),
        num_rows: saturating_u32(rows_fit),
        start_col_index: saturating_u32(start_col),
        start_row_index: saturating_u32(start_row),
        is_cropped,
    })
}

/// Geometry for every slice in the partition, row-major. Slices that
/// cannot be laid out are skipped.
pub fn compute_all_slices(
    config: &GridConfig,
    image: &ImageDimensions,
    partition: SlicePartition,
    threshold: CropThreshold,
    scale: f64,
) -> Vec<SliceGeometry> {
    partition
        .ids()
        .filter_map(|id| compute_slice_geometry(config, image, partition, id, threshold, scale))
        .collect()
}

/// Ratio between an export DPI and the configured source DPI.
pub fn export_scale(export_dpi: f64, source_dpi: f64) -> Option<f64> {
    let scale = export_dpi / source_dpi;
    (scale.is_finite() && scale > 0.0).then_some(scale)
}

/// Extent of the grid over the whole, unsliced image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridExtent {
    /// Columns from the grid origin to the image's right edge, counting a
    /// trailing partial cell.
    pub total_cols: u32,
    pub total_rows: u32,
}

impl GridExtent {
    pub fn compute(config: &GridConfig, image: &ImageDimensions) -> Option<Self> {
        let cell = config.cell_size_px()?;
        if !image.is_valid() || config.grid_offset.is_nan() {
            return None;
        }
        let cols = ((image.width - config.grid_offset.x) / cell).ceil().max(0.0);
        let rows = ((image.height - config.grid_offset.y) / cell).ceil().max(0.0);
        if !cols.is_finite() || !rows.is_finite() {
            return None;
        }
        Some(Self {
            total_cols: saturating_u32(cols),
            total_rows: saturating_u32(rows),
        })
    }
}

fn saturating_u32(v: f64) -> u32 {
    if v >= u32::MAX as f64 {
        u32::MAX
    } else {
        v as u32
    }
}

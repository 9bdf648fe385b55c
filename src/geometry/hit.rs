//! Pointer hit-testing against the on-screen slice layout.
//!
//! On screen each slice is drawn as a box holding a label gutter (column
//! labels above, row labels to the left) and the slice's image content.
//! Boxes are laid out in the partition's grid with fixed spacing, and the
//! whole container may be CSS-scaled to fit the viewport.

use serde::Serialize;

use crate::types::{
    Coordinate, GridConfig, ImageDimensions, Offset, SliceId, SlicePartition, ViewTransform,
};

use super::label::encode_column;
use super::slice::GridExtent;

/// Fixed on-screen spacing around slice content, in content pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenLayout {
    /// Width of the row-label gutter and height of the column-label gutter.
    pub label_gutter: f64,
    /// Gap between neighbouring slice boxes.
    pub slice_spacing: f64,
}

impl Default for ScreenLayout {
    fn default() -> Self {
        Self {
            label_gutter: 30.0,
            slice_spacing: 20.0,
        }
    }
}

impl ScreenLayout {
    /// Distance between the left edges of neighbouring slice boxes.
    fn pitch(&self, slice_extent: f64) -> f64 {
        self.label_gutter + slice_extent + self.slice_spacing
    }

    /// Top-left of a slice's image content in unscaled container space.
    pub fn content_origin(&self, image: &ImageDimensions, partition: SlicePartition, id: SliceId) -> Offset {
        let (w, h) = slice_size(image, partition);
        Offset::new(
            id.col as f64 * self.pitch(w) + self.label_gutter,
            id.row as f64 * self.pitch(h) + self.label_gutter,
        )
    }

    /// Unscaled size of the whole container.
    pub fn container_size(&self, image: &ImageDimensions, partition: SlicePartition) -> (f64, f64) {
        let (w, h) = slice_size(image, partition);
        let cols = partition.cols as f64;
        let rows = partition.rows as f64;
        (
            cols * (self.label_gutter + w) + (cols - 1.0).max(0.0) * self.slice_spacing,
            rows * (self.label_gutter + h) + (rows - 1.0).max(0.0) * self.slice_spacing,
        )
    }
}

fn slice_size(image: &ImageDimensions, partition: SlicePartition) -> (f64, f64) {
    (
        image.width / partition.cols.max(1) as f64,
        image.height / partition.rows.max(1) as f64,
    )
}

/// Everything a hit-test is measured against.
#[derive(Debug, Clone, Copy)]
pub struct HitTarget<'a> {
    pub config: &'a GridConfig,
    pub image: &'a ImageDimensions,
    pub partition: SlicePartition,
    pub layout: ScreenLayout,
}

/// A resolved hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hit {
    pub slice: SliceId,
    pub col_index: u32,
    pub row_index: u32,
    pub coordinate: Coordinate,
}

/// Map a pointer position to a logical grid cell.
///
/// `pointer` is relative to the rendered container, which is drawn at
/// `scale`. `view_for` supplies the zoom and pan in effect for a slice.
/// Returns `None` for points in gutters, spacing, outside the image or
/// before the grid origin.
pub fn hit_test<F>(pointer: Offset, scale: f64, target: &HitTarget<'_>, view_for: F) -> Option<Hit>
where
    F: Fn(SliceId) -> ViewTransform,
{
    if !scale.is_finite() || scale <= 0.0 || pointer.is_nan() {
        return None;
    }
    let cell = target.config.cell_size_px()?;
    if !target.image.is_valid() || !target.partition.is_valid() {
        return None;
    }

    let content = Offset::new(pointer.x / scale, pointer.y / scale);
    let (slice_w, slice_h) = slice_size(target.image, target.partition);
    let layout = &target.layout;

    let (col, local_x) = locate_on_axis(content.x, slice_w, layout, target.partition.cols)?;
    let (row, local_y) = locate_on_axis(content.y, slice_h, layout, target.partition.rows)?;
    let slice = SliceId::new(row, col);

    let view = view_for(slice);
    if !view.zoom.is_finite() || view.zoom <= 0.0 {
        return None;
    }

    let image_pixel_x = local_x + col as f64 * slice_w;
    let image_pixel_y = local_y + row as f64 * slice_h;
    let img_x = (image_pixel_x - view.pan.x) / view.zoom;
    let img_y = (image_pixel_y - view.pan.y) / view.zoom;
    let grid_x = img_x - target.config.grid_offset.x;
    let grid_y = img_y - target.config.grid_offset.y;

    if grid_x < 0.0 || grid_y < 0.0 || img_x >= target.image.width || img_y >= target.image.height {
        return None;
    }

    let col_index = (grid_x / cell).floor();
    let row_index = (grid_y / cell).floor();

    // Bounded by the whole image's grid, not just this slice
    let extent = GridExtent::compute(target.config, target.image)?;
    if col_index >= extent.total_cols as f64 || row_index >= extent.total_rows as f64 {
        return None;
    }

    let col_index = col_index as u32;
    let row_index = row_index as u32;
    Some(Hit {
        slice,
        col_index,
        row_index,
        coordinate: Coordinate::new(encode_column(col_index as i64), row_index + 1),
    })
}

/// Which slice box an unscaled position falls in along one axis, and the
/// position relative to that slice's content.
fn locate_on_axis(pos: f64, slice_extent: f64, layout: &ScreenLayout, count: u32) -> Option<(u32, f64)> {
    if pos < 0.0 {
        return None;
    }
    let pitch = layout.pitch(slice_extent);
    let index = (pos / pitch).floor();
    if index >= count as f64 {
        return None;
    }
    let within = pos - index * pitch;
    let local = within - layout.label_gutter;
    if local < 0.0 || local >= slice_extent {
        return None;
    }
    Some((index as u32, local))
}

/// Screen position (after `scale`) of the centre of a logical cell as it is
/// drawn inside `slice`. `None` if that centre is not visible in the slice.
pub fn project_cell_center(
    col_index: u32,
    row_index: u32,
    slice: SliceId,
    scale: f64,
    target: &HitTarget<'_>,
    view: &ViewTransform,
) -> Option<Offset> {
    let cell = target.config.cell_size_px()?;
    if !target.image.is_valid() || !target.partition.contains(slice) {
        return None;
    }
    let (slice_w, slice_h) = slice_size(target.image, target.partition);

    let img_x = (col_index as f64 + 0.5) * cell + target.config.grid_offset.x;
    let img_y = (row_index as f64 + 0.5) * cell + target.config.grid_offset.y;
    let local_x = img_x * view.zoom + view.pan.x - slice.col as f64 * slice_w;
    let local_y = img_y * view.zoom + view.pan.y - slice.row as f64 * slice_h;

    if !(0.0..slice_w).contains(&local_x) || !(0.0..slice_h).contains(&local_y) {
        return None;
    }

    let origin = target.layout.content_origin(target.image, target.partition, slice);
    Some(Offset::new(
        (origin.x + local_x) * scale,
        (origin.y + local_y) * scale,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Unit;

    fn target<'a>(config: &'a GridConfig, image: &'a ImageDimensions, split: (u32, u32)) -> HitTarget<'a> {
        HitTarget {
            config,
            image,
            partition: SlicePartition::new(split.0, split.1),
            layout: ScreenLayout::default(),
        }
    }

    fn identity(_: SliceId) -> ViewTransform {
        ViewTransform::IDENTITY
    }

    #[test]
    fn test_hit_first_cell() {
        let config = GridConfig::new(100.0, Unit::Px);
        let image = ImageDimensions::new(1000.0, 1000.0);
        let t = target(&config, &image, (1, 1));

        // Gutter is 30px: content starts at (30, 30)
        let hit = hit_test(Offset::new(35.0, 35.0), 1.0, &t, identity).unwrap();
        assert_eq!(hit.coordinate, Coordinate::new("A", 1));
        assert_eq!(hit.slice, SliceId::new(0, 0));
    }

    #[test]
    fn test_hit_in_gutter_or_spacing_misses() {
        let config = GridConfig::new(100.0, Unit::Px);
        let image = ImageDimensions::new(1000.0, 1000.0);
        let t = target(&config, &image, (2, 1));

        assert!(hit_test(Offset::new(10.0, 100.0), 1.0, &t, identity).is_none());
        // First box spans 0..530, spacing 530..550
        assert!(hit_test(Offset::new(540.0, 100.0), 1.0, &t, identity).is_none());
        // Second box gutter 550..580
        assert!(hit_test(Offset::new(560.0, 100.0), 1.0, &t, identity).is_none());
        assert!(hit_test(Offset::new(-1.0, 100.0), 1.0, &t, identity).is_none());
        // Past the last box
        assert!(hit_test(Offset::new(2000.0, 100.0), 1.0, &t, identity).is_none());
    }

    #[test]
    fn test_hit_second_slice_continues_columns() {
        let config = GridConfig::new(100.0, Unit::Px);
        let image = ImageDimensions::new(1000.0, 1000.0);
        let t = target(&config, &image, (2, 1));

        // Content of the second slice starts at 550 + 30 = 580
        let hit = hit_test(Offset::new(590.0, 40.0), 1.0, &t, identity).unwrap();
        assert_eq!(hit.slice, SliceId::new(0, 1));
        assert_eq!(hit.coordinate, Coordinate::new("F", 1));
    }

    #[test]
    fn test_hit_undoes_container_scale() {
        let config = GridConfig::new(100.0, Unit::Px);
        let image = ImageDimensions::new(1000.0, 1000.0);
        let t = target(&config, &image, (1, 1));

        // Unscaled (30 + 250, 30 + 150) -> column C, row 2
        let hit = hit_test(Offset::new(140.0, 90.0), 0.5, &t, identity).unwrap();
        assert_eq!(hit.coordinate, Coordinate::new("C", 2));

        assert!(hit_test(Offset::new(140.0, 90.0), 0.0, &t, identity).is_none());
    }

    #[test]
    fn test_hit_applies_zoom_pan_and_origin() {
        let config = GridConfig::new(100.0, Unit::Px).with_offset(50.0, 0.0);
        let image = ImageDimensions::new(1000.0, 1000.0);
        let t = target(&config, &image, (1, 1));
        let view = ViewTransform {
            zoom: 2.0,
            pan: Offset::new(100.0, 0.0),
            rotation: 0.0,
        };

        // local 500 -> image (500 - 100) / 2 = 200 -> grid 150 -> column B
        let hit = hit_test(Offset::new(530.0, 50.0), 1.0, &t, |_| view).unwrap();
        assert_eq!(hit.coordinate.col, "B");

        // local 100 -> image 0 -> grid -50: before the origin
        assert!(hit_test(Offset::new(130.0, 50.0), 1.0, &t, |_| view).is_none());
    }

    #[test]
    fn test_hit_outside_image_misses() {
        let config = GridConfig::new(100.0, Unit::Px);
        let image = ImageDimensions::new(1000.0, 1000.0);
        let t = target(&config, &image, (1, 1));
        let zoomed_out = ViewTransform {
            zoom: 0.5,
            pan: Offset::ZERO,
            rotation: 0.0,
        };
        // local 600 / 0.5 = image 1200 > width
        assert!(hit_test(Offset::new(630.0, 40.0), 1.0, &t, |_| zoomed_out).is_none());
    }

    #[test]
    fn test_degenerate_config_never_hits() {
        let config = GridConfig::new(0.0, Unit::Px);
        let image = ImageDimensions::new(1000.0, 1000.0);
        let t = target(&config, &image, (1, 1));
        assert!(hit_test(Offset::new(50.0, 50.0), 1.0, &t, identity).is_none());

        let config = GridConfig::new(10.0, Unit::Px);
        let t = target(&config, &image, (0, 1));
        assert!(hit_test(Offset::new(50.0, 50.0), 1.0, &t, identity).is_none());
    }

    #[test]
    fn test_cell_centres_round_trip() {
        let config = GridConfig::new(37.0, Unit::Px).with_offset(11.0, 23.0);
        let image = ImageDimensions::new(900.0, 700.0);
        let t = target(&config, &image, (3, 2));
        let extent = GridExtent::compute(&config, &image).unwrap();
        let scale = 0.8;

        let mut checked = 0;
        for c in 0..extent.total_cols {
            for r in 0..extent.total_rows {
                let projected = t
                    .partition
                    .ids()
                    .find_map(|id| project_cell_center(c, r, id, scale, &t, &ViewTransform::IDENTITY));
                let Some(point) = projected else { continue };

                let hit = hit_test(point, scale, &t, identity).unwrap();
                assert_eq!(hit.coordinate, Coordinate::new(encode_column(c as i64), r + 1));
                checked += 1;
            }
        }
        assert!(checked > 200);
    }

    #[test]
    fn test_cell_centres_round_trip_with_views() {
        use crate::types::SliceSettings;

        let config = GridConfig::new(37.0, Unit::Px).with_offset(11.0, 23.0);
        let image = ImageDimensions::new(900.0, 700.0);
        let t = target(&config, &image, (3, 2));
        let extent = GridExtent::compute(&config, &image).unwrap();
        let scale = 1.25;

        let global = ViewTransform {
            zoom: 1.5,
            pan: Offset::new(40.0, 25.0),
            rotation: 0.0,
        };
        let mut settings = SliceSettings::new();
        settings.adjust(SliceId::new(0, 1), &global, |v| {
            v.zoom = 2.0;
            v.pan = Offset::new(-150.0, -60.0);
        });
        let view_for = |id: SliceId| settings.effective(id, &global);

        let mut checked = 0;
        let mut in_override = 0;
        for c in 0..extent.total_cols {
            for r in 0..extent.total_rows {
                let projected = t.partition.ids().find_map(|id| {
                    project_cell_center(c, r, id, scale, &t, &view_for(id)).map(|p| (id, p))
                });
                let Some((id, point)) = projected else { continue };

                let hit = hit_test(point, scale, &t, view_for).unwrap();
                assert_eq!(hit.slice, id);
                assert_eq!((hit.col_index, hit.row_index), (c, r));
                checked += 1;
                if id == SliceId::new(0, 1) {
                    in_override += 1;
                }
            }
        }
        assert!(checked > 50, "only {} cells checked", checked);
        assert!(in_override > 5, "only {} cells in the overridden slice", in_override);
    }

    #[test]
    fn test_container_size() {
        let image = ImageDimensions::new(1000.0, 600.0);
        let layout = ScreenLayout::default();
        let (w, h) = layout.container_size(&image, SlicePartition::new(2, 3));
        assert_eq!(w, 2.0 * 530.0 + 20.0);
        assert_eq!(h, 3.0 * 230.0 + 40.0);
    }
}

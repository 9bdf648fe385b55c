//! Editing session state.
//!
//! An `EditingSession` owns everything the user edits for one map: grid
//! configuration, image size, partition, global and per-slice views, slice
//! names, styling and the hover/click coordinates. Records from storage are
//! turned into a session and back; geometry is always derived on demand.

use std::collections::BTreeMap;

use crate::geometry::{
    compute_all_slices, compute_slice_geometry, hit_test, CropThreshold, GridExtent, Hit,
    HitTarget, ScreenLayout, SliceGeometry,
};
use crate::map::{MapRecord, ReferenceColors};
use crate::types::{
    Colour, Coordinate, GridConfig, ImageDimensions, Offset, SliceId, SliceImageSettings,
    SlicePartition, SliceSettings, ViewTransform,
};

/// Colours and line weight of the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStyle {
    pub grid_color: Colour,
    pub label_color: Colour,
    pub background_color: Colour,
    /// Grid line thickness in source pixels.
    pub grid_thickness: f64,
    pub reference_colors: ReferenceColors,
}

impl Default for GridStyle {
    fn default() -> Self {
        Self {
            grid_color: Colour::BLACK,
            label_color: Colour::BLACK,
            background_color: Colour::WHITE,
            grid_thickness: 1.0,
            reference_colors: ReferenceColors::default(),
        }
    }
}

/// Optional overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayFlags {
    pub show_reference_points: bool,
    pub show_center_coords: bool,
    pub show_scale_bar: bool,
}

impl Default for DisplayFlags {
    fn default() -> Self {
        Self {
            show_reference_points: false,
            show_center_coords: true,
            show_scale_bar: true,
        }
    }
}

/// Which view a pan drag moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanTarget {
    Global,
    Slice(SliceId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PanDrag {
    target: PanTarget,
    start_pointer: Offset,
    start_pan: Offset,
}

/// In-memory state for one map being edited.
#[derive(Debug, Clone)]
pub struct EditingSession {
    pub name: String,
    pub image_path: Option<String>,
    pub config: GridConfig,
    pub image: Option<ImageDimensions>,
    pub view: ViewTransform,
    pub style: GridStyle,
    pub flags: DisplayFlags,
    pub crop_threshold: CropThreshold,
    pub layout: ScreenLayout,
    partition: SlicePartition,
    slice_settings: SliceSettings,
    slice_names: BTreeMap<SliceId, String>,
    hover: Option<Coordinate>,
    click: Option<Coordinate>,
    drag: Option<PanDrag>,
}

impl Default for EditingSession {
    fn default() -> Self {
        Self::from_record(&MapRecord::default())
    }
}

impl EditingSession {
    /// Build a session from a stored record. Slice entries whose index lies
    /// outside the record's partition are dropped.
    pub fn from_record(record: &MapRecord) -> Self {
        let config = GridConfig {
            cell_size: record.cell_size,
            unit: record.unit,
            dpi: record.dpi,
            grid_offset: record.grid_offset,
        };
        let partition = SlicePartition::new(record.split_cols, record.split_rows);
        let (slice_settings, _) =
            SliceSettings::from_indexed(&record.slice_image_settings, partition);

        let slice_names = record
            .slice_names
            .iter()
            .filter_map(|(key, name)| {
                let id = key.trim().parse::<usize>().ok().and_then(|i| partition.id_at(i))?;
                let name = name.trim();
                (!name.is_empty()).then(|| (id, name.to_string()))
            })
            .collect();

        Self {
            name: record.name.clone(),
            image_path: record.image_path.clone(),
            config,
            image: record.image_dimensions,
            view: ViewTransform {
                zoom: record.image_zoom,
                pan: record.pan_offset,
                rotation: record.image_rotation,
            }
            .normalized(),
            style: GridStyle {
                grid_color: record.grid_color,
                label_color: record.label_color,
                background_color: record.background_color,
                grid_thickness: record.grid_thickness,
                reference_colors: record.reference_colors,
            },
            flags: DisplayFlags {
                show_reference_points: record.show_reference_points,
                show_center_coords: record.show_center_coords,
                show_scale_bar: record.show_scale_bar,
            },
            crop_threshold: CropThreshold::default(),
            layout: ScreenLayout::default(),
            partition,
            slice_settings,
            slice_names,
            hover: None,
            click: None,
            drag: None,
        }
    }

    /// Snapshot the session as a record for storage.
    pub fn to_record(&self) -> MapRecord {
        let slice_names = self
            .slice_names
            .iter()
            .filter_map(|(id, name)| {
                self.partition
                    .index_of(*id)
                    .map(|i| (i.to_string(), name.clone()))
            })
            .collect();

        MapRecord {
            name: self.name.clone(),
            image_path: self.image_path.clone(),
            cell_size: self.config.cell_size,
            unit: self.config.unit,
            dpi: self.config.dpi,
            grid_offset: self.config.grid_offset,
            pan_offset: self.view.pan,
            image_zoom: self.view.zoom,
            image_rotation: self.view.rotation,
            image_dimensions: self.image,
            split_cols: self.partition.cols,
            split_rows: self.partition.rows,
            slice_names,
            grid_color: self.style.grid_color,
            label_color: self.style.label_color,
            background_color: self.style.background_color,
            grid_thickness: self.style.grid_thickness,
            reference_colors: self.style.reference_colors,
            slice_image_settings: self.slice_settings.to_indexed(self.partition),
            show_reference_points: self.flags.show_reference_points,
            show_center_coords: self.flags.show_center_coords,
            show_scale_bar: self.flags.show_scale_bar,
        }
    }

    pub fn partition(&self) -> SlicePartition {
        self.partition
    }

    /// Change the partition, pruning overrides and names of slices that no
    /// longer exist. Returns the pruned slice ids.
    pub fn set_partition(&mut self, partition: SlicePartition) -> Vec<SliceId> {
        self.partition = partition;
        let mut pruned = self.slice_settings.prune(partition);
        self.slice_names.retain(|id, _| {
            let keep = partition.contains(*id);
            if !keep && !pruned.contains(id) {
                pruned.push(*id);
            }
            keep
        });
        pruned.sort();
        if let Some(PanDrag {
            target: PanTarget::Slice(id),
            ..
        }) = self.drag
        {
            if !partition.contains(id) {
                self.drag = None;
            }
        }
        pruned
    }

    // -- Slice names --

    /// Display name of a slice: the user's name, or `Slice {n}` counting
    /// row-major from 1.
    pub fn slice_name(&self, id: SliceId) -> String {
        if let Some(name) = self.slice_names.get(&id) {
            return name.clone();
        }
        match self.partition.index_of(id) {
            Some(i) => format!("Slice {}", i + 1),
            None => format!("Slice {}", id),
        }
    }

    /// Rename a slice. A blank name restores the default.
    pub fn rename_slice(&mut self, id: SliceId, name: &str) -> bool {
        if !self.partition.contains(id) {
            return false;
        }
        let name = name.trim();
        if name.is_empty() {
            self.slice_names.remove(&id);
        } else {
            self.slice_names.insert(id, name.to_string());
        }
        true
    }

    // -- Geometry --

    pub fn geometry(&self, id: SliceId) -> Option<SliceGeometry> {
        self.geometry_scaled(id, 1.0)
    }

    pub fn geometry_scaled(&self, id: SliceId, scale: f64) -> Option<SliceGeometry> {
        let image = self.image.as_ref()?;
        compute_slice_geometry(&self.config, image, self.partition, id, self.crop_threshold, scale)
    }

    pub fn all_geometry(&self) -> Vec<SliceGeometry> {
        match &self.image {
            Some(image) => compute_all_slices(&self.config, image, self.partition, self.crop_threshold, 1.0),
            None => vec![],
        }
    }

    pub fn extent(&self) -> Option<GridExtent> {
        GridExtent::compute(&self.config, self.image.as_ref()?)
    }

    // -- Views --

    pub fn effective_view(&self, id: SliceId) -> ViewTransform {
        self.slice_settings.effective(id, &self.view)
    }

    pub fn slice_settings(&self) -> &SliceSettings {
        &self.slice_settings
    }

    pub fn slice_override(&self, id: SliceId) -> Option<&SliceImageSettings> {
        self.slice_settings.get(id)
    }

    /// Adjust one slice's view, creating an override on first use.
    pub fn adjust_slice_view<F>(&mut self, id: SliceId, f: F) -> Option<ViewTransform>
    where
        F: FnOnce(&mut ViewTransform),
    {
        if !self.partition.contains(id) {
            return None;
        }
        Some(self.slice_settings.adjust(id, &self.view, f))
    }

    /// Drop a slice's override so it follows the global view again.
    pub fn reset_slice_view(&mut self, id: SliceId) -> bool {
        self.slice_settings.reset(id)
    }

    // -- Pointer --

    pub fn hit(&self, pointer: Offset, scale: f64) -> Option<Hit> {
        let image = self.image.as_ref()?;
        let target = HitTarget {
            config: &self.config,
            image,
            partition: self.partition,
            layout: self.layout,
        };
        hit_test(pointer, scale, &target, |id| self.effective_view(id))
    }

    /// Track the hovered cell. Misses clear the hover.
    pub fn pointer_moved(&mut self, pointer: Offset, scale: f64) -> Option<&Coordinate> {
        self.hover = self.hit(pointer, scale).map(|h| h.coordinate);
        self.hover.as_ref()
    }

    pub fn pointer_left(&mut self) {
        self.hover = None;
    }

    /// Pin the clicked cell. Clicking the pinned cell again or clicking
    /// outside the grid clears it.
    pub fn pointer_clicked(&mut self, pointer: Offset, scale: f64) -> Option<&Coordinate> {
        let hit = self.hit(pointer, scale).map(|h| h.coordinate);
        self.click = match hit {
            Some(c) if self.click.as_ref() == Some(&c) => None,
            other => other,
        };
        self.click.as_ref()
    }

    pub fn hover(&self) -> Option<&Coordinate> {
        self.hover.as_ref()
    }

    pub fn clicked(&self) -> Option<&Coordinate> {
        self.click.as_ref()
    }

    /// The coordinate shown in the centre badge: a click wins over hover.
    pub fn active_coordinate(&self) -> Option<&Coordinate> {
        self.click.as_ref().or(self.hover.as_ref())
    }

    // -- Panning --

    /// Start dragging a background image. Captures the pan at drag start.
    pub fn begin_pan(&mut self, target: PanTarget, pointer: Offset) -> bool {
        let start_pan = match target {
            PanTarget::Global => self.view.pan,
            PanTarget::Slice(id) if self.partition.contains(id) => self.effective_view(id).pan,
            PanTarget::Slice(_) => return false,
        };
        self.drag = Some(PanDrag {
            target,
            start_pointer: pointer,
            start_pan,
        });
        true
    }

    /// Move the dragged image so it follows the pointer. `scale` is the
    /// container scale, so screen deltas become content deltas.
    pub fn update_pan(&mut self, pointer: Offset, scale: f64) -> Option<ViewTransform> {
        let drag = self.drag?;
        if !scale.is_finite() || scale <= 0.0 || pointer.is_nan() {
            return None;
        }
        let pan = Offset::new(
            drag.start_pan.x + (pointer.x - drag.start_pointer.x) / scale,
            drag.start_pan.y + (pointer.y - drag.start_pointer.y) / scale,
        );
        match drag.target {
            PanTarget::Global => {
                self.view.pan = pan;
                Some(self.view)
            }
            PanTarget::Slice(id) => self.adjust_slice_view(id, |v| v.pan = pan),
        }
    }

    pub fn end_pan(&mut self) {
        self.drag = None;
    }

    pub fn is_panning(&self) -> bool {
        self.drag.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Unit;
    use pretty_assertions::assert_eq;

    fn session() -> EditingSession {
        let mut s = EditingSession::default();
        s.config = GridConfig::new(100.0, Unit::Px);
        s.image = Some(ImageDimensions::new(1000.0, 1000.0));
        s.set_partition(SlicePartition::new(2, 1));
        s
    }

    #[test]
    fn test_record_round_trip() {
        let mut s = session();
        s.name = "Orchard".to_string();
        s.rename_slice(SliceId::new(0, 1), "East");
        s.adjust_slice_view(SliceId::new(0, 0), |v| v.zoom = 2.0);

        let record = s.to_record();
        assert_eq!(record.split_cols, 2);
        assert_eq!(record.slice_names.get("1").map(String::as_str), Some("East"));
        assert_eq!(record.slice_image_settings.get("0").map(|s| s.zoom), Some(2.0));

        let back = EditingSession::from_record(&record);
        assert_eq!(back.to_record(), record);
        assert_eq!(back.slice_name(SliceId::new(0, 1)), "East");
    }

    #[test]
    fn test_from_record_drops_stale_indices() {
        let mut record = MapRecord::default();
        record.split_cols = 2;
        record.slice_names.insert("7".to_string(), "Ghost".to_string());
        record.slice_names.insert("1".to_string(), "  ".to_string());

        let s = EditingSession::from_record(&record);
        assert!(s.to_record().slice_names.is_empty());
        assert_eq!(s.slice_name(SliceId::new(0, 1)), "Slice 2");
    }

    #[test]
    fn test_default_slice_names() {
        let mut s = session();
        s.set_partition(SlicePartition::new(3, 2));
        assert_eq!(s.slice_name(SliceId::new(0, 0)), "Slice 1");
        assert_eq!(s.slice_name(SliceId::new(1, 2)), "Slice 6");
        assert!(s.rename_slice(SliceId::new(1, 2), " Pond "));
        assert_eq!(s.slice_name(SliceId::new(1, 2)), "Pond");
        assert!(s.rename_slice(SliceId::new(1, 2), ""));
        assert_eq!(s.slice_name(SliceId::new(1, 2)), "Slice 6");
        assert!(!s.rename_slice(SliceId::new(2, 0), "Nope"));
    }

    #[test]
    fn test_set_partition_prunes_overrides_and_names() {
        let mut s = session();
        s.set_partition(SlicePartition::new(3, 3));
        s.adjust_slice_view(SliceId::new(2, 2), |v| v.zoom = 3.0);
        s.adjust_slice_view(SliceId::new(0, 0), |v| v.zoom = 3.0);
        s.rename_slice(SliceId::new(1, 2), "Gone");

        let pruned = s.set_partition(SlicePartition::new(2, 2));
        assert_eq!(pruned, vec![SliceId::new(1, 2), SliceId::new(2, 2)]);
        assert!(s.slice_override(SliceId::new(0, 0)).is_some());
        assert_eq!(s.slice_settings().len(), 1);
    }

    #[test]
    fn test_geometry_requires_image() {
        let mut s = session();
        assert!(s.geometry(SliceId::new(0, 1)).is_some());
        assert_eq!(s.all_geometry().len(), 2);

        s.image = None;
        assert!(s.geometry(SliceId::new(0, 0)).is_none());
        assert!(s.all_geometry().is_empty());
    }

    #[test]
    fn test_degenerate_cell_size_renders_nothing() {
        let mut s = session();
        s.config.cell_size = 0.0;
        assert!(s.all_geometry().is_empty());
        assert!(s.pointer_moved(Offset::new(50.0, 50.0), 1.0).is_none());
    }

    #[test]
    fn test_hover_and_click_precedence() {
        let mut s = session();
        assert_eq!(
            s.pointer_moved(Offset::new(35.0, 35.0), 1.0),
            Some(&Coordinate::new("A", 1))
        );
        assert_eq!(s.active_coordinate(), Some(&Coordinate::new("A", 1)));

        s.pointer_clicked(Offset::new(140.0, 35.0), 1.0);
        s.pointer_moved(Offset::new(35.0, 140.0), 1.0);
        assert_eq!(s.hover(), Some(&Coordinate::new("A", 2)));
        assert_eq!(s.active_coordinate(), Some(&Coordinate::new("B", 1)));

        // Clicking the pinned cell again unpins it
        s.pointer_clicked(Offset::new(140.0, 35.0), 1.0);
        assert_eq!(s.clicked(), None);
        assert_eq!(s.active_coordinate(), Some(&Coordinate::new("A", 2)));

        s.pointer_left();
        assert_eq!(s.active_coordinate(), None);
    }

    #[test]
    fn test_hit_uses_slice_override() {
        let mut s = session();
        s.adjust_slice_view(SliceId::new(0, 1), |v| v.zoom = 2.0);

        // Second slice content starts at x = 580; local 10 -> image pixel 510
        // -> zoom 2 -> 255 -> column C
        let hit = s.hit(Offset::new(590.0, 40.0), 1.0).unwrap();
        assert_eq!(hit.coordinate.col, "C");

        // First slice is unaffected
        let hit = s.hit(Offset::new(40.0, 40.0), 1.0).unwrap();
        assert_eq!(hit.coordinate.col, "A");
    }

    #[test]
    fn test_pan_drag_global() {
        let mut s = session();
        assert!(s.begin_pan(PanTarget::Global, Offset::new(100.0, 100.0)));
        let view = s.update_pan(Offset::new(110.0, 90.0), 0.5).unwrap();
        assert_eq!(view.pan, Offset::new(20.0, -20.0));
        s.end_pan();
        assert!(!s.is_panning());
        assert!(s.update_pan(Offset::new(0.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn test_pan_drag_slice_creates_override() {
        let mut s = session();
        let id = SliceId::new(0, 1);
        assert!(s.begin_pan(PanTarget::Slice(id), Offset::ZERO));
        s.update_pan(Offset::new(5.0, 5.0), 1.0);
        s.update_pan(Offset::new(15.0, 5.0), 1.0);

        assert_eq!(s.effective_view(id).pan, Offset::new(15.0, 5.0));
        assert_eq!(s.view.pan, Offset::ZERO);

        assert!(!s.begin_pan(PanTarget::Slice(SliceId::new(4, 4)), Offset::ZERO));
    }

    #[test]
    fn test_partition_change_cancels_drag_on_removed_slice() {
        let mut s = session();
        s.begin_pan(PanTarget::Slice(SliceId::new(0, 1)), Offset::ZERO);
        s.set_partition(SlicePartition::SINGLE);
        assert!(!s.is_panning());
    }

    #[test]
    fn test_reset_slice_view() {
        let mut s = session();
        let id = SliceId::new(0, 0);
        s.adjust_slice_view(id, |v| v.rotation = 90.0);
        assert_eq!(s.effective_view(id).rotation, 90.0);
        assert!(s.reset_slice_view(id));
        assert_eq!(s.effective_view(id), s.view);
    }
}

//! Per-slice background image adjustments.
//!
//! Every slice shows the source image under the global zoom/pan/rotation
//! unless the user adjusted that slice on its own. Overrides are keyed by
//! `SliceId` so that changing the partition can prune them precisely.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::config::{Offset, SliceId, SlicePartition};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 10.0;

/// Zoom, pan and rotation applied to a background image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub zoom: f64,
    pub pan: Offset,
    /// Degrees clockwise, normalised to `[0, 360)`.
    pub rotation: f64,
}

impl ViewTransform {
    pub const IDENTITY: Self = Self {
        zoom: 1.0,
        pan: Offset::ZERO,
        rotation: 0.0,
    };

    /// Clamp zoom into range and normalise rotation.
    pub fn normalized(mut self) -> Self {
        self.zoom = clamp_zoom(self.zoom);
        self.rotation = normalize_rotation(self.rotation);
        if self.pan.is_nan() {
            self.pan = Offset::ZERO;
        }
        self
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A user override for one slice's background image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceImageSettings {
    pub zoom: f64,
    pub pan_offset: Offset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

impl SliceImageSettings {
    fn from_view(view: &ViewTransform) -> Self {
        Self {
            zoom: view.zoom,
            pan_offset: view.pan,
            rotation: Some(view.rotation),
        }
    }

    /// Resolve against the global view; a missing rotation inherits the global one.
    pub fn resolve(&self, global: &ViewTransform) -> ViewTransform {
        ViewTransform {
            zoom: self.zoom,
            pan: self.pan_offset,
            rotation: self.rotation.unwrap_or(global.rotation),
        }
        .normalized()
    }
}

/// Sparse per-slice overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SliceSettings {
    entries: BTreeMap<SliceId, SliceImageSettings>,
}

impl SliceSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SliceId) -> Option<&SliceImageSettings> {
        self.entries.get(&id)
    }

    pub fn insert(&mut self, id: SliceId, settings: SliceImageSettings) {
        self.entries.insert(id, settings);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SliceId, &SliceImageSettings)> {
        self.entries.iter()
    }

    /// The view a slice is actually displayed with.
    pub fn effective(&self, id: SliceId, global: &ViewTransform) -> ViewTransform {
        match self.entries.get(&id) {
            Some(settings) => settings.resolve(global),
            None => global.normalized(),
        }
    }

    /// Apply an adjustment to one slice, creating its override from the
    /// global view on first use.
    pub fn adjust<F>(&mut self, id: SliceId, global: &ViewTransform, f: F) -> ViewTransform
    where
        F: FnOnce(&mut ViewTransform),
    {
        let mut view = self.effective(id, global);
        f(&mut view);
        let view = view.normalized();
        self.entries.insert(id, SliceImageSettings::from_view(&view));
        view
    }

    /// Drop a slice's override. Returns whether one existed.
    pub fn reset(&mut self, id: SliceId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Remove overrides that fall outside `partition`, returning their ids.
    pub fn prune(&mut self, partition: SlicePartition) -> Vec<SliceId> {
        let stale: Vec<SliceId> = self
            .entries
            .keys()
            .copied()
            .filter(|id| !partition.contains(*id))
            .collect();
        for id in &stale {
            self.entries.remove(id);
        }
        stale
    }

    /// Build from a record's flat-index mapping. Keys that are not indices
    /// inside `partition` are skipped and returned.
    pub fn from_indexed(
        indexed: &BTreeMap<String, SliceImageSettings>,
        partition: SlicePartition,
    ) -> (Self, Vec<String>) {
        let mut settings = Self::new();
        let mut skipped = Vec::new();
        for (key, value) in indexed {
            match key.trim().parse::<usize>().ok().and_then(|i| partition.id_at(i)) {
                Some(id) => settings.insert(id, *value),
                None => skipped.push(key.clone()),
            }
        }
        (settings, skipped)
    }

    /// Flatten to the record's index-keyed mapping.
    pub fn to_indexed(&self, partition: SlicePartition) -> BTreeMap<String, SliceImageSettings> {
        self.entries
            .iter()
            .filter_map(|(id, s)| partition.index_of(*id).map(|i| (i.to_string(), *s)))
            .collect()
    }
}

pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        1.0
    }
}

pub fn normalize_rotation(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let r = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if r >= 360.0 {
        0.0
    } else {
        r
    }
}

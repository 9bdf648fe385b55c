//! Persisted map records.
//!
//! The storage side hands records back with object-typed fields either as
//! native JSON or as JSON-encoded strings (`"gridOffset": "{\"x\":0,\"y\":0}"`).
//! Both are accepted on read. The save payload always stringifies those
//! fields, which is what the storage API expects.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{GridError, Result};
use crate::types::{Colour, ImageDimensions, Offset, SliceImageSettings, Unit, DEFAULT_DPI};

/// Colours of the four reference-frame edges drawn on exports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceColors {
    pub top: Colour,
    pub right: Colour,
    pub bottom: Colour,
    pub left: Colour,
}

impl Default for ReferenceColors {
    fn default() -> Self {
        Self {
            top: Colour::rgb(0xFF, 0x00, 0x00),
            right: Colour::rgb(0x00, 0xAA, 0x00),
            bottom: Colour::rgb(0x00, 0x00, 0xFF),
            left: Colour::rgb(0xFF, 0xAA, 0x00),
        }
    }
}

/// A map as stored by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapRecord {
    pub name: String,
    /// Source image, relative to the record file when not absolute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    pub cell_size: f64,
    pub unit: Unit,
    pub dpi: f64,
    #[serde(deserialize_with = "json_or_string")]
    pub grid_offset: Offset,
    #[serde(deserialize_with = "json_or_string")]
    pub pan_offset: Offset,
    pub image_zoom: f64,
    pub image_rotation: f64,
    #[serde(
        deserialize_with = "json_or_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_dimensions: Option<ImageDimensions>,
    pub split_cols: u32,
    pub split_rows: u32,
    /// Flat slice index (row-major) to display name.
    #[serde(deserialize_with = "json_or_string")]
    pub slice_names: BTreeMap<String, String>,
    pub grid_color: Colour,
    pub label_color: Colour,
    pub background_color: Colour,
    pub grid_thickness: f64,
    #[serde(deserialize_with = "json_or_string")]
    pub reference_colors: ReferenceColors,
    /// Flat slice index (row-major) to view override.
    #[serde(deserialize_with = "json_or_string")]
    pub slice_image_settings: BTreeMap<String, SliceImageSettings>,
    pub show_reference_points: bool,
    pub show_center_coords: bool,
    pub show_scale_bar: bool,
}

impl Default for MapRecord {
    fn default() -> Self {
        Self {
            name: "Untitled map".to_string(),
            image_path: None,
            cell_size: 50.0,
            unit: Unit::Px,
            dpi: DEFAULT_DPI,
            grid_offset: Offset::ZERO,
            pan_offset: Offset::ZERO,
            image_zoom: 1.0,
            image_rotation: 0.0,
            image_dimensions: None,
            split_cols: 1,
            split_rows: 1,
            slice_names: BTreeMap::new(),
            grid_color: Colour::BLACK,
            label_color: Colour::BLACK,
            background_color: Colour::WHITE,
            grid_thickness: 1.0,
            reference_colors: ReferenceColors::default(),
            slice_image_settings: BTreeMap::new(),
            show_reference_points: false,
            show_center_coords: true,
            show_scale_bar: true,
        }
    }
}

impl MapRecord {
    /// Load a record from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| GridError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to read map record: {}", e),
        })?;

        Self::parse(&content)
    }

    /// Parse a record from JSON text.
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| GridError::Persistence {
            message: format!("Invalid map record: {}", e),
            help: Some("Object fields may be native JSON or JSON-encoded strings".to_string()),
        })
    }

    /// Write the record as pretty JSON with native object fields.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| GridError::Persistence {
            message: format!("Failed to serialize map record: {}", e),
            help: None,
        })?;
        fs::write(path, json).map_err(|e| GridError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to write map record: {}", e),
        })
    }

    /// The flat payload sent to the storage API on save.
    pub fn to_save_payload(&self) -> Result<serde_json::Value> {
        serde_json::to_value(SavePayload::from(self)).map_err(|e| GridError::Persistence {
            message: format!("Failed to build save payload: {}", e),
            help: None,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SavePayload<'a> {
    name: &'a str,
    cell_size: f64,
    unit: Unit,
    dpi: f64,
    #[serde(serialize_with = "as_json_string")]
    grid_offset: &'a Offset,
    #[serde(serialize_with = "as_json_string")]
    pan_offset: &'a Offset,
    image_zoom: f64,
    image_rotation: f64,
    #[serde(serialize_with = "as_json_string")]
    image_dimensions: &'a Option<ImageDimensions>,
    split_cols: u32,
    split_rows: u32,
    #[serde(serialize_with = "as_json_string")]
    slice_names: &'a BTreeMap<String, String>,
    grid_color: Colour,
    label_color: Colour,
    background_color: Colour,
    grid_thickness: f64,
    #[serde(serialize_with = "as_json_string")]
    reference_colors: &'a ReferenceColors,
    #[serde(serialize_with = "as_json_string")]
    slice_image_settings: &'a BTreeMap<String, SliceImageSettings>,
    show_reference_points: bool,
    show_center_coords: bool,
    show_scale_bar: bool,
}

impl<'a> From<&'a MapRecord> for SavePayload<'a> {
    fn from(r: &'a MapRecord) -> Self {
        Self {
            name: &r.name,
            cell_size: r.cell_size,
            unit: r.unit,
            dpi: r.dpi,
            grid_offset: &r.grid_offset,
            pan_offset: &r.pan_offset,
            image_zoom: r.image_zoom,
            image_rotation: r.image_rotation,
            image_dimensions: &r.image_dimensions,
            split_cols: r.split_cols,
            split_rows: r.split_rows,
            slice_names: &r.slice_names,
            grid_color: r.grid_color,
            label_color: r.label_color,
            background_color: r.background_color,
            grid_thickness: r.grid_thickness,
            reference_colors: &r.reference_colors,
            slice_image_settings: &r.slice_image_settings,
            show_reference_points: r.show_reference_points,
            show_center_coords: r.show_center_coords,
            show_scale_bar: r.show_scale_bar,
        }
    }
}

/// Accept a field as native JSON, a JSON-encoded string, or null.
fn json_or_string<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(T::default()),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(T::default()),
        serde_json::Value::String(s) => serde_json::from_str(&s).map_err(serde::de::Error::custom),
        other => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}

fn as_json_string<S, T>(value: &T, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    let s = serde_json::to_string(value).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}

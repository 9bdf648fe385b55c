//! Core domain types for gridslice.
//!
//! - `GridConfig` - cell size, unit, DPI and grid origin
//! - `ImageDimensions`, `SlicePartition`, `SliceId` - what the grid is laid over
//! - `SliceSettings` - sparse per-slice view overrides
//! - `Colour` - RGBA colours stored as hex strings

mod colour;
mod config;
mod settings;

pub use colour::Colour;
pub(crate) use config::format_number;
pub use config::{
    Coordinate, GridConfig, ImageDimensions, Offset, SliceId, SlicePartition, Unit, DEFAULT_DPI,
    MM_PER_INCH,
};
pub use settings::{
    clamp_zoom, normalize_rotation, SliceImageSettings, SliceSettings, ViewTransform, MAX_ZOOM,
    MIN_ZOOM,
};

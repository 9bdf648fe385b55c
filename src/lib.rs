//! gridslice - labelled coordinate grids over images
//!
//! Lays a square grid with spreadsheet-style labels (columns `A, B, ... Z,
//! AA`, rows `1, 2, ...`) over an image, splits the image into a grid of
//! slices that keep one continuous coordinate system, and exports each
//! slice as a print-ready JPEG.

pub mod cli;
pub mod discovery;
pub mod error;
pub mod geometry;
pub mod map;
pub mod output;
pub mod render;
pub mod session;
pub mod types;
pub mod validation;

pub use discovery::{discover, discover_paths, DiscoveryResult, Settings};
pub use error::{GridError, Result};
pub use geometry::{
    compute_all_slices, compute_slice_geometry, decode_column, encode_column, hit_test, GridExtent,
    Hit, ScreenLayout, SliceGeometry,
};
pub use map::MapRecord;
pub use render::{export_slices, plan_overlay, ExportArtifact, ExportOptions, OverlayPlan};
pub use session::EditingSession;
pub use types::{
    Colour, Coordinate, GridConfig, ImageDimensions, Offset, SliceId, SlicePartition, Unit,
    ViewTransform,
};
pub use validation::{validate_record, Diagnostic, Severity, ValidationResult};

//! Rendering for gridslice.
//!
//! `overlay` plans the interactive on-screen view; `export` rasterizes
//! slices to JPEG. Both read their grid from [`crate::geometry`], so the two
//! outputs agree up to the export scale.

mod canvas;
mod export;
mod overlay;

pub use canvas::{label_font, Canvas, PixelRect};
pub use export::{
    encode_jpeg, export_from_image, export_slices, render_slice, sanitize_file_name,
    write_artifact, ExportArtifact, ExportLayoutConfig, ExportOptions, ExportedSlice,
};
pub(crate) use export::unique_name;
pub use overlay::{
    plan_overlay, BackgroundPlacement, CenterBadge, OverlayLabel, OverlayPlan, SliceOverlay,
};

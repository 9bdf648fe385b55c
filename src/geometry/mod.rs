//! Grid geometry: column labels, per-slice layout and pointer hit-testing.
//!
//! Everything in here is pure and cheap enough to call on every render or
//! pointer event. Invalid input never panics or errors; it yields `None`.

mod hit;
mod label;
mod slice;

pub use hit::{hit_test, project_cell_center, Hit, HitTarget, ScreenLayout};
pub use label::{decode_column, encode_column, legacy_column_index};
pub use slice::{
    compute_all_slices, compute_slice_geometry, export_scale, AxisLabel, CropThreshold,
    GridExtent, SliceGeometry, DEFAULT_CROP_THRESHOLD,
};

//! Validation of map records.
//!
//! Runs a suite of checks against a record and reports errors and
//! warnings. Used by `gridslice validate` and before every export.

mod checks;
mod warning;

pub use warning::{Diagnostic, Severity, ValidationResult};

use crate::geometry::CropThreshold;
use crate::map::MapRecord;
use crate::output::Printer;

/// Run all validation checks against a record.
pub fn validate_record(record: &MapRecord, threshold: CropThreshold) -> ValidationResult {
    let mut result = ValidationResult::new();

    result.merge(checks::check_cell_size(record));
    result.merge(checks::check_partition(record));
    result.merge(checks::check_image_dimensions(record));
    result.merge(checks::check_cropped_slices(record, threshold));
    result.merge(checks::check_stale_slice_entries(record));
    result.merge(checks::check_zoom_range(record));
    result.merge(checks::check_center_label_columns(record));
    result.merge(checks::check_duplicate_slice_names(record));

    result
}

/// Print diagnostics to stderr.
pub fn print_diagnostics(result: &ValidationResult, printer: &Printer) {
    for d in result.iter() {
        let label = printer.severity(&d.severity.to_string(), d.severity == Severity::Error);
        eprintln!("  {}[{}]: {}", label, printer.dim(&d.code), d.message);
        if let Some(help) = &d.help {
            eprintln!("    help: {}", help);
        }
    }
}

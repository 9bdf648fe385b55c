//! Validate command implementation.

use std::path::PathBuf;

use clap::Args;

use crate::discovery::discover_paths;
use crate::error::{GridError, Result};
use crate::map::MapRecord;
use crate::output::{display_path, plural, Printer};
use crate::validation::{print_diagnostics, validate_record, Diagnostic, ValidationResult};

/// Check map records for problems
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Map records, or directories to search for *.map.json
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

pub fn run(args: ValidateArgs, printer: &Printer) -> Result<()> {
    let discovery = discover_paths(&args.files, &std::env::current_dir()?)?;
    let threshold = discovery.settings.effective_crop_threshold();
    let files = discovery.maps;

    if files.is_empty() {
        printer.warning("Skipping", "no map records found");
        return Ok(());
    }

    let mut errors = 0;
    let mut warnings = 0;
    let mut failed_files = 0;

    for file in &files {
        let result = match MapRecord::load(file) {
            Ok(record) => validate_record(&record, threshold),
            Err(e) => {
                let mut result = ValidationResult::new();
                result.push(Diagnostic::error(
                    "gridslice::validate::unreadable",
                    e.to_string(),
                ));
                result
            }
        };

        let file_errors = result.error_count() + if args.strict { result.warning_count() } else { 0 };
        errors += file_errors;
        warnings += result.warning_count();
        if file_errors > 0 {
            failed_files += 1;
        }

        if result.is_ok() {
            printer.status("Checked", &display_path(file));
        } else {
            if result.has_errors() {
                printer.error("Invalid", &display_path(file));
            } else {
                printer.warning("Checked", &display_path(file));
            }
            print_diagnostics(&result, printer);
        }
    }

    if failed_files > 0 {
        return Err(GridError::Validation {
            errors,
            files: failed_files,
        });
    }

    printer.success(
        "Finished",
        &format!(
            "{} valid, {}",
            plural(files.len(), "record", "records"),
            plural(warnings, "warning", "warnings")
        ),
    );
    Ok(())
}

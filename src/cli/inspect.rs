//! Inspect command implementation.
//!
//! Prints the computed layout of every slice: human-readable on stderr, or
//! JSON on stdout with `--json`.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::discovery::load_settings;
use crate::error::{GridError, Result};
use crate::geometry::{export_scale, GridExtent, SliceGeometry};
use crate::output::{display_path, plural, Printer};

/// Print the grid layout of every slice
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Map record to inspect
    #[arg(required = true)]
    pub file: PathBuf,

    /// Source image (default: the record's imagePath)
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Report geometry as exported at this DPI instead of on screen
    #[arg(long)]
    pub dpi: Option<f64>,

    /// Print JSON to stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectReport {
    name: String,
    scale: f64,
    cell_size_px: Option<f64>,
    scale_text: String,
    extent: Option<GridExtent>,
    slices: Vec<SliceReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SliceReport {
    id: String,
    name: String,
    #[serde(flatten)]
    geometry: SliceGeometry,
    column_labels: Vec<String>,
    row_labels: Vec<String>,
}

pub fn run(args: InspectArgs, printer: &Printer) -> Result<()> {
    let (settings, _) = load_settings(&std::env::current_dir()?)?;
    let opened = super::open_map(&args.file, args.image.as_deref(), &settings)?;
    let session = opened.session;
    let image = super::require_dimensions(&session, &args.file)?;

    let scale = match args.dpi {
        Some(dpi) => export_scale(dpi, session.config.dpi).ok_or_else(|| GridError::InvalidGeometry {
            message: format!("cannot scale from {} dpi to {} dpi", session.config.dpi, dpi),
            help: Some("Both DPI values must be positive".to_string()),
        })?,
        None => 1.0,
    };

    let mut slices = Vec::new();
    for id in session.partition().ids() {
        match session.geometry_scaled(id, scale) {
            Some(geometry) => slices.push(SliceReport {
                id: id.to_string(),
                name: session.slice_name(id),
                column_labels: geometry.column_labels().into_iter().map(|l| l.text).collect(),
                row_labels: geometry.row_labels().into_iter().map(|l| l.text).collect(),
                geometry,
            }),
            None => printer.warning("Skipping", &format!("slice {}: no grid can be laid out", id)),
        }
    }

    if slices.is_empty() {
        return Err(GridError::InvalidGeometry {
            message: format!("no slice of {} has a valid grid", display_path(&args.file)),
            help: Some("Check cellSize, splitCols, splitRows and imageDimensions".to_string()),
        });
    }

    let report = InspectReport {
        name: session.name.clone(),
        scale,
        cell_size_px: session.config.cell_size_px().map(|c| c * scale),
        scale_text: session.config.scale_text(),
        extent: GridExtent::compute(&session.config, &image),
        slices,
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report).map_err(|e| GridError::Export {
            message: format!("Failed to serialize report: {}", e),
            help: None,
        })?;
        println!("{}", json);
        return Ok(());
    }

    print_report(&report, printer);
    Ok(())
}

fn print_report(report: &InspectReport, printer: &Printer) {
    let extent = report
        .extent
        .map(|e| format!(", {}x{} cells", e.total_cols, e.total_rows))
        .unwrap_or_default();
    printer.info(
        "Map",
        &format!(
            "{} ({}{}, {})",
            printer.cyan(&report.name),
            plural(report.slices.len(), "slice", "slices"),
            extent,
            report.scale_text
        ),
    );

    for slice in &report.slices {
        let g = &slice.geometry;
        let span = match (slice.column_labels.first(), slice.column_labels.last()) {
            (Some(first), Some(last)) if first != last => format!("{}-{}", first, last),
            (Some(first), _) => first.clone(),
            _ => "-".to_string(),
        };
        let message = format!(
            "{} {} cols {} x rows {}-{}, {}x{} whole cells",
            slice.name,
            printer.dim(&format!("[{}]", slice.id)),
            span,
            g.start_row_index + 1,
            g.start_row_index + g.num_rows.max(1),
            g.num_cols,
            g.num_rows
        );
        if g.is_cropped {
            printer.warning("Cropped", &message);
        } else {
            printer.status("Slice", &message);
        }
        printer.verbose(
            "Offsets",
            &format!(
                "first line at ({:.2}, {:.2}), cell {:.2}px, slice at ({:.2}, {:.2}) {:.2}x{:.2}",
                g.first_col_offset,
                g.first_row_offset,
                g.cell_size_px,
                g.slice_left,
                g.slice_top,
                g.slice_width,
                g.slice_height
            ),
        );
    }
}

//! Export command implementation.
//!
//! Renders the slices of one or more map records to labelled JPEG tiles.
//! A single slice is written as `{slice name}.jpg`; several are bundled into
//! one zip per map. When more than one map is exported, each map writes
//! into its own subdirectory named after the record file, so maps with the
//! same slice names or zip name never overwrite each other.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use clap::Args;

use crate::discovery::{discover_paths, map_stem, Settings};
use crate::error::{GridError, Result};
use crate::output::{display_path, plural, Printer};
use crate::render::{
    export_slices, sanitize_file_name, unique_name, write_artifact, ExportArtifact, ExportOptions,
};
use crate::types::SliceId;
use crate::validation::{print_diagnostics, validate_record};

/// Export slices as labelled JPEG tiles
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Map records, or directories to search for *.map.json
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Source image (default: the record's imagePath)
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Output DPI (default: export_dpi from gridslice.yaml, else 300)
    #[arg(long)]
    pub dpi: Option<f64>,

    /// JPEG quality, 1-100
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Slice to export as row,col (repeatable; default: all)
    #[arg(long = "slice", value_parser = super::parse_slice_id)]
    pub slices: Vec<SliceId>,

    /// Output directory (default: output from gridslice.yaml, else dist).
    /// With several maps, each gets a subdirectory named after its record
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Draw the coloured reference frame
    #[arg(long)]
    pub reference_lines: bool,

    /// Leave out the name and scale badge
    #[arg(long)]
    pub no_badge: bool,

    /// File name for the zip when several slices are exported
    #[arg(long)]
    pub zip_name: Option<String>,
}

pub fn run(args: ExportArgs, printer: &Printer) -> Result<()> {
    let discovery = discover_paths(&args.paths, &std::env::current_dir()?)?;
    if discovery.has_settings {
        printer.verbose("Settings", &display_path(&discovery.root.join(crate::discovery::SETTINGS_FILENAME)));
    }

    if discovery.maps.is_empty() {
        return Err(GridError::Export {
            message: "no map records found".to_string(),
            help: Some("Pass *.map.json files or a directory containing them".to_string()),
        });
    }
    if args.image.is_some() && discovery.maps.len() > 1 {
        return Err(GridError::Export {
            message: format!("--image given for {}", plural(discovery.maps.len(), "map", "maps")),
            help: Some("Export one map at a time when overriding its image".to_string()),
        });
    }

    let output = args.output.clone().unwrap_or_else(|| discovery.settings.output.clone());
    let started = std::time::Instant::now();
    let mut written = 0;
    let per_map_dirs = discovery.maps.len() > 1;
    let mut used_dirs = HashSet::new();

    for map in &discovery.maps {
        let artifact = export_map(map, &args, &discovery.settings, printer)?;
        let dir = if per_map_dirs {
            let stem = sanitize_file_name(map_stem(map).unwrap_or("map"));
            output.join(unique_name(stem, &mut used_dirs))
        } else {
            output.clone()
        };
        let path = write_artifact(&artifact, &dir)?;
        written += artifact.slices().len();
        printer.status("Wrote", &display_path(&path));
    }

    printer.success(
        "Finished",
        &format!(
            "{} from {} in {:.2}s",
            plural(written, "slice", "slices"),
            plural(discovery.maps.len(), "map", "maps"),
            started.elapsed().as_secs_f64()
        ),
    );
    Ok(())
}

/// Validate and render one map. Nothing is written here.
fn export_map(path: &Path, args: &ExportArgs, settings: &Settings, printer: &Printer) -> Result<ExportArtifact> {
    let opened = super::open_map(path, args.image.as_deref(), settings)?;

    let diagnostics = validate_record(&opened.record, opened.session.crop_threshold);
    if diagnostics.has_errors() {
        printer.error("Invalid", &display_path(path));
        print_diagnostics(&diagnostics, printer);
        return Err(GridError::Validation {
            errors: diagnostics.error_count(),
            files: 1,
        });
    }

    let image_path = opened.image_path.ok_or_else(|| GridError::Export {
        message: format!("{} has no source image", display_path(path)),
        help: Some("Pass --image or set imagePath in the record".to_string()),
    })?;

    let options = export_options(args, settings, &opened.session.flags);
    printer.status(
        "Exporting",
        &format!(
            "{} ({} at {} dpi)",
            printer.cyan(&opened.session.name),
            if options.slices.is_empty() {
                plural(opened.session.partition().len(), "slice", "slices")
            } else {
                plural(options.slices.len(), "slice", "slices")
            },
            options.dpi
        ),
    );

    let artifact = export_slices(&opened.session, &image_path, &options)?;
    for slice in artifact.slices() {
        printer.verbose(
            "Rendered",
            &format!(
                "{} {} {}x{}",
                slice.file_name,
                printer.dim(&format!("[{}]", slice.slice)),
                slice.width,
                slice.height
            ),
        );
    }
    Ok(artifact)
}

/// Flags win over gridslice.yaml, which wins over the map's own flags.
fn export_options(args: &ExportArgs, settings: &Settings, flags: &crate::session::DisplayFlags) -> ExportOptions {
    ExportOptions {
        dpi: args
            .dpi
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or_else(|| settings.effective_export_dpi()),
        jpeg_quality: args.quality.unwrap_or_else(|| settings.effective_jpeg_quality()),
        reference_lines: args.reference_lines || settings.effective_reference_lines(flags.show_reference_points),
        badge: !args.no_badge && settings.effective_badge(flags.show_scale_bar),
        slices: args.slices.clone(),
        zip_name: args.zip_name.clone().or_else(|| settings.zip_name.clone()),
    }
}

//! Locate command implementation.
//!
//! Hit-tests a point on the rendered slice container and prints the grid
//! cell under it.

use std::path::PathBuf;

use clap::Args;

use crate::discovery::load_settings;
use crate::error::{GridError, Result};
use crate::geometry::Hit;
use crate::output::Printer;
use crate::types::Offset;

/// Find the grid cell under a screen position
#[derive(Args, Debug)]
pub struct LocateArgs {
    /// Map record to hit-test
    #[arg(required = true)]
    pub file: PathBuf,

    /// Horizontal position relative to the slice container
    #[arg(long, allow_negative_numbers = true)]
    pub x: f64,

    /// Vertical position relative to the slice container
    #[arg(long, allow_negative_numbers = true)]
    pub y: f64,

    /// Zoom the container is drawn at
    #[arg(long, default_value = "1.0")]
    pub scale: f64,

    /// Source image (default: the record's imagePath)
    #[arg(long)]
    pub image: Option<PathBuf>,
}

pub fn run(args: LocateArgs, printer: &Printer) -> Result<()> {
    let hit = locate(&args)?;

    match &hit {
        Some(hit) => printer.info(
            "Located",
            &format!(
                "{} in {} {}",
                printer.bold(&hit.coordinate.to_string()),
                hit.slice,
                printer.dim(&format!("(col {}, row {})", hit.col_index, hit.row_index))
            ),
        ),
        None => printer.warning("Missed", &format!("no cell at ({}, {})", args.x, args.y)),
    }

    let json = serde_json::to_string_pretty(&hit).map_err(|e| GridError::Export {
        message: format!("Failed to serialize hit: {}", e),
        help: None,
    })?;
    println!("{}", json);
    Ok(())
}

fn locate(args: &LocateArgs) -> Result<Option<Hit>> {
    let (settings, _) = load_settings(&std::env::current_dir()?)?;
    let opened = super::open_map(&args.file, args.image.as_deref(), &settings)?;
    super::require_dimensions(&opened.session, &args.file)?;

    if !args.scale.is_finite() || args.scale <= 0.0 {
        return Err(GridError::InvalidGeometry {
            message: format!("scale must be positive, got {}", args.scale),
            help: None,
        });
    }

    Ok(opened.session.hit(Offset::new(args.x, args.y), args.scale))
}

pub mod completions;
pub mod export;
pub mod inspect;
pub mod locate;
pub mod validate;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::discovery::{resolve_image_path, Settings};
use crate::error::{GridError, Result};
use crate::map::MapRecord;
use crate::session::EditingSession;
use crate::types::{ImageDimensions, SliceId};

/// gridslice - labelled coordinate grids over images, split into slices
#[derive(Parser, Debug)]
#[command(name = "gridslice")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Print per-slice detail
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(long, short, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the grid layout of every slice
    Inspect(inspect::InspectArgs),

    /// Find the grid cell under a screen position
    Locate(locate::LocateArgs),

    /// Export slices as labelled JPEG tiles
    Export(export::ExportArgs),

    /// Check map records for problems
    Validate(validate::ValidateArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Parse a slice id written as `row,col`.
pub fn parse_slice_id(s: &str) -> std::result::Result<SliceId, String> {
    let (row, col) = s
        .split_once(',')
        .ok_or_else(|| format!("expected row,col but got '{}'", s))?;
    let row = row
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid row '{}'", row.trim()))?;
    let col = col
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid column '{}'", col.trim()))?;
    Ok(SliceId::new(row, col))
}

/// A map record opened for a command.
pub(crate) struct OpenedMap {
    pub record: MapRecord,
    pub session: EditingSession,
    /// Source image: `--image` if given, else the record's own path.
    pub image_path: Option<PathBuf>,
}

/// Load a record into a session. Missing image dimensions are read from
/// the image header when an image is known, into both the session and
/// the returned record.
pub(crate) fn open_map(path: &Path, image: Option<&Path>, settings: &Settings) -> Result<OpenedMap> {
    let mut record = MapRecord::load(path)?;
    let mut session = EditingSession::from_record(&record);
    session.crop_threshold = settings.effective_crop_threshold();

    let image_path = image
        .map(Path::to_path_buf)
        .or_else(|| record.image_path.as_deref().map(|p| resolve_image_path(path, p)));

    if session.image.is_none() {
        if let Some(image_path) = &image_path {
            let (w, h) = image::image_dimensions(image_path).map_err(|e| GridError::Io {
                path: image_path.clone(),
                message: format!("Failed to read image size: {}", e),
            })?;
            session.image = Some(ImageDimensions::new(w as f64, h as f64));
            record.image_dimensions = session.image;
        }
    }

    Ok(OpenedMap {
        record,
        session,
        image_path,
    })
}

/// Fail when a session has no image size to lay a grid over.
pub(crate) fn require_dimensions(session: &EditingSession, path: &Path) -> Result<ImageDimensions> {
    session.image.ok_or_else(|| GridError::InvalidGeometry {
        message: format!("{} has no image dimensions", path.display()),
        help: Some("Add imageDimensions or imagePath to the record, or pass --image".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_slice_id() {
        assert_eq!(parse_slice_id("0,1"), Ok(SliceId::new(0, 1)));
        assert_eq!(parse_slice_id(" 2 , 3 "), Ok(SliceId::new(2, 3)));
        assert!(parse_slice_id("2").is_err());
        assert!(parse_slice_id("a,1").is_err());
        assert!(parse_slice_id("1,-1").is_err());
    }

    #[test]
    fn test_open_map_reads_dimensions_from_image() {
        let dir = tempdir().unwrap();
        image::RgbaImage::new(40, 30)
            .save(dir.path().join("field.png"))
            .unwrap();
        let record = dir.path().join("field.map.json");
        fs::write(&record, r#"{"name": "Field", "imagePath": "field.png"}"#).unwrap();

        let opened = open_map(&record, None, &Settings::default()).unwrap();
        assert_eq!(opened.session.image, Some(ImageDimensions::new(40.0, 30.0)));
        assert_eq!(opened.record.image_dimensions, opened.session.image);
        assert_eq!(opened.image_path, Some(dir.path().join("field.png")));
        assert_eq!(opened.record.name, "Field");
    }

    #[test]
    fn test_open_map_without_image() {
        let dir = tempdir().unwrap();
        let record = dir.path().join("bare.map.json");
        fs::write(&record, "{}").unwrap();

        let opened = open_map(&record, None, &Settings::default()).unwrap();
        assert!(opened.image_path.is_none());
        assert!(require_dimensions(&opened.session, &record).is_err());
    }

    #[test]
    fn test_open_map_missing_image_file() {
        let dir = tempdir().unwrap();
        let record = dir.path().join("gone.map.json");
        fs::write(&record, r#"{"imagePath": "gone.png"}"#).unwrap();

        let result = open_map(&record, None, &Settings::default());
        assert!(matches!(result, Err(GridError::Io { .. })));
    }
}

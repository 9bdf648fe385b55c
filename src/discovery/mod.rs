//! Locating map records, their source images and tool settings.
//!
//! # Example
//!
//! ```ignore
//! use gridslice::discovery::discover;
//!
//! let result = discover("./maps")?;
//! println!("Found {} maps", result.maps.len());
//! ```

mod scanner;
mod settings;

use std::path::{Path, PathBuf};

use crate::error::Result;

pub use scanner::{is_map_file, map_stem, scan_directory, scan_paths, MAP_SUFFIX};
pub use settings::{Settings, DEFAULT_EXPORT_DPI, DEFAULT_JPEG_QUALITY};

/// The name of the settings file.
pub const SETTINGS_FILENAME: &str = "gridslice.yaml";

/// Result of discovering map records.
#[derive(Debug)]
pub struct DiscoveryResult {
    /// Directory settings were looked up in.
    pub root: PathBuf,

    /// Loaded settings (default if no gridslice.yaml was found).
    pub settings: Settings,

    /// Whether a gridslice.yaml was found.
    pub has_settings: bool,

    /// Map record files, in path order.
    pub maps: Vec<PathBuf>,
}

/// Load `gridslice.yaml` from `dir` if present.
pub fn load_settings(dir: &Path) -> Result<(Settings, bool)> {
    let path = dir.join(SETTINGS_FILENAME);
    if path.exists() {
        Ok((Settings::load(&path)?, true))
    } else {
        Ok((Settings::default(), false))
    }
}

/// Discover every map record under `root`, using `root/gridslice.yaml`.
pub fn discover(root: impl AsRef<Path>) -> Result<DiscoveryResult> {
    let root = root.as_ref().to_path_buf();
    let (settings, has_settings) = load_settings(&root)?;
    let maps = scan_directory(&root);

    Ok(DiscoveryResult {
        root,
        settings,
        has_settings,
        maps,
    })
}

/// Discover map records from explicit files and directories. Settings are
/// read from `settings_dir`.
pub fn discover_paths(paths: &[PathBuf], settings_dir: &Path) -> Result<DiscoveryResult> {
    let (settings, has_settings) = load_settings(settings_dir)?;

    Ok(DiscoveryResult {
        root: settings_dir.to_path_buf(),
        settings,
        has_settings,
        maps: scan_paths(paths),
    })
}

/// Resolve a record's image path against the directory holding the record.
pub fn resolve_image_path(record_path: &Path, image: &str) -> PathBuf {
    let image = Path::new(image);
    if image.is_absolute() {
        return image.to_path_buf();
    }
    match record_path.parent() {
        Some(parent) => parent.join(image),
        None => image.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_discover_empty_directory() {
        let dir = tempdir().unwrap();
        let result = discover(dir.path()).unwrap();

        assert!(!result.has_settings);
        assert!(result.maps.is_empty());
        assert_eq!(result.settings, Settings::default());
    }

    #[test]
    fn test_discover_with_settings() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILENAME), "export_dpi: 150\n").unwrap();
        fs::write(dir.path().join("a.map.json"), "{}").unwrap();

        let result = discover(dir.path()).unwrap();
        assert!(result.has_settings);
        assert_eq!(result.settings.effective_export_dpi(), 150.0);
        assert_eq!(result.maps.len(), 1);
    }

    #[test]
    fn test_discover_with_invalid_settings() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILENAME), "export_dpi: [").unwrap();
        assert!(discover(dir.path()).is_err());
    }

    #[test]
    fn test_discover_paths() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("one.map.json");
        fs::write(&file, "{}").unwrap();

        let result = discover_paths(&[file.clone()], dir.path()).unwrap();
        assert_eq!(result.maps, vec![file]);
        assert!(!result.has_settings);
    }

    #[test]
    fn test_resolve_image_path() {
        let record = Path::new("maps/north/field.map.json");
        assert_eq!(
            resolve_image_path(record, "field.jpg"),
            PathBuf::from("maps/north/field.jpg")
        );
        assert_eq!(
            resolve_image_path(record, "/srv/images/field.jpg"),
            PathBuf::from("/srv/images/field.jpg")
        );
    }
}

//! File system scanner for map records.
//!
//! Recursively scans directories for `.map.json` files.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Suffix that marks a map record file.
pub const MAP_SUFFIX: &str = ".map.json";

/// Whether a path names a map record.
pub fn is_map_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(MAP_SUFFIX) && n.len() > MAP_SUFFIX.len())
}

/// Scan a directory for map records, sorted by path.
pub fn scan_directory(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        return vec![];
    }

    let mut maps: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_map_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    maps.sort();
    maps
}

/// Expand files and directories into a list of map records. Explicit
/// files are kept whatever their name; directories contribute only
/// `.map.json` files.
pub fn scan_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut maps = Vec::new();
    for path in paths {
        if path.is_dir() {
            maps.extend(scan_directory(path));
        } else {
            maps.push(path.clone());
        }
    }
    maps
}

/// Map name derived from a record file name (`north-field.map.json` -> `north-field`).
pub fn map_stem(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(MAP_SUFFIX)
        .or_else(|| name.strip_suffix(".json"))
        .filter(|s| !s.is_empty())
}

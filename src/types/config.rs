//! Grid configuration and the shapes it is measured against.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Millimetres per inch, used to turn `mm` cell sizes into pixels.
pub const MM_PER_INCH: f64 = 25.4;

/// Screen DPI assumed when a record does not carry one.
pub const DEFAULT_DPI: f64 = 96.0;

/// Unit the cell size is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Px,
    Mm,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Px => write!(f, "px"),
            Unit::Mm => write!(f, "mm"),
        }
    }
}

/// A 2D pixel offset. Used for the grid origin and for pan offsets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

impl Offset {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_nan(self) -> bool {
        self.x.is_nan() || self.y.is_nan()
    }
}

/// Global grid description, immutable for one render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    /// Cell size in `unit`s.
    pub cell_size: f64,
    pub unit: Unit,
    /// Only meaningful when `unit` is `Mm`.
    pub dpi: f64,
    /// Grid origin relative to the full image's top-left corner. May be negative.
    pub grid_offset: Offset,
}

impl GridConfig {
    pub fn new(cell_size: f64, unit: Unit) -> Self {
        Self {
            cell_size,
            unit,
            dpi: DEFAULT_DPI,
            grid_offset: Offset::ZERO,
        }
    }

    pub fn with_dpi(mut self, dpi: f64) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_offset(mut self, x: f64, y: f64) -> Self {
        self.grid_offset = Offset::new(x, y);
        self
    }

    /// Cell size in source pixels, or `None` when it is not a positive finite number.
    pub fn cell_size_px(&self) -> Option<f64> {
        let px = match self.unit {
            Unit::Px => self.cell_size,
            Unit::Mm => (self.cell_size / MM_PER_INCH) * self.dpi,
        };
        (px.is_finite() && px > 0.0).then_some(px)
    }

    /// Human-readable physical size of one cell, e.g. `1 cell = 10 mm`.
    pub fn scale_text(&self) -> String {
        format!("1 cell = {} {}", format_number(self.cell_size), self.unit)
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::new(50.0, Unit::Px)
    }
}

/// Natural pixel size of the full source image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: f64,
    pub height: f64,
}

impl ImageDimensions {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// How the full image is divided into equal rectangular slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlicePartition {
    pub cols: u32,
    pub rows: u32,
}

impl SlicePartition {
    pub const SINGLE: Self = Self { cols: 1, rows: 1 };

    pub const fn new(cols: u32, rows: u32) -> Self {
        Self { cols, rows }
    }

    pub fn is_valid(&self) -> bool {
        self.cols >= 1 && self.rows >= 1
    }

    pub fn len(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: SliceId) -> bool {
        id.row < self.rows && id.col < self.cols
    }

    /// All slice ids in row-major order.
    pub fn ids(&self) -> impl Iterator<Item = SliceId> {
        let cols = self.cols;
        (0..self.rows).flat_map(move |row| (0..cols).map(move |col| SliceId::new(row, col)))
    }

    /// Row-major flat index of a slice, as used by persisted records.
    pub fn index_of(&self, id: SliceId) -> Option<usize> {
        self.contains(id)
            .then(|| id.row as usize * self.cols as usize + id.col as usize)
    }

    pub fn id_at(&self, index: usize) -> Option<SliceId> {
        if !self.is_valid() || index >= self.len() {
            return None;
        }
        let cols = self.cols as usize;
        Some(SliceId::new((index / cols) as u32, (index % cols) as u32))
    }
}

impl Default for SlicePartition {
    fn default() -> Self {
        Self::SINGLE
    }
}

/// Stable identity of one slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SliceId {
    pub row: u32,
    pub col: u32,
}

impl SliceId {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for SliceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

/// A logical cell address: column letters and a 1-based row number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub col: String,
    pub row: u32,
}

impl Coordinate {
    pub fn new(col: impl Into<String>, row: u32) -> Self {
        Self {
            col: col.into(),
            row,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.col, self.row)
    }
}

/// Format a number without a trailing `.0` for whole values.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        let s = format!("{:.2}", n);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_size_px_from_px() {
        let config = GridConfig::new(40.0, Unit::Px);
        assert_eq!(config.cell_size_px(), Some(40.0));
    }

    #[test]
    fn test_cell_size_px_from_mm() {
        let config = GridConfig::new(25.4, Unit::Mm).with_dpi(300.0);
        let px = config.cell_size_px().unwrap();
        assert!((px - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_cell_size_px_rejects_degenerate() {
        assert_eq!(GridConfig::new(0.0, Unit::Px).cell_size_px(), None);
        assert_eq!(GridConfig::new(-5.0, Unit::Px).cell_size_px(), None);
        assert_eq!(GridConfig::new(f64::NAN, Unit::Px).cell_size_px(), None);
        assert_eq!(GridConfig::new(10.0, Unit::Mm).with_dpi(0.0).cell_size_px(), None);
        assert_eq!(
            GridConfig::new(10.0, Unit::Mm).with_dpi(f64::INFINITY).cell_size_px(),
            None
        );
    }

    #[test]
    fn test_unit_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Unit::Mm).unwrap(), "\"mm\"");
        let unit: Unit = serde_json::from_str("\"px\"").unwrap();
        assert_eq!(unit, Unit::Px);
    }

    #[test]
    fn test_scale_text() {
        assert_eq!(GridConfig::new(10.0, Unit::Mm).scale_text(), "1 cell = 10 mm");
        assert_eq!(GridConfig::new(12.5, Unit::Px).scale_text(), "1 cell = 12.5 px");
    }

    #[test]
    fn test_partition_ids_row_major() {
        let partition = SlicePartition::new(3, 2);
        let ids: Vec<_> = partition.ids().collect();
        assert_eq!(ids.len(), 6);
        assert_eq!(ids[0], SliceId::new(0, 0));
        assert_eq!(ids[2], SliceId::new(0, 2));
        assert_eq!(ids[3], SliceId::new(1, 0));
    }

    #[test]
    fn test_partition_index_round_trip() {
        let partition = SlicePartition::new(3, 2);
        assert_eq!(partition.index_of(SliceId::new(1, 2)), Some(5));
        assert_eq!(partition.id_at(4), Some(SliceId::new(1, 1)));
        assert_eq!(partition.id_at(6), None);
        assert_eq!(partition.index_of(SliceId::new(2, 0)), None);
    }

    #[test]
    fn test_zero_partition_has_no_ids() {
        let partition = SlicePartition::new(0, 3);
        assert!(!partition.is_valid());
        assert_eq!(partition.ids().count(), 0);
        assert_eq!(partition.id_at(0), None);
    }

    #[test]
    fn test_coordinate_display() {
        assert_eq!(Coordinate::new("AB", 12).to_string(), "AB12");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(1.0 / 3.0), "0.33");
    }
}

//! Slice export.
//!
//! Each exported slice is a JPEG holding the slice's background content, the
//! grid, column labels above and below, row labels on both sides, an
//! optional coloured reference frame and an optional name/scale badge. The
//! grid comes from the same geometry as the on-screen overlay, computed at
//! `export_dpi / source_dpi`.
//!
//! Exports are built fully in memory. Nothing touches the filesystem until
//! every requested slice has rendered, so a decode failure leaves no partial
//! output behind.

use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{GridError, Result};
use crate::geometry::{compute_slice_geometry, export_scale, SliceGeometry};
use crate::session::EditingSession;
use crate::types::{Colour, ImageDimensions, Offset, SliceId};

use super::canvas::Canvas;
use super::overlay::BackgroundPlacement;

/// Drawing sizes for one export, in output pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportLayoutConfig {
    pub scale: f64,
    /// Width of the label band on every side of the content.
    pub label_gutter: f64,
    /// Font size in pixels for axis labels.
    pub label_size: f32,
    pub grid_thickness: f64,
    pub reference_thickness: f64,
    /// Inset of the reference frame from the content edge.
    pub reference_padding: f64,
    pub badge_size: f32,
    pub badge_padding: f64,
    /// Distance of the badge from the content's bottom-left corner.
    pub badge_margin: f64,
}

const LABEL_GUTTER: f64 = 30.0;
const LABEL_HEIGHT: f64 = 12.0;
const REFERENCE_THICKNESS: f64 = 4.0;
const REFERENCE_PADDING: f64 = 2.0;
const BADGE_TEXT_HEIGHT: f64 = 10.0;
const BADGE_PADDING: f64 = 6.0;
const BADGE_MARGIN: f64 = 8.0;
const BADGE_ALPHA: u8 = 220;

/// Largest side a JPEG can carry.
const MAX_EXPORT_SIDE: f64 = 65_535.0;
/// About 1 GiB of RGBA working memory.
const MAX_EXPORT_PIXELS: f64 = 16_384.0 * 16_384.0;

impl ExportLayoutConfig {
    /// Scale the on-screen sizes by the export scale.
    pub fn for_scale(scale: f64, grid_thickness: f64) -> Self {
        let thickness = if grid_thickness.is_finite() && grid_thickness > 0.0 {
            grid_thickness
        } else {
            1.0
        };
        Self {
            scale,
            label_gutter: (LABEL_GUTTER * scale).round().max(1.0),
            label_size: (LABEL_HEIGHT * scale).max(1.0) as f32,
            grid_thickness: (thickness * scale).max(1.0),
            reference_thickness: (REFERENCE_THICKNESS * scale).max(1.0),
            reference_padding: REFERENCE_PADDING * scale,
            badge_size: (BADGE_TEXT_HEIGHT * scale).max(1.0) as f32,
            badge_padding: BADGE_PADDING * scale,
            badge_margin: BADGE_MARGIN * scale,
        }
    }
}

/// What to export and how.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub dpi: f64,
    pub jpeg_quality: u8,
    pub reference_lines: bool,
    pub badge: bool,
    /// Slices to export, in order. Empty exports every slice.
    pub slices: Vec<SliceId>,
    /// Bundle file name; defaults to `{map name}.zip`.
    pub zip_name: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            dpi: crate::discovery::DEFAULT_EXPORT_DPI,
            jpeg_quality: crate::discovery::DEFAULT_JPEG_QUALITY,
            reference_lines: false,
            badge: true,
            slices: vec![],
            zip_name: None,
        }
    }
}

/// One encoded slice.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedSlice {
    pub slice: SliceId,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// The finished download: one JPEG, or a zip of several.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportArtifact {
    Single(ExportedSlice),
    Bundle {
        file_name: String,
        slices: Vec<ExportedSlice>,
        bytes: Vec<u8>,
    },
}

impl ExportArtifact {
    pub fn file_name(&self) -> &str {
        match self {
            ExportArtifact::Single(slice) => &slice.file_name,
            ExportArtifact::Bundle { file_name, .. } => file_name,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            ExportArtifact::Single(slice) => &slice.bytes,
            ExportArtifact::Bundle { bytes, .. } => bytes,
        }
    }

    pub fn slices(&self) -> &[ExportedSlice] {
        match self {
            ExportArtifact::Single(slice) => std::slice::from_ref(slice),
            ExportArtifact::Bundle { slices, .. } => slices,
        }
    }
}

/// Decode the source image at `path` and export the selected slices.
pub fn export_slices(session: &EditingSession, path: &Path, options: &ExportOptions) -> Result<ExportArtifact> {
    let source = image::open(path).map_err(|e| GridError::ExportDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    export_from_image(session, &source, options)
}

/// Export the selected slices from an already decoded image.
pub fn export_from_image(
    session: &EditingSession,
    source: &DynamicImage,
    options: &ExportOptions,
) -> Result<ExportArtifact> {
    let selected = select_slices(session, &options.slices)?;
    let source = source.to_rgba8();

    let mut used_names = HashSet::new();
    let mut exported = Vec::with_capacity(selected.len());
    for id in selected {
        let raster = render_slice(session, &source, id, options)?;
        let bytes = encode_jpeg(&raster, options.jpeg_quality)?;
        let stem = unique_name(sanitize_file_name(&session.slice_name(id)), &mut used_names);
        exported.push(ExportedSlice {
            slice: id,
            file_name: format!("{}.jpg", stem),
            width: raster.width(),
            height: raster.height(),
            bytes,
        });
    }

    if exported.len() == 1 {
        if let Some(single) = exported.pop() {
            return Ok(ExportArtifact::Single(single));
        }
    }

    let file_name = match &options.zip_name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => format!("{}.zip", sanitize_file_name(&session.name)),
    };
    let bytes = bundle_zip(&exported)?;
    Ok(ExportArtifact::Bundle {
        file_name,
        slices: exported,
        bytes,
    })
}

fn select_slices(session: &EditingSession, requested: &[SliceId]) -> Result<Vec<SliceId>> {
    let partition = session.partition();
    if !partition.is_valid() {
        return Err(GridError::InvalidGeometry {
            message: format!("split must be at least 1x1, got {}x{}", partition.cols, partition.rows),
            help: None,
        });
    }
    if requested.is_empty() {
        return Ok(partition.ids().collect());
    }
    if let Some(bad) = requested.iter().find(|id| !partition.contains(**id)) {
        return Err(GridError::Export {
            message: format!("slice {} is outside the {}x{} split", bad, partition.rows, partition.cols),
            help: Some(format!(
                "Slices are addressed as row,col from 0,0 to {},{}",
                partition.rows - 1,
                partition.cols - 1
            )),
        });
    }
    let mut seen = HashSet::new();
    Ok(requested.iter().copied().filter(|id| seen.insert(*id)).collect())
}

/// Rasterize one slice at the export scale.
pub fn render_slice(
    session: &EditingSession,
    source: &RgbaImage,
    id: SliceId,
    options: &ExportOptions,
) -> Result<RgbaImage> {
    let dims = session
        .image
        .unwrap_or_else(|| ImageDimensions::new(source.width() as f64, source.height() as f64));
    let scale = export_scale(options.dpi, session.config.dpi).ok_or_else(|| GridError::InvalidGeometry {
        message: format!(
            "cannot scale from {} dpi to {} dpi",
            session.config.dpi, options.dpi
        ),
        help: Some("Both DPI values must be positive".to_string()),
    })?;
    let geometry = compute_slice_geometry(
        &session.config,
        &dims,
        session.partition(),
        id,
        session.crop_threshold,
        scale,
    )
    .ok_or_else(|| GridError::InvalidGeometry {
        message: format!("no grid can be laid out for slice {}", id),
        help: Some("Check the cell size, image size and split counts".to_string()),
    })?;

    let layout = ExportLayoutConfig::for_scale(scale, session.style.grid_thickness);
    let g = layout.label_gutter;
    let (content_w, content_h) = (geometry.slice_width, geometry.slice_height);
    let width = (content_w + 2.0 * g).round();
    let height = (content_h + 2.0 * g).round();
    let fits = width <= MAX_EXPORT_SIDE
        && height <= MAX_EXPORT_SIDE
        && width * height <= MAX_EXPORT_PIXELS;
    if !fits {
        return Err(GridError::Export {
            message: format!(
                "slice {} would be {}x{} pixels at {} dpi",
                id, width, height, options.dpi
            ),
            help: Some(format!(
                "Lower the export DPI; tiles are limited to {} pixels",
                MAX_EXPORT_PIXELS
            )),
        });
    }
    let mut canvas = Canvas::new(width as u32, height as u32, session.style.background_color)?;

    draw_background(&mut canvas, session, source, &dims, &geometry, scale, g);
    draw_grid(&mut canvas, session, &geometry, &layout);
    if options.reference_lines {
        draw_reference_frame(&mut canvas, session, &geometry, &layout);
    }
    if options.badge {
        draw_badge(&mut canvas, session, &geometry, &layout);
    }

    Ok(canvas.into_image())
}

fn draw_background(
    canvas: &mut Canvas,
    session: &EditingSession,
    source: &RgbaImage,
    dims: &ImageDimensions,
    geometry: &SliceGeometry,
    scale: f64,
    gutter: f64,
) {
    let view = session.effective_view(geometry.slice);
    let placement = BackgroundPlacement::for_slice(
        &view,
        dims,
        geometry.slice_left / scale,
        geometry.slice_top / scale,
    )
    .scaled(scale);
    // Record dimensions may differ from the decoded pixels
    let ratio_x = source.width() as f64 / dims.width;
    let ratio_y = source.height() as f64 / dims.height;

    let dest = canvas.clip(gutter, gutter, geometry.slice_width, geometry.slice_height);
    canvas.draw_resampled(source, dest, |p| {
        let at = placement.source_point(Offset::new(p.x - gutter, p.y - gutter), dims);
        Offset::new(at.x * ratio_x, at.y * ratio_y)
    });
}

fn draw_grid(canvas: &mut Canvas, session: &EditingSession, geometry: &SliceGeometry, layout: &ExportLayoutConfig) {
    let g = layout.label_gutter;
    let (w, h) = (geometry.slice_width, geometry.slice_height);
    let style = &session.style;

    for x in geometry.column_lines() {
        canvas.vline(g + x, g, g + h, layout.grid_thickness, style.grid_color);
    }
    for y in geometry.row_lines() {
        canvas.hline(g + y, g, g + w, layout.grid_thickness, style.grid_color);
    }

    for label in geometry.column_labels() {
        let x = g + label.position;
        canvas.draw_text_centered(&label.text, x, g / 2.0, layout.label_size, style.label_color);
        canvas.draw_text_centered(&label.text, x, g + h + g / 2.0, layout.label_size, style.label_color);
    }
    for label in geometry.row_labels() {
        let y = g + label.position;
        canvas.draw_text_centered(&label.text, g / 2.0, y, layout.label_size, style.label_color);
        canvas.draw_text_centered(&label.text, g + w + g / 2.0, y, layout.label_size, style.label_color);
    }
}

fn draw_reference_frame(
    canvas: &mut Canvas,
    session: &EditingSession,
    geometry: &SliceGeometry,
    layout: &ExportLayoutConfig,
) {
    let colors = &session.style.reference_colors;
    let t = layout.reference_thickness;
    let inset = layout.reference_padding + t / 2.0;
    let left = layout.label_gutter + inset;
    let top = layout.label_gutter + inset;
    let right = layout.label_gutter + geometry.slice_width - inset;
    let bottom = layout.label_gutter + geometry.slice_height - inset;

    canvas.hline(top, left, right, t, colors.top);
    canvas.vline(right, top, bottom, t, colors.right);
    canvas.hline(bottom, left, right, t, colors.bottom);
    canvas.vline(left, top, bottom, t, colors.left);
}

fn draw_badge(canvas: &mut Canvas, session: &EditingSession, geometry: &SliceGeometry, layout: &ExportLayoutConfig) {
    let lines = [session.name.trim().to_string(), session.config.scale_text()];
    let lines: Vec<&str> = lines.iter().map(String::as_str).filter(|l| !l.is_empty()).collect();
    if lines.is_empty() {
        return;
    }

    let size = layout.badge_size;
    let line_h = size as f64;
    let line_gap = line_h * 0.3;
    let text_w = lines
        .iter()
        .map(|l| canvas.text_size(l, size).0)
        .max()
        .unwrap_or(0) as f64;
    let text_h = line_h * lines.len() as f64 + line_gap * (lines.len() - 1) as f64;

    let pad = layout.badge_padding;
    let box_w = text_w + 2.0 * pad;
    let box_h = text_h + 2.0 * pad;
    let x = layout.label_gutter + layout.badge_margin;
    let y = layout.label_gutter + geometry.slice_height - layout.badge_margin - box_h;

    let base = session.style.background_color;
    let fill = Colour::new(base.r, base.g, base.b, BADGE_ALPHA);
    canvas.fill_rect(x, y, box_w, box_h, fill);

    let text_colour = base.contrasting_text();
    for (i, line) in lines.iter().enumerate() {
        let ty = y + pad + i as f64 * (line_h + line_gap);
        canvas.draw_text(line, x + pad, ty, size, text_colour);
    }
}

/// Encode an RGBA raster as JPEG. Alpha is dropped.
pub fn encode_jpeg(raster: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(raster.clone()).to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| GridError::Export {
            message: format!("JPEG encoding failed: {}", e),
            help: None,
        })?;
    Ok(bytes)
}

fn bundle_zip(slices: &[ExportedSlice]) -> Result<Vec<u8>> {
    let zip_err = |e: zip::result::ZipError| GridError::Export {
        message: format!("Failed to build zip: {}", e),
        help: None,
    };

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    // JPEG data does not compress further
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Stored);
    for slice in slices {
        zip.start_file(slice.file_name.as_str(), options).map_err(zip_err)?;
        zip.write_all(&slice.bytes)?;
    }
    Ok(zip.finish().map_err(zip_err)?.into_inner())
}

/// Write the artifact into `dir`, creating it if needed.
pub fn write_artifact(artifact: &ExportArtifact, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| GridError::Io {
        path: dir.to_path_buf(),
        message: format!("Failed to create output directory: {}", e),
    })?;
    let path = dir.join(artifact.file_name());
    fs::write(&path, artifact.bytes()).map_err(|e| GridError::Io {
        path: path.clone(),
        message: format!("Failed to write export: {}", e),
    })?;
    Ok(path)
}

/// Make a slice or map name safe to use as a file name.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_end_matches(['.', ' ']).trim().to_string();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "slice".to_string()
    } else {
        cleaned
    }
}

/// `stem`, or `stem (n)` when `used` already holds it. Comparison ignores
/// case.
pub(crate) fn unique_name(stem: String, used: &mut HashSet<String>) -> String {
    if used.insert(stem.to_lowercase()) {
        return stem;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{} ({})", stem, n);
        if used.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}

//! Offline RGBA drawing surface.
//!
//! Wraps an `image::RgbaImage` in imageproc's alpha-blending `Blend`
//! canvas. Rectangles, lines and text go through `imageproc::drawing`;
//! text uses the DejaVu Sans face bundled into the binary, so exports do
//! not depend on the fonts installed on the host. Coordinates are `f64`
//! pixels and everything is clipped to the surface.

use ab_glyph::{FontRef, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut, text_size, Blend,
    Canvas as _,
};
use imageproc::rect::Rect;

use crate::error::{GridError, Result};
use crate::types::{Colour, Offset};

static LABEL_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// The face used for axis labels and badges.
pub fn label_font() -> Result<FontRef<'static>> {
    FontRef::try_from_slice(LABEL_FONT).map_err(|e| GridError::Export {
        message: format!("Bundled label font is unreadable: {}", e),
        help: None,
    })
}

/// A pixel-aligned rectangle, half-open on the right and bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    fn to_rect(self) -> Option<Rect> {
        if self.is_empty() {
            return None;
        }
        Some(Rect::at(self.x0 as i32, self.y0 as i32).of_size(self.width(), self.height()))
    }
}

pub struct Canvas {
    image: Blend<RgbaImage>,
    font: FontRef<'static>,
}

impl Canvas {
    /// A surface filled with `background`.
    pub fn new(width: u32, height: u32, background: Colour) -> Result<Self> {
        Ok(Self {
            image: Blend(RgbaImage::from_pixel(
                width.max(1),
                height.max(1),
                Rgba(background.to_rgba()),
            )),
            font: label_font()?,
        })
    }

    pub fn width(&self) -> u32 {
        self.image.0.width()
    }

    pub fn height(&self) -> u32 {
        self.image.0.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Colour> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let [r, g, b, a] = self.image.0.get_pixel(x, y).0;
        Some(Colour::new(r, g, b, a))
    }

    pub fn into_image(self) -> RgbaImage {
        self.image.0
    }

    /// Clip a floating-point rectangle to whole pixels. A rectangle with
    /// positive size never rounds away to nothing.
    pub fn clip(&self, x: f64, y: f64, w: f64, h: f64) -> PixelRect {
        let (x0, x1) = clip_span(x, w, self.width());
        let (y0, y1) = clip_span(y, h, self.height());
        PixelRect { x0, y0, x1, y1 }
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, colour: Colour) {
        if let Some(rect) = self.clip(x, y, w, h).to_rect() {
            draw_filled_rect_mut(&mut self.image, rect, Rgba(colour.to_rgba()));
        }
    }

    /// Vertical line centred on `x` from `y0` to `y1`.
    pub fn vline(&mut self, x: f64, y0: f64, y1: f64, thickness: f64, colour: Colour) {
        let t = thickness.max(1.0);
        let band = self.clip(x - t / 2.0, y0.min(y1), t, (y1 - y0).abs());
        if band.width() == 1 && band.height() > 0 {
            let column = band.x0 as f32;
            draw_line_segment_mut(
                &mut self.image,
                (column, band.y0 as f32),
                (column, (band.y1 - 1) as f32),
                Rgba(colour.to_rgba()),
            );
        } else if let Some(rect) = band.to_rect() {
            draw_filled_rect_mut(&mut self.image, rect, Rgba(colour.to_rgba()));
        }
    }

    /// Horizontal line centred on `y` from `x0` to `x1`.
    pub fn hline(&mut self, y: f64, x0: f64, x1: f64, thickness: f64, colour: Colour) {
        let t = thickness.max(1.0);
        let band = self.clip(x0.min(x1), y - t / 2.0, (x1 - x0).abs(), t);
        if band.height() == 1 && band.width() > 0 {
            let row = band.y0 as f32;
            draw_line_segment_mut(
                &mut self.image,
                (band.x0 as f32, row),
                ((band.x1 - 1) as f32, row),
                Rgba(colour.to_rgba()),
            );
        } else if let Some(rect) = band.to_rect() {
            draw_filled_rect_mut(&mut self.image, rect, Rgba(colour.to_rgba()));
        }
    }

    /// Width and height in pixels of `text` set at `size` pixels.
    pub fn text_size(&self, text: &str, size: f32) -> (u32, u32) {
        text_size(PxScale::from(size.max(1.0)), &self.font, text)
    }

    /// Draw `text` with the top of its line box at (`x`, `y`).
    pub fn draw_text(&mut self, text: &str, x: f64, y: f64, size: f32, colour: Colour) {
        if text.is_empty() || !x.is_finite() || !y.is_finite() {
            return;
        }
        draw_text_mut(
            &mut self.image,
            Rgba(colour.to_rgba()),
            x.round() as i32,
            y.round() as i32,
            PxScale::from(size.max(1.0)),
            &self.font,
            text,
        );
    }

    /// Draw `text` centred on (`cx`, `cy`). The vertical centre is that of
    /// the line box, so labels of different glyphs share a baseline.
    pub fn draw_text_centered(&mut self, text: &str, cx: f64, cy: f64, size: f32, colour: Colour) {
        let (w, _) = self.text_size(text, size);
        let line = size.max(1.0) as f64;
        self.draw_text(text, cx - w as f64 / 2.0, cy - line / 2.0, size, colour);
    }

    /// Fill `dest` by resampling `src`. `map` takes the centre of a
    /// destination pixel and returns the matching continuous position in
    /// `src`; samples that fall outside `src` leave the surface unchanged.
    pub fn draw_resampled<F>(&mut self, src: &RgbaImage, dest: PixelRect, map: F)
    where
        F: Fn(Offset) -> Offset,
    {
        for py in dest.y0..dest.y1.min(self.height()) {
            for px in dest.x0..dest.x1.min(self.width()) {
                let at = map(Offset::new(px as f64 + 0.5, py as f64 + 0.5));
                // Continuous position to pixel-centre grid
                if let Some(colour) = bilinear_sample(src, at.x - 0.5, at.y - 0.5) {
                    self.image.draw_pixel(px, py, Rgba(colour.to_rgba()));
                }
            }
        }
    }
}

fn clip_span(start: f64, len: f64, limit: u32) -> (u32, u32) {
    if !start.is_finite() || !len.is_finite() || len <= 0.0 {
        return (0, 0);
    }
    let lo = start.round();
    let mut hi = (start + len).round();
    if hi <= lo {
        hi = lo + 1.0;
    }
    let lo = lo.clamp(0.0, limit as f64) as u32;
    let hi = hi.clamp(0.0, limit as f64) as u32;
    (lo, hi)
}

/// Bilinear sample with transparent edges. `None` when the sample lies
/// entirely outside the image.
fn bilinear_sample(img: &RgbaImage, x: f64, y: f64) -> Option<Colour> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    let x0 = x.floor();
    let y0 = y.floor();
    let (w, h) = (img.width() as f64, img.height() as f64);
    if x0 < -1.0 || y0 < -1.0 || x0 >= w || y0 >= h {
        return None;
    }
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let sample = |sx: i64, sy: i64| -> [f64; 4] {
        if sx < 0 || sy < 0 || sx >= img.width() as i64 || sy >= img.height() as i64 {
            [0.0; 4]
        } else {
            let p = img.get_pixel(sx as u32, sy as u32);
            [p[0] as f64, p[1] as f64, p[2] as f64, p[3] as f64]
        }
    };

    let tl = sample(x0, y0);
    let tr = sample(x0 + 1, y0);
    let bl = sample(x0, y0 + 1);
    let br = sample(x0 + 1, y0 + 1);

    let lerp = |a: f64, b: f64, t: f64| a + (b - a) * t;
    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = lerp(tl[c], tr[c], fx);
        let bot = lerp(bl[c], br[c], fx);
        out[c] = lerp(top, bot, fy).round().clamp(0.0, 255.0) as u8;
    }
    Some(Colour::new(out[0], out[1], out[2], out[3]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RED: Colour = Colour::rgb(255, 0, 0);

    #[test]
    fn test_new_fills_background() {
        let canvas = Canvas::new(4, 3, Colour::WHITE).unwrap();
        assert_eq!(canvas.width(), 4);
        assert_eq!(canvas.height(), 3);
        assert_eq!(canvas.pixel(3, 2), Some(Colour::WHITE));
        assert_eq!(canvas.pixel(4, 0), None);
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut canvas = Canvas::new(10, 10, Colour::WHITE).unwrap();
        canvas.fill_rect(-5.0, 8.0, 7.0, 10.0, RED);
        assert_eq!(canvas.pixel(0, 9), Some(RED));
        assert_eq!(canvas.pixel(1, 8), Some(RED));
        assert_eq!(canvas.pixel(2, 8), Some(Colour::WHITE));
        assert_eq!(canvas.pixel(0, 7), Some(Colour::WHITE));
    }

    #[test]
    fn test_thin_line_is_never_lost() {
        let mut canvas = Canvas::new(10, 10, Colour::WHITE).unwrap();
        canvas.vline(5.0, 0.0, 10.0, 0.2, RED);
        assert!((0..10).all(|y| canvas.pixel(4, y) == Some(RED) || canvas.pixel(5, y) == Some(RED)));
    }

    #[test]
    fn test_hline_thickness() {
        let mut canvas = Canvas::new(10, 10, Colour::WHITE).unwrap();
        canvas.hline(5.0, 0.0, 10.0, 2.0, RED);
        assert_eq!(canvas.pixel(0, 4), Some(RED));
        assert_eq!(canvas.pixel(9, 5), Some(RED));
        assert_eq!(canvas.pixel(0, 3), Some(Colour::WHITE));
        assert_eq!(canvas.pixel(0, 6), Some(Colour::WHITE));
    }

    #[test]
    fn test_translucent_fill_blends() {
        let mut canvas = Canvas::new(1, 1, Colour::WHITE).unwrap();
        canvas.fill_rect(0.0, 0.0, 1.0, 1.0, Colour::new(0, 0, 0, 128));
        let p = canvas.pixel(0, 0).unwrap();
        assert!(p.r > 120 && p.r < 135, "got {:?}", p);
        assert_eq!(p.a, 255);
    }

    #[test]
    fn test_thin_hline_is_a_single_row() {
        let mut canvas = Canvas::new(10, 10, Colour::WHITE).unwrap();
        canvas.hline(5.0, 2.0, 8.0, 1.0, RED);
        assert!((2..8).all(|x| canvas.pixel(x, 5) == Some(RED)));
        assert_eq!(canvas.pixel(1, 5), Some(Colour::WHITE));
        assert_eq!(canvas.pixel(8, 5), Some(Colour::WHITE));
        assert_eq!(canvas.pixel(4, 4), Some(Colour::WHITE));
    }

    #[test]
    fn test_draw_text() {
        let mut canvas = Canvas::new(40, 24, Colour::WHITE).unwrap();
        let (w, h) = canvas.text_size("T", 16.0);
        assert!(w > 0 && h > 0);

        canvas.draw_text("T", 2.0, 2.0, 16.0, RED);
        let inked = (0..40)
            .flat_map(|x| (0..24).map(move |y| (x, y)))
            .filter(|&(x, y)| canvas.pixel(x, y) != Some(Colour::WHITE))
            .count();
        assert!(inked > 10, "only {} pixels inked", inked);
        // Nothing right of the glyph
        assert!((30..40).all(|x| (0..24).all(|y| canvas.pixel(x, y) == Some(Colour::WHITE))));
    }

    #[test]
    fn test_text_keeps_case_and_accents() {
        use ab_glyph::{Font, GlyphId};

        let font = label_font().unwrap();
        assert_ne!(font.glyph_id('é'), GlyphId(0));
        assert_ne!(font.glyph_id('ø'), GlyphId(0));

        let render = |text: &str| {
            let mut canvas = Canvas::new(120, 24, Colour::WHITE).unwrap();
            canvas.draw_text(text, 0.0, 0.0, 16.0, Colour::BLACK);
            canvas.into_image()
        };
        assert_ne!(render("Café nord"), render("CAF? NORD"));
        assert_ne!(render("e"), render("é"));
    }

    #[test]
    fn test_text_size_grows_with_size() {
        let canvas = Canvas::new(1, 1, Colour::WHITE).unwrap();
        let small = canvas.text_size("AB12", 10.0);
        let large = canvas.text_size("AB12", 30.0);
        assert!(large.0 > small.0);
        assert!(canvas.text_size("AB12", 10.0).0 > canvas.text_size("A", 10.0).0);
    }

    #[test]
    fn test_draw_resampled_identity() {
        let mut src = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
        src.put_pixel(1, 2, Rgba([255, 0, 0, 255]));

        let mut canvas = Canvas::new(4, 4, Colour::WHITE).unwrap();
        let dest = canvas.clip(0.0, 0.0, 4.0, 4.0);
        canvas.draw_resampled(&src, dest, |p| p);

        assert_eq!(canvas.pixel(1, 2), Some(RED));
        assert_eq!(canvas.pixel(3, 3), Some(Colour::rgb(0, 0, 255)));
    }

    #[test]
    fn test_draw_resampled_outside_source_keeps_background() {
        let src = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        let mut canvas = Canvas::new(6, 1, Colour::WHITE).unwrap();
        let dest = canvas.clip(0.0, 0.0, 6.0, 1.0);
        canvas.draw_resampled(&src, dest, |p| Offset::new(p.x + 10.0, p.y));
        assert!((0..6).all(|x| canvas.pixel(x, 0) == Some(Colour::WHITE)));
    }

    #[test]
    fn test_clip_degenerate() {
        let canvas = Canvas::new(5, 5, Colour::WHITE).unwrap();
        assert!(canvas.clip(0.0, 0.0, 0.0, 5.0).is_empty());
        assert!(canvas.clip(f64::NAN, 0.0, 2.0, 2.0).is_empty());
    }
}

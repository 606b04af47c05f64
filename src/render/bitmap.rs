use anyhow::Context as _;

use crate::foundation::error::GraspResult;
use crate::render::font;

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Opaque black, the default drawing color.
    pub const BLACK: Self = Self::opaque(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::opaque(255, 255, 255);

    /// Fully opaque color from RGB channels.
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Row-major straight RGBA8 bitmap: the common raster representation shared
/// by the asset decoder, the virtual screen and the encoder.
///
/// All drawing operations clip against the bitmap bounds, so callers may
/// pass coordinates partially or fully outside the frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    /// Allocate a `width` x `height` bitmap filled with `fill`.
    pub fn new(width: u32, height: u32, fill: Rgba8) -> Self {
        let mut bmp = Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        };
        bmp.fill(fill);
        bmp
    }

    /// Wrap a decoded `image` buffer without copying.
    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw pixel bytes, row-major RGBA8.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixel at `(x, y)`, or `None` outside the bitmap.
    pub fn get(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some(Rgba8 {
            r: self.data[i],
            g: self.data[i + 1],
            b: self.data[i + 2],
            a: self.data[i + 3],
        })
    }

    /// Fill the whole bitmap with a solid color.
    pub fn fill(&mut self, color: Rgba8) {
        for px in self.data.chunks_exact_mut(4) {
            px[0] = color.r;
            px[1] = color.g;
            px[2] = color.b;
            px[3] = color.a;
        }
    }

    /// Draw a filled rectangle, clipped to the bitmap.
    pub fn fill_rect(&mut self, x: i64, y: i64, w: u32, h: u32, color: Rgba8) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + i64::from(w)).min(i64::from(self.width));
        let y1 = (y + i64::from(h)).min(i64::from(self.height));
        for py in y0..y1.max(y0) {
            for px in x0..x1.max(x0) {
                let i = (py as usize * self.width as usize + px as usize) * 4;
                self.data[i] = color.r;
                self.data[i + 1] = color.g;
                self.data[i + 2] = color.b;
                self.data[i + 3] = color.a;
            }
        }
    }

    /// Draw an unfilled rectangle outline of the given stroke width by
    /// compositing four filled bars. Corner order does not matter.
    pub fn draw_box(&mut self, x1: i64, y1: i64, x2: i64, y2: i64, stroke: u32, color: Rgba8) {
        let (x1, x2) = (x1.min(x2), x1.max(x2));
        let (y1, y2) = (y1.min(y2), y1.max(y2));
        let stroke = stroke.max(1);
        let w = (x2 - x1 + 1).max(0) as u32;
        let h = (y2 - y1 + 1).max(0) as u32;

        self.fill_rect(x1, y1, w, stroke, color);
        self.fill_rect(x1, y2 - i64::from(stroke) + 1, w, stroke, color);
        self.fill_rect(x1, y1, stroke, h, color);
        self.fill_rect(x2 - i64::from(stroke) + 1, y1, stroke, h, color);
    }

    /// Composite `src` onto `self` with its top-left corner at `(x, y)`,
    /// blending straight alpha over the existing pixels.
    pub fn composite(&mut self, src: &Bitmap, x: i64, y: i64) {
        for sy in 0..src.height {
            let dy = y + i64::from(sy);
            if dy < 0 || dy >= i64::from(self.height) {
                continue;
            }
            for sx in 0..src.width {
                let dx = x + i64::from(sx);
                if dx < 0 || dx >= i64::from(self.width) {
                    continue;
                }
                let si = (sy as usize * src.width as usize + sx as usize) * 4;
                let di = (dy as usize * self.width as usize + dx as usize) * 4;
                let a = u16::from(src.data[si + 3]);
                match a {
                    0 => {}
                    255 => self.data[di..di + 4].copy_from_slice(&src.data[si..si + 4]),
                    _ => {
                        let inv = 255 - a;
                        for c in 0..3 {
                            let s = u16::from(src.data[si + c]);
                            let d = u16::from(self.data[di + c]);
                            self.data[di + c] = ((s * a + d * inv + 127) / 255) as u8;
                        }
                        let da = u16::from(self.data[di + 3]);
                        self.data[di + 3] = (a + da * inv / 255).min(255) as u8;
                    }
                }
            }
        }
    }

    /// Render `text` with the built-in 8x8 font, the glyph row starting at
    /// `(x, top)`. Pixels outside the bitmap are dropped.
    pub fn draw_text(&mut self, x: i64, top: i64, text: &str, color: Rgba8) {
        for (i, ch) in text.chars().enumerate() {
            let cell_x = x + i as i64 * i64::from(font::GLYPH_WIDTH);
            let rows = font::glyph(ch);
            for (row, bits) in rows.iter().enumerate() {
                let py = top + row as i64;
                if py < 0 || py >= i64::from(self.height) {
                    continue;
                }
                for col in 0..font::GLYPH_WIDTH {
                    if bits & (1 << col) == 0 {
                        continue;
                    }
                    let px = cell_x + i64::from(col);
                    if px < 0 || px >= i64::from(self.width) {
                        continue;
                    }
                    let di = (py as usize * self.width as usize + px as usize) * 4;
                    self.data[di] = color.r;
                    self.data[di + 1] = color.g;
                    self.data[di + 2] = color.b;
                    self.data[di + 3] = color.a;
                }
            }
        }
    }

    /// Serialize to PNG bytes.
    pub fn png_bytes(&self) -> GraspResult<Vec<u8>> {
        use image::ImageEncoder as _;

        let mut out = Vec::new();
        image::codecs::png::PngEncoder::new(&mut out)
            .write_image(
                &self.data,
                self.width,
                self.height,
                image::ExtendedColorType::Rgba8,
            )
            .context("encode bitmap as png")?;
        Ok(out)
    }
}

//! CAPTCHA image generation.
//!
//! Digits are drawn from a built-in 5x7 bitmap font, scaled up, jittered,
//! and overlaid with noise, then encoded as PNG. No font files are needed.

use std::io::Cursor;

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use rand::Rng;

use warden_common::WardenError;

use crate::config::CaptchaConfig;

const GLYPH_COLS: u32 = 5;
const GLYPH_ROWS: u32 = 7;

/// Row bitmaps for digits 0-9, MSB of the low 5 bits is the leftmost column
const DIGIT_GLYPHS: [[u8; 7]; 10] = [
    [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
    [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
    [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
    [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
    [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
    [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
    [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
    [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
    [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
];

/// CAPTCHA generator service
pub struct CaptchaGenerator {
    length: usize,
    width: u32,
    height: u32,
}

impl CaptchaGenerator {
    pub fn new(config: &CaptchaConfig) -> Self {
        Self {
            length: config.length,
            width: config.width,
            height: config.height,
        }
    }

    /// Random answer digits, each in `0..=9`
    pub fn random_digits(&self) -> Vec<u8> {
        let mut rng = rand::rng();
        (0..self.length).map(|_| rng.random_range(0..10u8)).collect()
    }

    /// Generate a cryptographically random challenge ID
    pub fn generate_challenge_id(&self) -> String {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let mut bytes = [0u8; 16];
        rand::rng().fill(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Render the digits as a PNG and wrap it in a `data:` URI
    pub fn render_data_uri(&self, digits: &[u8]) -> Result<String, WardenError> {
        let png = self.render_png(digits)?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    }

    /// Render the digits as PNG bytes
    pub fn render_png(&self, digits: &[u8]) -> Result<Vec<u8>, WardenError> {
        let image = self.render(digits)?;
        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| WardenError::Captcha(format!("PNG encoding failed: {e}")))?;
        Ok(buf.into_inner())
    }

    fn render(&self, digits: &[u8]) -> Result<RgbImage, WardenError> {
        if digits.is_empty() {
            return Err(WardenError::Captcha("nothing to render".to_string()));
        }

        let mut rng = rand::rng();
        let mut image = RgbImage::from_pixel(self.width, self.height, Rgb([245, 245, 240]));

        let slot_width = self.width / digits.len() as u32;
        let scale = ((slot_width * 4 / 5) / GLYPH_COLS)
            .min((self.height * 3 / 4) / GLYPH_ROWS)
            .max(1);
        let glyph_width = GLYPH_COLS * scale;
        let glyph_height = GLYPH_ROWS * scale;

        // Background speckle
        for _ in 0..(self.width * self.height / 60) {
            let x = rng.random_range(0..self.width) as i32;
            let y = rng.random_range(0..self.height) as i32;
            let shade = rng.random_range(150..220u8);
            draw_filled_circle_mut(&mut image, (x, y), 1, Rgb([shade, shade, shade]));
        }

        for (i, &digit) in digits.iter().enumerate() {
            let glyph = DIGIT_GLYPHS
                .get(usize::from(digit))
                .ok_or_else(|| WardenError::Captcha(format!("not a digit: {digit}")))?;

            let slack_x = slot_width.saturating_sub(glyph_width) as i32;
            let slack_y = self.height.saturating_sub(glyph_height) as i32;
            let origin_x = (i as u32 * slot_width) as i32 + jitter(&mut rng, slack_x);
            let origin_y = jitter(&mut rng, slack_y);
            let color = Rgb([
                rng.random_range(10..90u8),
                rng.random_range(10..90u8),
                rng.random_range(40..140u8),
            ]);

            for (row, bits) in glyph.iter().enumerate() {
                for col in 0..GLYPH_COLS {
                    if (bits >> (GLYPH_COLS - 1 - col)) & 1 == 0 {
                        continue;
                    }
                    let x = origin_x + (col * scale) as i32;
                    let y = origin_y + (row as u32 * scale) as i32;
                    draw_filled_rect_mut(&mut image, Rect::at(x, y).of_size(scale, scale), color);
                }
            }
        }

        // Strike-through curves across the digits
        for _ in 0..2 {
            let amplitude = self.height as f32 * rng.random_range(0.08f32..0.2);
            let period = self.width as f32 * rng.random_range(0.5f32..1.2);
            let baseline = self.height as f32 * rng.random_range(0.3f32..0.7);
            let phase = rng.random_range(0.0f32..std::f32::consts::TAU);
            let shade = rng.random_range(40..120u8);

            let mut prev = (0.0f32, baseline + amplitude * phase.sin());
            for x in (4..=self.width).step_by(4) {
                let xf = x as f32;
                let y = baseline + amplitude * (xf / period * std::f32::consts::TAU + phase).sin();
                draw_line_segment_mut(&mut image, prev, (xf, y), Rgb([shade, shade, shade]));
                prev = (xf, y);
            }
        }

        Ok(image)
    }
}

/// Random offset in `0..=slack`
fn jitter(rng: &mut impl Rng, slack: i32) -> i32 {
    if slack <= 0 { 0 } else { rng.random_range(0..=slack) }
}

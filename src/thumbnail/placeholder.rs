//! Deterministic placeholder thumbnails
//!
//! A placeholder is a solid colour derived from the domain's SHA-256 digest,
//! optionally overlaid with the domain's initials drawn from a small built-in
//! 5x7 bitmap font. The same domain always produces the same image.

use crate::thumbnail::image_ops::{write_jpeg, ThumbnailBox};
use crate::thumbnail::ImageError;
use crate::url::domain_initials;
use image::{DynamicImage, Rgb, RgbImage};
use sha2::{Digest, Sha256};
use std::path::Path;

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

/// Rows of a 5x7 glyph, most significant of the low five bits on the left
fn glyph(c: char) -> Option<[u8; 7]> {
    let rows = match c {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        _ => return None,
    };
    Some(rows)
}

/// Background colour for `domain`, kept in a mid range so initials stay legible
pub fn placeholder_color(domain: &str) -> Rgb<u8> {
    let digest = Sha256::digest(domain.as_bytes());
    let channel = |b: u8| 48 + (u16::from(b) * 160 / 255) as u8;
    Rgb([channel(digest[0]), channel(digest[1]), channel(digest[2])])
}

fn text_color(background: Rgb<u8>) -> Rgb<u8> {
    let [r, g, b] = background.0;
    let luma = (299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000;
    if luma < 140 {
        Rgb([255, 255, 255])
    } else {
        Rgb([32, 32, 32])
    }
}

/// Draws `text` centred on `canvas`; characters without a glyph are skipped
fn draw_text(canvas: &mut RgbImage, text: &str, color: Rgb<u8>) {
    let glyphs: Vec<[u8; 7]> = text.chars().filter_map(glyph).collect();
    if glyphs.is_empty() {
        return;
    }

    let count = glyphs.len() as u32;
    let columns = count * GLYPH_WIDTH + (count - 1);
    let scale_h = canvas.height() * 2 / 5 / GLYPH_HEIGHT;
    let scale_w = canvas.width() * 7 / 10 / columns;
    let scale = scale_h.min(scale_w).max(1);

    let text_w = columns * scale;
    let text_h = GLYPH_HEIGHT * scale;
    let origin_x = canvas.width().saturating_sub(text_w) / 2;
    let origin_y = canvas.height().saturating_sub(text_h) / 2;

    for (index, rows) in glyphs.iter().enumerate() {
        let glyph_x = origin_x + index as u32 * (GLYPH_WIDTH + 1) * scale;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let x0 = glyph_x + col * scale;
                let y0 = origin_y + row as u32 * scale;
                for y in y0..(y0 + scale).min(canvas.height()) {
                    for x in x0..(x0 + scale).min(canvas.width()) {
                        canvas.put_pixel(x, y, color);
                    }
                }
            }
        }
    }
}

/// Renders the placeholder image for `domain`
pub fn render_placeholder(domain: &str, target: &ThumbnailBox, with_initials: bool) -> RgbImage {
    let background = placeholder_color(domain);
    let mut canvas = RgbImage::from_pixel(target.width, target.height, background);

    if with_initials {
        draw_text(&mut canvas, &domain_initials(domain), text_color(background));
    }
    canvas
}

/// Renders the placeholder for `domain` and writes it to `path`
pub fn write_placeholder(
    domain: &str,
    target: &ThumbnailBox,
    with_initials: bool,
    path: &Path,
) -> Result<(), ImageError> {
    let image = DynamicImage::ImageRgb8(render_placeholder(domain, target, with_initials));
    write_jpeg(&image, target, path)
}

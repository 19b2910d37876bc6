//! 5x7 bitmap digits for slide labels. Only digits are ever printed, so a
//! font dependency is not needed.

use image::{Rgb, RgbImage};

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;
/// Each glyph pixel becomes a `SCALE x SCALE` block.
const SCALE: u32 = 2;
const SPACING: u32 = 2;

/// One row per byte, bit 4 is the leftmost column.
const DIGITS: [[u8; 7]; 10] = [
    [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
    [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
    [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
    [0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110],
    [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
    [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
    [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
    [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
    [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
];

fn glyph(c: char) -> Option<&'static [u8; 7]> {
    c.to_digit(10).map(|d| &DIGITS[d as usize])
}

/// Rendered `(width, height)` of `text`; non-digits are skipped.
pub fn text_size(text: &str) -> (u32, u32) {
    let n = text.chars().filter(|c| glyph(*c).is_some()).count() as u32;
    if n == 0 {
        return (0, 0);
    }
    (n * GLYPH_W * SCALE + (n - 1) * SPACING, GLYPH_H * SCALE)
}

/// Draw `text` centered inside the box at `(x, y)` of size `(w, h)`.
pub fn draw_centered(img: &mut RgbImage, text: &str, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    let (tw, th) = text_size(text);
    let mut pen_x = x + w.saturating_sub(tw) / 2;
    let pen_y = y + h.saturating_sub(th) / 2;

    for rows in text.chars().filter_map(glyph) {
        for (gy, bits) in rows.iter().enumerate() {
            for gx in 0..GLYPH_W {
                if bits & (1 << (GLYPH_W - 1 - gx)) == 0 {
                    continue;
                }
                fill_block(img, pen_x + gx * SCALE, pen_y + gy as u32 * SCALE, color);
            }
        }
        pen_x += GLYPH_W * SCALE + SPACING;
    }
}

fn fill_block(img: &mut RgbImage, x: u32, y: u32, color: Rgb<u8>) {
    for dy in 0..SCALE {
        for dx in 0..SCALE {
            let (px, py) = (x + dx, y + dy);
            if px < img.width() && py < img.height() {
                img.put_pixel(px, py, color);
            }
        }
    }
}

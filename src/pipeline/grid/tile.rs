//! One grid cell: a 150x150 thumbnail (or placeholder) over a labeled band.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use thiserror::Error;

use super::glyphs;
use super::layout::{CELL_HEIGHT, LABEL_BAND, TILE_SIZE};

/// Why a slide is rendered as a placeholder. Each class has its own pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileFailure {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

const BAND_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

const FETCH_FILL: Rgb<u8> = Rgb([205, 205, 205]);
const FETCH_MARK: Rgb<u8> = Rgb([90, 90, 90]);
const DECODE_FILL: Rgb<u8> = Rgb([245, 196, 66]);
const DECODE_MARK: Rgb<u8> = Rgb([190, 120, 20]);

/// A rendered cell plus what went wrong, if anything.
#[derive(Debug)]
pub struct RenderedTile {
    pub image: RgbImage,
    pub failure: Option<TileFailure>,
}

/// Decode fetched bytes and stretch them to the tile square.
pub fn decode_thumbnail(bytes: &[u8]) -> Result<RgbImage, TileFailure> {
    let decoded = image::load_from_memory(bytes).map_err(|e| TileFailure::Decode(e.to_string()))?;
    Ok(imageops::resize(&decoded.to_rgb8(), TILE_SIZE, TILE_SIZE, FilterType::Triangle))
}

/// Fixed pattern per failure class: an X over grey for fetch failures,
/// horizontal stripes over amber for decode failures.
pub fn placeholder(failure: &TileFailure) -> RgbImage {
    match failure {
        TileFailure::Fetch(_) => RgbImage::from_fn(TILE_SIZE, TILE_SIZE, |x, y| {
            let on_diagonal = x.abs_diff(y) < 3 || x.abs_diff(TILE_SIZE - 1 - y) < 3;
            if on_diagonal { FETCH_MARK } else { FETCH_FILL }
        }),
        TileFailure::Decode(_) => RgbImage::from_fn(TILE_SIZE, TILE_SIZE, |_, y| {
            if (y / 10) % 2 == 1 { DECODE_MARK } else { DECODE_FILL }
        }),
    }
}

/// Render slide `index` from a fetch result.
pub fn render_tile(fetched: Result<Vec<u8>, TileFailure>, index: usize) -> RenderedTile {
    let (square, failure) = match fetched.and_then(|bytes| decode_thumbnail(&bytes)) {
        Ok(square) => (square, None),
        Err(failure) => (placeholder(&failure), Some(failure)),
    };

    let mut cell = RgbImage::from_pixel(TILE_SIZE, CELL_HEIGHT, BAND_COLOR);
    imageops::overlay(&mut cell, &square, 0, 0);
    glyphs::draw_centered(
        &mut cell,
        &index.to_string(),
        0,
        TILE_SIZE,
        TILE_SIZE,
        LABEL_BAND,
        LABEL_COLOR,
    );

    RenderedTile { image: cell, failure }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat};
    use std::io::Cursor;

    pub(crate) fn png_bytes(w: u32, h: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(w, h, Rgb(color));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    #[test]
    fn decoded_thumbnail_is_stretched_to_square() {
        let tile = render_tile(Ok(png_bytes(40, 90, [10, 120, 200])), 3);
        assert!(tile.failure.is_none());
        assert_eq!(tile.image.dimensions(), (TILE_SIZE, CELL_HEIGHT));
        let Rgb(center) = *tile.image.get_pixel(75, 75);
        for (got, want) in center.iter().zip([10u8, 120, 200]) {
            assert!(got.abs_diff(want) <= 1, "{center:?}");
        }
        // Band stays white away from the centered label.
        assert_eq!(*tile.image.get_pixel(2, TILE_SIZE + 2), BAND_COLOR);
    }

    #[test]
    fn undecodable_bytes_get_decode_placeholder() {
        let tile = render_tile(Ok(b"<html>not an image</html>".to_vec()), 1);
        assert!(matches!(tile.failure, Some(TileFailure::Decode(_))));
        assert_eq!(*tile.image.get_pixel(40, 5), DECODE_FILL);
        assert_eq!(*tile.image.get_pixel(40, 15), DECODE_MARK);
    }

    #[test]
    fn fetch_failure_gets_fetch_placeholder() {
        let tile = render_tile(Err(TileFailure::Fetch("timeout".into())), 2);
        assert!(matches!(tile.failure, Some(TileFailure::Fetch(_))));
        assert_eq!(*tile.image.get_pixel(40, 40), FETCH_MARK);
        assert_eq!(*tile.image.get_pixel(40, 60), FETCH_FILL);
    }

    #[test]
    fn placeholders_are_deterministic_and_distinct() {
        let fetch_a = placeholder(&TileFailure::Fetch("a".into()));
        let fetch_b = placeholder(&TileFailure::Fetch("b".into()));
        let decode = placeholder(&TileFailure::Decode("c".into()));
        assert_eq!(fetch_a, fetch_b);
        assert_ne!(fetch_a, decode);
    }

    #[test]
    fn label_is_drawn_in_band() {
        let tile = render_tile(Err(TileFailure::Fetch("x".into())), 7);
        let inked = (0..TILE_SIZE)
            .flat_map(|x| (TILE_SIZE..CELL_HEIGHT).map(move |y| (x, y)))
            .filter(|&(x, y)| *tile.image.get_pixel(x, y) == LABEL_COLOR)
            .count();
        assert!(inked > 0);
    }
}

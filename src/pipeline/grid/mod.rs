//! Grid Compositor.
//!
//! Turns one backend's gallery into a single labeled JPEG: every slide is
//! fetched concurrently, rendered as a 150x150 tile with its 0-based index
//! printed underneath, and tiled row-major. Failed thumbnails become
//! placeholder tiles so slide numbering never shifts.

pub mod fetch;
pub mod glyphs;
pub mod layout;
pub mod tile;

use std::io::Cursor;
use std::time::Instant;

use image::{imageops, DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use thiserror::Error;
use tracing::Instrument;

use crate::models::{BackendKind, ThumbnailGallery};

pub use fetch::ThumbnailFetcher;
pub use layout::{GridLayout, DEFAULT_COLUMNS, TILE_SIZE};
pub use tile::TileFailure;

const DEFAULT_JPEG_QUALITY: u8 = 85;
const BLANK_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Error)]
pub enum GridError {
    #[error("grid encoding failed: {0}")]
    Encode(String),
}

/// An encoded grid plus the metadata arbitration answers are checked against.
#[derive(Debug, Clone)]
pub struct GridImage {
    pub backend: BackendKind,
    /// JPEG bytes.
    pub bytes: Vec<u8>,
    /// Slides rendered, reference included.
    pub slides: usize,
    pub columns: u32,
    /// Slides rendered as placeholders.
    pub placeholders: usize,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone)]
pub struct GridCompositor {
    fetcher: ThumbnailFetcher,
    columns: u32,
    jpeg_quality: u8,
}

impl GridCompositor {
    pub fn new(fetcher: ThumbnailFetcher, columns: u32) -> Self {
        Self {
            fetcher,
            columns,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Fetch, render and encode one gallery.
    pub async fn compose(&self, gallery: &ThumbnailGallery) -> Result<GridImage, GridError> {
        let span = tracing::info_span!("compose_grid", backend = %gallery.backend, slides = gallery.slide_count());
        let start = Instant::now();

        let urls = gallery.slide_urls();
        let fetched = self.fetcher.fetch_all(&urls).instrument(span.clone()).await;
        let _enter = span.entered();

        let canvas = assemble(gallery.backend, fetched, self.columns);
        let bytes = encode_jpeg(&canvas.image, self.jpeg_quality)?;

        tracing::info!(
            backend = %gallery.backend,
            slides = canvas.slides,
            placeholders = canvas.placeholders,
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Grid composed"
        );

        Ok(GridImage {
            backend: gallery.backend,
            bytes,
            slides: canvas.slides,
            columns: canvas.layout.columns,
            placeholders: canvas.placeholders,
            width: canvas.image.width(),
            height: canvas.image.height(),
        })
    }
}

/// Unencoded grid. Kept separate from encoding so layout can be checked
/// pixel for pixel.
pub struct GridCanvas {
    pub image: RgbImage,
    pub layout: GridLayout,
    pub slides: usize,
    pub placeholders: usize,
}

/// Render fetched slides (in slide order) onto a canvas. CPU only.
pub fn assemble(
    backend: BackendKind,
    fetched: Vec<Result<Vec<u8>, tile::TileFailure>>,
    columns: u32,
) -> GridCanvas {
    let layout = GridLayout::new(fetched.len(), columns);
    let (width, height) = layout.canvas_size();
    let mut image = RgbImage::from_pixel(width, height, BLANK_COLOR);
    let slides = fetched.len();
    let mut placeholders = 0;

    for (index, result) in fetched.into_iter().enumerate() {
        let rendered = tile::render_tile(result, index);
        if let Some(failure) = &rendered.failure {
            placeholders += 1;
            tracing::warn!(backend = %backend, slide = index, error = %failure, "Thumbnail replaced by placeholder");
        }
        let (x, y) = layout.origin(index as u32);
        imageops::overlay(&mut image, &rendered.image, x, y);
    }

    GridCanvas {
        image,
        layout,
        slides,
        placeholders,
    }
}

pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, GridError> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut cursor, ImageOutputFormat::Jpeg(quality))
        .map_err(|e| GridError::Encode(e.to_string()))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GalleryItem;
    use crate::pipeline::grid::fetch::tests::spawn_thumbnail_server;
    use crate::pipeline::grid::layout::CELL_HEIGHT;
    use crate::pipeline::grid::tile::tests::png_bytes;
    use std::time::Duration;

    fn gallery(base: &str, paths: &[&str]) -> ThumbnailGallery {
        let items = paths
            .iter()
            .enumerate()
            .map(|(position, path)| GalleryItem {
                position,
                thumbnail_url: format!("{base}{path}"),
                title: None,
                detail_link: None,
                price: None,
                currency: None,
                native_rank: None,
            })
            .collect();
        ThumbnailGallery::assemble(BackendKind::Web, &format!("{base}/red.png"), items)
    }

    fn compositor(timeout_ms: u64) -> GridCompositor {
        let fetcher = ThumbnailFetcher::new(reqwest::Client::new(), Duration::from_millis(timeout_ms));
        GridCompositor::new(fetcher, DEFAULT_COLUMNS)
    }

    #[test]
    fn assemble_places_slides_row_major() {
        let fetched = (0..8)
            .map(|i| Ok(png_bytes(4, 4, [i * 30, 0, 0])))
            .collect();
        let canvas = assemble(BackendKind::Web, fetched, 6);

        assert_eq!(canvas.slides, 8);
        assert_eq!(canvas.placeholders, 0);
        assert_eq!(canvas.image.dimensions(), (900, 340));
        // Slide 7 sits in row 1, column 1.
        let Rgb(px) = *canvas.image.get_pixel(150 + 75, CELL_HEIGHT + 75);
        assert!(px[0].abs_diff(210) <= 1);
        // Blank cells pad out the last row.
        assert_eq!(*canvas.image.get_pixel(4 * 150 + 75, CELL_HEIGHT + 75), BLANK_COLOR);
    }

    #[test]
    fn failures_keep_index_space_stable() {
        let fetched = vec![
            Ok(png_bytes(4, 4, [0, 0, 255])),
            Err(TileFailure::Fetch("timeout".into())),
            Ok(b"junk".to_vec()),
            Ok(png_bytes(4, 4, [0, 255, 0])),
        ];
        let canvas = assemble(BackendKind::Marketplace, fetched, 6);
        assert_eq!(canvas.slides, 4);
        assert_eq!(canvas.placeholders, 2);
        assert_eq!(canvas.layout.blank_cells(), 2);
        let Rgb(px) = *canvas.image.get_pixel(3 * 150 + 75, 75);
        assert!(px[1] >= 254 && px[0] <= 1);
    }

    #[test]
    fn assembling_twice_is_identical() {
        let make = || {
            vec![
                Ok(png_bytes(4, 4, [9, 9, 9])),
                Err(TileFailure::Decode("x".into())),
                Ok(png_bytes(6, 3, [200, 100, 50])),
            ]
        };
        let a = assemble(BackendKind::Web, make(), 6);
        let b = assemble(BackendKind::Web, make(), 6);
        assert_eq!(a.image, b.image);
    }

    #[tokio::test]
    async fn compose_renders_reference_plus_items() {
        let base = spawn_thumbnail_server().await;
        let gallery = gallery(&base, &["/ok.png", "/missing", "/broken"]);

        let grid = compositor(2_000).compose(&gallery).await.unwrap();
        assert_eq!(grid.slides, 4);
        assert_eq!(grid.placeholders, 2);
        assert_eq!((grid.width, grid.height), (900, 170));
        assert_eq!(&grid.bytes[0..3], &[0xFF, 0xD8, 0xFF]);

        let decoded = image::load_from_memory(&grid.bytes).unwrap();
        assert_eq!(decoded.to_rgb8().dimensions(), (900, 170));
    }

    #[tokio::test]
    async fn compose_survives_timeouts() {
        let base = spawn_thumbnail_server().await;
        let gallery = gallery(&base, &["/slow", "/ok.png"]);
        let grid = compositor(200).compose(&gallery).await.unwrap();
        assert_eq!(grid.slides, 3);
        assert_eq!(grid.placeholders, 1);
    }
}

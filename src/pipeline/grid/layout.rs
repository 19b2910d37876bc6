//! Row-major slide placement. Pure arithmetic; the index-to-cell mapping
//! here is what arbitration answers are read against.

/// Thumbnail square edge in pixels.
pub const TILE_SIZE: u32 = 150;
/// Height of the white label band under each thumbnail.
pub const LABEL_BAND: u32 = 20;
/// Full cell height: thumbnail plus label band.
pub const CELL_HEIGHT: u32 = TILE_SIZE + LABEL_BAND;
pub const DEFAULT_COLUMNS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub slides: u32,
    pub columns: u32,
}

impl GridLayout {
    /// A zero column count falls back to the default.
    pub fn new(slides: usize, columns: u32) -> Self {
        let columns = if columns == 0 { DEFAULT_COLUMNS } else { columns };
        Self {
            slides: u32::try_from(slides).unwrap_or(u32::MAX),
            columns,
        }
    }

    pub fn rows(&self) -> u32 {
        self.slides.div_ceil(self.columns).max(1)
    }

    /// `(row, column)` for a slide index.
    pub fn cell(&self, index: u32) -> (u32, u32) {
        (index / self.columns, index % self.columns)
    }

    /// Top-left pixel of a slide's cell.
    pub fn origin(&self, index: u32) -> (u32, u32) {
        let (row, col) = self.cell(index);
        (col * TILE_SIZE, row * CELL_HEIGHT)
    }

    /// Canvas `(width, height)`; always full rows of `columns` cells.
    pub fn canvas_size(&self) -> (u32, u32) {
        (self.columns * TILE_SIZE, self.rows() * CELL_HEIGHT)
    }

    /// Empty cells padding out the last row.
    pub fn blank_cells(&self) -> u32 {
        self.rows() * self.columns - self.slides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_slides_fit_one_row_with_two_blanks() {
        let layout = GridLayout::new(4, 6);
        assert_eq!(layout.rows(), 1);
        assert_eq!(layout.blank_cells(), 2);
        assert_eq!(layout.canvas_size(), (900, 170));
        assert_eq!(layout.cell(3), (0, 3));
    }

    #[test]
    fn full_gallery_wraps_row_major() {
        let layout = GridLayout::new(21, 6);
        assert_eq!(layout.rows(), 4);
        assert_eq!(layout.blank_cells(), 3);
        assert_eq!(layout.cell(6), (1, 0));
        assert_eq!(layout.cell(20), (3, 2));
        assert_eq!(layout.origin(20), (300, 510));
    }

    #[test]
    fn exact_multiple_has_no_blanks() {
        let layout = GridLayout::new(12, 6);
        assert_eq!(layout.rows(), 2);
        assert_eq!(layout.blank_cells(), 0);
    }

    #[test]
    fn zero_columns_uses_default() {
        assert_eq!(GridLayout::new(1, 0).columns, DEFAULT_COLUMNS);
    }
}

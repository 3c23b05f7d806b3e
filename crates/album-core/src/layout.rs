pub const GRID_GAP: f64 = 10.0;
/// Rows assumed when the viewport has no size yet.
const FALLBACK_ROWS: u32 = 4;
const FALLBACK_PER_PAGE: u32 = 20;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Number of items that fill the viewport with square tiles in `columns`
/// columns, whole rows only.
pub fn items_per_page(columns: u32, viewport: Viewport, gap: f64) -> u32 {
    if columns == 0 {
        return FALLBACK_PER_PAGE;
    }
    if viewport.is_degenerate() {
        return columns * FALLBACK_ROWS;
    }

    let cols = f64::from(columns);
    let tile = (viewport.width - (cols - 1.0) * gap) / cols;
    let step = tile + gap;
    if step <= gap {
        return columns;
    }
    let rows = ((viewport.height / step).floor() as u32).max(1);
    (columns * rows).max(columns)
}

pub fn rows_for(columns: u32, per_page: u32) -> u32 {
    if columns == 0 {
        return 0;
    }
    per_page.div_ceil(columns)
}

#[cfg(test)]
mod tests {
    use super::{items_per_page, rows_for, Viewport, GRID_GAP};

    #[test]
    fn five_columns_four_rows_fill_twenty() {
        // tile = (1040 - 40) / 5 = 200, step 210, 4 rows fit in 850
        let viewport = Viewport::new(1040.0, 850.0);
        assert_eq!(items_per_page(5, viewport, GRID_GAP), 20);
    }

    #[test]
    fn partial_trailing_row_is_dropped() {
        let viewport = Viewport::new(1040.0, 629.0);
        assert_eq!(items_per_page(5, viewport, GRID_GAP), 10);
    }

    #[test]
    fn degenerate_viewport_uses_four_rows() {
        assert_eq!(items_per_page(6, Viewport::new(0.0, 900.0), GRID_GAP), 24);
        assert_eq!(items_per_page(0, Viewport::new(100.0, 100.0), GRID_GAP), 20);
    }

    #[test]
    fn short_viewport_still_shows_one_row() {
        assert_eq!(items_per_page(4, Viewport::new(800.0, 50.0), GRID_GAP), 4);
    }

    #[test]
    fn too_narrow_for_columns_falls_back_to_one_row() {
        assert_eq!(items_per_page(20, Viewport::new(150.0, 500.0), GRID_GAP), 20);
    }

    #[test]
    fn rows_round_up() {
        assert_eq!(rows_for(5, 20), 4);
        assert_eq!(rows_for(5, 21), 5);
        assert_eq!(rows_for(0, 21), 0);
    }
}

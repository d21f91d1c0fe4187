//! Navigation grid built from a tile map
//!
//! One walkability flag per tile, plus the conversions between world metres
//! and grid cells.

use glam::Vec2;
use smallvec::SmallVec;

/// Source of per-tile walkability, implemented by level data
pub trait TileSource {
    /// Width in tiles
    fn width(&self) -> usize;
    /// Height in tiles
    fn height(&self) -> usize;
    /// Tile width in pixels
    fn tile_width(&self) -> f32;
    /// Tile height in pixels
    fn tile_height(&self) -> f32;
    /// Whether the tile at `(x, y)` can be walked on
    fn is_walkable(&self, x: usize, y: usize) -> bool;
}

/// Integer cell coordinate; may lie outside the grid until validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared euclidean distance in cells
    #[must_use]
    pub fn distance_squared(self, other: Self) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }

    /// True if `other` is one of the eight surrounding cells
    #[must_use]
    pub fn is_adjacent(self, other: Self) -> bool {
        self != other
            && (i64::from(self.x) - i64::from(other.x)).abs() <= 1
            && (i64::from(self.y) - i64::from(other.y)).abs() <= 1
    }
}

/// Neighbour offsets in generation order, bottom row first
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// A 2D navigation grid
#[derive(Debug, Clone)]
pub struct NavGrid {
    width: usize,
    height: usize,
    /// Walkable cells (true = walkable), row-major
    cells: Vec<bool>,
    /// Tile size in pixels
    tile_width: f32,
    tile_height: f32,
    pixels_per_metre: f32,
}

impl NavGrid {
    /// A grid with no cells; every lookup resolves to "no cell"
    #[must_use]
    pub fn empty(pixels_per_metre: f32) -> Self {
        Self::new(0, 0, pixels_per_metre, pixels_per_metre)
    }

    /// Create a new grid (all cells walkable)
    #[must_use]
    pub fn new(width: usize, height: usize, tile_size: f32, pixels_per_metre: f32) -> Self {
        Self {
            width,
            height,
            cells: vec![true; width * height],
            tile_width: tile_size,
            tile_height: tile_size,
            pixels_per_metre,
        }
    }

    /// Build a grid from a tile source
    #[must_use]
    pub fn from_source(source: &impl TileSource, pixels_per_metre: f32) -> Self {
        let width = source.width();
        let height = source.height();
        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                cells.push(source.is_walkable(x, y));
            }
        }

        Self {
            width,
            height,
            cells,
            tile_width: source.tile_width(),
            tile_height: source.tile_height(),
            pixels_per_metre,
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Set a cell's walkability; out-of-bounds coordinates are ignored
    pub fn set_walkable(&mut self, x: usize, y: usize, walkable: bool) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = walkable;
        }
    }

    fn index(&self, coord: GridCoord) -> Option<usize> {
        let x = usize::try_from(coord.x).ok()?;
        let y = usize::try_from(coord.y).ok()?;
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// Walkability of a cell, or `None` if the coordinate is off the grid
    #[must_use]
    pub fn cell(&self, coord: GridCoord) -> Option<bool> {
        self.index(coord).map(|i| self.cells[i])
    }

    /// Check if a cell exists and is walkable
    #[must_use]
    pub fn is_walkable(&self, coord: GridCoord) -> bool {
        self.cell(coord).unwrap_or(false)
    }

    /// Convert world position (metres) to grid coordinates
    #[must_use]
    pub fn world_to_grid(&self, pos: Vec2) -> GridCoord {
        let pixels = pos * self.pixels_per_metre;
        GridCoord::new(
            (pixels.x / self.tile_width).floor() as i32,
            (pixels.y / self.tile_height).floor() as i32,
        )
    }

    /// Convert grid coordinates to world position (center of cell)
    #[must_use]
    pub fn grid_to_world(&self, coord: GridCoord) -> Vec2 {
        Vec2::new(
            (coord.x as f32 * self.tile_width + self.tile_width * 0.5) / self.pixels_per_metre,
            (coord.y as f32 * self.tile_height + self.tile_height * 0.5) / self.pixels_per_metre,
        )
    }

    /// Walkable 8-connected neighbours of a cell
    pub(crate) fn neighbors(&self, coord: GridCoord) -> SmallVec<[GridCoord; 8]> {
        NEIGHBOR_OFFSETS
            .iter()
            .map(|&(dx, dy)| GridCoord::new(coord.x + dx, coord.y + dy))
            .filter(|&n| self.is_walkable(n))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rows(Vec<&'static str>);

    impl TileSource for Rows {
        fn width(&self) -> usize {
            self.0[0].len()
        }
        fn height(&self) -> usize {
            self.0.len()
        }
        fn tile_width(&self) -> f32 {
            32.0
        }
        fn tile_height(&self) -> f32 {
            16.0
        }
        fn is_walkable(&self, x: usize, y: usize) -> bool {
            self.0[y].as_bytes()[x] == b'.'
        }
    }

    #[test]
    fn test_from_source() {
        let grid = NavGrid::from_source(&Rows(vec!["..#", "#.."]), 32.0);

        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.cell(GridCoord::new(2, 0)), Some(false));
        assert_eq!(grid.cell(GridCoord::new(0, 1)), Some(false));
        assert_eq!(grid.cell(GridCoord::new(1, 1)), Some(true));
    }

    #[test]
    fn test_out_of_bounds_is_no_cell() {
        let grid = NavGrid::new(4, 4, 64.0, 64.0);

        assert_eq!(grid.cell(GridCoord::new(-1, 0)), None);
        assert_eq!(grid.cell(GridCoord::new(0, 4)), None);
        assert!(!grid.is_walkable(GridCoord::new(4, 4)));
    }

    #[test]
    fn test_world_grid_conversion() {
        // 32x16 pixel tiles at 32 px/m: cells are 1m wide and 0.5m tall
        let grid = NavGrid::from_source(&Rows(vec!["...", "..."]), 32.0);

        assert_eq!(grid.world_to_grid(Vec2::new(1.2, 0.7)), GridCoord::new(1, 1));
        assert_eq!(grid.world_to_grid(Vec2::new(-0.1, 0.1)), GridCoord::new(-1, 0));

        let center = grid.grid_to_world(GridCoord::new(1, 1));
        assert!((center - Vec2::new(1.5, 0.75)).length() < 1e-5);
    }

    #[test]
    fn test_neighbors_skip_walls_and_edges() {
        let mut grid = NavGrid::new(3, 3, 1.0, 1.0);
        grid.set_walkable(1, 0, false);

        let corner = grid.neighbors(GridCoord::new(0, 0));
        assert_eq!(corner.as_slice(), &[GridCoord::new(0, 1), GridCoord::new(1, 1)]);

        let center = grid.neighbors(GridCoord::new(1, 1));
        assert_eq!(center.len(), 7);
        assert_eq!(center[0], GridCoord::new(0, 0));
    }

    #[test]
    fn test_adjacency() {
        let c = GridCoord::new(2, 2);
        assert!(c.is_adjacent(GridCoord::new(3, 3)));
        assert!(!c.is_adjacent(c));
        assert!(!c.is_adjacent(GridCoord::new(4, 2)));
        assert_eq!(c.distance_squared(GridCoord::new(5, 6)), 25);
    }

    #[test]
    fn test_extreme_coords_do_not_overflow() {
        let low = GridCoord::new(i32::MIN, i32::MIN);
        let high = GridCoord::new(i32::MAX, i32::MAX);

        let span = i64::from(i32::MAX) - i64::from(i32::MIN);
        assert_eq!(low.distance_squared(high), 2 * span * span);
        assert!(!low.is_adjacent(high));
        assert!(high.is_adjacent(GridCoord::new(i32::MAX - 1, i32::MAX)));
    }
}

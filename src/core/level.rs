//! Level description and tile map
//!
//! Levels are stored as RON (or JSON) documents. Tiles are written as text
//! rows, top row first, so the file reads like the map it describes:
//!
//! ```text
//! tiles: [
//!     "#######",
//!     "#.....#",
//!     "#..#..#",
//!     "#######",
//! ]
//! ```
//!
//! `.` is floor, `#` is wall. Grid row 0 is the bottom row of the text.

use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::ai::grid::TileSource;
use crate::ai::spawn::Light;
use crate::core::LoadError;

const FLOOR: u8 = b'.';
const WALL: u8 = b'#';

/// A serializable level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    /// Level name
    pub name: String,
    /// Tile width in pixels
    pub tile_width: f32,
    /// Tile height in pixels
    pub tile_height: f32,
    /// Tile rows, top row first
    pub tiles: Vec<String>,
    /// Player start position in metres
    pub player_spawn: Vec2,
    /// Enemy spawn points in metres
    #[serde(default)]
    pub enemy_spawns: Vec<Vec2>,
    /// Exit position in metres
    #[serde(default)]
    pub exit: Option<Vec2>,
    /// Static lights; spawning never happens inside them
    #[serde(default)]
    pub lights: Vec<Light>,
    /// Overrides the configured enemy cap
    #[serde(default)]
    pub max_enemies: Option<usize>,
}

impl LevelData {
    /// Build the tile map described by `tiles`
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InvalidLevel` for empty, ragged or unknown tiles
    pub fn tile_map(&self) -> Result<TileMap, LoadError> {
        let rows: Vec<&str> = self.tiles.iter().map(String::as_str).collect();
        TileMap::from_rows(&rows, self.tile_width, self.tile_height)
    }

    /// Load a level from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, deserialization fails or
    /// the tiles are invalid
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path).map_err(|e| LoadError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    /// Parse a level from RON text
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the tiles are invalid
    pub fn from_ron_str(content: &str) -> Result<Self, LoadError> {
        let level: LevelData =
            ron::from_str(content).map_err(|e| LoadError::Deserialize(e.to_string()))?;
        level.tile_map()?;
        Ok(level)
    }

    /// Save the level to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| LoadError::Serialize(e.to_string()))?;
        fs::write(path, ron_string).map_err(|e| LoadError::Io(e.to_string()))?;
        Ok(())
    }

    /// Load a level from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, deserialization fails or
    /// the tiles are invalid
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path).map_err(|e| LoadError::Io(e.to_string()))?;
        let level: LevelData = serde_json::from_str(&content)
            .map_err(|e| LoadError::Deserialize(e.to_string()))?;
        level.tile_map()?;
        Ok(level)
    }
}

/// Walkability of every tile, bottom row first
#[derive(Debug, Clone, PartialEq)]
pub struct TileMap {
    width: usize,
    height: usize,
    tile_width: f32,
    tile_height: f32,
    walkable: Vec<bool>,
}

impl TileMap {
    /// Parse text rows (top row first)
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InvalidLevel` for empty, ragged or unknown tiles
    pub fn from_rows(rows: &[&str], tile_width: f32, tile_height: f32) -> Result<Self, LoadError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        if width == 0 {
            return Err(LoadError::InvalidLevel("level has no tiles".into()));
        }
        if tile_width <= 0.0 || tile_height <= 0.0 {
            return Err(LoadError::InvalidLevel(format!(
                "tile size must be positive, got {tile_width}x{tile_height}"
            )));
        }

        let mut walkable = Vec::with_capacity(width * height);
        for (i, row) in rows.iter().rev().enumerate() {
            if row.len() != width {
                return Err(LoadError::InvalidLevel(format!(
                    "row {} has {} tiles, expected {width}",
                    height - 1 - i,
                    row.len()
                )));
            }
            for &tile in row.as_bytes() {
                match tile {
                    FLOOR => walkable.push(true),
                    WALL => walkable.push(false),
                    other => {
                        return Err(LoadError::InvalidLevel(format!(
                            "unknown tile '{}'",
                            other.escape_ascii()
                        )));
                    }
                }
            }
        }

        Ok(Self {
            width,
            height,
            tile_width,
            tile_height,
            walkable,
        })
    }
}

impl TileSource for TileMap {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn tile_width(&self) -> f32 {
        self.tile_width
    }

    fn tile_height(&self) -> f32 {
        self.tile_height
    }

    fn is_walkable(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.walkable[y * self.width + x]
    }
}

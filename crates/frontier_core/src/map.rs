//! Terrain map and tile geometry.
//!
//! The map is a fixed grid of land and water tiles addressed by [`TileRef`]
//! (`y * width + x`). Real map assets are loaded outside the core; the ASCII
//! format here is what scenarios and tests use.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Index of a tile in the map (`y * width + x`).
pub type TileRef = u32;

/// Terrain of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    /// Claimable land.
    Land,
    /// Ocean or lake. Only transport ships cross it.
    Water,
}

/// Immutable terrain grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainMap {
    width: u32,
    height: u32,
    terrain: Vec<Terrain>,
}

impl TerrainMap {
    /// Create a map from a terrain vector in row-major order.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MapParse`] if the dimensions do not match the data.
    pub fn new(width: u32, height: u32, terrain: Vec<Terrain>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GameError::MapParse("map must not be empty".to_string()));
        }
        let expected = u64::from(width) * u64::from(height);
        if terrain.len() as u64 != expected {
            return Err(GameError::MapParse(format!(
                "expected {expected} tiles for {width}x{height}, got {}",
                terrain.len()
            )));
        }
        Ok(Self {
            width,
            height,
            terrain,
        })
    }

    /// Parse an ASCII map: `#` is land, `.` or `~` is water, one row per line.
    ///
    /// Blank lines and surrounding whitespace are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use frontier_core::map::TerrainMap;
    ///
    /// let map = TerrainMap::from_ascii("##.\n##.").unwrap();
    /// assert_eq!(map.width(), 3);
    /// assert_eq!(map.land_tile_count(), 4);
    /// ```
    pub fn from_ascii(text: &str) -> Result<Self> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let Some(first) = rows.first() else {
            return Err(GameError::MapParse("map has no rows".to_string()));
        };
        let width = first.chars().count();

        let mut terrain = Vec::with_capacity(width * rows.len());
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(GameError::MapParse(format!(
                    "row {y} has {} columns, expected {width}",
                    row.chars().count()
                )));
            }
            for (x, c) in row.chars().enumerate() {
                terrain.push(match c {
                    '#' => Terrain::Land,
                    '.' | '~' => Terrain::Water,
                    other => {
                        return Err(GameError::MapParse(format!(
                            "unexpected character '{other}' at ({x}, {y})"
                        )))
                    }
                });
            }
        }

        Self::new(width as u32, rows.len() as u32, terrain)
    }

    /// Map width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Map height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terrain.len()
    }

    /// Whether the map has no tiles (never true for a constructed map).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terrain.is_empty()
    }

    /// Tile at the given coordinates, if inside the map.
    #[must_use]
    pub fn tile(&self, x: u32, y: u32) -> Option<TileRef> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// X coordinate of a tile.
    #[must_use]
    pub const fn x(&self, tile: TileRef) -> u32 {
        tile % self.width
    }

    /// Y coordinate of a tile.
    #[must_use]
    pub const fn y(&self, tile: TileRef) -> u32 {
        tile / self.width
    }

    /// Whether the tile reference points inside the map.
    #[must_use]
    pub fn is_valid(&self, tile: TileRef) -> bool {
        (tile as usize) < self.terrain.len()
    }

    /// Terrain of a tile.
    #[must_use]
    pub fn terrain(&self, tile: TileRef) -> Option<Terrain> {
        self.terrain.get(tile as usize).copied()
    }

    /// Whether the tile is land.
    #[must_use]
    pub fn is_land(&self, tile: TileRef) -> bool {
        self.terrain(tile) == Some(Terrain::Land)
    }

    /// Whether the tile is water.
    #[must_use]
    pub fn is_water(&self, tile: TileRef) -> bool {
        self.terrain(tile) == Some(Terrain::Water)
    }

    /// Orthogonal neighbours in fixed order (up, left, right, down).
    pub fn neighbors(&self, tile: TileRef) -> impl Iterator<Item = TileRef> {
        let (x, y) = (self.x(tile), self.y(tile));
        let (w, h) = (self.width, self.height);
        let up = (y > 0).then(|| tile - w);
        let left = (x > 0).then(|| tile - 1);
        let right = (x + 1 < w).then(|| tile + 1);
        let down = (y + 1 < h).then(|| tile + w);
        [up, left, right, down].into_iter().flatten()
    }

    /// Land tile adjacent to water.
    #[must_use]
    pub fn is_shore(&self, tile: TileRef) -> bool {
        self.is_land(tile) && self.neighbors(tile).any(|n| self.is_water(n))
    }

    /// Manhattan distance between two tiles.
    #[must_use]
    pub fn manhattan(&self, a: TileRef, b: TileRef) -> u32 {
        self.x(a).abs_diff(self.x(b)) + self.y(a).abs_diff(self.y(b))
    }

    /// All tiles within a Manhattan radius of `center`, in ascending order.
    #[must_use]
    pub fn tiles_within(&self, center: TileRef, radius: u32) -> Vec<TileRef> {
        let (cx, cy) = (self.x(center), self.y(center));
        let min_y = cy.saturating_sub(radius);
        let max_y = (cy + radius).min(self.height - 1);
        let min_x = cx.saturating_sub(radius);
        let max_x = (cx + radius).min(self.width - 1);

        let mut tiles = Vec::new();
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                if cx.abs_diff(x) + cy.abs_diff(y) <= radius {
                    tiles.push(y * self.width + x);
                }
            }
        }
        tiles
    }

    /// Number of land tiles.
    #[must_use]
    pub fn land_tile_count(&self) -> usize {
        self.terrain.iter().filter(|t| **t == Terrain::Land).count()
    }

    /// All land tiles in ascending order.
    pub fn land_tiles(&self) -> impl Iterator<Item = TileRef> + '_ {
        self.terrain
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == Terrain::Land)
            .map(|(i, _)| i as TileRef)
    }
}

//! Tile grid and coordinate model.
//!
//! The world is a sparse map from integer coordinates to tiles. Reading a
//! coordinate that was never written defaults it to Grass, so callers can
//! treat the map as dense within the generated extent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Integer 2D grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Center of this cell in world space.
    pub fn to_world(self, tile_size: f32) -> WorldPosition {
        WorldPosition {
            x: self.x as f32 * tile_size + tile_size / 2.0,
            y: self.y as f32 * tile_size + tile_size / 2.0,
        }
    }

    /// Cell containing a world-space position.
    pub fn from_world(pos: WorldPosition, tile_size: f32) -> Self {
        Self {
            x: (pos.x / tile_size).floor() as i32,
            y: (pos.y / tile_size).floor() as i32,
        }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Continuous 2D position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPosition {
    pub x: f32,
    pub y: f32,
}

impl WorldPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: WorldPosition) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    Grass,
    Mountain,
    Tree,
    House,
    Campfire,
    Hearth,
}

impl TileKind {
    /// Only open grass can be walked through.
    pub fn is_traversable(self) -> bool {
        matches!(self, TileKind::Grass)
    }
}

#[derive(Debug, Clone)]
pub struct Tile {
    pub kind: TileKind,
    /// Cosmetic flag: true while the tile sits outside every fire's influence.
    pub snowed: bool,
}

impl Tile {
    fn grass() -> Self {
        Self {
            kind: TileKind::Grass,
            snowed: true,
        }
    }
}

const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(0, 1), (0, -1), (-1, 0), (1, 0)];

/// Owns the tile mapping plus the grid extent.
pub struct Grid {
    tiles: HashMap<Coordinate, Tile>,
    width: i32,
    height: i32,
    tile_size: f32,
}

impl Grid {
    pub fn new(width: i32, height: i32, tile_size: f32) -> Self {
        Self {
            tiles: HashMap::new(),
            width,
            height,
            tile_size,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn in_bounds(&self, coord: Coordinate) -> bool {
        coord.x >= 0 && coord.x < self.width && coord.y >= 0 && coord.y < self.height
    }

    /// Whether the coordinate has ever been instantiated.
    pub fn contains(&self, coord: Coordinate) -> bool {
        self.tiles.contains_key(&coord)
    }

    /// Read a tile, creating a default Grass tile if absent.
    pub fn tile_at(&mut self, coord: Coordinate) -> &Tile {
        self.tiles.entry(coord).or_insert_with(Tile::grass)
    }

    pub fn tile_at_mut(&mut self, coord: Coordinate) -> &mut Tile {
        self.tiles.entry(coord).or_insert_with(Tile::grass)
    }

    /// Read-only lookup that never instantiates.
    pub fn get(&self, coord: Coordinate) -> Option<&Tile> {
        self.tiles.get(&coord)
    }

    pub fn kind_at(&mut self, coord: Coordinate) -> TileKind {
        self.tile_at(coord).kind
    }

    pub fn is_traversable(&self, coord: Coordinate) -> bool {
        self.tiles
            .get(&coord)
            .map(|t| t.kind.is_traversable())
            .unwrap_or(false)
    }

    /// Mutate a tile's kind. Returns true when the kind actually changed.
    pub fn set_kind(&mut self, coord: Coordinate, kind: TileKind) -> bool {
        let tile = self.tile_at_mut(coord);
        if tile.kind == kind {
            return false;
        }
        tile.kind = kind;
        true
    }

    pub fn set_snowed(&mut self, coord: Coordinate, snowed: bool) -> bool {
        let tile = self.tile_at_mut(coord);
        if tile.snowed == snowed {
            return false;
        }
        tile.snowed = snowed;
        true
    }

    /// 4-neighbors whose kind differs from this tile's kind. Border smoothing
    /// is presentation-side, but generation and influence rely on this
    /// adjacency query.
    pub fn neighbors_differing(&mut self, coord: Coordinate) -> Vec<Coordinate> {
        let kind = self.kind_at(coord);
        let mut out = Vec::new();
        for (dx, dy) in NEIGHBOR_OFFSETS {
            let n = coord.offset(dx, dy);
            if let Some(tile) = self.tiles.get(&n) {
                if tile.kind != kind {
                    out.push(n);
                }
            }
        }
        out
    }

    /// Instantiated 4-neighbors of a coordinate.
    pub fn adjacent(&self, coord: Coordinate) -> Vec<Coordinate> {
        NEIGHBOR_OFFSETS
            .iter()
            .map(|&(dx, dy)| coord.offset(dx, dy))
            .filter(|c| self.tiles.contains_key(c))
            .collect()
    }

    /// Tiles strictly inside the Euclidean radius (`dist^2 < r^2`), clamped
    /// to the grid extent. Used for influence footprints and forest patches.
    pub fn tiles_in_radius(&self, center: Coordinate, radius: i32) -> Vec<Coordinate> {
        let r2 = (radius as i64) * (radius as i64);
        let mut out = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let d2 = (dx as i64) * (dx as i64) + (dy as i64) * (dy as i64);
                if d2 >= r2 {
                    continue;
                }
                let c = center.offset(dx, dy);
                if self.in_bounds(c) {
                    out.push(c);
                }
            }
        }
        out
    }

    /// Inclusive bounding-box neighborhood, corners included. Not
    /// interchangeable with [`tiles_in_radius`].
    pub fn tiles_in_square(&self, center: Coordinate, radius: i32) -> Vec<Coordinate> {
        let mut out = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let c = center.offset(dx, dy);
                if self.in_bounds(c) {
                    out.push(c);
                }
            }
        }
        out
    }

    pub fn manhattan_distance(a: Coordinate, b: Coordinate) -> i32 {
        (a.x - b.x).abs() + (a.y - b.y).abs()
    }

    /// Stable sort by Manhattan distance from an origin.
    pub fn sort_by_distance(mut tiles: Vec<Coordinate>, origin: Coordinate) -> Vec<Coordinate> {
        tiles.sort_by_key(|c| Self::manhattan_distance(*c, origin));
        tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_round_trip() {
        for tile_size in [1.0, 4.0, 10.0] {
            for x in -5..5 {
                for y in -5..5 {
                    let c = Coordinate::new(x, y);
                    let back = Coordinate::from_world(c.to_world(tile_size), tile_size);
                    assert_eq!(c, back, "round trip failed at tile_size {tile_size}");
                }
            }
        }
    }

    #[test]
    fn test_traversability_follows_kind() {
        let kinds = [
            TileKind::Grass,
            TileKind::Mountain,
            TileKind::Tree,
            TileKind::House,
            TileKind::Campfire,
            TileKind::Hearth,
        ];
        for kind in kinds {
            assert_eq!(kind.is_traversable(), kind == TileKind::Grass);
        }
    }

    #[test]
    fn test_lazy_grass_default() {
        let mut grid = Grid::new(4, 4, 1.0);
        let c = Coordinate::new(2, 2);
        assert!(!grid.contains(c));
        assert_eq!(grid.kind_at(c), TileKind::Grass);
        assert!(grid.contains(c));
        assert!(grid.tile_at(c).snowed);
    }

    #[test]
    fn test_radius_metric_is_strict() {
        let mut grid = Grid::new(9, 9, 1.0);
        let center = Coordinate::new(4, 4);
        for c in grid.tiles_in_square(center, 4) {
            grid.tile_at(c);
        }
        let tiles = grid.tiles_in_radius(center, 2);
        // dist^2 < 4: center, four at distance 1, and the four diagonals (2 < 4).
        assert_eq!(tiles.len(), 9);
        assert!(!tiles.contains(&Coordinate::new(4, 6)), "dist 2 excluded");
        assert!(tiles.contains(&Coordinate::new(5, 5)), "diagonal included");
    }

    #[test]
    fn test_square_includes_corners() {
        let grid = Grid::new(9, 9, 1.0);
        let tiles = grid.tiles_in_square(Coordinate::new(4, 4), 1);
        assert_eq!(tiles.len(), 9);
        assert!(tiles.contains(&Coordinate::new(3, 3)));
    }

    #[test]
    fn test_neighbors_differing() {
        let mut grid = Grid::new(4, 4, 1.0);
        let c = Coordinate::new(1, 1);
        grid.set_kind(c, TileKind::Tree);
        grid.tile_at(Coordinate::new(1, 2));
        grid.set_kind(Coordinate::new(2, 1), TileKind::Tree);
        let diff = grid.neighbors_differing(c);
        assert!(diff.contains(&Coordinate::new(1, 2)));
        assert!(!diff.contains(&Coordinate::new(2, 1)));
    }

    #[test]
    fn test_sort_by_distance_is_stable() {
        let a = Coordinate::new(1, 0);
        let b = Coordinate::new(0, 1);
        let sorted = Grid::sort_by_distance(vec![a, b, Coordinate::new(2, 0)], Coordinate::new(0, 0));
        assert_eq!(sorted[0], a);
        assert_eq!(sorted[1], b);
        assert_eq!(sorted[2], Coordinate::new(2, 0));
    }
}

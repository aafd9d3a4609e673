//! Tile map with terrain, fog-of-war flags and line of sight
//!
//! Three per-tile flags are tracked alongside terrain:
//! - `explored`: seen at least once on this floor
//! - `visible`: inside the player's current field of view
//! - `visited`: the player has stood on it (drives exploration frontier)

use serde::{Deserialize, Serialize};

use crate::core::types::Position;

/// Terrain of a single tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tile {
    #[default]
    Wall,
    Floor,
    StairsDown,
}

impl Tile {
    pub fn is_walkable(&self) -> bool {
        matches!(self, Tile::Floor | Tile::StairsDown)
    }

    pub fn blocks_sight(&self) -> bool {
        matches!(self, Tile::Wall)
    }

    pub fn glyph(&self) -> char {
        match self {
            Tile::Wall => '#',
            Tile::Floor => '.',
            Tile::StairsDown => '>',
        }
    }
}

/// Rectangular room, used by generators when carving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> Position {
        Position::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Overlap test with a one-tile margin so rooms never share walls
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x <= other.x + other.width
            && self.x + self.width >= other.x
            && self.y <= other.y + other.height
            && self.y + self.height >= other.y
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.x && pos.x < self.x + self.width && pos.y >= self.y && pos.y < self.y + self.height
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (self.y..self.y + self.height)
            .flat_map(move |y| (self.x..self.x + self.width).map(move |x| Position::new(x, y)))
    }
}

/// A single dungeon floor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileMap {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    explored: Vec<bool>,
    visible: Vec<bool>,
    visited: Vec<bool>,
}

impl TileMap {
    /// Create a map filled with one tile type
    pub fn new(width: i32, height: i32, fill: Tile) -> Self {
        let len = (width.max(0) * height.max(0)) as usize;
        Self {
            width,
            height,
            tiles: vec![fill; len],
            explored: vec![false; len],
            visible: vec![false; len],
            visited: vec![false; len],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if self.in_bounds(pos) {
            Some((pos.y * self.width + pos.x) as usize)
        } else {
            None
        }
    }

    pub fn tile(&self, pos: Position) -> Option<Tile> {
        self.index(pos).map(|i| self.tiles[i])
    }

    pub fn set_tile(&mut self, pos: Position, tile: Tile) {
        if let Some(i) = self.index(pos) {
            self.tiles[i] = tile;
        }
    }

    /// Out-of-bounds tiles are never walkable
    pub fn is_walkable(&self, pos: Position) -> bool {
        self.tile(pos).is_some_and(|t| t.is_walkable())
    }

    pub fn blocks_sight(&self, pos: Position) -> bool {
        self.tile(pos).map_or(true, |t| t.blocks_sight())
    }

    pub fn is_explored(&self, pos: Position) -> bool {
        self.index(pos).is_some_and(|i| self.explored[i])
    }

    pub fn is_visible(&self, pos: Position) -> bool {
        self.index(pos).is_some_and(|i| self.visible[i])
    }

    pub fn is_visited(&self, pos: Position) -> bool {
        self.index(pos).is_some_and(|i| self.visited[i])
    }

    pub fn mark_visited(&mut self, pos: Position) {
        if let Some(i) = self.index(pos) {
            self.visited[i] = true;
        }
    }

    /// Replace the visible set; everything visible becomes explored
    pub fn set_visible(&mut self, positions: &[Position]) {
        self.visible.iter_mut().for_each(|v| *v = false);
        for pos in positions {
            if let Some(i) = self.index(*pos) {
                self.visible[i] = true;
                self.explored[i] = true;
            }
        }
    }

    /// Carve a room interior to floor
    pub fn carve_room(&mut self, room: &Rect) {
        let cells: Vec<Position> = room.positions().collect();
        for pos in cells {
            self.set_tile(pos, Tile::Floor);
        }
    }

    pub fn carve_horizontal(&mut self, x1: i32, x2: i32, y: i32) {
        for x in x1.min(x2)..=x1.max(x2) {
            self.set_tile(Position::new(x, y), Tile::Floor);
        }
    }

    pub fn carve_vertical(&mut self, y1: i32, y2: i32, x: i32) {
        for y in y1.min(y2)..=y1.max(y2) {
            self.set_tile(Position::new(x, y), Tile::Floor);
        }
    }

    /// All stairs tiles in row-major order
    pub fn stairs(&self) -> Vec<Position> {
        self.positions()
            .filter(|p| self.tile(*p) == Some(Tile::StairsDown))
            .collect()
    }

    /// Every position on the map in row-major order
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Position::new(x, y)))
    }

    pub fn count_visited(&self) -> usize {
        self.visited.iter().filter(|v| **v).count()
    }

    pub fn count_explored(&self) -> usize {
        self.explored.iter().filter(|v| **v).count()
    }

    /// Bresenham line of sight; the endpoints themselves never block
    pub fn has_line_of_sight(&self, from: Position, to: Position) -> bool {
        let mut x = from.x;
        let mut y = from.y;
        let dx = (to.x - from.x).abs();
        let dy = -(to.y - from.y).abs();
        let sx = if from.x < to.x { 1 } else { -1 };
        let sy = if from.y < to.y { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            if x == to.x && y == to.y {
                return true;
            }
            let here = Position::new(x, y);
            if here != from && self.blocks_sight(here) {
                return false;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

//! Field of view
//!
//! A tile is visible when it lies within the radius (Chebyshev) and the
//! Bresenham line from the viewer reaches it without crossing a wall.

use crate::core::types::Position;
use crate::world::map::TileMap;

/// All tiles visible from `origin`, in row-major order
pub fn field_of_view(map: &TileMap, origin: Position, radius: i32) -> Vec<Position> {
    let mut visible = Vec::new();
    for y in (origin.y - radius)..=(origin.y + radius) {
        for x in (origin.x - radius)..=(origin.x + radius) {
            let pos = Position::new(x, y);
            if map.in_bounds(pos) && map.has_line_of_sight(origin, pos) {
                visible.push(pos);
            }
        }
    }
    visible
}

/// Range plus line-of-sight check used for monster perception
pub fn can_see(map: &TileMap, from: Position, to: Position, radius: u32) -> bool {
    from.distance(&to) <= radius && map.has_line_of_sight(from, to)
}

//! A* pathfinding on the tile grid
//!
//! 8-connected, unit step cost, Chebyshev heuristic. Ties are broken by
//! position so the same query always yields the same path.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::AHashMap;

use crate::core::types::Position;
use crate::world::map::TileMap;

/// Node in the A* open set
#[derive(Debug, Clone, Copy)]
struct PathNode {
    pos: Position,
    f_cost: u32, // g_cost + heuristic
    g_cost: u32,
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; deeper nodes first on equal f
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| self.g_cost.cmp(&other.g_cost))
            .then_with(|| other.pos.cmp(&self.pos))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a path using A*
///
/// `passable` decides intermediate tiles; the goal only has to be inside the
/// map, so a path can end on an occupied tile (an attack target). Gives up
/// after expanding `max_nodes` nodes. Returns the full path including start.
pub fn find_path(
    map: &TileMap,
    start: Position,
    goal: Position,
    max_nodes: usize,
    passable: impl Fn(Position) -> bool,
) -> Option<Vec<Position>> {
    if start == goal {
        return Some(vec![start]);
    }
    if !map.in_bounds(goal) {
        return None;
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: AHashMap<Position, Position> = AHashMap::new();
    let mut g_scores: AHashMap<Position, u32> = AHashMap::new();
    let mut expanded = 0usize;

    g_scores.insert(start, 0);
    open_set.push(PathNode {
        pos: start,
        f_cost: start.distance(&goal),
        g_cost: 0,
    });

    while let Some(current) = open_set.pop() {
        if current.pos == goal {
            return Some(reconstruct_path(&came_from, current.pos));
        }

        let current_g = *g_scores.get(&current.pos).unwrap_or(&u32::MAX);
        if current.g_cost > current_g {
            continue; // stale entry
        }

        expanded += 1;
        if expanded > max_nodes {
            return None;
        }

        for neighbor in current.pos.neighbors() {
            if neighbor != goal && !passable(neighbor) {
                continue;
            }
            if !map.in_bounds(neighbor) {
                continue;
            }

            let tentative_g = current_g + 1;
            let neighbor_g = *g_scores.get(&neighbor).unwrap_or(&u32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.pos);
                g_scores.insert(neighbor, tentative_g);
                open_set.push(PathNode {
                    pos: neighbor,
                    f_cost: tentative_g + neighbor.distance(&goal),
                    g_cost: tentative_g,
                });
            }
        }
    }

    None // No path found
}

/// Reconstruct path from came_from map
fn reconstruct_path(came_from: &AHashMap<Position, Position>, mut current: Position) -> Vec<Position> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::map::{Rect, Tile};

    fn open(width: i32, height: i32) -> TileMap {
        let mut map = TileMap::new(width + 2, height + 2, Tile::Wall);
        map.carve_room(&Rect::new(1, 1, width, height));
        map
    }

    #[test]
    fn test_straight_path() {
        let map = open(5, 1);
        let path = find_path(&map, Position::new(1, 1), Position::new(5, 1), 100, |p| {
            map.is_walkable(p)
        })
        .expect("path exists");
        assert_eq!(path.len(), 5);
        assert_eq!(path[0], Position::new(1, 1));
        assert_eq!(path[4], Position::new(5, 1));
    }

    #[test]
    fn test_diagonal_costs_one() {
        let map = open(4, 4);
        let path = find_path(&map, Position::new(1, 1), Position::new(4, 4), 100, |p| {
            map.is_walkable(p)
        })
        .unwrap();
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn test_routes_around_wall() {
        let mut map = open(5, 3);
        map.set_tile(Position::new(3, 1), Tile::Wall);
        map.set_tile(Position::new(3, 2), Tile::Wall);
        let path = find_path(&map, Position::new(1, 1), Position::new(5, 1), 100, |p| {
            map.is_walkable(p)
        })
        .unwrap();
        assert!(path.contains(&Position::new(3, 3)));
    }

    #[test]
    fn test_no_path_when_sealed() {
        let mut map = open(5, 1);
        map.set_tile(Position::new(3, 1), Tile::Wall);
        let path = find_path(&map, Position::new(1, 1), Position::new(5, 1), 100, |p| {
            map.is_walkable(p)
        });
        assert!(path.is_none());
    }

    #[test]
    fn test_goal_may_be_blocked() {
        let map = open(3, 1);
        let goal = Position::new(3, 1);
        let path = find_path(&map, Position::new(1, 1), goal, 100, |p| map.is_walkable(p) && p != goal);
        assert_eq!(path.map(|p| p.len()), Some(3));
    }

    #[test]
    fn test_node_budget() {
        let map = open(30, 30);
        let path = find_path(&map, Position::new(1, 1), Position::new(30, 30), 3, |p| {
            map.is_walkable(p)
        });
        assert!(path.is_none());
    }

    #[test]
    fn test_same_query_same_path() {
        let map = open(8, 8);
        let run = || {
            find_path(&map, Position::new(1, 4), Position::new(8, 2), 500, |p| map.is_walkable(p))
        };
        assert_eq!(run(), run());
    }
}

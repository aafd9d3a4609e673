//! Core type definitions used throughout the codebase

use std::fmt;

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// The single RNG type threaded through a run.
///
/// Every random draw in the simulation goes through one of these, seeded at
/// the start of the owning run. Nothing in the crate touches a thread RNG.
pub type SimRng = ChaCha8Rng;

/// Game tick counter (simulation time unit)
pub type Tick = u64;

/// Unique identifier for actors
///
/// Allocated monotonically by the world and never reused within a run, so a
/// dead actor's id can safely stay in "known" sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// Unique identifier for items (on the floor or in an inventory)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// Unique identifier for traps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrapId(pub u32);

impl fmt::Display for TrapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trap#{}", self.0)
    }
}

/// Grid position on a dungeon floor
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// The eight step offsets, in the fixed order every search uses.
///
/// Order matters for determinism: ties in BFS/A* are broken by this order.
pub const DIRECTIONS: [(i32, i32); 8] = [
    (0, -1),  // N
    (1, -1),  // NE
    (1, 0),   // E
    (1, 1),   // SE
    (0, 1),   // S
    (-1, 1),  // SW
    (-1, 0),  // W
    (-1, -1), // NW
];

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Chebyshev distance (diagonal steps cost the same as orthogonal ones)
    pub fn distance(&self, other: &Self) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx.max(dy)
    }

    /// True for the eight surrounding tiles (not for the tile itself)
    pub fn is_adjacent(&self, other: &Self) -> bool {
        self.distance(other) == 1
    }

    /// All eight neighbours in [`DIRECTIONS`] order
    pub fn neighbors(&self) -> [Position; 8] {
        DIRECTIONS.map(|(dx, dy)| self.offset(dx, dy))
    }

    /// Unit step (each component in -1..=1) from self toward other
    pub fn step_toward(&self, other: &Self) -> (i32, i32) {
        ((other.x - self.x).signum(), (other.y - self.y).signum())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Allegiance of an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Player,
    Monster,
    Neutral,
}

impl Faction {
    /// Players and monsters fight each other; neutrals fight nobody
    pub fn is_hostile_to(&self, other: &Faction) -> bool {
        matches!(
            (self, other),
            (Faction::Player, Faction::Monster) | (Faction::Monster, Faction::Player)
        )
    }
}

/// Splitmix64 finaliser, used to derive independent seeds from a base seed
pub fn mix_seed(value: u64) -> u64 {
    let mut z = value.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chebyshev_distance() {
        let a = Position::new(0, 0);
        assert_eq!(a.distance(&Position::new(3, 1)), 3);
        assert_eq!(a.distance(&Position::new(-2, -2)), 2);
        assert_eq!(a.distance(&a), 0);
    }

    #[test]
    fn test_adjacency_excludes_self() {
        let a = Position::new(5, 5);
        assert!(a.is_adjacent(&Position::new(6, 6)));
        assert!(!a.is_adjacent(&a));
        assert!(!a.is_adjacent(&Position::new(7, 5)));
    }

    #[test]
    fn test_neighbors_follow_direction_order() {
        let n = Position::new(0, 0).neighbors();
        assert_eq!(n[0], Position::new(0, -1));
        assert_eq!(n[2], Position::new(1, 0));
        assert_eq!(n[7], Position::new(-1, -1));
    }

    #[test]
    fn test_faction_hostility() {
        assert!(Faction::Player.is_hostile_to(&Faction::Monster));
        assert!(Faction::Monster.is_hostile_to(&Faction::Player));
        assert!(!Faction::Monster.is_hostile_to(&Faction::Monster));
        assert!(!Faction::Neutral.is_hostile_to(&Faction::Player));
    }

    #[test]
    fn test_mix_seed_spreads_neighbours() {
        assert_ne!(mix_seed(1), mix_seed(2));
        assert_eq!(mix_seed(42), mix_seed(42));
    }
}

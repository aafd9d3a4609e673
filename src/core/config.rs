//! Simulation configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};

/// Configuration for the simulation systems
///
/// Passed by reference into every run; there is no global copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === VISIBILITY ===
    /// Radius (Chebyshev) of the player's field of view
    ///
    /// Larger radii reveal rooms in one glance, which makes the exploration
    /// planner stop less often for new discoveries.
    pub fov_radius: i32,

    /// How far monsters notice the player (needs line of sight as well)
    pub monster_sight_radius: u32,

    // === EXPLORATION ===
    /// Upper bound on BFS depth for frontier search
    ///
    /// Bounds worst-case cost on large maps. A frontier tile further away than
    /// this counts as unreachable and the floor reports exhaustion.
    pub max_search_distance: u32,

    /// Length of the recent-positions ring used for oscillation detection
    ///
    /// Six positions hold exactly three A<->B alternations.
    pub oscillation_window: usize,

    // === HARNESS ===
    /// Consecutive idle ticks before a run is declared stalled
    ///
    /// A tick is idle when the policy only waited, or when the chosen action
    /// did not end the turn. This is the final livelock backstop.
    pub max_idle_ticks: u32,

    // === INVENTORY ===
    /// Maximum number of items an actor can carry
    pub inventory_capacity: usize,

    /// Hit points restored by one healing potion
    pub potion_heal: i32,

    /// Healing potions the player starts each run with
    pub starting_potions: u32,

    // === PLAYER ===
    pub player_max_hp: i32,
    pub player_attack: i32,
    pub player_defense: i32,

    // === DUNGEON FIXTURE ===
    /// Floor width in tiles
    pub map_width: i32,
    /// Floor height in tiles
    pub map_height: i32,
    /// Room placement attempts per floor
    pub max_rooms: u32,
    pub room_min_size: i32,
    pub room_max_size: i32,
    /// Upper bound of monsters placed in each room after the first
    pub max_monsters_per_room: u32,
    /// Upper bound of floor items placed in each room
    pub max_items_per_room: u32,
    /// Traps placed per floor
    pub traps_per_floor: u32,

    // === TRAPS ===
    /// Fraction of traps that start hidden
    pub hidden_trap_fraction: f32,
    /// Damage dealt when a trap triggers
    pub trap_damage: i32,
    /// Chance that a Search reveals each adjacent hidden trap
    pub search_reveal_chance: f32,
    /// Chance that a Disarm succeeds (failure triggers the trap)
    pub disarm_chance: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fov_radius: 8,
            monster_sight_radius: 7,

            max_search_distance: 120,
            oscillation_window: 6,

            max_idle_ticks: 50,

            inventory_capacity: 12,
            potion_heal: 30,
            starting_potions: 3,

            player_max_hp: 100,
            player_attack: 8,
            player_defense: 2,

            map_width: 56,
            map_height: 28,
            max_rooms: 9,
            room_min_size: 4,
            room_max_size: 9,
            max_monsters_per_room: 2,
            max_items_per_room: 1,
            traps_per_floor: 3,

            hidden_trap_fraction: 0.6,
            trap_damage: 4,
            search_reveal_chance: 0.5,
            disarm_chance: 0.7,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys fall back to defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.fov_radius <= 0 {
            return Err(SimError::Config(format!(
                "fov_radius must be positive (got {})",
                self.fov_radius
            )));
        }

        // Fewer than six entries cannot hold three alternations
        if self.oscillation_window < 6 {
            return Err(SimError::Config(format!(
                "oscillation_window ({}) must be at least 6",
                self.oscillation_window
            )));
        }

        if self.max_idle_ticks == 0 {
            return Err(SimError::Config("max_idle_ticks must be positive".into()));
        }

        if self.room_min_size > self.room_max_size {
            return Err(SimError::Config(format!(
                "room_min_size ({}) should be <= room_max_size ({})",
                self.room_min_size, self.room_max_size
            )));
        }

        if self.map_width < self.room_max_size + 2 || self.map_height < self.room_max_size + 2 {
            return Err(SimError::Config(format!(
                "map {}x{} too small for rooms up to {}",
                self.map_width, self.map_height, self.room_max_size
            )));
        }

        for (name, chance) in [
            ("hidden_trap_fraction", self.hidden_trap_fraction),
            ("search_reveal_chance", self.search_reveal_chance),
            ("disarm_chance", self.disarm_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(SimError::Config(format!(
                    "{} must be within 0.0..=1.0 (got {})",
                    name, chance
                )));
            }
        }

        if self.player_max_hp <= 0 {
            return Err(SimError::Config("player_max_hp must be positive".into()));
        }

        Ok(())
    }
}

//! Floor generation seam
//!
//! Dungeon generation is an external collaborator: anything implementing
//! [`WorldFactory`] can supply floors. Two fixtures ship with the crate, a
//! rooms-and-corridors layout for soak runs and a single open room for
//! scenario tests.

use rand::{Rng, SeedableRng};

use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{mix_seed, Position, SimRng};
use crate::world::actor::MonsterKind;
use crate::world::items::ItemKind;
use crate::world::map::{Rect, Tile, TileMap};
use crate::world::World;

/// Everything needed to populate one floor
#[derive(Debug, Clone)]
pub struct FloorPlan {
    pub map: TileMap,
    /// Where the player arrives
    pub entry: Position,
    pub monsters: Vec<(MonsterKind, Position)>,
    pub items: Vec<(ItemKind, Position)>,
    /// Trap positions and whether each starts hidden
    pub traps: Vec<(Position, bool)>,
}

pub trait WorldFactory {
    fn name(&self) -> &str;

    /// Produce a floor for the given depth (1-based)
    fn generate(&self, config: &SimulationConfig, depth: u32, rng: &mut SimRng) -> Result<FloorPlan>;
}

/// RNG dedicated to generating one floor of one run
///
/// Kept separate from the run's turn RNG so floor layout does not depend on
/// how many draws the turns before it consumed.
pub fn floor_rng(run_seed: u64, depth: u32) -> SimRng {
    SimRng::seed_from_u64(mix_seed(run_seed ^ mix_seed(depth as u64)))
}

/// Build the depth-1 world for a run
pub fn build_world(factory: &dyn WorldFactory, config: &SimulationConfig, run_seed: u64) -> Result<World> {
    let mut rng = floor_rng(run_seed, 1);
    let plan = factory.generate(config, 1, &mut rng)?;
    World::from_plan(plan, config)
}

/// Classic rooms joined by L-shaped corridors
#[derive(Debug, Clone, Copy, Default)]
pub struct RoomsAndCorridors;

impl RoomsAndCorridors {
    fn carve_rooms(config: &SimulationConfig, rng: &mut SimRng) -> (TileMap, Vec<Rect>) {
        let mut map = TileMap::new(config.map_width, config.map_height, Tile::Wall);
        let mut rooms: Vec<Rect> = Vec::new();

        for _ in 0..config.max_rooms {
            let w = rng.gen_range(config.room_min_size..=config.room_max_size);
            let h = rng.gen_range(config.room_min_size..=config.room_max_size);
            let max_x = config.map_width - w - 1;
            let max_y = config.map_height - h - 1;
            if max_x < 1 || max_y < 1 {
                continue;
            }
            let room = Rect::new(rng.gen_range(1..=max_x), rng.gen_range(1..=max_y), w, h);
            if rooms.iter().any(|r| r.intersects(&room)) {
                continue;
            }

            map.carve_room(&room);
            if let Some(prev) = rooms.last() {
                let (a, b) = (prev.center(), room.center());
                if rng.gen_bool(0.5) {
                    map.carve_horizontal(a.x, b.x, a.y);
                    map.carve_vertical(a.y, b.y, b.x);
                } else {
                    map.carve_vertical(a.y, b.y, a.x);
                    map.carve_horizontal(a.x, b.x, b.y);
                }
            }
            rooms.push(room);
        }

        (map, rooms)
    }

    fn pick_monster(depth: u32, rng: &mut SimRng) -> MonsterKind {
        let eligible: Vec<MonsterKind> = MonsterKind::ALL
            .iter()
            .copied()
            .filter(|k| k.min_depth() <= depth)
            .collect();
        eligible[rng.gen_range(0..eligible.len())]
    }
}

/// Random free tile inside a room; gives up after a few tries
fn free_tile_in(room: &Rect, taken: &[Position], rng: &mut SimRng) -> Option<Position> {
    for _ in 0..10 {
        let pos = Position::new(
            rng.gen_range(room.x..room.x + room.width),
            rng.gen_range(room.y..room.y + room.height),
        );
        if !taken.contains(&pos) {
            return Some(pos);
        }
    }
    None
}

impl WorldFactory for RoomsAndCorridors {
    fn name(&self) -> &str {
        "rooms_and_corridors"
    }

    fn generate(&self, config: &SimulationConfig, depth: u32, rng: &mut SimRng) -> Result<FloorPlan> {
        let (mut map, rooms) = Self::carve_rooms(config, rng);
        let (first, last) = match (rooms.first(), rooms.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(SimError::WorldConstruction(format!(
                    "no room fits on a {}x{} floor",
                    config.map_width, config.map_height
                )))
            }
        };

        let entry = first.center();
        let stairs = if rooms.len() > 1 {
            last.center()
        } else {
            Position::new(last.x + last.width - 1, last.y + last.height - 1)
        };
        map.set_tile(stairs, Tile::StairsDown);

        let mut taken = vec![entry, stairs];
        let mut monsters = Vec::new();
        let mut items = Vec::new();
        let mut traps = Vec::new();

        // The first room stays quiet so a run never opens in melee
        let extra = depth.saturating_sub(1) / 2;
        for room in rooms.iter().skip(1) {
            let count = rng.gen_range(0..=config.max_monsters_per_room) + extra;
            for _ in 0..count {
                let kind = Self::pick_monster(depth, rng);
                if let Some(pos) = free_tile_in(room, &taken, rng) {
                    taken.push(pos);
                    monsters.push((kind, pos));
                }
            }
        }

        for room in &rooms {
            for _ in 0..rng.gen_range(0..=config.max_items_per_room) {
                let kind = if rng.gen_bool(0.7) {
                    ItemKind::HealingPotion
                } else {
                    ItemKind::Gold {
                        amount: rng.gen_range(5..=25) * depth,
                    }
                };
                if let Some(pos) = free_tile_in(room, &taken, rng) {
                    taken.push(pos);
                    items.push((kind, pos));
                }
            }
        }

        if rooms.len() > 1 {
            for _ in 0..config.traps_per_floor {
                let room = rooms[rng.gen_range(1..rooms.len())];
                if let Some(pos) = free_tile_in(&room, &taken, rng) {
                    taken.push(pos);
                    traps.push((pos, rng.gen::<f32>() < config.hidden_trap_fraction));
                }
            }
        }

        Ok(FloorPlan {
            map,
            entry,
            monsters,
            items,
            traps,
        })
    }
}

/// A single walled room with hand-placed contents
///
/// Interior tiles run from (1, 1) to (width, height). The entry defaults to
/// the room centre.
#[derive(Debug, Clone, Default)]
pub struct OpenRoom {
    pub width: i32,
    pub height: i32,
    pub entry: Option<Position>,
    pub stairs: Vec<Position>,
    pub monsters: Vec<(MonsterKind, Position)>,
    pub items: Vec<(ItemKind, Position)>,
    pub traps: Vec<(Position, bool)>,
}

impl OpenRoom {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_entry(mut self, pos: Position) -> Self {
        self.entry = Some(pos);
        self
    }

    pub fn with_stairs(mut self, pos: Position) -> Self {
        self.stairs.push(pos);
        self
    }

    pub fn with_monster(mut self, kind: MonsterKind, pos: Position) -> Self {
        self.monsters.push((kind, pos));
        self
    }

    pub fn with_item(mut self, kind: ItemKind, pos: Position) -> Self {
        self.items.push((kind, pos));
        self
    }

    pub fn with_trap(mut self, pos: Position, hidden: bool) -> Self {
        self.traps.push((pos, hidden));
        self
    }

    pub fn center(&self) -> Position {
        Position::new(1 + self.width / 2, 1 + self.height / 2)
    }
}

impl WorldFactory for OpenRoom {
    fn name(&self) -> &str {
        "open_room"
    }

    fn generate(&self, _config: &SimulationConfig, _depth: u32, _rng: &mut SimRng) -> Result<FloorPlan> {
        if self.width < 1 || self.height < 1 {
            return Err(SimError::WorldConstruction(format!(
                "open room must be at least 1x1 (got {}x{})",
                self.width, self.height
            )));
        }

        let mut map = TileMap::new(self.width + 2, self.height + 2, Tile::Wall);
        map.carve_room(&Rect::new(1, 1, self.width, self.height));
        for pos in &self.stairs {
            map.set_tile(*pos, Tile::StairsDown);
        }

        Ok(FloorPlan {
            map,
            entry: self.entry.unwrap_or_else(|| self.center()),
            monsters: self.monsters.clone(),
            items: self.items.clone(),
            traps: self.traps.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rooms_generation_is_deterministic() {
        let config = SimulationConfig::default();
        let a = RoomsAndCorridors.generate(&config, 1, &mut floor_rng(99, 1)).unwrap();
        let b = RoomsAndCorridors.generate(&config, 1, &mut floor_rng(99, 1)).unwrap();
        assert_eq!(a.entry, b.entry);
        assert_eq!(a.monsters, b.monsters);
        assert_eq!(a.items, b.items);
    }

    #[test]
    fn test_rooms_have_stairs_and_walkable_entry() {
        let config = SimulationConfig::default();
        for seed in 0..20 {
            let plan = RoomsAndCorridors
                .generate(&config, 1, &mut floor_rng(seed, 1))
                .unwrap();
            assert!(plan.map.is_walkable(plan.entry));
            assert_eq!(plan.map.stairs().len(), 1);
            for (_, pos) in &plan.monsters {
                assert!(plan.map.is_walkable(*pos));
            }
        }
    }

    #[test]
    fn test_shallow_floors_only_spawn_shallow_monsters() {
        let config = SimulationConfig::default();
        for seed in 0..10 {
            let plan = RoomsAndCorridors
                .generate(&config, 1, &mut floor_rng(seed, 1))
                .unwrap();
            assert!(plan.monsters.iter().all(|(k, _)| k.min_depth() == 1));
        }
    }

    #[test]
    fn test_open_room_defaults_entry_to_center() {
        let plan = OpenRoom::new(3, 3)
            .generate(&SimulationConfig::default(), 1, &mut floor_rng(0, 1))
            .unwrap();
        assert_eq!(plan.entry, Position::new(2, 2));
        assert_eq!(plan.map.width(), 5);
    }

    #[test]
    fn test_open_room_rejects_empty() {
        let result = OpenRoom::new(0, 3).generate(&SimulationConfig::default(), 1, &mut floor_rng(0, 1));
        assert!(result.is_err());
    }

    #[test]
    fn test_floor_rng_differs_per_depth() {
        let mut a = floor_rng(5, 1);
        let mut b = floor_rng(5, 2);
        assert_ne!(a.gen::<u64>(), b.gen::<u64>());
    }
}

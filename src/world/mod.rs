//! World state for one run: the current floor, its actors, items and traps

pub mod actor;
pub mod generation;
pub mod items;
pub mod map;
pub mod visibility;

pub use actor::{Actor, ActorKind, Behavior, MonsterKind};
pub use generation::{build_world, floor_rng, FloorPlan, OpenRoom, RoomsAndCorridors, WorldFactory};
pub use items::{FloorItem, Inventory, Item, ItemKind};
pub use map::{Rect, Tile, TileMap};

use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{ActorId, Faction, ItemId, Position, Tick, TrapId};
use crate::explore::ExplorationState;

/// Top-level game mode; anything but `Playing` forbids secondary actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    Playing,
    Victory,
    Defeat,
    Menu,
}

impl GameMode {
    pub fn is_terminal(&self) -> bool {
        match self {
            GameMode::Playing => false,
            GameMode::Victory | GameMode::Defeat | GameMode::Menu => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trap {
    pub id: TrapId,
    pub pos: Position,
    pub detected: bool,
    pub armed: bool,
}

#[derive(Debug, Clone)]
pub struct World {
    pub map: TileMap,
    /// Turn order for the secondary phase is list order
    pub actors: Vec<Actor>,
    pub items: Vec<FloorItem>,
    pub traps: Vec<Trap>,
    /// Current floor, starting at 1
    pub depth: u32,
    /// Completed turns (ticks whose primary action ended the turn)
    pub turn: Tick,
    pub mode: GameMode,
    /// Set by a resolved `Descend`; consumed by whoever owns the run loop
    pub pending_descent: bool,
    player: ActorId,
    fov_radius: i32,
    monster_sight_radius: u32,
    next_actor_id: u32,
    next_item_id: u32,
    next_trap_id: u32,
}

impl World {
    /// Build a depth-1 world from a floor plan, spawning the player at the entry
    pub fn from_plan(plan: FloorPlan, config: &SimulationConfig) -> Result<Self> {
        if !plan.map.is_walkable(plan.entry) {
            return Err(SimError::WorldConstruction(format!(
                "entry {} is not walkable",
                plan.entry
            )));
        }

        let mut world = Self {
            map: TileMap::new(0, 0, Tile::Wall),
            actors: Vec::new(),
            items: Vec::new(),
            traps: Vec::new(),
            depth: 1,
            turn: 0,
            mode: GameMode::Playing,
            pending_descent: false,
            player: ActorId(0),
            fov_radius: config.fov_radius,
            monster_sight_radius: config.monster_sight_radius,
            next_actor_id: 1,
            next_item_id: 1,
            next_trap_id: 1,
        };

        let player_id = world.allocate_actor_id();
        let mut player = Actor::player(
            player_id,
            plan.entry,
            config.player_max_hp,
            config.player_attack,
            config.player_defense,
            config.inventory_capacity,
        );
        for _ in 0..config.starting_potions {
            let potion = world.new_item(ItemKind::HealingPotion);
            if player.inventory.add(potion).is_err() {
                break;
            }
        }
        world.player = player_id;
        world.actors.push(player);
        world.populate(plan)?;
        Ok(world)
    }

    /// Replace the floor with the next one, carrying the player over
    pub fn descend(&mut self, plan: FloorPlan) -> Result<()> {
        if !plan.map.is_walkable(plan.entry) {
            return Err(SimError::WorldConstruction(format!(
                "entry {} is not walkable",
                plan.entry
            )));
        }

        let player_id = self.player;
        self.actors.retain(|a| a.id == player_id);
        self.items.clear();
        self.traps.clear();
        self.depth += 1;
        self.pending_descent = false;
        if let Some(player) = self.actor_mut(player_id) {
            player.pos = plan.entry;
            player.exploration = None;
            player.last_stop = None;
        }
        self.populate(plan)
    }

    fn populate(&mut self, plan: FloorPlan) -> Result<()> {
        let FloorPlan {
            map,
            entry,
            monsters,
            items,
            traps,
        } = plan;
        self.map = map;

        for (kind, pos) in monsters {
            if !self.map.is_walkable(pos) || pos == entry {
                return Err(SimError::WorldConstruction(format!(
                    "cannot place {} at {}",
                    kind.stats().name,
                    pos
                )));
            }
            self.spawn_monster(kind, pos);
        }
        for (kind, pos) in items {
            self.place_item(kind, pos);
        }
        for (pos, hidden) in traps {
            self.place_trap(pos, hidden);
        }

        self.map.mark_visited(entry);
        self.refresh_visibility();
        Ok(())
    }

    fn allocate_actor_id(&mut self) -> ActorId {
        let id = ActorId(self.next_actor_id);
        self.next_actor_id += 1;
        id
    }

    pub fn spawn_monster(&mut self, kind: MonsterKind, pos: Position) -> ActorId {
        let id = self.allocate_actor_id();
        self.actors.push(Actor::monster(id, kind, pos));
        id
    }

    /// Mint an item with a fresh id (not placed anywhere)
    pub fn new_item(&mut self, kind: ItemKind) -> Item {
        let id = ItemId(self.next_item_id);
        self.next_item_id += 1;
        Item { id, kind }
    }

    pub fn place_item(&mut self, kind: ItemKind, pos: Position) -> ItemId {
        let item = self.new_item(kind);
        self.items.push(FloorItem { item, pos });
        item.id
    }

    pub fn place_trap(&mut self, pos: Position, hidden: bool) -> TrapId {
        let id = TrapId(self.next_trap_id);
        self.next_trap_id += 1;
        self.traps.push(Trap {
            id,
            pos,
            detected: !hidden,
            armed: true,
        });
        id
    }

    pub fn player_id(&self) -> ActorId {
        self.player
    }

    pub fn player(&self) -> Option<&Actor> {
        self.actor(self.player)
    }

    pub fn player_mut(&mut self) -> Option<&mut Actor> {
        let id = self.player;
        self.actor_mut(id)
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.iter().find(|a| a.id == id)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.iter_mut().find(|a| a.id == id)
    }

    pub fn actor_name(&self, id: ActorId) -> String {
        self.actor(id)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Living actor standing on a tile
    pub fn actor_at(&self, pos: Position) -> Option<&Actor> {
        self.actors.iter().find(|a| a.pos == pos && a.is_alive())
    }

    /// Walkable and not occupied by a living actor
    pub fn is_passable(&self, pos: Position) -> bool {
        self.map.is_walkable(pos) && self.actor_at(pos).is_none()
    }

    /// Snapshot of every non-player entry in the actor list, in list order
    pub fn secondary_actor_ids(&self) -> Vec<ActorId> {
        self.actors
            .iter()
            .filter(|a| a.id != self.player)
            .map(|a| a.id)
            .collect()
    }

    /// Living hostiles the given actor can currently see
    ///
    /// The player sees through the map's visible flags; monsters use range
    /// plus line of sight.
    pub fn visible_hostiles(&self, id: ActorId) -> Vec<&Actor> {
        let Some(observer) = self.actor(id) else {
            return Vec::new();
        };
        self.actors
            .iter()
            .filter(|a| a.is_alive() && a.id != id && observer.is_hostile_to(a))
            .filter(|a| self.can_perceive(observer, a.pos))
            .collect()
    }

    fn can_perceive(&self, observer: &Actor, pos: Position) -> bool {
        if observer.id == self.player {
            self.map.is_visible(pos)
        } else {
            visibility::can_see(&self.map, observer.pos, pos, self.monster_sight_radius)
        }
    }

    pub fn adjacent_hostile_count(&self, id: ActorId) -> usize {
        let Some(actor) = self.actor(id) else {
            return 0;
        };
        self.actors
            .iter()
            .filter(|a| a.is_alive() && actor.is_hostile_to(a) && a.pos.is_adjacent(&actor.pos))
            .count()
    }

    /// Whether a living member of the faction stands next to the position
    pub fn faction_adjacent(&self, pos: Position, faction: Faction) -> bool {
        self.actors
            .iter()
            .any(|a| a.is_alive() && a.faction == faction && a.pos.is_adjacent(&pos))
    }

    pub fn visible_items(&self) -> Vec<&FloorItem> {
        self.items.iter().filter(|i| self.map.is_visible(i.pos)).collect()
    }

    pub fn visible_stairs(&self) -> Vec<Position> {
        self.map
            .stairs()
            .into_iter()
            .filter(|p| self.map.is_visible(*p))
            .collect()
    }

    /// Stairs the player has seen at some point on this floor
    pub fn explored_stairs(&self) -> Vec<Position> {
        self.map
            .stairs()
            .into_iter()
            .filter(|p| self.map.is_explored(*p))
            .collect()
    }

    pub fn trap_at(&self, pos: Position) -> Option<&Trap> {
        self.traps.iter().find(|t| t.pos == pos && t.armed)
    }

    pub fn trap(&self, id: TrapId) -> Option<&Trap> {
        self.traps.iter().find(|t| t.id == id)
    }

    pub fn trap_mut(&mut self, id: TrapId) -> Option<&mut Trap> {
        self.traps.iter_mut().find(|t| t.id == id)
    }

    /// Armed traps the player knows about; pathing treats these as walls
    pub fn is_known_trap(&self, pos: Position) -> bool {
        self.trap_at(pos).is_some_and(|t| t.detected)
    }

    /// Recompute the player's field of view
    pub fn refresh_visibility(&mut self) {
        let Some(origin) = self.player().map(|p| p.pos) else {
            return;
        };
        let visible = visibility::field_of_view(&self.map, origin, self.fov_radius);
        self.map.set_visible(&visible);
    }

    /// Replace the actor's exploration state with a fresh one that already
    /// knows what is in view. Returns false for an unknown actor.
    pub fn begin_exploration(&mut self, id: ActorId, window: usize) -> bool {
        let monsters: Vec<ActorId> = self.visible_hostiles(id).iter().map(|a| a.id).collect();
        let items: Vec<ItemId> = self.visible_items().iter().map(|i| i.item.id).collect();
        let stairs = self.visible_stairs();

        let Some(actor) = self.actor_mut(id) else {
            return false;
        };
        actor.exploration = Some(ExplorationState::seeded(window, monsters, items, stairs));
        actor.last_stop = None;
        true
    }

    /// Drop dead monsters; the player stays so outcomes can be read
    pub fn reap_dead(&mut self) {
        let player = self.player;
        self.actors.retain(|a| a.is_alive() || a.id == player);
    }

    pub fn living_monsters(&self) -> usize {
        self.actors
            .iter()
            .filter(|a| a.is_alive() && a.faction == Faction::Monster)
            .count()
    }

    /// ASCII rendering of what the player knows about the floor
    pub fn render(&self) -> String {
        let mut out = String::new();
        for y in 0..self.map.height() {
            for x in 0..self.map.width() {
                let pos = Position::new(x, y);
                let glyph = if !self.map.is_explored(pos) {
                    ' '
                } else if let Some(actor) = self.actor_at(pos).filter(|_| self.map.is_visible(pos)) {
                    if actor.is_player() {
                        '@'
                    } else {
                        actor.name.chars().next().unwrap_or('m')
                    }
                } else if self.map.is_visible(pos) && self.items.iter().any(|i| i.pos == pos) {
                    '!'
                } else if self.is_known_trap(pos) {
                    '^'
                } else {
                    self.map.tile(pos).map_or(' ', |t| t.glyph())
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}

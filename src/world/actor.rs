//! Actors and the monster table

use serde::{Deserialize, Serialize};

use crate::core::types::{ActorId, Faction, Position};
use crate::explore::{ExplorationState, StopReason};
use crate::turn::status::{Condition, EffectKind, RefreshPolicy, StatusEffect, StatusEffectLedger};
use crate::world::items::Inventory;

/// How a monster spends turns when it cannot see the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Behavior {
    /// Wanders about, half the time standing still
    Hunter,
    /// Always takes a random step
    Wanderer,
    /// Stays put until the player shows up
    Ambusher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonsterKind {
    Rat,
    Goblin,
    Spider,
    Slime,
    Ghoul,
    Shaman,
}

/// An effect a monster's hit may inflict
#[derive(Debug, Clone, Copy)]
pub struct OnHit {
    pub effect: StatusEffect,
    /// Chance in percent
    pub chance: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct MonsterStats {
    pub name: &'static str,
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub behavior: Behavior,
    pub on_hit: Option<OnHit>,
}

impl MonsterKind {
    pub const ALL: [MonsterKind; 6] = [
        MonsterKind::Rat,
        MonsterKind::Goblin,
        MonsterKind::Spider,
        MonsterKind::Slime,
        MonsterKind::Ghoul,
        MonsterKind::Shaman,
    ];

    pub fn stats(&self) -> MonsterStats {
        match self {
            MonsterKind::Rat => MonsterStats {
                name: "rat",
                hp: 6,
                attack: 3,
                defense: 0,
                behavior: Behavior::Wanderer,
                on_hit: None,
            },
            MonsterKind::Goblin => MonsterStats {
                name: "goblin",
                hp: 12,
                attack: 5,
                defense: 1,
                behavior: Behavior::Hunter,
                on_hit: None,
            },
            MonsterKind::Spider => MonsterStats {
                name: "spider",
                hp: 10,
                attack: 4,
                defense: 1,
                behavior: Behavior::Ambusher,
                on_hit: Some(OnHit {
                    effect: StatusEffect::decaying(EffectKind::Poisoned { per_tick: 1 }, 4),
                    chance: 40,
                }),
            },
            MonsterKind::Slime => MonsterStats {
                name: "slime",
                hp: 16,
                attack: 3,
                defense: 2,
                behavior: Behavior::Wanderer,
                on_hit: Some(OnHit {
                    effect: StatusEffect::decaying(EffectKind::Slowed { every: 2 }, 4),
                    chance: 50,
                }),
            },
            // Grapples: the hold lasts as long as a monster stays adjacent
            MonsterKind::Ghoul => MonsterStats {
                name: "ghoul",
                hp: 20,
                attack: 6,
                defense: 2,
                behavior: Behavior::Hunter,
                on_hit: Some(OnHit {
                    effect: StatusEffect::new(
                        EffectKind::Immobilized,
                        2,
                        RefreshPolicy::WhileCondition(Condition::AdjacentToFaction(
                            Faction::Monster,
                        )),
                    ),
                    chance: 30,
                }),
            },
            MonsterKind::Shaman => MonsterStats {
                name: "shaman",
                hp: 14,
                attack: 4,
                defense: 1,
                behavior: Behavior::Ambusher,
                on_hit: Some(OnHit {
                    effect: StatusEffect::decaying(EffectKind::Confused, 3),
                    chance: 35,
                }),
            },
        }
    }

    /// Shallowest depth this monster appears at
    pub fn min_depth(&self) -> u32 {
        match self {
            MonsterKind::Rat | MonsterKind::Goblin => 1,
            MonsterKind::Spider | MonsterKind::Slime => 2,
            MonsterKind::Ghoul | MonsterKind::Shaman => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorKind {
    Player,
    Monster(MonsterKind),
}

#[derive(Debug, Clone)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    pub kind: ActorKind,
    pub faction: Faction,
    pub pos: Position,
    pub hp: i32,
    pub max_hp: i32,
    pub attack: i32,
    pub defense: i32,
    /// Set when the actor's action resolves this tick, cleared at tick start
    pub acted_this_tick: bool,
    pub ledger: StatusEffectLedger,
    pub inventory: Inventory,
    /// Live planner state; `None` means not exploring
    pub exploration: Option<ExplorationState>,
    pub last_stop: Option<StopReason>,
}

impl Actor {
    pub fn monster(id: ActorId, kind: MonsterKind, pos: Position) -> Self {
        let stats = kind.stats();
        Self {
            id,
            name: stats.name.to_string(),
            kind: ActorKind::Monster(kind),
            faction: Faction::Monster,
            pos,
            hp: stats.hp,
            max_hp: stats.hp,
            attack: stats.attack,
            defense: stats.defense,
            acted_this_tick: false,
            ledger: StatusEffectLedger::new(),
            inventory: Inventory::with_capacity(0),
            exploration: None,
            last_stop: None,
        }
    }

    pub fn player(id: ActorId, pos: Position, max_hp: i32, attack: i32, defense: i32, capacity: usize) -> Self {
        Self {
            id,
            name: "player".to_string(),
            kind: ActorKind::Player,
            faction: Faction::Player,
            pos,
            hp: max_hp,
            max_hp,
            attack,
            defense,
            acted_this_tick: false,
            ledger: StatusEffectLedger::new(),
            inventory: Inventory::with_capacity(capacity),
            exploration: None,
            last_stop: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, ActorKind::Player)
    }

    pub fn is_exploring(&self) -> bool {
        self.exploration.is_some()
    }

    /// Current HP as a fraction of max; `None` for a zero max
    pub fn hp_fraction(&self) -> Option<f32> {
        if self.max_hp <= 0 {
            None
        } else {
            Some(self.hp as f32 / self.max_hp as f32)
        }
    }

    pub fn monster_kind(&self) -> Option<MonsterKind> {
        match self.kind {
            ActorKind::Monster(kind) => Some(kind),
            ActorKind::Player => None,
        }
    }

    pub fn is_hostile_to(&self, other: &Actor) -> bool {
        self.faction.is_hostile_to(&other.faction)
    }
}

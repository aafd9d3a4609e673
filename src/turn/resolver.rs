//! Action resolution
//!
//! A resolver applies one actor's action to the world and reports what
//! happened. It reads nothing but its arguments and its own immutable rules;
//! all randomness comes from the RNG handed in.

use rand::Rng;
use tracing::debug;

use crate::core::config::SimulationConfig;
use crate::core::types::{ActorId, ItemId, Position, SimRng, TrapId};
use crate::explore::StopReason;
use crate::turn::action::ActionRequest;
use crate::turn::events::{turn_spent, BlockReason, ResultEvent};
use crate::turn::status::Gate;
use crate::world::{GameMode, ItemKind, World};

/// Seam between the scheduler and whatever applies actions
pub trait Resolve {
    fn resolve(
        &mut self,
        world: &mut World,
        actor: ActorId,
        action: ActionRequest,
        rng: &mut SimRng,
    ) -> Vec<ResultEvent>;
}

/// Rule constants the resolver needs, copied out of the run config
#[derive(Debug, Clone, Copy)]
pub struct ResolverRules {
    pub potion_heal: i32,
    pub trap_damage: i32,
    pub search_reveal_chance: f32,
    pub disarm_chance: f32,
    pub oscillation_window: usize,
}

impl From<&SimulationConfig> for ResolverRules {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            potion_heal: config.potion_heal,
            trap_damage: config.trap_damage,
            search_reveal_chance: config.search_reveal_chance,
            disarm_chance: config.disarm_chance,
            oscillation_window: config.oscillation_window,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TurnResolver {
    rules: ResolverRules,
}

impl TurnResolver {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            rules: ResolverRules::from(config),
        }
    }

    fn message(actor: ActorId, text: impl Into<String>) -> Vec<ResultEvent> {
        vec![ResultEvent::Message {
            actor: Some(actor),
            text: text.into(),
        }]
    }

    fn resolve_move(&self, world: &mut World, id: ActorId, dx: i32, dy: i32, rng: &mut SimRng) -> Vec<ResultEvent> {
        let Some(actor) = world.actor(id) else {
            return Vec::new();
        };
        let from = actor.pos;
        let to = from.offset(dx, dy);

        if dx.abs() > 1 || dy.abs() > 1 || (dx == 0 && dy == 0) {
            return vec![ResultEvent::Blocked {
                actor: id,
                at: from,
                reason: BlockReason::InvalidStep,
            }];
        }
        if !world.map.is_walkable(to) {
            return vec![ResultEvent::Blocked {
                actor: id,
                at: to,
                reason: BlockReason::Wall,
            }];
        }
        if let Some(occupant) = world.actor_at(to) {
            let (other, hostile) = (occupant.id, actor.is_hostile_to(occupant));
            if hostile {
                return self.resolve_attack(world, id, other, rng);
            }
            return vec![ResultEvent::Blocked {
                actor: id,
                at: to,
                reason: BlockReason::Occupied(other),
            }];
        }

        let is_player = id == world.player_id();
        if let Some(actor) = world.actor_mut(id) {
            actor.pos = to;
        }
        let mut events = vec![ResultEvent::Moved { actor: id, from, to }];

        // Traps and loot only concern the player
        if is_player {
            world.map.mark_visited(to);
            events.extend(self.pick_up(world, id, to));
            if let Some(trap) = world.trap_at(to).filter(|t| !t.detected).map(|t| t.id) {
                events.extend(self.trigger_trap(world, id, trap));
            }
        }
        events
    }

    fn pick_up(&self, world: &mut World, id: ActorId, at: Position) -> Vec<ResultEvent> {
        let mut events = Vec::new();
        let mut index = 0;
        while index < world.items.len() {
            if world.items[index].pos != at {
                index += 1;
                continue;
            }
            let item = world.items[index].item;
            let Some(actor) = world.actor_mut(id) else {
                break;
            };
            if actor.inventory.add(item).is_err() {
                events.push(ResultEvent::Message {
                    actor: Some(id),
                    text: format!("no room for the {}", item.kind.name()),
                });
                index += 1;
                continue;
            }
            world.items.remove(index);
            events.push(ResultEvent::ItemPickedUp {
                actor: id,
                item: item.id,
                kind: item.kind,
            });
        }
        events
    }

    fn trigger_trap(&self, world: &mut World, id: ActorId, trap: TrapId) -> Vec<ResultEvent> {
        let mut events = Vec::new();
        let at = match world.trap_mut(trap) {
            Some(t) => {
                t.detected = true;
                t.pos
            }
            None => return events,
        };
        events.push(ResultEvent::TrapRevealed { actor: id, trap, at });
        events.push(ResultEvent::TrapTriggered {
            actor: id,
            trap,
            damage: self.rules.trap_damage,
        });
        events.extend(self.damage(world, id, self.rules.trap_damage, None));
        events
    }

    /// Apply damage, emitting `Died` (and ending the game for the player)
    fn damage(&self, world: &mut World, id: ActorId, amount: i32, source: Option<ActorId>) -> Vec<ResultEvent> {
        let player = world.player_id();
        let Some(actor) = world.actor_mut(id) else {
            return Vec::new();
        };
        if !actor.is_alive() {
            return Vec::new();
        }
        actor.hp -= amount;
        if actor.is_alive() {
            return Vec::new();
        }
        if id == player {
            world.mode = GameMode::Defeat;
        }
        vec![ResultEvent::Died {
            actor: id,
            killer: source,
        }]
    }

    fn resolve_attack(&self, world: &mut World, id: ActorId, target: ActorId, rng: &mut SimRng) -> Vec<ResultEvent> {
        let (Some(attacker), Some(defender)) = (world.actor(id), world.actor(target)) else {
            return Self::message(id, format!("{} is not here", target));
        };
        if !defender.is_alive() || !attacker.pos.is_adjacent(&defender.pos) {
            return Self::message(id, format!("{} is out of reach", defender.name));
        }
        if !attacker.is_hostile_to(defender) {
            return Self::message(id, format!("{} refuses to attack {}", attacker.name, defender.name));
        }

        let on_hit = attacker.monster_kind().and_then(|k| k.stats().on_hit);
        let damage = (attacker.attack - defender.defense).max(1) + rng.gen_range(0..=2);
        let remaining_hp = defender.hp - damage;

        let mut events = vec![ResultEvent::Attacked {
            attacker: id,
            target,
            damage,
            remaining_hp,
        }];
        events.extend(self.damage(world, target, damage, Some(id)));

        if let Some(on_hit) = on_hit {
            let roll = rng.gen_range(0..100);
            if roll < on_hit.chance {
                if let Some(victim) = world.actor_mut(target).filter(|a| a.is_alive()) {
                    victim.ledger.apply(on_hit.effect);
                    events.push(ResultEvent::StatusApplied {
                        actor: target,
                        effect: on_hit.effect.kind,
                    });
                }
            }
        }
        events
    }

    fn resolve_use_item(&self, world: &mut World, id: ActorId, item: ItemId) -> Vec<ResultEvent> {
        let heal = self.rules.potion_heal;
        let Some(actor) = world.actor_mut(id) else {
            return Vec::new();
        };
        let Some(kind) = actor.inventory.get(item).map(|i| i.kind) else {
            return Self::message(id, format!("{} is not carried", item));
        };
        match kind {
            ItemKind::HealingPotion => {
                // Drinking at full health would burn a turn for nothing
                if actor.hp >= actor.max_hp {
                    return Self::message(id, "already at full health");
                }
                let before = actor.hp;
                actor.hp = (actor.hp + heal).min(actor.max_hp);
                actor.inventory.remove(item);
                vec![ResultEvent::ItemUsed {
                    actor: id,
                    item,
                    healed: actor.hp - before,
                }]
            }
            ItemKind::Gold { .. } => Self::message(id, "gold cannot be used"),
        }
    }

    fn resolve_search(&self, world: &mut World, id: ActorId, rng: &mut SimRng) -> Vec<ResultEvent> {
        let Some(pos) = world.actor(id).map(|a| a.pos) else {
            return Vec::new();
        };
        let mut events = Vec::new();
        let mut found = 0;
        for trap in world.traps.iter_mut() {
            if !trap.armed || trap.detected || pos.distance(&trap.pos) > 1 {
                continue;
            }
            if rng.gen::<f32>() < self.rules.search_reveal_chance {
                trap.detected = true;
                found += 1;
                events.push(ResultEvent::TrapRevealed {
                    actor: id,
                    trap: trap.id,
                    at: trap.pos,
                });
            }
        }
        events.insert(0, ResultEvent::Searched { actor: id, found });
        events
    }

    fn resolve_disarm(&self, world: &mut World, id: ActorId, trap: TrapId, rng: &mut SimRng) -> Vec<ResultEvent> {
        let Some(pos) = world.actor(id).map(|a| a.pos) else {
            return Vec::new();
        };
        let Some(target) = world.trap(trap).copied() else {
            return Self::message(id, format!("{} does not exist", trap));
        };
        if !target.armed || !target.detected || pos.distance(&target.pos) > 1 {
            return Self::message(id, "no known trap within reach");
        }

        if rng.gen::<f32>() < self.rules.disarm_chance {
            if let Some(t) = world.trap_mut(trap) {
                t.armed = false;
            }
            return vec![ResultEvent::TrapDisarmed { actor: id, trap }];
        }

        let mut events = vec![ResultEvent::DisarmFailed { actor: id, trap }];
        events.push(ResultEvent::TrapTriggered {
            actor: id,
            trap,
            damage: self.rules.trap_damage,
        });
        events.extend(self.damage(world, id, self.rules.trap_damage, None));
        events
    }

    fn resolve_descend(&self, world: &mut World, id: ActorId) -> Vec<ResultEvent> {
        if id != world.player_id() {
            return Self::message(id, "only the player takes the stairs");
        }
        let on_stairs = world
            .actor(id)
            .is_some_and(|a| world.map.tile(a.pos) == Some(crate::world::Tile::StairsDown));
        if !on_stairs {
            return Self::message(id, "there are no stairs here");
        }
        world.pending_descent = true;
        vec![ResultEvent::Descended {
            actor: id,
            depth: world.depth + 1,
        }]
    }
}

impl Resolve for TurnResolver {
    fn resolve(
        &mut self,
        world: &mut World,
        actor: ActorId,
        action: ActionRequest,
        rng: &mut SimRng,
    ) -> Vec<ResultEvent> {
        let Some(current) = world.actor(actor) else {
            return vec![ResultEvent::Message {
                actor: None,
                text: format!("{} does not exist", actor),
            }];
        };
        if !current.is_alive() {
            return Vec::new();
        }

        let mut events = Vec::new();
        let mut redirected_by = None;
        let action = match current.ledger.gate(action, rng) {
            Gate::Proceed(action) => action,
            Gate::Veto(effect) => {
                debug!(%actor, effect = effect.label(), "action vetoed");
                return vec![ResultEvent::Vetoed { actor, effect }];
            }
            Gate::Redirect { action, effect } => {
                events.push(ResultEvent::Message {
                    actor: Some(actor),
                    text: format!("{} stumbles about, {}", current.name, effect.label()),
                });
                redirected_by = Some(effect);
                action
            }
        };

        let outcome = match action {
            ActionRequest::Move { dx, dy } => self.resolve_move(world, actor, dx, dy, rng),
            ActionRequest::Attack(target) => self.resolve_attack(world, actor, target, rng),
            ActionRequest::UseItem { item, .. } => self.resolve_use_item(world, actor, item),
            ActionRequest::Wait => vec![ResultEvent::Waited { actor }],
            ActionRequest::StartExploring => {
                world.begin_exploration(actor, self.rules.oscillation_window);
                vec![ResultEvent::ExploreStarted { actor }]
            }
            ActionRequest::CancelExploring => match world.actor_mut(actor) {
                Some(a) if a.exploration.is_some() => {
                    a.exploration = None;
                    a.last_stop = Some(StopReason::Cancelled);
                    vec![ResultEvent::ExploreStopped {
                        actor,
                        reason: StopReason::Cancelled,
                    }]
                }
                _ => Self::message(actor, "not exploring"),
            },
            ActionRequest::Search => self.resolve_search(world, actor, rng),
            ActionRequest::Disarm(trap) => self.resolve_disarm(world, actor, trap, rng),
            ActionRequest::Descend => self.resolve_descend(world, actor),
        };
        // A redirected move always costs the turn, even when it hits a wall
        let stumbled = redirected_by.filter(|_| !turn_spent(&outcome));
        events.extend(outcome);
        if let Some(effect) = stumbled {
            events.push(ResultEvent::Vetoed { actor, effect });
        }
        events
    }
}

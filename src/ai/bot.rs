//! Automated player
//!
//! Layers are evaluated fresh every tick, highest priority first:
//! self-preservation, combat, exploration, then waiting. Whether exploration
//! is running is read off the actor's live planner state each time; the bot
//! keeps no flag of its own.

use ordered_float::OrderedFloat;
use tracing::{debug, error};

use crate::ai::persona::BotPersona;
use crate::ai::{PolicyAgent, PolicyNote};
use crate::core::config::SimulationConfig;
use crate::core::types::{ActorId, ItemId, SimRng};
use crate::explore::{ExplorationPlanner, StopReason};
use crate::turn::action::ActionRequest;
use crate::world::{Tile, World};

/// What the self-preservation layer looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vitals {
    pub hp: i32,
    pub max_hp: i32,
    pub adjacent_hostiles: usize,
    pub visible_hostiles: usize,
    pub has_potion: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealReason {
    /// Critically hurt with enemies in reach
    Panic,
    /// Hurt and ganged up on
    Surrounded,
    /// Hurt, and healing is allowed right now
    Routine,
}

/// Decide whether to drink a potion
///
/// Full health always short-circuits, whatever the thresholds say.
pub fn self_preservation(persona: &BotPersona, vitals: &Vitals) -> Option<HealReason> {
    if vitals.max_hp <= 0 {
        return None;
    }
    let fraction = vitals.hp as f32 / vitals.max_hp as f32;
    if fraction >= 1.0 || !vitals.has_potion {
        return None;
    }

    if fraction < persona.panic_hp_fraction && vitals.adjacent_hostiles >= persona.panic_min_adjacent {
        return Some(HealReason::Panic);
    }
    if fraction < persona.heal_hp_fraction && vitals.adjacent_hostiles >= 2 {
        return Some(HealReason::Surrounded);
    }
    if fraction < persona.heal_hp_fraction && (vitals.visible_hostiles == 0 || persona.combat_healing) {
        return Some(HealReason::Routine);
    }
    None
}

/// Reduce a candidate list to one action
///
/// Starting exploration wins over any leftover movement; otherwise the first
/// candidate stands. An empty list means waiting.
pub fn collapse_candidates(candidates: &[ActionRequest]) -> ActionRequest {
    if candidates.contains(&ActionRequest::StartExploring) {
        return ActionRequest::StartExploring;
    }
    candidates.first().copied().unwrap_or(ActionRequest::Wait)
}

/// The layer that won this tick
#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Heal { item: ItemId, reason: HealReason },
    Fight { target: ActorId, action: ActionRequest },
    Explore,
}

/// Per-floor bookkeeping, reset whenever the depth changes
#[derive(Debug, Clone, Copy, Default)]
struct FloorProgress {
    depth: u32,
    oscillation_restarts: u32,
    searches: u32,
    abandoned: bool,
}

pub struct BotPolicy {
    persona: BotPersona,
    planner: ExplorationPlanner,
    notes: Vec<PolicyNote>,
    floor: FloorProgress,
}

impl BotPolicy {
    pub fn new(persona: BotPersona, config: &SimulationConfig) -> Self {
        Self {
            persona,
            planner: ExplorationPlanner::from_config(config),
            notes: Vec::new(),
            floor: FloorProgress::default(),
        }
    }

    pub fn persona(&self) -> &BotPersona {
        &self.persona
    }

    fn sync_floor(&mut self, depth: u32) {
        if self.floor.depth != depth {
            self.floor = FloorProgress {
                depth,
                ..FloorProgress::default()
            };
        }
    }

    fn select_mode(&self, world: &World, actor: ActorId) -> Mode {
        if let Some(me) = world.actor(actor) {
            let potion = me.inventory.first_healing();
            let vitals = Vitals {
                hp: me.hp,
                max_hp: me.max_hp,
                adjacent_hostiles: world.adjacent_hostile_count(actor),
                visible_hostiles: world.visible_hostiles(actor).len(),
                has_potion: potion.is_some(),
            };
            if let (Some(reason), Some(item)) = (self_preservation(&self.persona, &vitals), potion) {
                return Mode::Heal { item, reason };
            }
        }

        match self.fight_action(world, actor) {
            Some((target, action)) => Mode::Fight { target, action },
            None => Mode::Explore,
        }
    }

    /// Attack or approach the best visible target, if any can be reached
    ///
    /// Targets rank by distance, then by how hurt they are, then by id.
    fn fight_action(&self, world: &World, actor: ActorId) -> Option<(ActorId, ActionRequest)> {
        let pos = world.actor(actor)?.pos;
        let mut targets = world.visible_hostiles(actor);
        targets.sort_by_key(|t| {
            (
                t.pos.distance(&pos),
                OrderedFloat(t.hp_fraction().unwrap_or(0.0)),
                t.id,
            )
        });

        targets.into_iter().find_map(|t| {
            if t.pos.is_adjacent(&pos) {
                Some((t.id, ActionRequest::Attack(t.id)))
            } else {
                self.planner.step_toward(world, pos, t.pos).map(|step| (t.id, step))
            }
        })
    }

    fn explore(&mut self, world: &mut World, actor: ActorId) -> Vec<ActionRequest> {
        let Some(me) = world.actor_mut(actor) else {
            return Vec::new();
        };
        let Some(mut state) = me.exploration.take() else {
            let last_stop = me.last_stop;
            return match last_stop {
                None => vec![ActionRequest::StartExploring],
                Some(reason) => self.resume(world, actor, reason),
            };
        };

        let (action, stop) = self.planner.next_step(world, actor, &mut state);
        let Some(reason) = stop else {
            if let Some(me) = world.actor_mut(actor) {
                me.exploration = Some(state);
            }
            return vec![action];
        };

        // Deactivation drops the state entirely
        if let Some(me) = world.actor_mut(actor) {
            me.last_stop = Some(reason);
        }
        debug!(%reason, depth = world.depth, "exploration stopped");
        self.notes.push(PolicyNote::ExplorationStopped(reason));

        let mut candidates = self.after_stop(world, actor, reason);
        if action != ActionRequest::Wait {
            candidates.push(action);
        }
        candidates
    }

    /// Reaction in the same tick the planner stopped
    fn after_stop(&mut self, world: &World, actor: ActorId, reason: StopReason) -> Vec<ActionRequest> {
        match reason {
            StopReason::Cancelled => vec![ActionRequest::Wait],
            StopReason::NewMonsterSpotted(_) => match self.fight_action(world, actor) {
                Some((_, action)) => vec![action],
                None => vec![ActionRequest::Wait],
            },
            StopReason::NewItemFound(_) => match self.seek_item(world, actor) {
                Some(step) => vec![step],
                None => vec![ActionRequest::StartExploring],
            },
            StopReason::NewStairsFound(_) | StopReason::MovementBlocked => {
                vec![ActionRequest::StartExploring]
            }
            StopReason::OscillationDetected => {
                self.floor.oscillation_restarts += 1;
                vec![ActionRequest::Wait]
            }
            StopReason::AllFrontierExhausted => vec![self.head_for_stairs(world, actor)],
        }
    }

    /// Reaction on later ticks while exploration stays off
    fn resume(&mut self, world: &World, actor: ActorId, reason: StopReason) -> Vec<ActionRequest> {
        match reason {
            StopReason::Cancelled
            | StopReason::NewMonsterSpotted(_)
            | StopReason::NewStairsFound(_)
            | StopReason::MovementBlocked => vec![ActionRequest::StartExploring],
            StopReason::NewItemFound(_) => match self.seek_item(world, actor) {
                Some(step) => vec![step],
                None => vec![ActionRequest::StartExploring],
            },
            StopReason::OscillationDetected => {
                if self.floor.oscillation_restarts <= self.persona.max_oscillation_restarts {
                    vec![ActionRequest::StartExploring]
                } else {
                    if !self.floor.abandoned {
                        self.floor.abandoned = true;
                        self.notes.push(PolicyNote::FloorAbandoned);
                    }
                    vec![self.head_for_stairs(world, actor)]
                }
            }
            StopReason::AllFrontierExhausted => vec![self.head_for_stairs(world, actor)],
        }
    }

    /// Step toward the nearest reachable visible item
    fn seek_item(&self, world: &World, actor: ActorId) -> Option<ActionRequest> {
        if !self.persona.seek_items {
            return None;
        }
        let me = world.actor(actor)?;
        if me.inventory.is_full() {
            return None;
        }
        let pos = me.pos;
        let mut items = world.visible_items();
        items.retain(|i| i.pos != pos);
        items.sort_by_key(|i| (i.pos.distance(&pos), i.item.id));
        items
            .into_iter()
            .find_map(|i| self.planner.step_toward(world, pos, i.pos))
    }

    /// Descend when on stairs, walk to known stairs, else search for a while
    fn head_for_stairs(&mut self, world: &World, actor: ActorId) -> ActionRequest {
        let Some(pos) = world.actor(actor).map(|a| a.pos) else {
            return ActionRequest::Wait;
        };
        if world.map.tile(pos) == Some(Tile::StairsDown) {
            return ActionRequest::Descend;
        }

        let mut stairs = world.explored_stairs();
        stairs.sort_by_key(|s| (s.distance(&pos), *s));
        if let Some(step) = stairs
            .into_iter()
            .find_map(|s| self.planner.step_toward(world, pos, s))
        {
            return step;
        }

        if self.floor.searches < self.persona.search_budget {
            self.floor.searches += 1;
            return ActionRequest::Search;
        }
        ActionRequest::Wait
    }

    fn interrupt_exploration(world: &mut World, actor: ActorId) {
        if let Some(state) = world.actor_mut(actor).and_then(|a| a.exploration.as_mut()) {
            state.interrupt();
        }
    }

    /// Enforce the one-action contract
    fn collapse(&mut self, candidates: Vec<ActionRequest>) -> ActionRequest {
        if candidates.len() > 1 {
            error!(?candidates, "policy produced more than one action in a tick");
            self.notes.push(PolicyNote::DualAction);
        }
        collapse_candidates(&candidates)
    }
}

impl PolicyAgent for BotPolicy {
    fn next_action(&mut self, world: &mut World, actor: ActorId, _rng: &mut SimRng) -> Option<ActionRequest> {
        if !world.actor(actor)?.is_alive() {
            return None;
        }
        self.sync_floor(world.depth);

        let candidates = match self.select_mode(world, actor) {
            Mode::Heal { item, reason } => {
                debug!(?reason, "drinking a potion");
                vec![ActionRequest::UseItem { item, target: None }]
            }
            Mode::Fight { target, action } => {
                debug!(%target, "engaging");
                Self::interrupt_exploration(world, actor);
                vec![action]
            }
            Mode::Explore => self.explore(world, actor),
        };
        Some(self.collapse(candidates))
    }

    fn drain_notes(&mut self) -> Vec<PolicyNote> {
        std::mem::take(&mut self.notes)
    }

    fn name(&self) -> &str {
        &self.persona.name
    }
}

//! Phase scheduler
//!
//! One call to [`PhaseScheduler::tick`] is one tick: the primary actor (the
//! player) resolves first, then every other eligible actor resolves exactly
//! once in world list order, then every status ledger ticks exactly once.
//! The caller owns the loop.

use std::collections::BTreeSet;

use tracing::{debug, error};

use crate::ai::monster::MonsterPolicy;
use crate::ai::PolicyAgent;
use crate::core::config::SimulationConfig;
use crate::core::types::{ActorId, Faction, SimRng};
use crate::turn::action::ActionRequest;
use crate::turn::events::{turn_spent, ResultEvent};
use crate::turn::resolver::{Resolve, TurnResolver};
use crate::turn::status::Condition;
use crate::world::{GameMode, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingInput,
    PrimaryResolving,
    SecondaryResolving { current: ActorId },
    /// No tick has run yet, or the game has ended
    Idle,
}

/// Invariant violations the scheduler recovered from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerAnomalies {
    pub reentrant_ticks: u64,
    pub duplicate_actors: u64,
}

impl SchedulerAnomalies {
    pub fn total(&self) -> u64 {
        self.reentrant_ticks + self.duplicate_actors
    }
}

/// What the last tick did, for the harness counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub turn_spent: bool,
    pub secondary_resolved: u32,
}

pub struct PhaseScheduler<R: Resolve = TurnResolver, P: PolicyAgent = MonsterPolicy> {
    phase: TurnPhase,
    resolver: R,
    secondary: P,
    anomalies: SchedulerAnomalies,
    last_tick: TickSummary,
}

impl PhaseScheduler {
    /// Scheduler with the standard resolver and monster policy
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(TurnResolver::new(config), MonsterPolicy::from_config(config))
    }
}

impl<R: Resolve, P: PolicyAgent> PhaseScheduler<R, P> {
    pub fn new(resolver: R, secondary: P) -> Self {
        Self {
            phase: TurnPhase::Idle,
            resolver,
            secondary,
            anomalies: SchedulerAnomalies::default(),
            last_tick: TickSummary::default(),
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn anomalies(&self) -> SchedulerAnomalies {
        self.anomalies
    }

    pub fn last_tick(&self) -> TickSummary {
        self.last_tick
    }

    /// Run one tick with the primary actor's action
    pub fn tick(&mut self, world: &mut World, rng: &mut SimRng, primary: ActionRequest) -> Vec<ResultEvent> {
        if matches!(
            self.phase,
            TurnPhase::PrimaryResolving | TurnPhase::SecondaryResolving { .. }
        ) {
            error!(phase = ?self.phase, "tick entered while a tick is still resolving");
            self.anomalies.reentrant_ticks += 1;
            return Vec::new();
        }

        self.last_tick = TickSummary::default();
        for actor in world.actors.iter_mut() {
            actor.acted_this_tick = false;
        }

        // === PRIMARY PHASE ===
        self.phase = TurnPhase::PrimaryResolving;
        let player = world.player_id();
        let mut events = self.resolver.resolve(world, player, primary, rng);
        if let Some(p) = world.actor_mut(player) {
            p.acted_this_tick = true;
        }
        world.refresh_visibility();

        if !turn_spent(&events) {
            debug!(action = primary.label(), "primary action did not end the turn");
            self.phase = Self::resting_phase(world);
            return events;
        }
        self.last_tick.turn_spent = true;

        // === SECONDARY PHASE ===
        let snapshot = world.secondary_actor_ids();
        for id in snapshot {
            self.phase = TurnPhase::SecondaryResolving { current: id };
            if world.mode.is_terminal() {
                continue;
            }
            let Some(actor) = world.actor(id) else {
                continue;
            };
            if !actor.is_alive() {
                continue;
            }
            if actor.acted_this_tick {
                error!(actor = %id, "actor appears twice in the turn order; skipping");
                self.anomalies.duplicate_actors += 1;
                continue;
            }

            if let Some(a) = world.actor_mut(id) {
                a.acted_this_tick = true;
            }
            let action = self
                .secondary
                .next_action(world, id, rng)
                .unwrap_or(ActionRequest::Wait);
            events.extend(self.resolver.resolve(world, id, action, rng));
            self.last_tick.secondary_resolved += 1;
        }

        // === LEDGER PHASE ===
        events.extend(Self::tick_ledgers(world));

        world.turn += 1;
        world.reap_dead();
        world.refresh_visibility();
        self.phase = Self::resting_phase(world);
        events
    }

    fn resting_phase(world: &World) -> TurnPhase {
        if world.mode.is_terminal() {
            TurnPhase::Idle
        } else {
            TurnPhase::AwaitingInput
        }
    }

    /// Tick each distinct actor's ledger once
    fn tick_ledgers(world: &mut World) -> Vec<ResultEvent> {
        let mut events = Vec::new();
        let mut seen = BTreeSet::new();
        let player = world.player_id();

        for index in 0..world.actors.len() {
            let (id, pos) = {
                let actor = &world.actors[index];
                (actor.id, actor.pos)
            };
            if !seen.insert(id) || !world.actors[index].is_alive() || world.actors[index].ledger.is_empty() {
                continue;
            }

            let adjacent: Vec<(Faction, bool)> = [Faction::Player, Faction::Monster, Faction::Neutral]
                .into_iter()
                .map(|f| (f, world.faction_adjacent(pos, f)))
                .collect();
            let holds = |condition: &Condition| match condition {
                Condition::AdjacentToFaction(faction) => adjacent
                    .iter()
                    .any(|(f, present)| f == faction && *present),
            };

            let actor = &mut world.actors[index];
            let outcome = actor.ledger.tick(holds);

            for effect in outcome.expired {
                events.push(ResultEvent::StatusExpired { actor: id, effect });
            }
            if outcome.poison_damage > 0 {
                actor.hp -= outcome.poison_damage;
                events.push(ResultEvent::PoisonDamage {
                    actor: id,
                    damage: outcome.poison_damage,
                });
                if !actor.is_alive() {
                    events.push(ResultEvent::Died { actor: id, killer: None });
                    if id == player {
                        world.mode = GameMode::Defeat;
                    }
                }
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Position;
    use crate::turn::status::{EffectKind, RefreshPolicy, StatusEffect};
    use crate::world::{MonsterKind, OpenRoom, WorldFactory};
    use rand::SeedableRng;

    fn setup(room: OpenRoom) -> (World, PhaseScheduler, SimRng) {
        let config = SimulationConfig::default();
        let plan = room.generate(&config, 1, &mut SimRng::seed_from_u64(0)).unwrap();
        let world = World::from_plan(plan, &config).unwrap();
        (world, PhaseScheduler::from_config(&config), SimRng::seed_from_u64(1))
    }

    #[test]
    fn test_reentrant_tick_is_rejected() {
        let (mut world, mut scheduler, mut rng) = setup(OpenRoom::new(3, 3));
        scheduler.phase = TurnPhase::SecondaryResolving { current: ActorId(5) };

        let events = scheduler.tick(&mut world, &mut rng, ActionRequest::Wait);
        assert!(events.is_empty());
        assert_eq!(scheduler.anomalies().reentrant_ticks, 1);
        assert_eq!(world.turn, 0);
    }

    #[test]
    fn test_primary_reentry_is_rejected() {
        let (mut world, mut scheduler, mut rng) = setup(OpenRoom::new(3, 3));
        scheduler.phase = TurnPhase::PrimaryResolving;
        assert!(scheduler.tick(&mut world, &mut rng, ActionRequest::Wait).is_empty());
        assert_eq!(scheduler.anomalies().total(), 1);
    }

    #[test]
    fn test_wait_advances_turn_and_returns_to_input() {
        let (mut world, mut scheduler, mut rng) = setup(OpenRoom::new(3, 3));
        assert_eq!(scheduler.phase(), TurnPhase::Idle);
        scheduler.tick(&mut world, &mut rng, ActionRequest::Wait);
        assert_eq!(world.turn, 1);
        assert_eq!(scheduler.phase(), TurnPhase::AwaitingInput);
    }

    #[test]
    fn test_meta_action_skips_secondary_phase() {
        let (mut world, mut scheduler, mut rng) =
            setup(OpenRoom::new(5, 5).with_monster(MonsterKind::Goblin, Position::new(1, 1)));
        let events = scheduler.tick(&mut world, &mut rng, ActionRequest::StartExploring);
        assert_eq!(world.turn, 0);
        assert_eq!(scheduler.last_tick().secondary_resolved, 0);
        assert!(events.iter().all(|e| e.actor() == Some(world.player_id())));
    }

    #[test]
    fn test_duplicate_actor_resolves_once() {
        let (mut world, mut scheduler, mut rng) =
            setup(OpenRoom::new(5, 5).with_monster(MonsterKind::Rat, Position::new(1, 1)));
        let dup = world.actors[1].clone();
        world.actors.push(dup);

        scheduler.tick(&mut world, &mut rng, ActionRequest::Wait);
        assert_eq!(scheduler.last_tick().secondary_resolved, 1);
        assert_eq!(scheduler.anomalies().duplicate_actors, 1);
    }

    #[test]
    fn test_terminal_mode_skips_secondaries() {
        let (mut world, mut scheduler, mut rng) =
            setup(OpenRoom::new(5, 5).with_monster(MonsterKind::Rat, Position::new(1, 1)));
        world.mode = GameMode::Menu;
        scheduler.tick(&mut world, &mut rng, ActionRequest::Wait);
        assert_eq!(scheduler.last_tick().secondary_resolved, 0);
        assert_eq!(scheduler.phase(), TurnPhase::Idle);
    }

    #[test]
    fn test_ledger_ticks_once_per_turn() {
        let (mut world, mut scheduler, mut rng) = setup(OpenRoom::new(3, 3));
        world
            .player_mut()
            .unwrap()
            .ledger
            .apply(StatusEffect::decaying(EffectKind::Confused, 3));

        scheduler.tick(&mut world, &mut rng, ActionRequest::Wait);
        let remaining = world.player().unwrap().ledger.remaining(&EffectKind::Confused);
        assert_eq!(remaining, Some(2));
    }

    #[test]
    fn test_grapple_holds_while_monster_adjacent() {
        let (mut world, mut scheduler, mut rng) =
            setup(OpenRoom::new(3, 3).with_monster(MonsterKind::Rat, Position::new(1, 1)));
        let grapple = RefreshPolicy::WhileCondition(Condition::AdjacentToFaction(Faction::Monster));
        world
            .player_mut()
            .unwrap()
            .ledger
            .apply(StatusEffect::new(EffectKind::Immobilized, 1, grapple));

        // Every tile of a 3x3 room touches the centre, so the rat stays adjacent
        for _ in 0..3 {
            scheduler.tick(&mut world, &mut rng, ActionRequest::Wait);
        }
        if world.living_monsters() > 0 {
            assert!(world.player().unwrap().ledger.has(&EffectKind::Immobilized));
        }
    }

    #[test]
    fn test_poison_can_kill_player() {
        let (mut world, mut scheduler, mut rng) = setup(OpenRoom::new(3, 3));
        {
            let p = world.player_mut().unwrap();
            p.hp = 1;
            p.ledger.apply(StatusEffect::decaying(EffectKind::Poisoned { per_tick: 2 }, 3));
        }
        let events = scheduler.tick(&mut world, &mut rng, ActionRequest::Wait);
        assert!(events.iter().any(|e| matches!(e, ResultEvent::Died { .. })));
        assert_eq!(world.mode, GameMode::Defeat);
        assert_eq!(scheduler.phase(), TurnPhase::Idle);
    }
}

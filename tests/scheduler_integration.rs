//! Phase scheduler integration tests

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use delvekeep::ai::MonsterPolicy;
use delvekeep::core::types::{ActorId, Position, SimRng};
use delvekeep::core::SimulationConfig;
use delvekeep::turn::{
    ActionRequest, EffectKind, PhaseScheduler, Resolve, ResultEvent, StatusEffect, TurnPhase, TurnResolver,
};
use delvekeep::world::{MonsterKind, OpenRoom, World, WorldFactory};
use proptest::prelude::*;
use rand::SeedableRng;

/// Wraps the real resolver and counts invocations per actor
struct CountingResolver {
    inner: TurnResolver,
    counts: Rc<RefCell<BTreeMap<ActorId, u32>>>,
}

impl Resolve for CountingResolver {
    fn resolve(&mut self, world: &mut World, actor: ActorId, action: ActionRequest, rng: &mut SimRng) -> Vec<ResultEvent> {
        *self.counts.borrow_mut().entry(actor).or_insert(0) += 1;
        self.inner.resolve(world, actor, action, rng)
    }
}

type CountingScheduler = PhaseScheduler<CountingResolver, MonsterPolicy>;

fn room_with_rats(count: usize) -> OpenRoom {
    let mut room = OpenRoom::new(12, 12);
    for x in 0..count {
        room = room.with_monster(MonsterKind::Rat, Position::new(1 + x as i32, 1));
    }
    room
}

fn setup(room: OpenRoom) -> (World, CountingScheduler, Rc<RefCell<BTreeMap<ActorId, u32>>>) {
    let config = SimulationConfig::default();
    let plan = room.generate(&config, 1, &mut SimRng::seed_from_u64(0)).unwrap();
    let world = World::from_plan(plan, &config).unwrap();
    let counts = Rc::new(RefCell::new(BTreeMap::new()));
    let resolver = CountingResolver {
        inner: TurnResolver::new(&config),
        counts: Rc::clone(&counts),
    };
    let scheduler = PhaseScheduler::new(resolver, MonsterPolicy::from_config(&config));
    (world, scheduler, counts)
}

// ========================================
// EXACTLY-ONCE RESOLUTION
// ========================================

proptest! {
    #[test]
    fn test_each_actor_resolves_exactly_once_per_tick(rats in 0usize..12, seed in any::<u64>(), ticks in 1usize..8) {
        let (mut world, mut scheduler, counts) = setup(room_with_rats(rats));
        let mut rng = SimRng::seed_from_u64(seed);

        for _ in 0..ticks {
            if world.mode.is_terminal() {
                break;
            }
            let mut expected: Vec<ActorId> = world
                .actors
                .iter()
                .filter(|a| a.is_alive())
                .map(|a| a.id)
                .collect();
            expected.sort();
            counts.borrow_mut().clear();

            scheduler.tick(&mut world, &mut rng, ActionRequest::Wait);

            let counts = counts.borrow();
            prop_assert!(counts.values().all(|&n| n == 1));
            if !world.mode.is_terminal() {
                let resolved: Vec<ActorId> = counts.keys().copied().collect();
                prop_assert_eq!(resolved, expected);
            }
            prop_assert_eq!(scheduler.anomalies().total(), 0);
        }
    }
}

#[test]
fn test_duplicated_actor_entry_resolves_once() {
    let (mut world, mut scheduler, counts) = setup(room_with_rats(2));
    let duplicate = world.actors[1].clone();
    let duplicate_id = duplicate.id;
    world.actors.push(duplicate);

    scheduler.tick(&mut world, &mut SimRng::seed_from_u64(3), ActionRequest::Wait);

    assert_eq!(counts.borrow().get(&duplicate_id), Some(&1));
    assert_eq!(scheduler.anomalies().duplicate_actors, 1);
    assert_eq!(scheduler.phase(), TurnPhase::AwaitingInput);
}

#[test]
fn test_non_turn_ending_primary_skips_secondaries() {
    let (mut world, mut scheduler, counts) = setup(room_with_rats(3));
    let player = world.player_id();

    scheduler.tick(&mut world, &mut SimRng::seed_from_u64(3), ActionRequest::StartExploring);

    let counts = counts.borrow();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts.get(&player), Some(&1));
    assert_eq!(world.turn, 0);
}

#[test]
fn test_blocked_move_returns_control_to_player() {
    let (mut world, mut scheduler, counts) = setup(room_with_rats(1));
    world.player_mut().unwrap().pos = Position::new(12, 12);

    let events = scheduler.tick(&mut world, &mut SimRng::seed_from_u64(3), ActionRequest::Move { dx: 1, dy: 0 });

    assert!(events.iter().any(|e| matches!(e, ResultEvent::Blocked { .. })));
    assert_eq!(counts.borrow().len(), 1);
    assert!(!scheduler.last_tick().turn_spent);
}

#[test]
fn test_confusion_wears_off_in_a_dead_end() {
    let (mut world, mut scheduler, _) = setup(OpenRoom::new(1, 1));
    world
        .player_mut()
        .unwrap()
        .ledger
        .apply(StatusEffect::decaying(EffectKind::Confused, 2));
    let mut rng = SimRng::seed_from_u64(11);

    for _ in 0..2 {
        scheduler.tick(&mut world, &mut rng, ActionRequest::Move { dx: 1, dy: 0 });
        assert!(scheduler.last_tick().turn_spent);
    }

    assert_eq!(world.turn, 2);
    assert!(!world.player().unwrap().ledger.has(&EffectKind::Confused));

    let events = scheduler.tick(&mut world, &mut rng, ActionRequest::Move { dx: 1, dy: 0 });
    assert!(events.iter().any(|e| matches!(e, ResultEvent::Blocked { .. })));
    assert_eq!(world.turn, 2);
}

#[test]
fn test_ticks_are_reproducible_for_a_seed() {
    let run = || {
        let (mut world, mut scheduler, _) = setup(room_with_rats(5));
        let mut rng = SimRng::seed_from_u64(77);
        let mut log = Vec::new();
        for _ in 0..20 {
            for event in scheduler.tick(&mut world, &mut rng, ActionRequest::Wait) {
                log.push(event.describe(&world));
            }
        }
        log
    };
    assert_eq!(run(), run());
}

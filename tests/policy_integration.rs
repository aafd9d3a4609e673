//! Bot policy integration tests

use delvekeep::ai::bot::{self_preservation, Vitals};
use delvekeep::ai::{BotPersona, BotPolicy, PolicyAgent};
use delvekeep::core::types::{Position, SimRng};
use delvekeep::core::SimulationConfig;
use delvekeep::explore::{ExplorationState, StopReason};
use delvekeep::turn::ActionRequest;
use delvekeep::world::{MonsterKind, OpenRoom, World, WorldFactory};
use proptest::prelude::*;
use rand::SeedableRng;

fn goblin_next_to_player() -> World {
    let config = SimulationConfig::default();
    let plan = OpenRoom::new(3, 3)
        .with_monster(MonsterKind::Goblin, Position::new(1, 1))
        .generate(&config, 1, &mut SimRng::seed_from_u64(0))
        .unwrap();
    World::from_plan(plan, &config).unwrap()
}

fn persona(panic: f32, heal: f32, combat_healing: bool) -> BotPersona {
    BotPersona {
        name: "test".into(),
        panic_hp_fraction: panic,
        heal_hp_fraction: heal,
        combat_healing,
        ..BotPersona::default()
    }
}

// ========================================
// SELF-PRESERVATION
// ========================================

proptest! {
    #[test]
    fn test_full_health_never_heals(
        panic in 0.0f32..=1.0,
        heal in 0.0f32..=1.0,
        min_adjacent in 0usize..4,
        combat_healing in any::<bool>(),
        max_hp in 1i32..500,
        adjacent in 0usize..8,
        visible in 0usize..8,
    ) {
        let mut p = persona(panic, heal, combat_healing);
        p.panic_min_adjacent = min_adjacent;
        let vitals = Vitals {
            hp: max_hp,
            max_hp,
            adjacent_hostiles: adjacent,
            visible_hostiles: visible.max(adjacent),
            has_potion: true,
        };
        prop_assert_eq!(self_preservation(&p, &vitals), None);
    }

    #[test]
    fn test_without_potion_never_heals(hp in 1i32..100, adjacent in 0usize..8) {
        let vitals = Vitals {
            hp,
            max_hp: 100,
            adjacent_hostiles: adjacent,
            visible_hostiles: adjacent,
            has_potion: false,
        };
        prop_assert_eq!(self_preservation(&persona(1.0, 1.0, true), &vitals), None);
    }
}

#[test]
fn test_panic_override_drinks_in_melee() {
    let mut world = goblin_next_to_player();
    let player = world.player_id();
    world.player_mut().unwrap().hp = 10;
    let potion = world.player().unwrap().inventory.first_healing().unwrap();

    let mut bot = BotPolicy::new(persona(0.15, 0.5, false), &SimulationConfig::default());
    let action = bot.next_action(&mut world, player, &mut SimRng::seed_from_u64(0));

    assert_eq!(action, Some(ActionRequest::UseItem { item: potion, target: None }));
}

#[test]
fn test_below_panic_line_keeps_fighting() {
    let mut world = goblin_next_to_player();
    let player = world.player_id();
    let goblin = world.secondary_actor_ids()[0];
    world.player_mut().unwrap().hp = 10;

    let mut bot = BotPolicy::new(persona(0.05, 0.5, false), &SimulationConfig::default());
    let action = bot.next_action(&mut world, player, &mut SimRng::seed_from_u64(0));

    assert_eq!(action, Some(ActionRequest::Attack(goblin)));
}

#[test]
fn test_combat_healing_persona_heals_mid_fight() {
    let mut world = goblin_next_to_player();
    let player = world.player_id();
    world.player_mut().unwrap().hp = 40;

    let mut bot = BotPolicy::new(persona(0.1, 0.5, true), &SimulationConfig::default());
    let action = bot.next_action(&mut world, player, &mut SimRng::seed_from_u64(0));

    assert!(matches!(action, Some(ActionRequest::UseItem { .. })));
}

#[test]
fn test_full_health_fights_instead() {
    let mut world = goblin_next_to_player();
    let player = world.player_id();
    let goblin = world.secondary_actor_ids()[0];

    let mut bot = BotPolicy::new(persona(1.0, 1.0, true), &SimulationConfig::default());
    let action = bot.next_action(&mut world, player, &mut SimRng::seed_from_u64(0));

    assert_eq!(action, Some(ActionRequest::Attack(goblin)));
}

// ========================================
// EXPLORATION STOPS
// ========================================

/// A slime seen across a detected trap: visible, but no path reaches it
fn unreachable_slime() -> World {
    let config = SimulationConfig::default();
    let plan = OpenRoom::new(5, 1)
        .with_entry(Position::new(1, 1))
        .with_trap(Position::new(2, 1), false)
        .with_monster(MonsterKind::Slime, Position::new(4, 1))
        .generate(&config, 1, &mut SimRng::seed_from_u64(0))
        .unwrap();
    let mut world = World::from_plan(plan, &config).unwrap();
    world.player_mut().unwrap().exploration = Some(ExplorationState::new(config.oscillation_window));
    world
}

#[test]
fn test_spotted_monster_is_not_restarted_same_tick() {
    let mut world = unreachable_slime();
    let player = world.player_id();
    let slime = world.secondary_actor_ids()[0];
    let mut bot = BotPolicy::new(BotPersona::default(), &SimulationConfig::default());
    let mut rng = SimRng::seed_from_u64(0);

    let action = bot.next_action(&mut world, player, &mut rng);

    assert_ne!(action, Some(ActionRequest::StartExploring));
    assert_eq!(action, Some(ActionRequest::Wait));
    let me = world.player().unwrap();
    assert!(!me.is_exploring());
    assert_eq!(me.last_stop, Some(StopReason::NewMonsterSpotted(slime)));

    // Next tick resumes from the stop recorded on the actor
    let action = bot.next_action(&mut world, player, &mut rng);
    assert_eq!(action, Some(ActionRequest::StartExploring));
}

#[test]
fn test_resume_reads_live_stop_reason() {
    let mut world = unreachable_slime();
    let player = world.player_id();
    let mut bot = BotPolicy::new(BotPersona::default(), &SimulationConfig::default());
    let mut rng = SimRng::seed_from_u64(0);

    bot.next_action(&mut world, player, &mut rng);
    world.player_mut().unwrap().last_stop = Some(StopReason::AllFrontierExhausted);

    // No stairs are known, so an exhausted floor is searched instead
    let action = bot.next_action(&mut world, player, &mut rng);
    assert_eq!(action, Some(ActionRequest::Search));
}

// ========================================
// PERSONAS
// ========================================

#[test]
fn test_shipped_personas_load_by_name() {
    let cautious = delvekeep::ai::load_persona("cautious").unwrap();
    assert_eq!(cautious.name, "cautious");
    assert!(cautious.combat_healing);

    let berserker = delvekeep::ai::load_persona("berserker").unwrap();
    assert_eq!(berserker.panic_min_adjacent, 2);
}

#[test]
fn test_unknown_persona_is_an_error() {
    assert!(delvekeep::ai::load_persona("does-not-exist").is_err());
}

//! Monster policy for secondary actors

use rand::Rng;

use crate::ai::PolicyAgent;
use crate::core::config::SimulationConfig;
use crate::core::types::{ActorId, SimRng, DIRECTIONS};
use crate::explore::ExplorationPlanner;
use crate::turn::action::ActionRequest;
use crate::world::{Behavior, World};

/// Chase and hit the nearest visible enemy, otherwise act on behaviour
#[derive(Debug, Clone, Copy)]
pub struct MonsterPolicy {
    planner: ExplorationPlanner,
}

impl MonsterPolicy {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            planner: ExplorationPlanner::from_config(config),
        }
    }

    fn random_step(world: &World, actor: ActorId, rng: &mut SimRng) -> ActionRequest {
        let Some(pos) = world.actor(actor).map(|a| a.pos) else {
            return ActionRequest::Wait;
        };
        let (dx, dy) = DIRECTIONS[rng.gen_range(0..DIRECTIONS.len())];
        if world.is_passable(pos.offset(dx, dy)) {
            ActionRequest::Move { dx, dy }
        } else {
            ActionRequest::Wait
        }
    }
}

impl PolicyAgent for MonsterPolicy {
    fn next_action(&mut self, world: &mut World, actor: ActorId, rng: &mut SimRng) -> Option<ActionRequest> {
        let me = world.actor(actor)?;
        let pos = me.pos;
        let behavior = me.monster_kind().map(|k| k.stats().behavior);

        let target = world
            .visible_hostiles(actor)
            .into_iter()
            .min_by_key(|h| (h.pos.distance(&pos), h.id))
            .map(|h| (h.id, h.pos));

        if let Some((target, target_pos)) = target {
            if pos.is_adjacent(&target_pos) {
                return Some(ActionRequest::Attack(target));
            }
            if let Some(step) = self.planner.step_toward(world, pos, target_pos) {
                return Some(step);
            }
        }

        let action = match behavior {
            Some(Behavior::Hunter) => {
                if rng.gen_bool(0.5) {
                    Self::random_step(world, actor, rng)
                } else {
                    ActionRequest::Wait
                }
            }
            Some(Behavior::Wanderer) => Self::random_step(world, actor, rng),
            Some(Behavior::Ambusher) | None => ActionRequest::Wait,
        };
        Some(action)
    }

    fn name(&self) -> &str {
        "monster"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Position;
    use crate::world::{MonsterKind, OpenRoom, WorldFactory};
    use rand::SeedableRng;

    fn world_from(room: OpenRoom) -> World {
        let config = SimulationConfig::default();
        let plan = room.generate(&config, 1, &mut SimRng::seed_from_u64(0)).unwrap();
        World::from_plan(plan, &config).unwrap()
    }

    #[test]
    fn test_adjacent_monster_attacks_player() {
        let mut world = world_from(OpenRoom::new(3, 3).with_monster(MonsterKind::Spider, Position::new(1, 1)));
        let spider = world.secondary_actor_ids()[0];
        let mut policy = MonsterPolicy::from_config(&SimulationConfig::default());
        let action = policy.next_action(&mut world, spider, &mut SimRng::seed_from_u64(3));
        assert_eq!(action, Some(ActionRequest::Attack(world.player_id())));
    }

    #[test]
    fn test_monster_closes_distance() {
        let mut world = world_from(
            OpenRoom::new(7, 1)
                .with_entry(Position::new(1, 1))
                .with_monster(MonsterKind::Goblin, Position::new(6, 1)),
        );
        let goblin = world.secondary_actor_ids()[0];
        let mut policy = MonsterPolicy::from_config(&SimulationConfig::default());
        let action = policy.next_action(&mut world, goblin, &mut SimRng::seed_from_u64(3));
        assert_eq!(action, Some(ActionRequest::Move { dx: -1, dy: 0 }));
    }

    #[test]
    fn test_ambusher_waits_out_of_sight() {
        let config = SimulationConfig::default();
        let mut room = OpenRoom::new(20, 1).with_entry(Position::new(1, 1));
        room = room.with_monster(MonsterKind::Spider, Position::new(20, 1));
        let plan = room.generate(&config, 1, &mut SimRng::seed_from_u64(0)).unwrap();
        let mut world = World::from_plan(plan, &config).unwrap();
        let spider = world.secondary_actor_ids()[0];

        let mut policy = MonsterPolicy::from_config(&config);
        let action = policy.next_action(&mut world, spider, &mut SimRng::seed_from_u64(3));
        assert_eq!(action, Some(ActionRequest::Wait));
    }
}

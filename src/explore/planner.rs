//! Frontier-driven exploration
//!
//! Each call plans one step. The planner walks toward the nearest explored
//! but unvisited tile, and stops (returning a [`StopReason`]) whenever
//! something worth a decision shows up.

use std::collections::VecDeque;

use ahash::AHashMap;

use crate::core::config::SimulationConfig;
use crate::core::types::{ActorId, Position};
use crate::explore::pathfinding::find_path;
use crate::explore::state::{ExplorationState, StopReason};
use crate::turn::action::ActionRequest;
use crate::world::World;

/// Node budget for goal-directed A*
const ASTAR_NODE_BUDGET: usize = 4096;

#[derive(Debug, Clone, Copy)]
pub struct ExplorationPlanner {
    max_search_distance: u32,
}

impl ExplorationPlanner {
    pub fn new(max_search_distance: u32) -> Self {
        Self { max_search_distance }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.max_search_distance)
    }

    /// Plan the next exploration step for `actor`
    ///
    /// Any stop comes back with `Wait` as the action; the caller decides what
    /// to actually do about it.
    pub fn next_step(
        &self,
        world: &World,
        actor: ActorId,
        state: &mut ExplorationState,
    ) -> (ActionRequest, Option<StopReason>) {
        let Some(pos) = world.actor(actor).filter(|a| a.is_alive()).map(|a| a.pos) else {
            return (ActionRequest::Wait, Some(StopReason::Cancelled));
        };

        if let Some(step) = state.take_last_step() {
            if step.from == pos {
                return (ActionRequest::Wait, Some(StopReason::MovementBlocked));
            }
        }

        if state.record_position(pos) {
            return (ActionRequest::Wait, Some(StopReason::OscillationDetected));
        }

        if let Some(reason) = Self::scan_discoveries(world, actor, state) {
            return (ActionRequest::Wait, Some(reason));
        }

        let Some(next) = self.search_frontier(world, pos) else {
            return (ActionRequest::Wait, Some(StopReason::AllFrontierExhausted));
        };

        if world.actor_at(next).is_some() {
            return (ActionRequest::Wait, Some(StopReason::MovementBlocked));
        }

        state.plan_step(pos, next);
        let (dx, dy) = pos.step_toward(&next);
        (ActionRequest::Move { dx, dy }, None)
    }

    /// New hostiles, then items, then stairs; each generates one stop only
    fn scan_discoveries(world: &World, actor: ActorId, state: &mut ExplorationState) -> Option<StopReason> {
        for hostile in world.visible_hostiles(actor) {
            if state.remember_monster(hostile.id) {
                return Some(StopReason::NewMonsterSpotted(hostile.id));
            }
        }
        for item in world.visible_items() {
            if state.remember_item(item.item.id) {
                return Some(StopReason::NewItemFound(item.item.id));
            }
        }
        for stairs in world.visible_stairs() {
            if state.remember_stairs(stairs) {
                return Some(StopReason::NewStairsFound(stairs));
            }
        }
        None
    }

    /// Bounded BFS over explored walkable tiles, known traps excluded.
    /// Returns the first step toward the nearest unvisited tile.
    fn search_frontier(&self, world: &World, start: Position) -> Option<Position> {
        let mut came_from: AHashMap<Position, Position> = AHashMap::new();
        let mut depth: AHashMap<Position, u32> = AHashMap::new();
        let mut queue = VecDeque::new();
        let mut nearest = None;

        depth.insert(start, 0);
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            let d = depth.get(&current).copied().unwrap_or(0);
            if current != start && !world.map.is_visited(current) {
                nearest = Some(current);
                break;
            }
            if d >= self.max_search_distance {
                continue;
            }

            for neighbor in current.neighbors() {
                if depth.contains_key(&neighbor) {
                    continue;
                }
                if !world.map.is_explored(neighbor)
                    || !world.map.is_walkable(neighbor)
                    || world.is_known_trap(neighbor)
                {
                    continue;
                }
                depth.insert(neighbor, d + 1);
                came_from.insert(neighbor, current);
                queue.push_back(neighbor);
            }
        }

        nearest.map(|target| {
            let mut step = target;
            while let Some(&prev) = came_from.get(&step) {
                if prev == start {
                    break;
                }
                step = prev;
            }
            step
        })
    }

    /// One A* step from `from` toward `goal`, routing around living actors
    /// and known traps. `None` when already there or unreachable.
    pub fn step_toward(&self, world: &World, from: Position, goal: Position) -> Option<ActionRequest> {
        let path = find_path(&world.map, from, goal, ASTAR_NODE_BUDGET, |p| {
            world.is_passable(p) && !world.is_known_trap(p)
        })?;
        let next = *path.get(1)?;
        if next != goal && !world.is_passable(next) {
            return None;
        }
        let (dx, dy) = from.step_toward(&next);
        Some(ActionRequest::Move { dx, dy })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SimRng;
    use crate::world::{MonsterKind, OpenRoom, WorldFactory};
    use rand::SeedableRng;

    fn world_from(room: OpenRoom) -> World {
        let config = SimulationConfig::default();
        let plan = room.generate(&config, 1, &mut SimRng::seed_from_u64(0)).unwrap();
        World::from_plan(plan, &config).unwrap()
    }

    fn apply_move(world: &mut World, action: ActionRequest) {
        if let ActionRequest::Move { dx, dy } = action {
            let player = world.player_mut().unwrap();
            player.pos = player.pos.offset(dx, dy);
            let pos = player.pos;
            world.map.mark_visited(pos);
            world.refresh_visibility();
        }
    }

    #[test]
    fn test_first_step_goes_north_in_open_room() {
        let world = world_from(OpenRoom::new(3, 3));
        let mut state = ExplorationState::new(6);
        let (action, stop) = ExplorationPlanner::new(50).next_step(&world, world.player_id(), &mut state);
        assert_eq!(stop, None);
        assert_eq!(action, ActionRequest::Move { dx: 0, dy: -1 });
    }

    #[test]
    fn test_room_exhausts_after_visiting_every_tile() {
        let mut world = world_from(OpenRoom::new(3, 3));
        let planner = ExplorationPlanner::new(50);
        let mut state = ExplorationState::new(6);
        let player = world.player_id();

        let mut moves = 0;
        loop {
            let (action, stop) = planner.next_step(&world, player, &mut state);
            if let Some(reason) = stop {
                assert_eq!(reason, StopReason::AllFrontierExhausted);
                break;
            }
            apply_move(&mut world, action);
            moves += 1;
            assert!(moves <= 8);
        }
        assert_eq!(moves, 8);
        assert_eq!(world.map.count_visited(), 9);
    }

    #[test]
    fn test_stuck_actor_reports_blocked() {
        let world = world_from(OpenRoom::new(3, 3));
        let planner = ExplorationPlanner::new(50);
        let mut state = ExplorationState::new(6);
        let player = world.player_id();

        let (_, stop) = planner.next_step(&world, player, &mut state);
        assert_eq!(stop, None);
        // The move never happened
        let (_, stop) = planner.next_step(&world, player, &mut state);
        assert_eq!(stop, Some(StopReason::MovementBlocked));
    }

    #[test]
    fn test_monster_reported_once() {
        let world = world_from(OpenRoom::new(5, 5).with_monster(MonsterKind::Rat, Position::new(1, 1)));
        let planner = ExplorationPlanner::new(50);
        let mut state = ExplorationState::new(6);
        let player = world.player_id();

        let (_, stop) = planner.next_step(&world, player, &mut state);
        assert!(matches!(stop, Some(StopReason::NewMonsterSpotted(_))));
        let (_, stop) = planner.next_step(&world, player, &mut state);
        assert_eq!(stop, None);
    }

    #[test]
    fn test_step_toward_routes_around_actor() {
        let world = world_from(
            OpenRoom::new(5, 1)
                .with_entry(Position::new(1, 1))
                .with_monster(MonsterKind::Rat, Position::new(2, 1)),
        );
        let planner = ExplorationPlanner::new(50);
        // Single-row corridor: the rat plugs it
        assert_eq!(planner.step_toward(&world, Position::new(1, 1), Position::new(5, 1)), None);
        // But the rat itself can be reached
        assert_eq!(
            planner.step_toward(&world, Position::new(1, 1), Position::new(2, 1)),
            Some(ActionRequest::Move { dx: 1, dy: 0 })
        );
    }

    #[test]
    fn test_known_traps_are_avoided() {
        let world = world_from(
            OpenRoom::new(3, 1)
                .with_entry(Position::new(1, 1))
                .with_trap(Position::new(2, 1), false),
        );
        let mut state = ExplorationState::new(6);
        let (_, stop) = ExplorationPlanner::new(50).next_step(&world, world.player_id(), &mut state);
        assert_eq!(stop, Some(StopReason::AllFrontierExhausted));
    }
}

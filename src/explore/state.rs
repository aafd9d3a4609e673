//! Per-actor exploration state
//!
//! Owned by the exploring actor and replaced wholesale on activation and
//! deactivation. Nothing else caches whether exploration is active: the
//! presence of this struct on the actor is the answer.

use std::collections::VecDeque;
use std::fmt;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::core::types::{ActorId, ItemId, Position};

/// Why the planner stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    Cancelled,
    NewMonsterSpotted(ActorId),
    NewItemFound(ItemId),
    NewStairsFound(Position),
    MovementBlocked,
    OscillationDetected,
    AllFrontierExhausted,
}

impl StopReason {
    /// Stable key used for metrics counters
    pub fn label(&self) -> &'static str {
        match self {
            StopReason::Cancelled => "cancelled",
            StopReason::NewMonsterSpotted(_) => "new_monster",
            StopReason::NewItemFound(_) => "new_item",
            StopReason::NewStairsFound(_) => "new_stairs",
            StopReason::MovementBlocked => "movement_blocked",
            StopReason::OscillationDetected => "oscillation",
            StopReason::AllFrontierExhausted => "frontier_exhausted",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::NewMonsterSpotted(id) => write!(f, "spotted {}", id),
            StopReason::NewItemFound(id) => write!(f, "found {}", id),
            StopReason::NewStairsFound(pos) => write!(f, "found stairs at {}", pos),
            StopReason::MovementBlocked => write!(f, "movement blocked"),
            StopReason::OscillationDetected => write!(f, "going back and forth"),
            StopReason::AllFrontierExhausted => write!(f, "nothing left to explore"),
        }
    }
}

/// The last move the planner asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedStep {
    pub from: Position,
    pub to: Position,
}

#[derive(Debug, Clone)]
pub struct ExplorationState {
    recent: VecDeque<Position>,
    window: usize,
    known_monsters: AHashSet<ActorId>,
    known_items: AHashSet<ItemId>,
    known_stairs: AHashSet<Position>,
    last_step: Option<PlannedStep>,
    steps_planned: u64,
}

impl ExplorationState {
    pub fn new(window: usize) -> Self {
        Self {
            recent: VecDeque::with_capacity(window),
            window,
            known_monsters: AHashSet::new(),
            known_items: AHashSet::new(),
            known_stairs: AHashSet::new(),
            last_step: None,
            steps_planned: 0,
        }
    }

    /// Fresh state that already knows about everything currently in view
    pub fn seeded(
        window: usize,
        monsters: impl IntoIterator<Item = ActorId>,
        items: impl IntoIterator<Item = ItemId>,
        stairs: impl IntoIterator<Item = Position>,
    ) -> Self {
        let mut state = Self::new(window);
        state.known_monsters.extend(monsters);
        state.known_items.extend(items);
        state.known_stairs.extend(stairs);
        state
    }

    /// Push a position into the ring; returns true when oscillating
    pub fn record_position(&mut self, pos: Position) -> bool {
        if self.recent.len() == self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(pos);
        self.is_oscillating()
    }

    /// Three complete A<->B alternations at the tail of the ring
    pub fn is_oscillating(&self) -> bool {
        const ALTERNATING_RUN: usize = 6;
        let n = self.recent.len();
        if n < ALTERNATING_RUN {
            return false;
        }
        let tail: Vec<&Position> = self.recent.iter().skip(n - ALTERNATING_RUN).collect();
        let (a, b) = (tail[0], tail[1]);
        a != b
            && tail
                .iter()
                .enumerate()
                .all(|(i, p)| if i % 2 == 0 { *p == a } else { *p == b })
    }

    /// Drop short-term movement memory but keep what has been discovered
    pub fn interrupt(&mut self) {
        self.recent.clear();
        self.last_step = None;
    }

    /// Returns true when the monster was not known before
    pub fn remember_monster(&mut self, id: ActorId) -> bool {
        self.known_monsters.insert(id)
    }

    pub fn remember_item(&mut self, id: ItemId) -> bool {
        self.known_items.insert(id)
    }

    pub fn remember_stairs(&mut self, pos: Position) -> bool {
        self.known_stairs.insert(pos)
    }

    pub fn knows_monster(&self, id: ActorId) -> bool {
        self.known_monsters.contains(&id)
    }

    pub fn knows_item(&self, id: ItemId) -> bool {
        self.known_items.contains(&id)
    }

    pub fn knows_stairs(&self, pos: Position) -> bool {
        self.known_stairs.contains(&pos)
    }

    pub fn known_stairs_count(&self) -> usize {
        self.known_stairs.len()
    }

    pub fn take_last_step(&mut self) -> Option<PlannedStep> {
        self.last_step.take()
    }

    pub fn plan_step(&mut self, from: Position, to: Position) {
        self.last_step = Some(PlannedStep { from, to });
        self.steps_planned += 1;
    }

    pub fn steps_planned(&self) -> u64 {
        self.steps_planned
    }

    pub fn recent(&self) -> impl Iterator<Item = &Position> {
        self.recent.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(state: &mut ExplorationState, positions: &[Position]) -> Vec<bool> {
        positions.iter().map(|p| state.record_position(*p)).collect()
    }

    #[test]
    fn test_three_alternations_detected() {
        let a = Position::new(1, 1);
        let b = Position::new(2, 1);
        let mut state = ExplorationState::new(6);
        let flags = feed(&mut state, &[a, b, a, b, a, b]);
        assert_eq!(flags, vec![false, false, false, false, false, true]);
    }

    #[test]
    fn test_two_and_a_half_alternations_not_detected() {
        let a = Position::new(1, 1);
        let b = Position::new(2, 1);
        let mut state = ExplorationState::new(6);
        assert!(!feed(&mut state, &[a, b, a, b, a]).into_iter().any(|f| f));
    }

    #[test]
    fn test_standing_still_is_not_oscillation() {
        let a = Position::new(1, 1);
        let mut state = ExplorationState::new(6);
        assert!(!feed(&mut state, &[a; 8]).into_iter().any(|f| f));
    }

    #[test]
    fn test_ring_is_bounded() {
        let mut state = ExplorationState::new(6);
        for x in 0..20 {
            state.record_position(Position::new(x, 0));
        }
        assert_eq!(state.recent().count(), 6);
    }

    #[test]
    fn test_interrupt_keeps_known_sets() {
        let mut state = ExplorationState::new(6);
        state.remember_stairs(Position::new(3, 3));
        state.record_position(Position::new(0, 0));
        state.interrupt();
        assert_eq!(state.recent().count(), 0);
        assert!(state.knows_stairs(Position::new(3, 3)));
    }

    #[test]
    fn test_remember_is_idempotent() {
        let mut state = ExplorationState::new(6);
        assert!(state.remember_monster(ActorId(4)));
        assert!(!state.remember_monster(ActorId(4)));
    }
}

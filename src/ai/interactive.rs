//! Interactive adapter
//!
//! The input layer pushes requests onto a queue; the adapter hands them out
//! one per tick. While the player's exploration is active and nothing is
//! queued, it steps the planner on the player's behalf and stops for good on
//! the first stop reason. Restarting is the human's call.

use std::collections::VecDeque;

use tracing::debug;

use crate::ai::{PolicyAgent, PolicyNote};
use crate::core::config::SimulationConfig;
use crate::core::types::{ActorId, SimRng};
use crate::explore::ExplorationPlanner;
use crate::turn::action::ActionRequest;
use crate::world::World;

#[derive(Debug, Clone)]
pub struct InteractivePolicy {
    queue: VecDeque<ActionRequest>,
    planner: ExplorationPlanner,
    notes: Vec<PolicyNote>,
}

impl InteractivePolicy {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            queue: VecDeque::new(),
            planner: ExplorationPlanner::from_config(config),
            notes: Vec::new(),
        }
    }

    pub fn push(&mut self, action: ActionRequest) {
        self.queue.push_back(action);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl PolicyAgent for InteractivePolicy {
    fn next_action(&mut self, world: &mut World, actor: ActorId, _rng: &mut SimRng) -> Option<ActionRequest> {
        if let Some(action) = self.queue.pop_front() {
            return Some(action);
        }

        let a = world.actor_mut(actor)?;
        let mut state = a.exploration.take()?;
        let (action, stop) = self.planner.next_step(world, actor, &mut state);

        let a = world.actor_mut(actor)?;
        match stop {
            None => {
                a.exploration = Some(state);
                Some(action)
            }
            Some(reason) => {
                debug!(%reason, "assisted exploration stopped");
                a.last_stop = Some(reason);
                self.notes.push(PolicyNote::ExplorationStopped(reason));
                None
            }
        }
    }

    fn drain_notes(&mut self) -> Vec<PolicyNote> {
        std::mem::take(&mut self.notes)
    }

    fn name(&self) -> &str {
        "interactive"
    }
}

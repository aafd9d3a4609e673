//! Policy agents: whatever decides an actor's next action
//!
//! The interactive adapter, the automated bot and the monster policy all sit
//! behind the same trait so the scheduler and session treat them alike.

pub mod bot;
pub mod interactive;
pub mod monster;
pub mod persona;

pub use bot::BotPolicy;
pub use interactive::InteractivePolicy;
pub use monster::MonsterPolicy;
pub use persona::{load_persona, load_persona_file, BotPersona};

use crate::core::types::{ActorId, SimRng};
use crate::explore::StopReason;
use crate::turn::action::ActionRequest;
use crate::world::World;

/// Something a policy wants the harness to know about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyNote {
    ExplorationStopped(StopReason),
    /// More than one action was produced in a tick and had to be collapsed
    DualAction,
    /// Gave up on the current floor after repeated oscillation
    FloorAbandoned,
}

pub trait PolicyAgent {
    /// Decide the actor's next action; `None` means there is nothing to do
    /// and no tick should run
    ///
    /// Takes the world mutably because exploration state lives on the actor.
    fn next_action(&mut self, world: &mut World, actor: ActorId, rng: &mut SimRng) -> Option<ActionRequest>;

    /// Drain notes gathered since the last call
    fn drain_notes(&mut self) -> Vec<PolicyNote> {
        Vec::new()
    }

    fn name(&self) -> &str;
}

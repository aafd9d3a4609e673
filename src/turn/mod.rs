//! Turn machinery: action requests, result events, status effects, the
//! resolver and the phase scheduler

pub mod action;
pub mod events;
pub mod resolver;
pub mod scheduler;
pub mod status;

pub use action::ActionRequest;
pub use events::{turn_spent, BlockReason, ResultEvent};
pub use resolver::{Resolve, ResolverRules, TurnResolver};
pub use scheduler::{PhaseScheduler, SchedulerAnomalies, TickSummary, TurnPhase};
pub use status::{Condition, EffectKind, Gate, RefreshPolicy, StatusEffect, StatusEffectLedger};

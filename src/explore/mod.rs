//! Automated exploration: per-actor state, frontier planner and A*

pub mod pathfinding;
pub mod planner;
pub mod state;

pub use planner::ExplorationPlanner;
pub use state::{ExplorationState, PlannedStep, StopReason};

//! Soak harness: run orchestration, per-run sessions, resettable services,
//! run records and batch metrics

pub mod metrics;
pub mod orchestrator;
pub mod record;
pub mod services;
pub mod session;

pub use metrics::{write_summary_json, BatchSummary, MetricsCollector};
pub use orchestrator::{run_seed, RunObserver, RunOrchestrator};
pub use record::{append_json_lines, RunOutcome, RunRecord, RunRecordBuilder};
pub use services::{FloorTracker, MovementValidator, MoveVerdict, Services, SharedWorld, SingletonService};
pub use session::{GameSession, StepReport};

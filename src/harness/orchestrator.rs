//! Soak batches
//!
//! Runs are strictly sequential. Every run boundary resets every service, so
//! nothing from run `i` can leak into run `i + 1`. A world that fails to
//! build aborts the whole batch; a panic inside a run is contained and
//! recorded as a crash.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tracing::{error, info, warn};

use crate::ai::{BotPersona, BotPolicy};
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::mix_seed;
use crate::harness::metrics::MetricsCollector;
use crate::harness::record::{RunOutcome, RunRecord, RunRecordBuilder};
use crate::harness::services::{Services, SharedWorld};
use crate::harness::session::GameSession;
use crate::world::{build_world, WorldFactory};

/// Hook called with each finished run
pub trait RunObserver {
    fn on_run_end(&mut self, record: &RunRecord, world: &SharedWorld);
}

/// Seed for run `index` of a batch
pub fn run_seed(seed_base: u64, index: u32) -> u64 {
    mix_seed(seed_base.wrapping_add(index as u64))
}

pub struct RunOrchestrator<F: WorldFactory> {
    config: SimulationConfig,
    persona: BotPersona,
    factory: F,
    services: Services,
    metrics: MetricsCollector,
    observers: Vec<Box<dyn RunObserver>>,
}

impl<F: WorldFactory> RunOrchestrator<F> {
    pub fn new(config: SimulationConfig, persona: BotPersona, factory: F) -> Self {
        let metrics = MetricsCollector::new(persona.name.clone());
        Self {
            config,
            persona,
            factory,
            services: Services::new(),
            metrics,
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn RunObserver>) {
        self.observers.push(observer);
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Run `n` games back to back
    pub fn run_batch(&mut self, n: u32, seed_base: u64, max_ticks: u64, max_depth: u32) -> Result<Vec<RunRecord>> {
        info!(runs = n, seed_base, persona = %self.persona.name, factory = self.factory.name(), "starting batch");
        let mut records = Vec::with_capacity(n as usize);

        for index in 0..n {
            let seed = run_seed(seed_base, index);
            let record = self.run_one(index, seed, max_ticks, max_depth)?;
            records.push(record);
        }

        info!(runs = n, "batch finished");
        Ok(records)
    }

    fn run_one(&mut self, index: u32, seed: u64, max_ticks: u64, max_depth: u32) -> Result<RunRecord> {
        self.services.reset_all(None);

        let (factory, config) = (&self.factory, &self.config);
        let built = self.metrics.time("world_build", || build_world(factory, config, seed));
        let world = match built {
            Ok(world) => Rc::new(RefCell::new(world)),
            Err(e) => {
                error!(run = index, seed, error = %e, "world construction failed; aborting batch");
                return Err(e);
            }
        };
        self.services.reset_all(Some(&world));

        let mut builder = RunRecordBuilder::new(index, seed, self.persona.name.clone());
        let policy = BotPolicy::new(self.persona.clone(), &self.config);

        let (config, factory, services) = (&self.config, &self.factory, &mut self.services);
        let caught = self.metrics.time("run", || {
            panic::catch_unwind(AssertUnwindSafe(|| {
                let mut session = GameSession::new(Rc::clone(&world), policy, config, factory, seed, max_depth);
                let outcome = session.drive(services, &mut builder, max_ticks);
                (outcome, session.ticks())
            }))
        });

        let (outcome, ticks) = match caught {
            Ok((Ok(outcome), ticks)) => (outcome, ticks),
            Ok((Err(e), _)) => {
                error!(run = index, seed, error = %e, "run failed to continue; aborting batch");
                self.services.reset_all(None);
                return Err(e);
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(run = index, seed, %message, "run panicked");
                builder.crashed(message);
                (RunOutcome::Crashed, builder.counter("ticks"))
            }
        };

        let (turns, floor) = match world.try_borrow() {
            Ok(w) => (w.turn, w.depth),
            Err(_) => (0, 0),
        };
        builder.set("turns", turns);
        let record = builder.seal(outcome, turns, ticks, floor);
        info!(run = index, seed, outcome = outcome.label(), turns, floor, "run finished");

        for observer in self.observers.iter_mut() {
            observer.on_run_end(&record, &world);
        }
        self.services.reset_all(None);
        self.metrics.record_run(record.clone());
        Ok(record)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

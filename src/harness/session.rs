//! One run's tick loop
//!
//! A session owns the turn RNG, the scheduler and the primary policy for a
//! single world. Each [`GameSession::step`] asks the policy for an action,
//! pre-validates movement through the bound services, runs one scheduler
//! tick and handles floor changes.

use rand::SeedableRng;
use tracing::{debug, info};

use crate::ai::{PolicyAgent, PolicyNote};
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::SimRng;
use crate::harness::record::{RunOutcome, RunRecordBuilder};
use crate::harness::services::{MoveVerdict, Services, SharedWorld};
use crate::turn::action::ActionRequest;
use crate::turn::events::ResultEvent;
use crate::turn::scheduler::PhaseScheduler;
use crate::world::{floor_rng, GameMode, WorldFactory};

/// What a single step did
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub action: Option<ActionRequest>,
    pub events: Vec<ResultEvent>,
    /// The move was rejected before any tick ran
    pub rejected: bool,
    pub turn_spent: bool,
}

pub struct GameSession<'a, P: PolicyAgent> {
    world: SharedWorld,
    rng: SimRng,
    scheduler: PhaseScheduler,
    policy: P,
    config: &'a SimulationConfig,
    factory: &'a dyn WorldFactory,
    run_seed: u64,
    max_depth: u32,
    ticks: u64,
    idle_streak: u32,
}

impl<'a, P: PolicyAgent> GameSession<'a, P> {
    pub fn new(
        world: SharedWorld,
        policy: P,
        config: &'a SimulationConfig,
        factory: &'a dyn WorldFactory,
        run_seed: u64,
        max_depth: u32,
    ) -> Self {
        Self {
            world,
            rng: SimRng::seed_from_u64(run_seed),
            scheduler: PhaseScheduler::from_config(config),
            policy,
            config,
            factory,
            run_seed,
            max_depth: max_depth.max(1),
            ticks: 0,
            idle_streak: 0,
        }
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    /// Policy consultations so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn turns(&self) -> u64 {
        self.world.borrow().turn
    }

    pub fn depth(&self) -> u32 {
        self.world.borrow().depth
    }

    pub fn idle_streak(&self) -> u32 {
        self.idle_streak
    }

    /// Consult the policy once and run at most one tick
    pub fn step(&mut self, services: &mut Services, record: &mut RunRecordBuilder) -> Result<StepReport> {
        self.ticks += 1;
        record.bump("ticks", 1);

        let (player, action) = {
            let mut world = self.world.borrow_mut();
            let player = world.player_id();
            (player, self.policy.next_action(&mut world, player, &mut self.rng))
        };
        for note in self.policy.drain_notes() {
            match note {
                PolicyNote::ExplorationStopped(reason) => record.bump(&format!("stop.{}", reason.label()), 1),
                PolicyNote::DualAction => record.bump("anomaly.dual_action", 1),
                PolicyNote::FloorAbandoned => record.bump("floor_abandoned", 1),
            }
        }

        let mut report = StepReport {
            action,
            events: Vec::new(),
            rejected: false,
            turn_spent: false,
        };
        let Some(action) = action else {
            self.idle_streak += 1;
            return Ok(report);
        };
        record.bump(&format!("action.{}", action.label()), 1);

        if services.movement.validate(player, &action)? == MoveVerdict::Blocked {
            record.bump("movement.rejected", 1);
            report.rejected = true;
            self.idle_streak += 1;
            return Ok(report);
        }

        let events = {
            let mut world = self.world.borrow_mut();
            self.scheduler.tick(&mut world, &mut self.rng, action)
        };
        for event in &events {
            record.bump(&format!("event.{}", event.label()), 1);
        }
        report.turn_spent = self.scheduler.last_tick().turn_spent;
        report.events = events;

        if report.turn_spent && action != ActionRequest::Wait {
            self.idle_streak = 0;
        } else {
            self.idle_streak += 1;
        }

        self.handle_descent()?;
        services.floors.observe()?;
        Ok(report)
    }

    fn handle_descent(&mut self) -> Result<()> {
        let mut world = self.world.borrow_mut();
        if !world.pending_descent || world.mode.is_terminal() {
            return Ok(());
        }
        if world.depth >= self.max_depth {
            info!(depth = world.depth, turn = world.turn, "floor limit reached");
            world.pending_descent = false;
            world.mode = GameMode::Victory;
            return Ok(());
        }

        let depth = world.depth + 1;
        let mut rng = floor_rng(self.run_seed, depth);
        let plan = self.factory.generate(self.config, depth, &mut rng)?;
        world.descend(plan)?;
        debug!(depth, factory = self.factory.name(), "entered new floor");
        Ok(())
    }

    /// Step until the run ends and report how it ended
    pub fn drive(&mut self, services: &mut Services, record: &mut RunRecordBuilder, max_ticks: u64) -> Result<RunOutcome> {
        let outcome = loop {
            if let Some(outcome) = self.finished(max_ticks) {
                break outcome;
            }
            self.step(services, record)?;
        };
        self.finish_counters(services, record);
        Ok(outcome)
    }

    fn finished(&self, max_ticks: u64) -> Option<RunOutcome> {
        match self.world.borrow().mode {
            GameMode::Defeat => return Some(RunOutcome::Died),
            GameMode::Victory => return Some(RunOutcome::Completed),
            GameMode::Playing | GameMode::Menu => {}
        }
        if self.ticks >= max_ticks {
            return Some(RunOutcome::TickLimit);
        }
        if self.idle_streak >= self.config.max_idle_ticks {
            return Some(RunOutcome::Stalled);
        }
        None
    }

    /// Copy end-of-run totals into the record
    pub fn finish_counters(&self, services: &Services, record: &mut RunRecordBuilder) {
        let anomalies = self.scheduler.anomalies();
        record.set("anomaly.reentrant_tick", anomalies.reentrant_ticks);
        record.set("anomaly.duplicate_actor", anomalies.duplicate_actors);
        record.set("movement.validated", services.movement.validated());
        record.set("movement.rejected", services.movement.rejected());
        record.set("floors_visited", services.floors.floors_visited() as u64);
    }
}

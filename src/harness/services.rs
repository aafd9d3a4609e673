//! Process-lifetime services bound to "the current world"
//!
//! Services outlive individual runs, so each holds only a weak handle to the
//! world it serves and is rebound through [`SingletonService::reset`] at
//! every run boundary. After a reset no service can reach a previous run's
//! world, even if something else keeps that world alive.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::core::error::{Result, SimError};
use crate::core::types::ActorId;
use crate::turn::action::ActionRequest;
use crate::world::World;

pub type SharedWorld = Rc<RefCell<World>>;

pub trait SingletonService {
    fn name(&self) -> &'static str;

    /// Drop all per-run state and bind to `world` (or to nothing)
    ///
    /// Idempotent, and safe to call with no world attached.
    fn reset(&mut self, world: Option<&SharedWorld>);

    fn is_bound(&self) -> bool;

    fn is_bound_to(&self, world: &SharedWorld) -> bool;
}

/// Weak handle shared by the services
#[derive(Debug, Default)]
struct WorldBinding {
    world: Option<Weak<RefCell<World>>>,
}

impl WorldBinding {
    fn bind(&mut self, world: Option<&SharedWorld>) {
        self.world = world.map(Rc::downgrade);
    }

    fn get(&self, service: &'static str) -> Result<SharedWorld> {
        self.world
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(SimError::NoWorldBound(service))
    }

    fn is_bound(&self) -> bool {
        self.world.as_ref().is_some_and(|w| w.strong_count() > 0)
    }

    fn is_bound_to(&self, world: &SharedWorld) -> bool {
        self.world
            .as_ref()
            .is_some_and(|w| std::ptr::eq(w.as_ptr(), Rc::as_ptr(world)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveVerdict {
    Valid,
    Blocked,
    /// Not a movement request; nothing to check
    NotAMove,
}

/// Checks movement requests against the bound world's terrain before a
/// tick is spent on them
#[derive(Debug, Default)]
pub struct MovementValidator {
    binding: WorldBinding,
    validated: u64,
    rejected: u64,
}

impl MovementValidator {
    pub const NAME: &'static str = "movement_validator";

    pub fn validate(&mut self, actor: ActorId, action: &ActionRequest) -> Result<MoveVerdict> {
        let ActionRequest::Move { dx, dy } = *action else {
            return Ok(MoveVerdict::NotAMove);
        };
        let world = self.binding.get(Self::NAME)?;
        let world = world.borrow();
        let from = world.actor(actor).ok_or(SimError::ActorNotFound(actor))?.pos;

        let to = from.offset(dx, dy);
        if world.map.is_walkable(to) {
            self.validated += 1;
            Ok(MoveVerdict::Valid)
        } else {
            self.rejected += 1;
            debug!(%actor, %to, "movement rejected before tick");
            Ok(MoveVerdict::Blocked)
        }
    }

    pub fn validated(&self) -> u64 {
        self.validated
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

impl SingletonService for MovementValidator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn reset(&mut self, world: Option<&SharedWorld>) {
        self.binding.bind(world);
        self.validated = 0;
        self.rejected = 0;
    }

    fn is_bound(&self) -> bool {
        self.binding.is_bound()
    }

    fn is_bound_to(&self, world: &SharedWorld) -> bool {
        self.binding.is_bound_to(world)
    }
}

/// Tracks which floors the bound world has been on and for how many turns
#[derive(Debug, Default)]
pub struct FloorTracker {
    binding: WorldBinding,
    current: Option<u32>,
    turns_per_floor: BTreeMap<u32, u64>,
    last_turn: u64,
}

impl FloorTracker {
    pub const NAME: &'static str = "floor_tracker";

    /// Sample the world; returns the new depth when the floor changed
    pub fn observe(&mut self) -> Result<Option<u32>> {
        let world = self.binding.get(Self::NAME)?;
        let world = world.borrow();

        let elapsed = world.turn.saturating_sub(self.last_turn);
        self.last_turn = world.turn;
        if let Some(depth) = self.current {
            *self.turns_per_floor.entry(depth).or_insert(0) += elapsed;
        }

        if self.current == Some(world.depth) {
            return Ok(None);
        }
        self.current = Some(world.depth);
        self.turns_per_floor.entry(world.depth).or_insert(0);
        Ok(Some(world.depth))
    }

    pub fn floors_visited(&self) -> usize {
        self.turns_per_floor.len()
    }

    pub fn turns_per_floor(&self) -> &BTreeMap<u32, u64> {
        &self.turns_per_floor
    }
}

impl SingletonService for FloorTracker {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn reset(&mut self, world: Option<&SharedWorld>) {
        self.binding.bind(world);
        self.current = None;
        self.turns_per_floor.clear();
        self.last_turn = 0;
    }

    fn is_bound(&self) -> bool {
        self.binding.is_bound()
    }

    fn is_bound_to(&self, world: &SharedWorld) -> bool {
        self.binding.is_bound_to(world)
    }
}

/// Every service the harness owns
#[derive(Debug, Default)]
pub struct Services {
    pub movement: MovementValidator,
    pub floors: FloorTracker,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every service
    ///
    /// The destructuring is exhaustive: adding a field without resetting it
    /// fails to compile.
    pub fn reset_all(&mut self, world: Option<&SharedWorld>) {
        let Services { movement, floors } = self;
        let all: [&mut dyn SingletonService; 2] = [movement, floors];
        for service in all {
            service.reset(world);
        }
    }

    pub fn all(&self) -> [&dyn SingletonService; 2] {
        let Services { movement, floors } = self;
        [movement, floors]
    }
}

//! Result events emitted by the resolver and scheduler
//!
//! Events are the only downstream output of a tick. A presenter renders them
//! with [`ResultEvent::describe`]; the harness counts them.

use serde::{Deserialize, Serialize};

use crate::core::types::{ActorId, ItemId, Position, TrapId};
use crate::explore::StopReason;
use crate::turn::status::EffectKind;
use crate::world::items::ItemKind;
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockReason {
    Wall,
    Occupied(ActorId),
    InvalidStep,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultEvent {
    Moved {
        actor: ActorId,
        from: Position,
        to: Position,
    },
    Attacked {
        attacker: ActorId,
        target: ActorId,
        damage: i32,
        remaining_hp: i32,
    },
    ItemUsed {
        actor: ActorId,
        item: ItemId,
        healed: i32,
    },
    Died {
        actor: ActorId,
        killer: Option<ActorId>,
    },
    Blocked {
        actor: ActorId,
        at: Position,
        reason: BlockReason,
    },
    Message {
        actor: Option<ActorId>,
        text: String,
    },
    Waited {
        actor: ActorId,
    },
    Vetoed {
        actor: ActorId,
        effect: EffectKind,
    },
    ItemPickedUp {
        actor: ActorId,
        item: ItemId,
        kind: ItemKind,
    },
    TrapTriggered {
        actor: ActorId,
        trap: TrapId,
        damage: i32,
    },
    TrapRevealed {
        actor: ActorId,
        trap: TrapId,
        at: Position,
    },
    TrapDisarmed {
        actor: ActorId,
        trap: TrapId,
    },
    DisarmFailed {
        actor: ActorId,
        trap: TrapId,
    },
    Searched {
        actor: ActorId,
        found: u32,
    },
    ExploreStarted {
        actor: ActorId,
    },
    ExploreStopped {
        actor: ActorId,
        reason: StopReason,
    },
    Descended {
        actor: ActorId,
        depth: u32,
    },
    StatusApplied {
        actor: ActorId,
        effect: EffectKind,
    },
    StatusExpired {
        actor: ActorId,
        effect: EffectKind,
    },
    PoisonDamage {
        actor: ActorId,
        damage: i32,
    },
}

impl ResultEvent {
    /// Whether this event consumes the acting actor's turn
    ///
    /// Side effects that ride along with a turn-ending event (pickups,
    /// deaths, status changes) return false on their own.
    pub fn ends_turn(&self) -> bool {
        match self {
            ResultEvent::Moved { .. }
            | ResultEvent::Attacked { .. }
            | ResultEvent::ItemUsed { .. }
            | ResultEvent::Waited { .. }
            | ResultEvent::Vetoed { .. }
            | ResultEvent::TrapDisarmed { .. }
            | ResultEvent::DisarmFailed { .. }
            | ResultEvent::Searched { .. }
            | ResultEvent::Descended { .. } => true,
            ResultEvent::Died { .. }
            | ResultEvent::Blocked { .. }
            | ResultEvent::Message { .. }
            | ResultEvent::ItemPickedUp { .. }
            | ResultEvent::TrapTriggered { .. }
            | ResultEvent::TrapRevealed { .. }
            | ResultEvent::ExploreStarted { .. }
            | ResultEvent::ExploreStopped { .. }
            | ResultEvent::StatusApplied { .. }
            | ResultEvent::StatusExpired { .. }
            | ResultEvent::PoisonDamage { .. } => false,
        }
    }

    /// Stable key used for metrics counters
    pub fn label(&self) -> &'static str {
        match self {
            ResultEvent::Moved { .. } => "moved",
            ResultEvent::Attacked { .. } => "attacked",
            ResultEvent::ItemUsed { .. } => "item_used",
            ResultEvent::Died { .. } => "died",
            ResultEvent::Blocked { .. } => "blocked",
            ResultEvent::Message { .. } => "message",
            ResultEvent::Waited { .. } => "waited",
            ResultEvent::Vetoed { .. } => "vetoed",
            ResultEvent::ItemPickedUp { .. } => "item_picked_up",
            ResultEvent::TrapTriggered { .. } => "trap_triggered",
            ResultEvent::TrapRevealed { .. } => "trap_revealed",
            ResultEvent::TrapDisarmed { .. } => "trap_disarmed",
            ResultEvent::DisarmFailed { .. } => "disarm_failed",
            ResultEvent::Searched { .. } => "searched",
            ResultEvent::ExploreStarted { .. } => "explore_started",
            ResultEvent::ExploreStopped { .. } => "explore_stopped",
            ResultEvent::Descended { .. } => "descended",
            ResultEvent::StatusApplied { .. } => "status_applied",
            ResultEvent::StatusExpired { .. } => "status_expired",
            ResultEvent::PoisonDamage { .. } => "poison_damage",
        }
    }

    /// The actor this event is about, if any
    pub fn actor(&self) -> Option<ActorId> {
        match self {
            ResultEvent::Attacked { attacker, .. } => Some(*attacker),
            ResultEvent::Message { actor, .. } => *actor,
            ResultEvent::Moved { actor, .. }
            | ResultEvent::ItemUsed { actor, .. }
            | ResultEvent::Died { actor, .. }
            | ResultEvent::Blocked { actor, .. }
            | ResultEvent::Waited { actor }
            | ResultEvent::Vetoed { actor, .. }
            | ResultEvent::ItemPickedUp { actor, .. }
            | ResultEvent::TrapTriggered { actor, .. }
            | ResultEvent::TrapRevealed { actor, .. }
            | ResultEvent::TrapDisarmed { actor, .. }
            | ResultEvent::DisarmFailed { actor, .. }
            | ResultEvent::Searched { actor, .. }
            | ResultEvent::ExploreStarted { actor }
            | ResultEvent::ExploreStopped { actor, .. }
            | ResultEvent::Descended { actor, .. }
            | ResultEvent::StatusApplied { actor, .. }
            | ResultEvent::StatusExpired { actor, .. }
            | ResultEvent::PoisonDamage { actor, .. } => Some(*actor),
        }
    }

    /// Plain-text rendering for any presenter
    pub fn describe(&self, world: &World) -> String {
        let name = |id: &ActorId| world.actor_name(*id);
        match self {
            ResultEvent::Moved { actor, to, .. } => format!("{} moves to {}", name(actor), to),
            ResultEvent::Attacked {
                attacker,
                target,
                damage,
                remaining_hp,
            } => format!(
                "{} hits {} for {} ({} hp left)",
                name(attacker),
                name(target),
                damage,
                remaining_hp
            ),
            ResultEvent::ItemUsed { actor, healed, .. } => {
                format!("{} drinks a potion and recovers {} hp", name(actor), healed)
            }
            ResultEvent::Died { actor, killer } => match killer {
                Some(k) => format!("{} is slain by {}", name(actor), name(k)),
                None => format!("{} dies", name(actor)),
            },
            ResultEvent::Blocked { actor, at, reason } => match reason {
                BlockReason::Wall => format!("{} bumps into a wall at {}", name(actor), at),
                BlockReason::Occupied(other) => {
                    format!("{} is blocked by {}", name(actor), name(other))
                }
                BlockReason::InvalidStep => format!("{} cannot step that way", name(actor)),
            },
            ResultEvent::Message { text, .. } => text.clone(),
            ResultEvent::Waited { actor } => format!("{} waits", name(actor)),
            ResultEvent::Vetoed { actor, effect } => {
                format!("{} is {} and loses the turn", name(actor), effect.label())
            }
            ResultEvent::ItemPickedUp { actor, kind, .. } => {
                format!("{} picks up {}", name(actor), kind.name())
            }
            ResultEvent::TrapTriggered { actor, damage, .. } => {
                format!("{} triggers a trap and takes {} damage", name(actor), damage)
            }
            ResultEvent::TrapRevealed { actor, at, .. } => {
                format!("{} spots a trap at {}", name(actor), at)
            }
            ResultEvent::TrapDisarmed { actor, .. } => format!("{} disarms a trap", name(actor)),
            ResultEvent::DisarmFailed { actor, .. } => {
                format!("{} fumbles the disarm", name(actor))
            }
            ResultEvent::Searched { actor, found } => {
                format!("{} searches and finds {} trap(s)", name(actor), found)
            }
            ResultEvent::ExploreStarted { actor } => format!("{} starts exploring", name(actor)),
            ResultEvent::ExploreStopped { actor, reason } => {
                format!("{} stops exploring: {}", name(actor), reason)
            }
            ResultEvent::Descended { actor, depth } => {
                format!("{} descends to depth {}", name(actor), depth)
            }
            ResultEvent::StatusApplied { actor, effect } => {
                format!("{} is now {}", name(actor), effect.label())
            }
            ResultEvent::StatusExpired { actor, effect } => {
                format!("{} is no longer {}", name(actor), effect.label())
            }
            ResultEvent::PoisonDamage { actor, damage } => {
                format!("{} suffers {} poison damage", name(actor), damage)
            }
        }
    }
}

/// True if any event in the list consumed the actor's turn
pub fn turn_spent(events: &[ResultEvent]) -> bool {
    events.iter().any(ResultEvent::ends_turn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_effects_do_not_end_turn() {
        let actor = ActorId(1);
        assert!(!ResultEvent::Blocked {
            actor,
            at: Position::new(0, 0),
            reason: BlockReason::Wall
        }
        .ends_turn());
        assert!(!ResultEvent::ExploreStarted { actor }.ends_turn());
        assert!(ResultEvent::Waited { actor }.ends_turn());
    }

    #[test]
    fn test_turn_spent_any() {
        let actor = ActorId(1);
        let events = vec![
            ResultEvent::Message {
                actor: Some(actor),
                text: "hello".into(),
            },
            ResultEvent::Searched { actor, found: 0 },
        ];
        assert!(turn_spent(&events));
        assert!(!turn_spent(&events[..1]));
    }
}

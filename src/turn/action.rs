//! Action requests issued by policies

use serde::{Deserialize, Serialize};

use crate::core::types::{ActorId, ItemId, TrapId};

/// One requested action for one actor
///
/// Immutable once issued: the resolver consumes it by value and any
/// redirection produces a new request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionRequest {
    Move { dx: i32, dy: i32 },
    Attack(ActorId),
    UseItem { item: ItemId, target: Option<ActorId> },
    Wait,
    StartExploring,
    CancelExploring,
    Search,
    Disarm(TrapId),
    Descend,
}

impl ActionRequest {
    /// Meta actions change policy state and never end the turn
    pub fn is_meta(&self) -> bool {
        matches!(self, ActionRequest::StartExploring | ActionRequest::CancelExploring)
    }

    pub fn is_move(&self) -> bool {
        matches!(self, ActionRequest::Move { .. })
    }

    /// Stable key used for metrics counters
    pub fn label(&self) -> &'static str {
        match self {
            ActionRequest::Move { .. } => "move",
            ActionRequest::Attack(_) => "attack",
            ActionRequest::UseItem { .. } => "use_item",
            ActionRequest::Wait => "wait",
            ActionRequest::StartExploring => "start_exploring",
            ActionRequest::CancelExploring => "cancel_exploring",
            ActionRequest::Search => "search",
            ActionRequest::Disarm(_) => "disarm",
            ActionRequest::Descend => "descend",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_actions() {
        assert!(ActionRequest::StartExploring.is_meta());
        assert!(ActionRequest::CancelExploring.is_meta());
        assert!(!ActionRequest::Wait.is_meta());
        assert!(!ActionRequest::Move { dx: 1, dy: 0 }.is_meta());
    }

    #[test]
    fn test_serializes_as_tagged_enum() {
        let json = serde_json::to_string(&ActionRequest::Move { dx: -1, dy: 1 }).unwrap();
        assert_eq!(json, r#"{"Move":{"dx":-1,"dy":1}}"#);
    }
}

//! Per-actor status effects
//!
//! The ledger is the only thing allowed to veto, slow or redirect an action.
//! Durations are unsigned and decay with saturating arithmetic, so a duration
//! can never go negative or wrap.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::{Faction, SimRng, DIRECTIONS};
use crate::turn::action::ActionRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    /// Cannot move (attacks and item use still allowed)
    Immobilized,
    /// Loses every Nth turn, counted from when it landed
    Slowed { every: u32 },
    /// Movement goes in a random direction
    Confused,
    /// Takes damage each ledger tick
    Poisoned { per_tick: i32 },
}

impl EffectKind {
    /// Kinds compare by variant only; parameters are refreshed in place
    pub fn same_kind(&self, other: &EffectKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    pub fn label(&self) -> &'static str {
        match self {
            EffectKind::Immobilized => "immobilized",
            EffectKind::Slowed { .. } => "slowed",
            EffectKind::Confused => "confused",
            EffectKind::Poisoned { .. } => "poisoned",
        }
    }
}

/// Conditions a `WhileCondition` effect can be tied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// Some living actor of this faction stands next to the holder
    AdjacentToFaction(Faction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshPolicy {
    /// Loses one tick of duration per ledger tick
    Decay,
    /// Frozen while the condition holds, decays by one otherwise
    WhileCondition(Condition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: EffectKind,
    pub remaining: u32,
    pub refresh: RefreshPolicy,
    /// Ledger ticks survived since the effect was applied
    #[serde(default)]
    pub elapsed: u32,
}

impl StatusEffect {
    pub fn new(kind: EffectKind, remaining: u32, refresh: RefreshPolicy) -> Self {
        Self {
            kind,
            remaining,
            refresh,
            elapsed: 0,
        }
    }

    pub fn decaying(kind: EffectKind, remaining: u32) -> Self {
        Self::new(kind, remaining, RefreshPolicy::Decay)
    }
}

/// What the ledger decided about an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Proceed(ActionRequest),
    Veto(EffectKind),
    Redirect {
        action: ActionRequest,
        effect: EffectKind,
    },
}

/// Outcome of one ledger tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerTick {
    pub expired: Vec<EffectKind>,
    pub poison_damage: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusEffectLedger {
    effects: Vec<StatusEffect>,
}

impl StatusEffectLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an effect; an existing effect of the same kind is refreshed to the
    /// longer of the two durations and takes the new parameters. The elapsed
    /// count is kept so a refresh does not reset a slow's cadence.
    pub fn apply(&mut self, effect: StatusEffect) {
        if effect.remaining == 0 {
            return;
        }
        match self.effects.iter_mut().find(|e| e.kind.same_kind(&effect.kind)) {
            Some(existing) => {
                existing.remaining = existing.remaining.max(effect.remaining);
                existing.kind = effect.kind;
                existing.refresh = effect.refresh;
            }
            None => self.effects.push(effect),
        }
    }

    pub fn has(&self, kind: &EffectKind) -> bool {
        self.effects.iter().any(|e| e.kind.same_kind(kind))
    }

    pub fn remaining(&self, kind: &EffectKind) -> Option<u32> {
        self.effects
            .iter()
            .find(|e| e.kind.same_kind(kind))
            .map(|e| e.remaining)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.effects.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    /// Decide whether an action goes ahead
    ///
    /// Checked in ledger order of severity: immobilized, slowed, confused.
    /// Meta actions and waiting are never gated.
    pub fn gate(&self, action: ActionRequest, rng: &mut SimRng) -> Gate {
        if action.is_meta() || action == ActionRequest::Wait {
            return Gate::Proceed(action);
        }

        let is_move = matches!(action, ActionRequest::Move { .. });
        for effect in &self.effects {
            match effect.kind {
                EffectKind::Immobilized if is_move => return Gate::Veto(effect.kind),
                EffectKind::Slowed { every } if every > 0 && (effect.elapsed + 1) % every == 0 => {
                    return Gate::Veto(effect.kind)
                }
                _ => {}
            }
        }

        if is_move && self.has(&EffectKind::Confused) {
            let (dx, dy) = DIRECTIONS[rng.gen_range(0..DIRECTIONS.len())];
            return Gate::Redirect {
                action: ActionRequest::Move { dx, dy },
                effect: EffectKind::Confused,
            };
        }

        Gate::Proceed(action)
    }

    /// Advance every effect by one tick
    ///
    /// `condition_holds` is evaluated against the holder's surroundings by
    /// the caller; the ledger itself never looks at the world.
    pub fn tick(&mut self, condition_holds: impl Fn(&Condition) -> bool) -> LedgerTick {
        let mut outcome = LedgerTick::default();

        for effect in &mut self.effects {
            if let EffectKind::Poisoned { per_tick } = effect.kind {
                outcome.poison_damage += per_tick.max(0);
            }
            let frozen = match &effect.refresh {
                RefreshPolicy::Decay => false,
                RefreshPolicy::WhileCondition(condition) => condition_holds(condition),
            };
            if !frozen {
                effect.remaining = effect.remaining.saturating_sub(1);
            }
            effect.elapsed = effect.elapsed.saturating_add(1);
        }

        self.effects.retain(|e| {
            if e.remaining == 0 {
                outcome.expired.push(e.kind);
                false
            } else {
                true
            }
        });

        outcome
    }
}

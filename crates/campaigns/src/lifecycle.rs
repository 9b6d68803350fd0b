//! Campaign lifecycle state machine.
//!
//! Pending → CreativeSent → Active → Archived, with the single reverse
//! edge Archived → Active (reactivation). Every state change in the store
//! goes through this table; there are no other legal edges.

use serde::{Deserialize, Serialize};
use siscoca_core::error::{SiscocaError, SiscocaResult};
use siscoca_core::types::CampaignState;

/// Describes a single valid transition in the campaign lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: CampaignState,
    pub to: CampaignState,
    pub trigger: String,
}

/// Guards the campaign lifecycle by enforcing a finite set of valid
/// state transitions.
#[derive(Debug, Clone)]
pub struct CampaignStateMachine {
    transitions: Vec<StateTransition>,
}

impl CampaignStateMachine {
    pub fn new() -> Self {
        let transitions = vec![
            StateTransition {
                from: CampaignState::Pending,
                to: CampaignState::CreativeSent,
                trigger: "creative_attached".to_string(),
            },
            StateTransition {
                from: CampaignState::CreativeSent,
                to: CampaignState::Active,
                trigger: "activate".to_string(),
            },
            StateTransition {
                from: CampaignState::Active,
                to: CampaignState::Archived,
                trigger: "archive".to_string(),
            },
            StateTransition {
                from: CampaignState::Archived,
                to: CampaignState::Active,
                trigger: "reactivate".to_string(),
            },
        ];

        Self { transitions }
    }

    /// Returns `true` if the given transition is allowed. A no-op
    /// transition (same state) is always allowed.
    pub fn can_transition(&self, from: CampaignState, to: CampaignState) -> bool {
        from == to
            || self
                .transitions
                .iter()
                .any(|t| t.from == from && t.to == to)
    }

    /// Checks a transition, returning an error naming the offending edge
    /// when it is not permitted.
    pub fn ensure_transition(&self, from: CampaignState, to: CampaignState) -> SiscocaResult<()> {
        if self.can_transition(from, to) {
            Ok(())
        } else {
            Err(SiscocaError::InvalidTransition {
                from: from.display_name().to_string(),
                to: to.display_name().to_string(),
            })
        }
    }
}

impl Default for CampaignStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_path_is_legal() {
        let machine = CampaignStateMachine::new();
        assert!(machine.can_transition(CampaignState::Pending, CampaignState::CreativeSent));
        assert!(machine.can_transition(CampaignState::CreativeSent, CampaignState::Active));
        assert!(machine.can_transition(CampaignState::Active, CampaignState::Archived));
    }

    #[test]
    fn reactivation_is_the_only_reverse_edge() {
        let machine = CampaignStateMachine::new();
        assert!(machine.can_transition(CampaignState::Archived, CampaignState::Active));
        assert!(!machine.can_transition(CampaignState::Active, CampaignState::CreativeSent));
        assert!(!machine.can_transition(CampaignState::CreativeSent, CampaignState::Pending));
        assert!(!machine.can_transition(CampaignState::Archived, CampaignState::Pending));
    }

    #[test]
    fn skipping_states_is_rejected() {
        let machine = CampaignStateMachine::new();
        assert!(!machine.can_transition(CampaignState::Pending, CampaignState::Active));
        assert!(!machine.can_transition(CampaignState::Pending, CampaignState::Archived));
        assert!(!machine.can_transition(CampaignState::CreativeSent, CampaignState::Archived));

        let err = machine
            .ensure_transition(CampaignState::Pending, CampaignState::Archived)
            .unwrap_err();
        assert!(err.to_string().contains("Pending"));
        assert!(err.to_string().contains("Archived"));
    }

    #[test]
    fn same_state_is_a_no_op() {
        let machine = CampaignStateMachine::new();
        assert!(machine
            .ensure_transition(CampaignState::Active, CampaignState::Active)
            .is_ok());
    }
}

//! Driver lifecycle state machine.
//!
//! Unconfigured → Inactive ↔ Active, Inactive → Unconfigured, any → Finalized.
//!
//! The machine only decides whether a transition is allowed. Drivers ask
//! with [`LifecycleStateMachine::next_state`], perform their side effects,
//! and commit with [`LifecycleStateMachine::handle_event`] only on success,
//! so a failed activation leaves the state untouched.

use rrbot_common::hal::driver::HalError;
use rrbot_common::hal::types::{LifecycleEvent, LifecycleState};

/// Result of a lifecycle transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition allowed, with the new state.
    Ok(LifecycleState),
    /// Transition rejected, with the reason.
    Rejected(&'static str),
}

impl TransitionResult {
    /// Convert into a `Result`, attaching the source state and event on rejection.
    pub fn into_result(
        self,
        from: LifecycleState,
        event: LifecycleEvent,
    ) -> Result<LifecycleState, HalError> {
        match self {
            TransitionResult::Ok(next) => Ok(next),
            TransitionResult::Rejected(reason) => Err(HalError::InvalidTransition {
                from,
                event,
                reason,
            }),
        }
    }
}

/// Lifecycle state holder.
#[derive(Debug, Clone)]
pub struct LifecycleStateMachine {
    state: LifecycleState,
}

impl LifecycleStateMachine {
    /// Create a new machine in Unconfigured state.
    pub const fn new() -> Self {
        Self {
            state: LifecycleState::Unconfigured,
        }
    }

    /// Current state.
    #[inline]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Evaluate `event` against the transition table without committing.
    pub fn next_state(&self, event: LifecycleEvent) -> TransitionResult {
        use LifecycleEvent::*;
        use LifecycleState::*;

        let next = match (self.state, event) {
            // Configure is repeatable while not Active.
            (Unconfigured, Configure) | (Inactive, Configure) => Inactive,

            (Inactive, Activate) => Active,
            (Active, Deactivate) => Inactive,
            (Inactive, Cleanup) => Unconfigured,

            (Finalized, _) => return TransitionResult::Rejected("driver is finalized"),
            (_, Shutdown) => Finalized,

            (Active, Configure) | (Active, Cleanup) => {
                return TransitionResult::Rejected("deactivate first");
            }
            (Unconfigured, Activate) => return TransitionResult::Rejected("configure first"),
            (Active, Activate) => return TransitionResult::Rejected("already active"),
            (Unconfigured, Deactivate) | (Inactive, Deactivate) => {
                return TransitionResult::Rejected("not active");
            }
            (Unconfigured, Cleanup) => return TransitionResult::Rejected("not configured"),
        };

        TransitionResult::Ok(next)
    }

    /// Evaluate `event` and commit the new state if allowed.
    pub fn handle_event(&mut self, event: LifecycleEvent) -> TransitionResult {
        let result = self.next_state(event);
        if let TransitionResult::Ok(next) = result {
            self.state = next;
        }
        result
    }

    /// Whether cyclic read/write may run.
    #[inline]
    pub const fn allows_cycle(&self) -> bool {
        matches!(self.state, LifecycleState::Active)
    }
}

impl Default for LifecycleStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

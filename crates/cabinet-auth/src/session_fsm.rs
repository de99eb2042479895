//! Session lifecycle state machine using rust-fsm.
//!
//! ```text
//!                 ┌──────────────────┐
//!   (initial) ──► │   Initializing   │ ◄──────────── TokenChanged ───────┐
//!                 └────────┬─────────┘                                  │
//!          ResolvedUser    │    ResolvedAnonymous                       │
//!          ┌───────────────┴──────────────┐                             │
//!          ▼                              ▼                             │
//! ┌──────────────────┐  LogoutRequested  ┌──────────────────┐           │
//! │  Authenticated   │ ────────────────► │ Unauthenticated  │ ──────────┘
//! └──────────────────┘                   └──────────────────┘
//! ```
//!
//! `LogoutRequested` is accepted in every state.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Initializing)

    Initializing => {
        TokenChanged => Initializing,
        ResolvedUser => Authenticated,
        ResolvedAnonymous => Unauthenticated,
        LogoutRequested => Unauthenticated
    },
    Authenticated => {
        TokenChanged => Initializing,
        LogoutRequested => Unauthenticated
    },
    Unauthenticated => {
        TokenChanged => Initializing,
        LogoutRequested => Unauthenticated
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// A resolution is in flight; no user yet.
    Initializing,
    Authenticated,
    /// Confirmed: no user.
    Unauthenticated,
}

impl From<&SessionMachineState> for SessionPhase {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Initializing => SessionPhase::Initializing,
            SessionMachineState::Authenticated => SessionPhase::Authenticated,
            SessionMachineState::Unauthenticated => SessionPhase::Unauthenticated,
        }
    }
}

impl SessionPhase {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionPhase::Initializing)
    }
}

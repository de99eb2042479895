//! Session core for the cabinet client.
//!
//! This crate provides:
//! - Token resolution against the backend with a decoded-claims fallback
//! - A tab-wide auth context with an FSM-checked lifecycle
//! - Role guards and the role-based dashboard menu
//! - The shared REST request layer

mod api;
mod backend;
mod context;
mod error;
mod guard;
mod identity;
mod menu;
mod navigation;
mod resolver;
mod role;
mod session_fsm;

pub use api::{ApiClient, Bearer, HttpAuthBackend, CURRENT_USER_PATH, LOGIN_PATH};
pub use backend::{AuthBackend, Credentials, LoginResponse};
pub use context::{AuthContext, Notice, Session};
pub use error::{AuthError, AuthResult};
pub use guard::{GuardDecision, GuardHandle, RoleGuard};
pub use identity::{Identity, TokenClaims, Trust, UserRecord};
pub use menu::{can_access, visible_items, NavItem, NAV_ITEMS};
pub use navigation::{HistoryNavigator, NavigationKind, Navigator};
pub use resolver::{Resolution, SessionResolver};
pub use role::Role;
pub use session_fsm::session_machine;
pub use session_fsm::{SessionMachine, SessionMachineInput, SessionMachineState, SessionPhase};

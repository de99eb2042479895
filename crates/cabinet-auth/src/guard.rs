//! Role-based route gating.

use crate::context::Session;
use crate::navigation::{NavigationKind, Navigator};
use crate::role::Role;
use cabinet_config_and_utils::{DEFAULT_HOME_ROUTE, DEFAULT_LOGIN_ROUTE};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// What a gated view should do for the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still resolving: show a placeholder, do not navigate.
    Pending,
    Render,
    Redirect(String),
}

/// Admits sessions whose role is in an allowed set.
#[derive(Debug, Clone)]
pub struct RoleGuard {
    allowed: Vec<Role>,
    login_route: String,
    home_route: String,
}

impl RoleGuard {
    /// Guard admitting `allowed` roles, compared case-insensitively.
    /// Unrecognized names admit nobody.
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roles = Vec::new();
        for role in allowed.into_iter().map(|name| Role::parse(name.as_ref())) {
            if role.is_known() && !roles.contains(&role) {
                roles.push(role);
            }
        }

        Self {
            allowed: roles,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            home_route: DEFAULT_HOME_ROUTE.to_string(),
        }
    }

    pub fn with_routes(mut self, login_route: impl Into<String>, home_route: impl Into<String>) -> Self {
        self.login_route = login_route.into();
        self.home_route = home_route.into();
        self
    }

    pub fn allowed(&self) -> &[Role] {
        &self.allowed
    }

    pub fn admits(&self, role: Role) -> bool {
        role.is_known() && self.allowed.contains(&role)
    }

    pub fn evaluate(&self, session: &Session) -> GuardDecision {
        if session.loading {
            return GuardDecision::Pending;
        }

        match session.role() {
            None => GuardDecision::Redirect(self.login_route.clone()),
            Some(role) if self.admits(role) => GuardDecision::Render,
            Some(_) => GuardDecision::Redirect(self.home_route.clone()),
        }
    }

    /// Re-evaluate on every session change, navigating on new redirects.
    pub fn spawn(
        self,
        mut sessions: watch::Receiver<Session>,
        navigator: Arc<dyn Navigator>,
    ) -> GuardHandle {
        let (decisions, decision) = watch::channel(GuardDecision::Pending);

        let task = tokio::spawn(async move {
            let mut last_redirect: Option<String> = None;
            loop {
                let decision = {
                    let session = sessions.borrow_and_update();
                    self.evaluate(&session)
                };

                match &decision {
                    GuardDecision::Redirect(route) if last_redirect.as_ref() != Some(route) => {
                        debug!(route = %route, allowed = ?self.allowed, "guard redirect");
                        navigator.navigate(route, NavigationKind::Soft);
                        last_redirect = Some(route.clone());
                    }
                    GuardDecision::Render => last_redirect = None,
                    _ => {}
                }
                decisions.send_replace(decision);

                if sessions.changed().await.is_err() {
                    break;
                }
            }
        });

        GuardHandle { decision, task }
    }
}

/// Running guard; stops when dropped.
pub struct GuardHandle {
    decision: watch::Receiver<GuardDecision>,
    task: JoinHandle<()>,
}

impl GuardHandle {
    pub fn decision(&self) -> GuardDecision {
        self.decision.borrow().clone()
    }

    /// Wait for the first decision other than [`GuardDecision::Pending`].
    pub async fn settled(&mut self) -> GuardDecision {
        if let Ok(decision) = self
            .decision
            .wait_for(|decision| *decision != GuardDecision::Pending)
            .await
        {
            return decision.clone();
        }
        self.decision.borrow().clone()
    }
}

impl Drop for GuardHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

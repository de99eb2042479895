//! Route navigation seam.

use parking_lot::Mutex;
use tracing::info;

/// How a navigation is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// Reload from scratch; all in-memory view state is discarded.
    Full,
    /// In-app route change.
    Soft,
}

/// Moves the user between routes.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str, kind: NavigationKind);

    fn current_route(&self) -> String;
}

/// In-memory navigator that records every navigation.
pub struct HistoryNavigator {
    state: Mutex<History>,
}

struct History {
    current: String,
    entries: Vec<(String, NavigationKind)>,
}

impl HistoryNavigator {
    pub fn new(initial_route: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(History {
                current: initial_route.into(),
                entries: Vec::new(),
            }),
        }
    }

    /// Every navigation so far, oldest first.
    pub fn history(&self) -> Vec<(String, NavigationKind)> {
        self.state.lock().entries.clone()
    }

    pub fn last(&self) -> Option<(String, NavigationKind)> {
        self.state.lock().entries.last().cloned()
    }
}

impl Default for HistoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, route: &str, kind: NavigationKind) {
        info!(route, kind = ?kind, "navigate");
        let mut state = self.state.lock();
        state.current = route.to_string();
        state.entries.push((route.to_string(), kind));
    }

    fn current_route(&self) -> String {
        self.state.lock().current.clone()
    }
}

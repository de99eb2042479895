//! Tab-wide authentication state.
//!
//! [`AuthContext`] owns the session of one tab: it resolves the stored token
//! at start, re-resolves on every token change (local or from another tab),
//! and exposes `login`/`logout`. Every resolution is tagged with a generation
//! number and only the latest one may update the session, so a slow response
//! for an old token never overwrites the result for a newer one.

use crate::backend::{AuthBackend, Credentials};
use crate::error::{AuthError, AuthResult};
use crate::identity::Identity;
use crate::navigation::{NavigationKind, Navigator};
use crate::resolver::{Resolution, SessionResolver};
use crate::role::Role;
use crate::session_fsm::{SessionMachine, SessionMachineInput, SessionPhase};
use cabinet_config_and_utils::Config;
use cabinet_storage::TokenStore;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const NOTICE_CAPACITY: usize = 16;

/// Snapshot of the authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: Option<Identity>,
    /// True while the first or a newer resolution is in flight.
    pub loading: bool,
}

impl Session {
    pub fn initializing() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            user: None,
            loading: false,
        }
    }

    pub fn signed_in(identity: Identity) -> Self {
        Self {
            user: Some(identity),
            loading: false,
        }
    }

    /// Role of the current user, derived from `user`.
    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|identity| identity.role)
    }

    pub fn phase(&self) -> SessionPhase {
        match (&self.user, self.loading) {
            (_, true) => SessionPhase::Initializing,
            (Some(_), false) => SessionPhase::Authenticated,
            (None, false) => SessionPhase::Unauthenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase() == SessionPhase::Authenticated
    }
}

/// User-visible messages raised by the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    SessionExpired,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::SessionExpired => "Your session has expired. Please log in again.",
        }
    }
}

struct Lifecycle {
    machine: SessionMachine,
    /// Tag of the latest resolution; older results are discarded.
    generation: u64,
    /// Advanced by logout; a login started under an older epoch is void.
    login_epoch: u64,
}

/// Authentication state holder for one tab.
pub struct AuthContext {
    store: TokenStore,
    resolver: SessionResolver,
    backend: Arc<dyn AuthBackend>,
    navigator: Arc<dyn Navigator>,
    landing_route: String,
    login_route: String,
    lifecycle: Mutex<Lifecycle>,
    state: watch::Sender<Session>,
    notices: broadcast::Sender<Notice>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl AuthContext {
    pub fn new(
        store: TokenStore,
        backend: Arc<dyn AuthBackend>,
        navigator: Arc<dyn Navigator>,
        config: &Config,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(Session::initializing());
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        Arc::new(Self {
            resolver: SessionResolver::new(store.clone(), Arc::clone(&backend)),
            store,
            backend,
            navigator,
            landing_route: config.landing_route.clone(),
            login_route: config.login_route.clone(),
            lifecycle: Mutex::new(Lifecycle {
                machine: SessionMachine::new(),
                generation: 0,
                login_epoch: 0,
            }),
            state,
            notices,
            listener: Mutex::new(None),
        })
    }

    /// Start listening for token changes and run the initial resolution.
    ///
    /// Must be called from within a Tokio runtime. Calling it again is a
    /// no-op.
    pub fn start(self: &Arc<Self>) {
        let mut listener = self.listener.lock();
        if listener.is_some() {
            debug!("auth context already started");
            return;
        }

        let mut changes = self.store.subscribe();
        let weak = Arc::downgrade(self);
        *listener = Some(tokio::spawn(async move {
            while let Some(change) = changes.recv().await {
                let Some(context) = weak.upgrade() else {
                    break;
                };
                debug!(source = ?change.source, present = change.present, "token changed");
                tokio::spawn(async move {
                    context.reload().await;
                });
            }
            debug!("token listener stopped");
        }));
        drop(listener);

        info!(tab = %self.store.tab_id(), "auth context started");
        let context = Arc::clone(self);
        tokio::spawn(async move {
            context.reload().await;
        });
    }

    /// Stop reacting to token changes.
    pub fn shutdown(&self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
    }

    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from(self.lifecycle.lock().machine.state())
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Wait until no resolution is in flight and return the session.
    pub async fn settled(&self) -> Session {
        let mut rx = self.state.subscribe();
        let session = match rx.wait_for(|session| !session.loading).await {
            Ok(session) => session.clone(),
            Err(_) => self.session(),
        };
        session
    }

    /// Log in and wait for the resulting session.
    ///
    /// A refused login leaves the session untouched. If [`logout`](Self::logout)
    /// is called while the backend call is in flight the token is discarded
    /// and [`AuthError::Superseded`] is returned.
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<Session> {
        let epoch = self.lifecycle.lock().login_epoch;
        let credentials = Credentials::new(username, password);

        debug!(username, "logging in");
        let response = match self.backend.login(&credentials).await {
            Ok(response) => response,
            Err(e) => {
                warn!(username, error = %e, "login failed");
                return Err(e);
            }
        };

        let Some(token) = response.bearer() else {
            warn!(username, "login response carried no token");
            return Err(AuthError::MissingToken);
        };

        {
            let lifecycle = self.lifecycle.lock();
            if lifecycle.login_epoch != epoch {
                info!(username, "logout during login, discarding token");
                return Err(AuthError::Superseded);
            }
            self.store.write(token)?;
        }

        let session = self.reload().await;
        info!(
            username,
            authenticated = session.is_authenticated(),
            role = ?session.role(),
            "login complete"
        );
        Ok(session)
    }

    /// Clear the token, sign out and reload the landing route.
    pub fn logout(&self) {
        {
            let mut lifecycle = self.lifecycle.lock();
            if let Err(e) = self.store.clear() {
                warn!(error = %e, "failed to clear token on logout");
            }
            lifecycle.generation += 1;
            lifecycle.login_epoch += 1;
            if let Err(e) = transition(&mut lifecycle, &SessionMachineInput::LogoutRequested) {
                warn!(error = %e, "logout transition rejected");
            }
            self.state.send_replace(Session::signed_out());
        }

        info!("logged out");
        self.navigator
            .navigate(&self.landing_route, NavigationKind::Full);
    }

    /// Resolve the stored token again.
    pub async fn refresh_user(&self) -> Session {
        self.reload().await
    }

    async fn reload(&self) -> Session {
        let generation = self.begin_resolution();
        let token = self.store.read();
        let resolution = self.resolver.inspect(token.as_deref()).await;
        self.finish_resolution(generation, token.as_deref(), resolution);
        self.settled().await
    }

    fn begin_resolution(&self) -> u64 {
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.generation += 1;
        let generation = lifecycle.generation;

        if let Err(e) = transition(&mut lifecycle, &SessionMachineInput::TokenChanged) {
            warn!(error = %e, "token change transition rejected");
        }
        self.state.send_replace(Session::initializing());
        debug!(generation, "resolution started");
        generation
    }

    fn finish_resolution(&self, generation: u64, token: Option<&str>, resolution: Resolution) {
        let expired = resolution == Resolution::Expired;
        let mut lifecycle = self.lifecycle.lock();

        // Refused tokens are cleared even for stale results, and under the
        // lock so the clear event cannot overtake this resolution.
        if let Some(token) = token.filter(|_| resolution.clears_token()) {
            self.resolver.discard(token);
        }

        if generation != lifecycle.generation {
            debug!(
                generation,
                current = lifecycle.generation,
                "discarding stale resolution"
            );
            return;
        }

        let (input, session) = match resolution.into_identity() {
            Some(identity) => (SessionMachineInput::ResolvedUser, Session::signed_in(identity)),
            None => (SessionMachineInput::ResolvedAnonymous, Session::signed_out()),
        };

        if let Err(e) = transition(&mut lifecycle, &input) {
            warn!(error = %e, generation, "resolution transition rejected");
            return;
        }

        // Queued before the session settles, so settled() waiters find it.
        if expired {
            self.notify_expired();
        }
        self.state.send_replace(session);
    }

    fn notify_expired(&self) {
        if self.navigator.current_route() == self.login_route {
            debug!("session expired while on the login route, no notice");
            return;
        }

        info!("session expired");
        // Nobody listening is fine.
        let _ = self.notices.send(Notice::SessionExpired);
    }
}

impl Drop for AuthContext {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.get_mut().take() {
            handle.abort();
        }
    }
}

fn transition(lifecycle: &mut Lifecycle, input: &SessionMachineInput) -> AuthResult<SessionPhase> {
    let old_phase = SessionPhase::from(lifecycle.machine.state());

    lifecycle.machine.consume(input).map_err(|_| {
        AuthError::InvalidStateTransition(format!(
            "Cannot apply {:?} in state {:?}",
            input,
            lifecycle.machine.state()
        ))
    })?;

    let new_phase = SessionPhase::from(lifecycle.machine.state());
    if old_phase != new_phase {
        debug!(old_state = ?old_phase, new_state = ?new_phase, "Session state transition");
    }
    Ok(new_phase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LoginResponse;
    use crate::identity::{Trust, UserRecord};
    use crate::navigation::HistoryNavigator;
    use async_trait::async_trait;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use cabinet_storage::SharedStorage;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[derive(Clone)]
    enum Whoami {
        User(UserRecord),
        Refuse,
        Offline,
    }

    #[derive(Clone)]
    enum LoginReply {
        Token(String),
        NoToken,
    }

    /// Backend answering from per-token and per-username scripts. A gated
    /// entry blocks until its `Notify` is signalled.
    #[derive(Default)]
    struct ScriptedBackend {
        whoami: parking_lot::Mutex<HashMap<String, (Whoami, Option<Arc<Notify>>)>>,
        logins: parking_lot::Mutex<HashMap<String, (LoginReply, Option<Arc<Notify>>)>>,
    }

    impl ScriptedBackend {
        fn user(&self, token: &str, user: UserRecord) {
            self.whoami
                .lock()
                .insert(token.to_string(), (Whoami::User(user), None));
        }

        fn user_gated(&self, token: &str, user: UserRecord) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.whoami.lock().insert(
                token.to_string(),
                (Whoami::User(user), Some(Arc::clone(&gate))),
            );
            gate
        }

        fn refuse(&self, token: &str) {
            self.whoami
                .lock()
                .insert(token.to_string(), (Whoami::Refuse, None));
        }

        fn offline(&self, token: &str) {
            self.whoami
                .lock()
                .insert(token.to_string(), (Whoami::Offline, None));
        }

        fn accept_login(&self, username: &str, reply: LoginReply) {
            self.logins
                .lock()
                .insert(username.to_string(), (reply, None));
        }

        fn accept_login_gated(&self, username: &str, token: &str) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.logins.lock().insert(
                username.to_string(),
                (LoginReply::Token(token.to_string()), Some(Arc::clone(&gate))),
            );
            gate
        }
    }

    #[async_trait]
    impl AuthBackend for ScriptedBackend {
        async fn login(&self, credentials: &Credentials) -> AuthResult<LoginResponse> {
            let entry = self.logins.lock().get(&credentials.username).cloned();
            let Some((reply, gate)) = entry else {
                return Err(AuthError::InvalidCredentials("Bad credentials".to_string()));
            };
            if let Some(gate) = gate {
                gate.notified().await;
            }
            Ok(match reply {
                LoginReply::Token(token) => LoginResponse {
                    access_token: Some(token),
                    ..LoginResponse::default()
                },
                LoginReply::NoToken => LoginResponse::default(),
            })
        }

        async fn current_user(&self, token: &str) -> AuthResult<UserRecord> {
            let entry = self.whoami.lock().get(token).cloned();
            let Some((reply, gate)) = entry else {
                return Err(AuthError::Unauthorized("unknown token".to_string()));
            };
            if let Some(gate) = gate {
                gate.notified().await;
            }
            match reply {
                Whoami::User(user) => Ok(user),
                Whoami::Refuse => Err(AuthError::Unauthorized("Forbidden (403)".to_string())),
                Whoami::Offline => Err(AuthError::Api {
                    status: 502,
                    message: "Bad Gateway (502)".to_string(),
                }),
            }
        }
    }

    fn user(id: i64, username: &str, usertype: &str) -> UserRecord {
        UserRecord {
            id: Some(id),
            username: username.to_string(),
            usertype: Some(usertype.to_string()),
            ..UserRecord::default()
        }
    }

    fn jwt(claims: serde_json::Value) -> String {
        format!(
            "eyJhbGciOiJIUzI1NiJ9.{}.sig",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap())
        )
    }

    struct Tab {
        context: Arc<AuthContext>,
        navigator: Arc<HistoryNavigator>,
    }

    fn open_tab(storage: &SharedStorage, backend: &Arc<ScriptedBackend>, route: &str) -> Tab {
        let config = Config::default();
        let navigator = Arc::new(HistoryNavigator::new(route));
        let context = AuthContext::new(
            storage.open(config.token_key.clone()),
            Arc::clone(backend) as Arc<dyn AuthBackend>,
            Arc::clone(&navigator) as Arc<dyn Navigator>,
            &config,
        );
        Tab { context, navigator }
    }

    /// Let every runnable task finish; with a paused clock the sleep only
    /// elapses once the runtime is idle.
    async fn quiesce() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_token_resolves_unauthenticated() {
        let backend = Arc::new(ScriptedBackend::default());
        let tab = open_tab(&SharedStorage::in_memory(), &backend, "/");

        assert_eq!(tab.context.session(), Session::initializing());
        assert_eq!(tab.context.phase(), SessionPhase::Initializing);

        tab.context.start();
        let session = tab.context.settled().await;

        assert_eq!(session, Session::signed_out());
        assert_eq!(session.phase(), SessionPhase::Unauthenticated);
        assert_eq!(session.role(), None);
        assert_eq!(tab.context.phase(), SessionPhase::Unauthenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_resolves_role_from_current_user() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.accept_login("doc1", LoginReply::Token("abc.def.ghi".to_string()));
        backend.user("abc.def.ghi", user(7, "doc1", "MEDECIN"));
        let tab = open_tab(&SharedStorage::in_memory(), &backend, "/login");

        tab.context.start();
        tab.context.settled().await;

        let session = tab.context.login("doc1", "x").await.unwrap();

        assert_eq!(session.role(), Some(Role::Medecin));
        let identity = session.user.unwrap();
        assert_eq!(identity.user.id, Some(7));
        assert_eq!(identity.trust, Trust::Authoritative);
        assert_eq!(
            tab.context.store().read(),
            Some("abc.def.ghi".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_login_changes_nothing() {
        let backend = Arc::new(ScriptedBackend::default());
        let tab = open_tab(&SharedStorage::in_memory(), &backend, "/login");
        tab.context.start();
        tab.context.settled().await;

        let err = tab.context.login("doc1", "wrong").await.unwrap_err();

        assert!(matches!(err, AuthError::InvalidCredentials(_)));
        assert_eq!(tab.context.session(), Session::signed_out());
        assert_eq!(tab.context.store().read(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_without_token_is_an_error() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.accept_login("doc1", LoginReply::NoToken);
        let tab = open_tab(&SharedStorage::in_memory(), &backend, "/login");
        tab.context.start();
        tab.context.settled().await;

        let err = tab.context.login("doc1", "x").await.unwrap_err();

        assert!(matches!(err, AuthError::MissingToken));
        assert_eq!(tab.context.store().read(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_then_logout_ends_signed_out() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.accept_login("doc1", LoginReply::Token("abc.def.ghi".to_string()));
        backend.user("abc.def.ghi", user(7, "doc1", "MEDECIN"));
        let tab = open_tab(&SharedStorage::in_memory(), &backend, "/login");
        tab.context.start();

        tab.context.login("doc1", "x").await.unwrap();
        tab.context.logout();
        quiesce().await;

        assert_eq!(tab.context.session(), Session::signed_out());
        assert_eq!(tab.context.store().read(), None);
        assert_eq!(
            tab.navigator.last(),
            Some(("/".to_string(), NavigationKind::Full))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_during_login_discards_token() {
        let backend = Arc::new(ScriptedBackend::default());
        let gate = backend.accept_login_gated("doc1", "abc.def.ghi");
        backend.user("abc.def.ghi", user(7, "doc1", "MEDECIN"));
        let tab = open_tab(&SharedStorage::in_memory(), &backend, "/login");
        tab.context.start();
        tab.context.settled().await;

        let context = Arc::clone(&tab.context);
        let login = tokio::spawn(async move { context.login("doc1", "x").await });
        quiesce().await;

        tab.context.logout();
        gate.notify_one();

        let result = login.await.unwrap();
        assert!(matches!(result, Err(AuthError::Superseded)));

        quiesce().await;
        assert_eq!(tab.context.session(), Session::signed_out());
        assert_eq!(tab.context.store().read(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_resolution_is_discarded() {
        let storage = SharedStorage::in_memory();
        let backend = Arc::new(ScriptedBackend::default());
        let old_gate = backend.user_gated("old", user(1, "doc1", "MEDECIN"));
        backend.user("new", user(2, "pat", "PATIENT"));

        let tab = open_tab(&storage, &backend, "/");
        tab.context.store().write("old").unwrap();
        tab.context.start();
        quiesce().await;
        assert!(tab.context.session().loading);

        // Another tab replaces the token while the first lookup hangs.
        storage.open("authToken").write("new").unwrap();
        quiesce().await;
        assert_eq!(tab.context.session().role(), Some(Role::Patient));

        old_gate.notify_one();
        quiesce().await;

        let session = tab.context.session();
        assert_eq!(session.role(), Some(Role::Patient));
        assert_eq!(session.user.unwrap().user.id, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_token_is_cleared_with_notice() {
        let storage = SharedStorage::in_memory();
        let backend = Arc::new(ScriptedBackend::default());
        backend.refuse("abc.def.ghi");
        let tab = open_tab(&storage, &backend, "/dashboard");
        tab.context.store().write("abc.def.ghi").unwrap();
        let mut notices = tab.context.subscribe_notices();

        tab.context.start();
        quiesce().await;

        assert_eq!(tab.context.session(), Session::signed_out());
        assert_eq!(tab.context.store().read(), None);
        assert_eq!(notices.try_recv().unwrap(), Notice::SessionExpired);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_expiry_notice_queued_before_session_settles() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.refuse("abc.def.ghi");

        for _ in 0..200 {
            let tab = open_tab(&SharedStorage::in_memory(), &backend, "/dashboard");
            tab.context.store().write("abc.def.ghi").unwrap();
            let mut notices = tab.context.subscribe_notices();

            tab.context.start();
            let session = tab.context.settled().await;

            assert_eq!(session, Session::signed_out());
            assert_eq!(notices.try_recv().unwrap(), Notice::SessionExpired);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_authenticated_session_ends_when_token_is_refused() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.user("abc.def.ghi", user(7, "doc1", "MEDECIN"));
        let tab = open_tab(&SharedStorage::in_memory(), &backend, "/dashboard");
        tab.context.store().write("abc.def.ghi").unwrap();
        let mut notices = tab.context.subscribe_notices();

        tab.context.start();
        assert!(tab.context.settled().await.is_authenticated());
        assert_eq!(tab.context.phase(), SessionPhase::Authenticated);

        backend.refuse("abc.def.ghi");
        let session = tab.context.refresh_user().await;
        quiesce().await;

        assert_eq!(session, Session::signed_out());
        assert_eq!(tab.context.session(), Session::signed_out());
        assert_eq!(tab.context.phase(), SessionPhase::Unauthenticated);
        assert_eq!(tab.context.store().read(), None);
        assert_eq!(notices.try_recv().unwrap(), Notice::SessionExpired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_expiry_notice_on_login_route() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.refuse("abc.def.ghi");
        let tab = open_tab(&SharedStorage::in_memory(), &backend, "/login");
        tab.context.store().write("abc.def.ghi").unwrap();
        let mut notices = tab.context.subscribe_notices();

        tab.context.start();
        quiesce().await;

        assert_eq!(tab.context.session(), Session::signed_out());
        assert!(notices.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_outage_keeps_decoded_session() {
        let backend = Arc::new(ScriptedBackend::default());
        let token = jwt(serde_json::json!({"sub": "7", "username": "doc1", "usertype": "medecin"}));
        backend.offline(&token);
        let tab = open_tab(&SharedStorage::in_memory(), &backend, "/dashboard");
        tab.context.store().write(&token).unwrap();

        tab.context.start();
        let session = tab.context.settled().await;

        assert_eq!(session.role(), Some(Role::Medecin));
        assert_eq!(session.user.unwrap().trust, Trust::Decoded);
        assert_eq!(tab.context.store().read(), Some(token));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_tab_follows_login_and_logout() {
        let storage = SharedStorage::in_memory();
        let backend = Arc::new(ScriptedBackend::default());
        backend.accept_login("doc1", LoginReply::Token("abc.def.ghi".to_string()));
        backend.user("abc.def.ghi", user(7, "doc1", "MEDECIN"));

        let tab_a = open_tab(&storage, &backend, "/login");
        let tab_b = open_tab(&storage, &backend, "/dashboard");
        tab_a.context.start();
        tab_b.context.start();
        quiesce().await;

        tab_a.context.login("doc1", "x").await.unwrap();
        quiesce().await;
        assert_eq!(tab_b.context.session().role(), Some(Role::Medecin));

        tab_a.context.logout();
        quiesce().await;

        assert_eq!(tab_b.context.session(), Session::signed_out());
        assert!(tab_b.navigator.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_user_picks_up_backend_changes() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.user("abc.def.ghi", user(5, "asst", "ASSISTANT"));
        let tab = open_tab(&SharedStorage::in_memory(), &backend, "/");
        tab.context.store().write("abc.def.ghi").unwrap();
        tab.context.start();
        assert_eq!(tab.context.settled().await.role(), Some(Role::Assistant));

        backend.user("abc.def.ghi", user(5, "asst", "MEDECIN"));
        let session = tab.context.refresh_user().await;

        assert_eq!(session.role(), Some(Role::Medecin));
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchers_see_loading_then_result() {
        let backend = Arc::new(ScriptedBackend::default());
        let gate = backend.user_gated("abc.def.ghi", user(7, "doc1", "MEDECIN"));
        let tab = open_tab(&SharedStorage::in_memory(), &backend, "/");
        tab.context.store().write("abc.def.ghi").unwrap();
        let mut rx = tab.context.subscribe();

        tab.context.start();
        quiesce().await;
        assert!(rx.borrow_and_update().loading);

        gate.notify_one();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().role(), Some(Role::Medecin));
    }

    #[test]
    fn test_session_projection() {
        assert_eq!(Session::initializing().phase(), SessionPhase::Initializing);
        assert_eq!(Session::signed_out().phase(), SessionPhase::Unauthenticated);

        let session = Session::signed_in(Identity::authoritative(user(3, "pat", "patient")));
        assert!(session.is_authenticated());
        assert_eq!(session.role(), Some(Role::Patient));
    }
}

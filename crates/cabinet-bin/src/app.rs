//! Command implementations.

use std::sync::Arc;

use cabinet_auth::{
    visible_items, AuthContext, AuthResult, GuardDecision, HistoryNavigator, HttpAuthBackend,
    Identity, Navigator, Notice, RoleGuard, Session, Trust,
};
use cabinet_config_and_utils::{Config, Paths};
use cabinet_storage::{FileStorage, SharedStorage};
use tokio::sync::broadcast;
use tracing::debug;

/// Route the commands pretend to be on when not on the login page.
const DASHBOARD_ROUTE: &str = "/dashboard";

/// One "tab" on the persistent storage file.
struct Client {
    context: Arc<AuthContext>,
    navigator: Arc<HistoryNavigator>,
    notices: broadcast::Receiver<Notice>,
}

impl Client {
    fn open(config: &Config, paths: &Paths, route: &str) -> AuthResult<Self> {
        let storage = SharedStorage::new(FileStorage::new(paths.storage_file()));
        let store = storage.open(config.token_key.clone());
        let backend = HttpAuthBackend::from_config(config, store.clone())?;
        let navigator = Arc::new(HistoryNavigator::new(route));

        let context = AuthContext::new(
            store,
            Arc::new(backend),
            Arc::clone(&navigator) as Arc<dyn Navigator>,
            config,
        );
        let notices = context.subscribe_notices();
        context.start();

        debug!(storage = %paths.storage_file().display(), route, "client opened");
        Ok(Self {
            context,
            navigator,
            notices,
        })
    }

    async fn settled(&mut self) -> Session {
        let session = self.context.settled().await;
        while let Ok(notice) = self.notices.try_recv() {
            eprintln!("{}", notice.message());
        }
        session
    }
}

pub async fn login(config: &Config, paths: &Paths, username: &str, password: &str) -> AuthResult<()> {
    let mut client = Client::open(config, paths, &config.login_route)?;
    client.settled().await;

    let session = client.context.login(username, password).await?;
    match &session.user {
        Some(identity) => {
            println!("Logged in as {}", describe(identity));
            print_trust(identity);
        }
        None => println!("Login accepted but the session could not be resolved"),
    }
    Ok(())
}

pub async fn logout(config: &Config, paths: &Paths) -> AuthResult<()> {
    let client = Client::open(config, paths, DASHBOARD_ROUTE)?;
    client.context.logout();

    match client.navigator.last() {
        Some((route, _)) => println!("Logged out, back to {}", route),
        None => println!("Logged out"),
    }
    Ok(())
}

pub async fn whoami(config: &Config, paths: &Paths, json: bool) -> AuthResult<()> {
    let mut client = Client::open(config, paths, DASHBOARD_ROUTE)?;
    let session = client.settled().await;

    let Some(identity) = session.user else {
        println!("Not logged in");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&identity)?);
        return Ok(());
    }

    let user = &identity.user;
    println!("{}", describe(&identity));
    if let Some(id) = user.id {
        println!("  Id:        {}", id);
    }
    if let Some(email) = &user.email {
        println!("  Email:     {}", email);
    }
    if let Some(phone) = &user.telephone {
        println!("  Telephone: {}", phone);
    }
    if let Some(specialite) = &user.specialite {
        println!("  Specialty: {}", specialite);
    }
    print_trust(&identity);
    Ok(())
}

pub async fn guard(config: &Config, paths: &Paths, allow: &[String]) -> AuthResult<()> {
    let client = Client::open(config, paths, DASHBOARD_ROUTE)?;
    let guard = RoleGuard::new(allow).with_routes(&config.login_route, &config.home_route);

    let mut handle = guard.spawn(
        client.context.subscribe(),
        Arc::clone(&client.navigator) as Arc<dyn Navigator>,
    );

    match handle.settled().await {
        GuardDecision::Render => println!("allowed"),
        GuardDecision::Redirect(route) => println!("denied, redirect to {}", route),
        GuardDecision::Pending => println!("session still resolving"),
    }
    Ok(())
}

pub async fn menu(config: &Config, paths: &Paths) -> AuthResult<()> {
    let mut client = Client::open(config, paths, DASHBOARD_ROUTE)?;
    let session = client.settled().await;

    for item in visible_items(session.role()) {
        println!("{:<12} {:<20} {}", item.id, item.label, item.path);
    }
    Ok(())
}

fn describe(identity: &Identity) -> String {
    format!(
        "{} ({}, {})",
        identity.user.display_name(),
        identity.user.username,
        identity.role
    )
}

fn print_trust(identity: &Identity) {
    if identity.trust == Trust::Decoded {
        println!("  (identity decoded from the token, backend unreachable)");
    }
}

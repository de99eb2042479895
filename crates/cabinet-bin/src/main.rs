//! Cabinet - command-line client for the practice backend session.

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cabinet_config_and_utils::{init_logging, Config, Paths};

/// Cabinet command-line interface.
#[derive(Parser)]
#[command(name = "cabinet")]
#[command(about = "Log in to the practice backend and inspect the current session")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, storage and logs. Defaults to ~/.cabinet
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session token
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "CABINET_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Clear the stored session token
    Logout,
    /// Show the user the stored token resolves to
    Whoami {
        /// Print the identity as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether the current user may open a view restricted to some roles
    Guard {
        /// Allowed roles (MEDECIN, ASSISTANT, PATIENT)
        #[arg(short, long = "allow", required = true, num_args = 1..)]
        allow: Vec<String>,
    },
    /// List the dashboard entries visible to the current user
    Menu,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(level, Some(paths.log_file()));

    match cli.command {
        Commands::Login { username, password } => {
            app::login(&config, &paths, &username, &password).await?;
        }
        Commands::Logout => {
            app::logout(&config, &paths).await?;
        }
        Commands::Whoami { json } => {
            app::whoami(&config, &paths, json).await?;
        }
        Commands::Guard { allow } => {
            app::guard(&config, &paths, &allow).await?;
        }
        Commands::Menu => {
            app::menu(&config, &paths).await?;
        }
    }

    Ok(())
}

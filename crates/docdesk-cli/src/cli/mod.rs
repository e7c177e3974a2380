//! CLI entry and dispatch.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use docdesk_core::api::{ApiClient, InvalidationHook};
use docdesk_core::config;
use docdesk_core::session::SessionStore;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "docdesk")]
#[command(version)]
#[command(about = "Session client for the document-management API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Password (read from stdin when omitted)
        #[arg(short, long, env = "DOCDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Log out and clear the stored session
    Logout,

    /// Show the signed-in user
    Whoami {
        /// Ask the backend instead of reading the stored session
        #[arg(long)]
        remote: bool,
    },

    /// Send an authenticated request and print the response body
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        #[arg(value_name = "METHOD")]
        method: String,

        /// Path relative to the API base URL
        #[arg(value_name = "PATH")]
        path: String,

        /// JSON request body
        #[arg(short, long, value_name = "JSON")]
        data: Option<String>,
    },

    /// Check whether the session may open a role-restricted page
    Guard {
        /// Comma-separated list of allowed roles (empty: any signed-in user)
        #[arg(long, value_delimiter = ',', value_name = "ROLES")]
        roles: Vec<String>,

        /// Where to send users without a session
        #[arg(long, default_value = "/login")]
        redirect: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Set the API base URL
    SetUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

/// Builds the client over the persisted session, seeded with its token.
///
/// The session-expired notice is printed only if a session existed when the
/// command started; a 401 from a failed login has nothing to expire.
fn build_client(config: &config::Config) -> Result<ApiClient> {
    let session = Arc::new(SessionStore::open(config::paths::session_path()));
    let had_session = session.token().is_some();
    let hook: Arc<dyn InvalidationHook> = Arc::new(move |_login_path: &str| {
        if had_session {
            eprintln!("Session expired. Run `docdesk login` to sign in again.");
        }
    });
    let client = ApiClient::new(&config.api, session, hook).context("build API client")?;
    client.set_auth_token(client.session().token().as_deref());
    Ok(client)
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = config::Config::load().context("load config")?;
    logging::init(&config.logging);

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::SetUrl { url } => commands::config::set_url(&url),
        },

        Commands::Login { email, password } => {
            let client = build_client(&config)?;
            commands::auth::login(&client, &email, password).await
        }

        Commands::Logout => {
            let client = build_client(&config)?;
            commands::auth::logout(&client).await
        }

        Commands::Whoami { remote } => {
            let client = build_client(&config)?;
            commands::auth::whoami(&client, remote).await
        }

        Commands::Request { method, path, data } => {
            let client = build_client(&config)?;
            commands::request::run(&client, &method, &path, data.as_deref()).await
        }

        Commands::Guard { roles, redirect } => {
            let session = SessionStore::open(config::paths::session_path());
            commands::guard::run(&session, &roles, &redirect);
            Ok(())
        }
    }
}

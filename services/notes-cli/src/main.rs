//! notes: command-line client for the notes API
//!
//! Every invocation:
//! 1. Loads configuration (flag / NOTES_CONFIG, file, env overrides)
//! 2. Opens the credential file (missing file = logged out)
//! 3. Runs one command through the authenticated client
//! 4. Exits 3 with a login hint if the session was terminated

mod api;
mod config;
mod error;

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use notes_auth::{FileStore, NewAccount};
use notes_session::{AuthClient, SessionEvent};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::HttpTransport;

use crate::api::NotesApi;
use crate::config::Config;
use crate::error::{EXIT_FAILURE, EXIT_SESSION_ENDED};

const RELOGIN_HINT: &str = "session expired: run `notes login` to sign in again";

#[derive(Parser)]
#[command(name = "notes", version, about = "Command-line client for the notes API")]
struct Cli {
    /// Config file (defaults to NOTES_CONFIG, then the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the credential pair
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long, env = "NOTES_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long, env = "NOTES_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored credentials
    Logout,
    /// Show whether credentials are stored and when the access token expires
    Status,
    /// Current user
    Me,
    /// List notes, or show one
    Notes { id: Option<String> },
    /// List uploaded media
    Media,
    History {
        #[arg(value_enum)]
        kind: HistoryKind,
    },
    /// Live transcription sessions
    Live {
        #[command(subcommand)]
        action: LiveAction,
    },
    Exports,
    /// Upload an audio, video or document file
    Upload { path: PathBuf },
    Health,
}

#[derive(Clone, Copy, ValueEnum)]
enum HistoryKind {
    Media,
    Notes,
}

#[derive(Subcommand)]
enum LiveAction {
    Start,
    Stop { session_id: String },
}

fn init_tracing(json: bool) {
    // LOG_LEVEL first, then RUST_LOG; quiet by default so stdout stays clean
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = Config::resolve_path(cli.config.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let credentials_path = config
        .credentials_path()
        .context("cannot locate credential file")?;

    info!(
        base_url = %config.api.base_url,
        credentials = %credentials_path.display(),
        "configuration loaded"
    );

    let store = FileStore::load(credentials_path.clone())
        .await
        .with_context(|| format!("failed to open {}", credentials_path.display()))?;
    let http = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;
    let transport = HttpTransport::new(http, config.api.base_url.clone(), config.request_timeout());
    let api = NotesApi::new(AuthClient::new(Arc::new(transport), Arc::new(store)));
    let mut terminated = api.client().subscribe();

    let outcome = tokio::select! {
        result = tokio::time::timeout(config.wait_timeout(), execute(&api, cli.command)) => {
            match result {
                Ok(outcome) => outcome,
                Err(_) => {
                    api.client().shutdown();
                    anyhow::bail!(
                        "command did not finish within {}s",
                        config.api.wait_timeout_secs
                    );
                }
            }
        }
        Ok(SessionEvent::Terminated) = terminated.recv() => {
            eprintln!("{RELOGIN_HINT}");
            return Ok(ExitCode::from(EXIT_SESSION_ENDED));
        }
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            let code = e.exit_code();
            if code == EXIT_SESSION_ENDED {
                eprintln!("{RELOGIN_HINT}");
            }
            eprintln!("error: {e}");
            Ok(ExitCode::from(code))
        }
    }
}

async fn execute(api: &NotesApi, command: Command) -> error::Result<()> {
    let client = api.client();
    match command {
        Command::Login { email, password } => {
            let password = password_or_stdin(password)?;
            client.login(&email, &password).await?;
            println!("logged in as {email}");
        }
        Command::Register {
            email,
            full_name,
            password,
        } => {
            let password = password_or_stdin(password)?;
            let user = client
                .register(&NewAccount {
                    email: &email,
                    password: &password,
                    full_name: full_name.as_deref(),
                })
                .await?;
            print_json(&user);
        }
        Command::Logout => {
            if client.logout().await? {
                println!("logged out");
            } else {
                println!("not logged in");
            }
        }
        Command::Status => print_status(client).await?,
        Command::Me => print_json(&api.me().await?),
        Command::Notes { id: Some(id) } => print_json(&api.get_note(&id).await?),
        Command::Notes { id: None } => print_json(&api.list_notes().await?),
        Command::Media => print_json(&api.list_media().await?),
        Command::History {
            kind: HistoryKind::Media,
        } => print_json(&api.media_history().await?),
        Command::History {
            kind: HistoryKind::Notes,
        } => print_json(&api.notes_history().await?),
        Command::Live {
            action: LiveAction::Start,
        } => print_json(&api.start_live().await?),
        Command::Live {
            action: LiveAction::Stop { session_id },
        } => print_json(&api.stop_live(&session_id).await?),
        Command::Exports => print_json(&api.list_exports().await?),
        Command::Upload { path } => print_json(&api.upload_media(&path).await?),
        Command::Health => print_json(&api.health().await?),
    }
    Ok(())
}

async fn print_status(client: &AuthClient) -> error::Result<()> {
    let Some(pair) = client.credentials().await? else {
        println!("not logged in");
        return Ok(());
    };

    println!("logged in");
    let refresh = if pair.refresh_token().is_some() {
        "stored"
    } else {
        "missing"
    };
    println!("refresh token: {refresh}");

    if let Some(claims) = client.access_claims().await? {
        if let Some(sub) = &claims.sub {
            println!("user: {sub}");
        }
        if let Some(exp) = claims.exp {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            let state = if claims.is_expired_at(now) {
                "expired, refreshed on next request"
            } else {
                "valid"
            };
            println!("access token expires at {exp} ({state})");
        }
    }
    Ok(())
}

fn password_or_stdin(password: Option<String>) -> error::Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    eprint!("password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(error::Error::Password)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}

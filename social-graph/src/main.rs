//! Social Graph maintenance entry point.
//!
//! Wires the engine from the environment and runs one maintenance command:
//!
//! ```text
//! social-graph check
//! social-graph friendship-status <viewer-id> <target-id>
//! social-graph reconcile-likes [admin-token]
//! social-graph delete-all-highlights [admin-token]
//! ```
//!
//! Administrative commands read the token from the argument, falling back to
//! `ADMIN_TOKEN`.

use dotenv::dotenv;
use social_graph::{AppError, Dependencies, SocialGraphEngine};
use social_graph_shared::UserId;
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Check,
    FriendshipStatus { viewer: UserId, target: UserId },
    ReconcileLikes { token: Option<String> },
    DeleteAllHighlights { token: Option<String> },
}

impl Command {
    fn parse(args: &[String]) -> Result<Self, AppError> {
        let usage = || {
            AppError::config(
                "usage: social-graph <check | friendship-status <viewer> <target> | \
                 reconcile-likes [token] | delete-all-highlights [token]>",
            )
        };

        match args {
            [cmd] if cmd == "check" => Ok(Self::Check),
            [cmd, viewer, target] if cmd == "friendship-status" => Ok(Self::FriendshipStatus {
                viewer: UserId::new(viewer.as_str()),
                target: UserId::new(target.as_str()),
            }),
            [cmd, rest @ ..] if cmd == "reconcile-likes" && rest.len() <= 1 => {
                Ok(Self::ReconcileLikes {
                    token: rest.first().cloned(),
                })
            }
            [cmd, rest @ ..] if cmd == "delete-all-highlights" && rest.len() <= 1 => {
                Ok(Self::DeleteAllHighlights {
                    token: rest.first().cloned(),
                })
            }
            _ => Err(usage()),
        }
    }
}

/// Initialize tracing/logging.
fn init_tracing() -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("social_graph=info,social_graph_repository=info"));

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
            .map_err(|e| AppError::config(format!("Failed to initialize tracing: {e}")))?;

        info!(
            service_name = "social-graph",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .try_init()
            .map_err(|e| AppError::config(format!("Failed to initialize tracing: {e}")))?;

        info!(
            service_name = "social-graph",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }

    Ok(())
}

fn admin_token(presented: Option<String>) -> Result<String, AppError> {
    presented
        .or_else(|| env::var("ADMIN_TOKEN").ok())
        .ok_or_else(|| AppError::config("no admin token given and ADMIN_TOKEN is not set"))
}

async fn run(engine: &SocialGraphEngine, command: Command) -> Result<(), AppError> {
    match command {
        Command::Check => {
            info!("Engine initialized; store reachable");
        }
        Command::FriendshipStatus { viewer, target } => {
            let status = engine.relationships().status(&viewer, &target).await?;
            info!(viewer = %viewer, target = %target, status = %status, code = status.code(), "Friendship status");
            println!("{status} ({})", status.code());
        }
        Command::ReconcileLikes { token } => {
            let admin = engine.authorize_admin(&admin_token(token)?)?;
            let results = engine.likes().reconcile_all(&admin).await?;
            for drifted in results.iter().filter(|r| r.drifted()) {
                warn!(
                    story_id = %drifted.story_id,
                    cached = drifted.cached,
                    actual = drifted.actual,
                    "Repaired like counter"
                );
            }
            println!(
                "reconciled {} stories, {} repaired",
                results.len(),
                results.iter().filter(|r| r.drifted()).count()
            );
        }
        Command::DeleteAllHighlights { token } => {
            let admin = engine.authorize_admin(&admin_token(token)?)?;
            let deleted = engine.content().delete_all_highlights(&admin).await?;
            println!("deleted {deleted} highlights");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    info!(command = ?command, "Starting Social Graph");

    let deps = match Dependencies::new().await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    match run(&deps.engine, command).await {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Command failed");
            Err(e)
        }
    }
}

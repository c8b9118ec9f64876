//! Entity Index Main Entry Point
//!
//! Rebuilds the search index of the demo schema and queries it.

use std::env;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use entity_index::output::{NullProgress, TracingProgress};
use entity_index::{AppError, Dependencies, SearchService, Settings};
use entity_index_shared::SearchQuery;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(version, about = "Populate and search the entity index")]
struct Cli {
    /// Entities per flushed batch (overrides POPULATE_BATCH_SIZE)
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Truncate the index and rebuild it from the entity source
    Populate {
        /// Only rebuild this type and its subtypes
        #[arg(long = "type")]
        type_name: Option<String>,
    },
    /// Print entities whose indexed content contains TERM, one JSON object per line
    Search {
        term: String,
        /// Restrict to a type and its subtypes (repeatable)
        #[arg(long = "type")]
        types: Vec<String>,
        /// Restrict to a group or field key (repeatable)
        #[arg(long = "group")]
        groups: Vec<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("entity_index=info,entity_index_repository=info"));

    let json = env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .pretty(),
            )
            .init();
    }

    info!(
        service_name = "entity-index",
        service_version = env!("CARGO_PKG_VERSION"),
        json,
        "Tracing initialized"
    );
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut settings = Settings::from_env();
    if let Some(batch_size) = cli.batch_size {
        if batch_size == 0 {
            return Err(AppError::config("--batch-size must be greater than zero"));
        }
        settings = settings.with_batch_size(batch_size);
    }

    let deps = Dependencies::new(&settings).await?;

    match cli.cmd {
        Cmd::Populate { type_name } => {
            let summary = deps
                .listener
                .populate(&TracingProgress::new(), type_name.as_deref())
                .await?;
            println!("{}", serde_json::to_string(&summary)?);
        }
        Cmd::Search {
            term,
            types,
            groups,
            limit,
        } => {
            if !deps.persistent {
                // The in-memory index starts empty.
                deps.listener.populate(&NullProgress, None).await?;
            }
            search(&deps.search, term, types, groups, limit).await?;
        }
    }
    Ok(())
}

async fn search(
    service: &SearchService,
    term: String,
    types: Vec<String>,
    groups: Vec<String>,
    limit: usize,
) -> Result<(), AppError> {
    let mut query = SearchQuery::new(term).with_limit(limit);
    if !types.is_empty() {
        query = query.with_types(types);
    }
    if !groups.is_empty() {
        query = query.with_groups(groups);
    }

    for hit in service.search(&query).await? {
        println!("{}", serde_json::to_string(&hit)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Entity index command failed");
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

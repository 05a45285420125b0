//! dbkit - command-line entry point.
//!
//! Connects to one backend, runs a single command and prints the result as JSON.

use clap::Parser;
use dbkit::config::{Cli, Command};
use dbkit::db::{ConnectionManager, TracingQueryLogger};
use dbkit::error::DbResult;
use dbkit::models::QueryParam;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays machine-readable
    if cli.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// A `--param` value is a JSON literal when it parses as one, else a plain string.
fn parse_params(raw: &[String]) -> Vec<QueryParam> {
    raw.iter()
        .map(|value| match serde_json::from_str::<JsonValue>(value) {
            Ok(json) => QueryParam::from(json),
            Err(_) => QueryParam::String(value.clone()),
        })
        .collect()
}

async fn run(cli: &Cli, manager: &ConnectionManager) -> DbResult<JsonValue> {
    let config = cli.connection_config()?;
    let status = manager.connect_default(config).await?;
    let adapter = manager.default_connection().await?;
    adapter.set_query_logger(Some(Arc::new(TracingQueryLogger)));

    let output = match &cli.command {
        Command::Health => json!(adapter.health_check().await),
        Command::Status => json!({
            "connection": status,
            "server_version": adapter.server_version(),
            "pool": adapter.pool_status().await?,
        }),
        Command::Query { statement, params } => {
            let rows = adapter.query(statement, &parse_params(params)).await?;
            JsonValue::Array(rows.into_iter().map(JsonValue::Object).collect())
        }
        Command::Execute { statement, params } => {
            json!(adapter.execute(statement, &parse_params(params)).await?)
        }
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli);

    info!("Starting dbkit v{}", env!("CARGO_PKG_VERSION"));

    let manager = ConnectionManager::new();
    let result = run(&cli, &manager).await;
    manager.close_all().await;

    match result {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Command failed");
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            Err(e.into())
        }
    }
}

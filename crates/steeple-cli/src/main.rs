//! steeple - command-line host for the offline cache worker.
//!
//! Each subcommand delivers one worker event (install, activate, fetch,
//! message, push) to a `CacheController` backed by the on-disk cache and the
//! real network, then waits for any write-behind work before exiting.

mod config;
mod platform;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use steeple_core::{
    CacheController, DiskStore, HttpNetwork, InterceptedRequest, KeepAlive, Method, RequestMode,
    WorkerHooks,
};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;
use platform::CliPlatform;

#[derive(Parser)]
#[command(name = "steeple", version, about = "Offline cache worker for the steeple dashboard")]
struct Cli {
    /// Config file (default: ~/.config/steeple/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory (default: the platform cache dir)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the current cache and pre-warm the asset manifest
    Install,
    /// Delete caches from previous versions and claim clients
    Activate,
    /// Run a request through the worker
    Fetch {
        /// Absolute URL, or a path under the configured origin
        url: String,
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        /// Treat as a top-level navigation
        #[arg(long)]
        navigate: bool,
        /// Request header, `Name: value`
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
        /// Request body
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Send a control message, e.g. '{"type":"CLEAR_CACHE"}'
    Message { json: String },
    /// Deliver a push payload
    Push { json: String },
    /// List cache namespaces and their entries
    Status,
    /// Print the effective config
    Config {
        /// Write it to the config file
        #[arg(long)]
        save: bool,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_file: Option<&PathBuf>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    Ok(guard)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_request(
    config: &Config,
    url: &str,
    method: &str,
    navigate: bool,
    headers: Vec<String>,
    data: Option<String>,
) -> Result<InterceptedRequest> {
    let url = config
        .offline
        .resolve(url)
        .with_context(|| format!("Invalid URL: {}", url))?;
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid method: {}", method))?;
    let mode = if navigate {
        RequestMode::Navigate
    } else {
        RequestMode::Cors
    };

    let mut request = InterceptedRequest::new(method, url, mode);
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("Header must be `Name: value`: {}", header))?;
        request = request.with_header(name.trim(), value.trim());
    }
    if let Some(data) = data {
        request = request.with_body(data);
    }
    Ok(request)
}

async fn status(config: &Config, store: &DiskStore) -> Result<()> {
    use steeple_core::CacheStore;

    let names = store.keys().await.context("Failed to list caches")?;
    if names.is_empty() {
        println!("No caches in {}", store.root().display());
        return Ok(());
    }

    for name in names {
        let label = if config.offline.is_current(&name) {
            "current"
        } else if config.offline.is_owned(&name) {
            "stale"
        } else {
            "foreign"
        };
        let entries = store.list_entries(&name).await?;
        println!("{} ({}, {} entries)", name, label, entries.len());
        for entry in entries {
            println!(
                "  {:>3}  {:<10} {}",
                entry.data.status,
                entry.age_display(),
                entry.data.url
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_ref())?;

    let config = Config::load(cli.config.clone())?;
    let cache_dir = config.cache_dir(cli.cache_dir.clone())?;
    let store = Arc::new(
        DiskStore::new(cache_dir.clone())
            .with_context(|| format!("Failed to open cache directory: {}", cache_dir.display()))?,
    );

    let controller = CacheController::new(
        config.offline.clone(),
        Arc::clone(&store) as Arc<dyn steeple_core::CacheStore>,
        Arc::new(HttpNetwork::new().context("Failed to create HTTP client")?),
        Arc::new(CliPlatform::new()),
    )?;
    info!(
        cache = %config.offline.static_cache_name(),
        dir = %cache_dir.display(),
        "Worker ready"
    );

    match cli.command {
        Command::Install => {
            let report = controller.on_install().await?;
            print_json(&report)?;
        }
        Command::Activate => {
            let report = controller.on_activate().await?;
            print_json(&report)?;
        }
        Command::Fetch {
            url,
            method,
            navigate,
            headers,
            data,
        } => {
            let request = build_request(&config, &url, &method, navigate, headers, data)?;
            eprintln!("{:?}", controller.classify(&request));

            let keep_alive = KeepAlive::new();
            let result = controller.on_fetch(request, &keep_alive).await;
            // Write-behind cache updates must land before the process exits
            let settled = keep_alive.settle().await;
            info!(settled, "Background work settled");

            let response = result?;
            eprintln!("HTTP {}", response.status);
            for (name, value) in &response.headers {
                eprintln!("{}: {}", name, value);
            }
            io::stdout().write_all(&response.body)?;
        }
        Command::Message { json } => {
            let message: serde_json::Value =
                serde_json::from_str(&json).context("Message must be JSON")?;
            match controller.on_message(&message).await {
                Some(reply) => print_json(&reply)?,
                None => eprintln!("Message ignored"),
            }
        }
        Command::Push { json } => {
            let notification = controller.on_push(json.as_bytes()).await?;
            print_json(&notification)?;
        }
        Command::Status => status(&config, &store).await?,
        Command::Config { save } => {
            if save {
                config.save()?;
                eprintln!("Saved {}", config.path().display());
            }
            print_json(&config.offline)?;
        }
    }

    Ok(())
}

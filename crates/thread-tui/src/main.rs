mod action;
mod app;
mod app_state;
mod component;
mod components;
mod dispatch;
mod theme;
mod thread;
mod widgets;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use thread_proto::config::Config;
use thread_proto::platform;
use thread_proto::store::{seed_sample_thread, LocalStore};

use crate::components::comment_thread::ThreadProps;

/// Terminal viewer for a nested comment thread.
#[derive(Parser, Debug)]
#[command(name = "threadview", version, about)]
struct Args {
    /// Resource whose thread to open (defaults to `thread.href` from the config)
    #[arg(long)]
    href: Option<String>,

    /// Config file to use instead of the platform default
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store file to use instead of `store.path` from the config
    #[arg(long)]
    store: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = platform::log_path();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for our own crates.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,thread_tui=debug,thread_proto=debug".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("threadview log: {}", log_path.display());

    info!("threadview starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .unwrap_or_default();

    let href = args.href.unwrap_or_else(|| config.thread.href.clone());
    let store_path = args.store.unwrap_or_else(|| config.store.path.clone());
    let user = config.user.drive();
    info!(
        "user {} ({}), thread {}, store {}",
        user.display_title(),
        user.url,
        href,
        store_path.display()
    );

    // ── Store ────────────────────────────────────────────────────────────────
    let store = LocalStore::open(store_path, user.clone())?;
    if config.store.seed_sample {
        match seed_sample_thread(&store, &href).await {
            Ok(true) => info!("seeded sample thread for {}", href),
            Ok(false) => {}
            Err(e) => warn!("could not seed sample thread: {}", e),
        }
    }

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let props = ThreadProps {
        href,
        user_url: user.url,
        composer_placeholder: config.thread.composer_placeholder.clone(),
    };
    let app = app::App::new(Arc::new(store), props);
    app.run().await?;

    Ok(())
}

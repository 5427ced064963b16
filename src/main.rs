use std::env;
use std::path::PathBuf;
use std::process::Command;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;

use repuragent_demo::core::config::env_file::OPENAI_API_KEY;
use repuragent_demo::core::logging;
use repuragent_demo::server;
use repuragent_demo::state::AppState;

/// Read-only viewer for recorded RepurAgent conversations.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Listen port. Overrides `server.port` from config.yml.
    #[arg(long)]
    port: Option<u16>,

    /// Do not open a browser window after startup.
    #[arg(long)]
    headless: bool,

    /// Override the user data directory (databases, logs).
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let state = AppState::initialize(args.data_dir).await?;
    logging::init(&state.paths);

    let api_key_present = env::var(OPENAI_API_KEY)
        .map(|val| !val.trim().is_empty())
        .unwrap_or(false);
    if !api_key_present {
        tracing::warn!("OPENAI_API_KEY is not set; live agent features stay disabled");
    }

    if state.conversations.thread_count().await? == 0 {
        let snapshot = state.conversations.create_thread(None).await?;
        tracing::info!("Seeded initial thread {}", snapshot.thread_id);
    }

    let config = state.config.load_config().unwrap_or_default();
    let host = config
        .pointer("/server/host")
        .and_then(|val| val.as_str())
        .unwrap_or("127.0.0.1")
        .to_string();
    let port = args.port.unwrap_or_else(|| {
        config
            .pointer("/server/port")
            .and_then(|val| val.as_u64())
            .and_then(|val| u16::try_from(val).ok())
            .unwrap_or(8502)
    });
    let bind_addr = format!("{}:{}", host, port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    let url = format!("http://{}", addr);

    tracing::info!("Listening on {}", addr);

    if args.headless {
        tracing::info!("Headless mode; open {} manually", url);
    } else {
        open_browser(&url);
    }

    let app: Router = server::router::router(state.clone());

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn open_browser(url: &str) {
    #[cfg(target_os = "windows")]
    let result = Command::new("cmd").args(["/C", "start", "", url]).spawn();
    #[cfg(target_os = "macos")]
    let result = Command::new("open").arg(url).spawn();
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let result = Command::new("xdg-open").arg(url).spawn();

    if let Err(err) = result {
        tracing::warn!("Could not open a browser for {}: {}", url, err);
    }
}

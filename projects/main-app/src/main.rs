mod app_state;
mod config;
mod core;
mod display;
mod notify;
mod stream;
mod web;

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use app_state::{AppState, session_options};
use config::AppConfig;
use stream::{http_transport::HttpTransport, probe::probe_stream};
use tracing::{info, warn};
use tracing_appender::rolling;

const PROBE_WAIT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = AppConfig::from_env()?;

    let mut args = std::env::args().skip(1);
    if let Some(flag) = args.next().filter(|arg| arg == "--probe") {
        let url = args
            .next()
            .with_context(|| format!("{flag} needs a stream URL"))?;
        let transport = HttpTransport::new(&config.user_agent, config.connect_timeout)?;
        let report = probe_stream(transport, &url, session_options(&config), PROBE_WAIT).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    tokio::fs::create_dir_all(&config.log_dir).await?;
    let file_appender = rolling::daily(&config.log_dir, "mjpeg-viewer.log");
    let (non_blocking, _log_guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::INFO)
        .init();

    tokio::fs::create_dir_all("static").await?;

    let state = Arc::new(AppState::new(config.clone())?);
    let app = web::routes::build_router(state.clone());

    if let Some(url) = config.stream_url.as_deref() {
        let mut stream = state.stream.lock().await;
        match stream.start(url) {
            Ok(url) => info!("auto-starting stream from {url}"),
            Err(err) => warn!("ignoring STREAM_URL: {err}"),
        }
    }

    info!("{} listening on {}", config.app_name, config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Context;

pub const DEFAULT_MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub bind_addr: SocketAddr,
    pub stream_url: Option<String>,
    pub default_stream_path: String,
    pub max_frame_bytes: Option<usize>,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub log_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "MJPEG Viewer".to_owned());
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_owned())
            .parse()
            .context("invalid BIND_ADDR")?;
        let stream_url = env::var("STREAM_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let default_stream_path = env::var("DEFAULT_STREAM_PATH")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .map(|value| {
                if value.starts_with('/') {
                    value
                } else {
                    format!("/{value}")
                }
            })
            .unwrap_or_else(|| "/stream".to_owned());

        // 0 disables the cap.
        let max_frame_bytes = match env::var("MAX_FRAME_BYTES") {
            Ok(value) => value
                .trim()
                .parse::<usize>()
                .context("invalid MAX_FRAME_BYTES")?,
            Err(_) => DEFAULT_MAX_FRAME_BYTES,
        };
        let max_frame_bytes = (max_frame_bytes > 0).then_some(max_frame_bytes);

        let user_agent = env::var("USER_AGENT")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| format!("mjpeg-viewer/{}", env!("CARGO_PKG_VERSION")));
        let connect_timeout = env::var("CONNECT_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));
        let log_dir = env::var("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("logs"));

        Ok(Self {
            app_name,
            bind_addr,
            stream_url,
            default_stream_path,
            max_frame_bytes,
            user_agent,
            connect_timeout,
            log_dir,
        })
    }
}

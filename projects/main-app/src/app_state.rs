use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::{
    config::AppConfig,
    display::FrameDisplay,
    notify::message::MessageSender,
    stream::{
        http_transport::HttpTransport,
        service::{SessionOptions, StreamService},
    },
};

pub struct AppState {
    pub config: AppConfig,
    pub stream: Mutex<StreamService<HttpTransport>>,
    pub display: Arc<FrameDisplay>,
    pub messages: MessageSender,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config.user_agent, config.connect_timeout)?;
        let messages = MessageSender::new(&config.user_agent, config.connect_timeout)?;
        let display = Arc::new(FrameDisplay::new());
        let stream = StreamService::new(transport, display.clone(), session_options(&config));

        Ok(Self {
            config,
            stream: Mutex::new(stream),
            display,
            messages,
        })
    }
}

pub fn session_options(config: &AppConfig) -> SessionOptions {
    SessionOptions {
        default_path: config.default_stream_path.clone(),
        max_frame_bytes: config.max_frame_bytes,
    }
}

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use reqwest::Url;

use crate::core::state::StreamStatus;

use super::decode::DecodedFrame;

pub type ChunkStream = BoxStream<'static, Result<Bytes>>;

/// An opened stream: response metadata plus the body as it arrives. The stream
/// ending is a close, an `Err` item is a transport failure.
pub struct StreamResponse {
    pub content_type: Option<String>,
    pub chunks: ChunkStream,
}

impl StreamResponse {
    pub fn looks_like_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|value| value.trim_start().to_ascii_lowercase().starts_with("text/html"))
    }
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn open(&self, url: &Url) -> Result<StreamResponse>;
}

/// Receives frames and lifecycle changes. Calls are made synchronously from the
/// session task and must not block.
pub trait Presenter: Send + Sync {
    fn on_frame(&self, frame: Arc<DecodedFrame>);
    fn on_status(&self, status: StreamStatus);
}

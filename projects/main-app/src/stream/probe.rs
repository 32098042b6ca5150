use std::{sync::Arc, time::Duration};

use anyhow::{Result, bail};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::core::state::{StatusKind, StreamStatus};

use super::{
    decode::DecodedFrame,
    service::{SessionOptions, StreamService},
    traits::{Presenter, Transport},
};

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub url: String,
    pub status: StatusKind,
    pub message: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub jpeg_bytes: Option<usize>,
}

enum ProbeEvent {
    Frame(Arc<DecodedFrame>),
    Status(StreamStatus),
}

struct ChannelPresenter {
    tx: mpsc::UnboundedSender<ProbeEvent>,
}

impl Presenter for ChannelPresenter {
    fn on_frame(&self, frame: Arc<DecodedFrame>) {
        let _ = self.tx.send(ProbeEvent::Frame(frame));
    }

    fn on_status(&self, status: StreamStatus) {
        let _ = self.tx.send(ProbeEvent::Status(status));
    }
}

/// Opens one session and reports on the first frame, or on whatever ended the
/// session before a frame arrived.
pub async fn probe_stream<T: Transport>(
    transport: T,
    input: &str,
    options: SessionOptions,
    wait: Duration,
) -> Result<ProbeReport> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut service = StreamService::new(transport, Arc::new(ChannelPresenter { tx }), options);
    let url = service.start(input)?;

    let outcome = tokio::time::timeout(wait, async {
        let mut streaming = None;
        while let Some(event) = rx.recv().await {
            match event {
                ProbeEvent::Frame(frame) => return Some((frame_status(streaming), Some(frame))),
                ProbeEvent::Status(status) if status.is_terminal() => return Some((status, None)),
                ProbeEvent::Status(status) => streaming = Some(status),
            }
        }
        None
    })
    .await;
    service.stop();

    let Ok(Some((status, frame))) = outcome else {
        bail!("no frame received from {url} within {}s", wait.as_secs());
    };

    Ok(ProbeReport {
        url: url.to_string(),
        status: status.kind,
        message: status.message,
        width: frame.as_ref().map(|f| f.width()),
        height: frame.as_ref().map(|f| f.height()),
        jpeg_bytes: frame.as_ref().map(|f| f.jpeg().len()),
    })
}

fn frame_status(last: Option<StreamStatus>) -> StreamStatus {
    last.filter(|status| status.kind == StatusKind::Streaming)
        .unwrap_or_else(|| StreamStatus::new(StatusKind::Streaming, "Streaming"))
}

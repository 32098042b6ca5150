use std::sync::Arc;

use reqwest::Url;
use tracing::{debug, warn};

use crate::core::state::{StatusKind, StreamStatus};

use super::{decode::DecodedFrame, jpeg::FrameExtractor};

/// How a session's connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndKind {
    InvalidEndpoint,
    StreamClosedEmpty,
    StreamClosedAfterFrames,
    NetworkError,
}

impl EndKind {
    pub fn classify(had_frame: bool, is_network_error: bool, looks_like_html: bool) -> Self {
        if is_network_error {
            Self::NetworkError
        } else if had_frame {
            Self::StreamClosedAfterFrames
        } else if looks_like_html {
            Self::InvalidEndpoint
        } else {
            Self::StreamClosedEmpty
        }
    }

    pub fn status(self, network_message: Option<&str>) -> StreamStatus {
        match self {
            Self::InvalidEndpoint => StreamStatus::error(
                "No MJPEG stream detected. Ensure the URL points to the /stream endpoint.",
            ),
            Self::StreamClosedEmpty => {
                StreamStatus::error("Stream closed before any frames were received.")
            }
            Self::StreamClosedAfterFrames => {
                StreamStatus::new(StatusKind::Idle, "Stream closed by server.")
            }
            Self::NetworkError => StreamStatus::error(format!(
                "Error: {}",
                network_message.unwrap_or("Unknown network error")
            )),
        }
    }
}

/// One connection attempt. Owns the scan buffer and the last good image; both
/// go away with the session.
pub struct StreamSession {
    id: u64,
    url: Url,
    extractor: FrameExtractor,
    last_image: Option<Arc<DecodedFrame>>,
    frames_decoded: u64,
    frames_dropped: u64,
}

impl StreamSession {
    pub fn new(id: u64, url: Url, max_frame_bytes: Option<usize>) -> Self {
        Self {
            id,
            url,
            extractor: FrameExtractor::with_max_frame_bytes(max_frame_bytes),
            last_image: None,
            frames_decoded: 0,
            frames_dropped: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn had_frame(&self) -> bool {
        self.last_image.is_some()
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    pub fn last_image(&self) -> Option<&Arc<DecodedFrame>> {
        self.last_image.as_ref()
    }

    /// Feeds a chunk and decodes whatever frames it completed, one at a time on
    /// the blocking pool so they come back in arrival order. Frames the codec
    /// rejects are skipped.
    pub async fn ingest(&mut self, chunk: &[u8]) -> Vec<Arc<DecodedFrame>> {
        let mut decoded = Vec::new();
        for frame in self.extractor.feed(chunk) {
            let len = frame.len();
            match tokio::task::spawn_blocking(move || DecodedFrame::decode(frame)).await {
                Ok(Ok(image)) => {
                    let image = Arc::new(image);
                    self.last_image = Some(image.clone());
                    self.frames_decoded += 1;
                    decoded.push(image);
                }
                Ok(Err(err)) => {
                    self.frames_dropped += 1;
                    debug!("session {} dropped {len}-byte frame: {err}", self.id);
                }
                Err(err) => {
                    self.frames_dropped += 1;
                    warn!("session {} decode task failed: {err}", self.id);
                }
            }
        }
        decoded
    }

    pub fn end(&self, network_error: Option<&str>, looks_like_html: bool) -> StreamStatus {
        EndKind::classify(self.had_frame(), network_error.is_some(), looks_like_html)
            .status(network_error)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Url;

    use crate::{
        core::state::StatusKind,
        stream::testing::{fake_stream, sample_jpeg},
    };

    use super::{EndKind, StreamSession};

    fn session() -> StreamSession {
        StreamSession::new(
            7,
            Url::parse("http://cam.local/stream").expect("url should parse"),
            None,
        )
    }

    #[test]
    fn classification_table() {
        use EndKind::*;
        let cases = [
            ((false, false, false), StreamClosedEmpty),
            ((false, false, true), InvalidEndpoint),
            ((true, false, false), StreamClosedAfterFrames),
            ((true, false, true), StreamClosedAfterFrames),
            ((false, true, false), NetworkError),
            ((false, true, true), NetworkError),
            ((true, true, false), NetworkError),
            ((true, true, true), NetworkError),
        ];
        for ((had_frame, network, html), expected) in cases {
            assert_eq!(
                EndKind::classify(had_frame, network, html),
                expected,
                "had_frame={had_frame} network={network} html={html}"
            );
        }
    }

    #[test]
    fn only_graceful_close_is_not_an_error() {
        assert!(!EndKind::StreamClosedAfterFrames.status(None).is_error());
        assert!(EndKind::StreamClosedEmpty.status(None).is_error());
        assert!(EndKind::InvalidEndpoint.status(None).is_error());

        let status = EndKind::NetworkError.status(Some("connection reset"));
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(status.message, "Error: connection reset");
    }

    #[tokio::test]
    async fn ingest_decodes_frames_and_keeps_last_image() {
        let mut session = session();
        let stream = fake_stream(&[sample_jpeg(4, 4), sample_jpeg(6, 2)]);
        let (head, tail) = stream.split_at(stream.len() / 2);

        let mut frames = session.ingest(head).await;
        frames.extend(session.ingest(tail).await);

        assert_eq!(frames.len(), 2);
        assert_eq!(session.frames_decoded(), 2);
        let last = session.last_image().expect("last image should be kept");
        assert_eq!((last.width(), last.height()), (6, 2));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn ingest_keeps_arrival_order_within_a_chunk() {
        let mut session = session();
        let sizes = [(4, 4), (6, 2), (8, 8), (2, 6)];
        let jpegs: Vec<Vec<u8>> = sizes.iter().map(|&(w, h)| sample_jpeg(w, h)).collect();

        let frames = session.ingest(&fake_stream(&jpegs)).await;
        let decoded: Vec<(u32, u32)> = frames.iter().map(|f| (f.width(), f.height())).collect();
        assert_eq!(decoded, sizes);
        assert_eq!(session.frames_decoded(), 4);
    }

    #[tokio::test]
    async fn undecodable_frame_is_dropped_without_ending_session() {
        let mut session = session();
        let mut stream = vec![0xFF, 0xD8, 0x00, 0x01, 0xFF, 0xD9];
        stream.extend_from_slice(&sample_jpeg(4, 4));

        let frames = session.ingest(&stream).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(session.frames_dropped(), 1);
        assert!(session.had_frame());
    }

    #[tokio::test]
    async fn end_status_reflects_frames_seen() {
        let mut session = session();
        assert_eq!(
            session.end(None, true).message,
            "No MJPEG stream detected. Ensure the URL points to the /stream endpoint."
        );
        session.ingest(&sample_jpeg(4, 4)).await;
        assert_eq!(session.end(None, true).message, "Stream closed by server.");
    }
}

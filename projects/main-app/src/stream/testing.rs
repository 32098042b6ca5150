use std::{
    collections::VecDeque,
    io::Cursor,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::core::state::{StatusKind, StreamStatus};

use super::{
    decode::DecodedFrame,
    traits::{Presenter, StreamResponse, Transport},
};

pub fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 96]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut out, ImageFormat::Jpeg)
        .expect("test jpeg should encode");
    out.into_inner()
}

/// Wraps frames the way an `mpjpeg` muxer does.
pub fn fake_stream(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for frame in frames {
        out.extend_from_slice(
            format!(
                "--frame\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
                frame.len()
            )
            .as_bytes(),
        );
        out.extend_from_slice(frame);
        out.extend_from_slice(b"\r\n");
    }
    out
}

pub fn response_from_chunks(
    content_type: Option<&str>,
    chunks: Vec<Result<Vec<u8>>>,
) -> StreamResponse {
    StreamResponse {
        content_type: content_type.map(str::to_owned),
        chunks: tokio_stream::iter(chunks.into_iter().map(|chunk| chunk.map(Bytes::from))).boxed(),
    }
}

/// A response whose body is fed by the returned sender; dropping it closes the stream.
pub fn response_from_channel(content_type: Option<&str>) -> (mpsc::Sender<Bytes>, StreamResponse) {
    let (tx, rx) = mpsc::channel(16);
    let response = StreamResponse {
        content_type: content_type.map(str::to_owned),
        chunks: ReceiverStream::new(rx).map(Ok).boxed(),
    };
    (tx, response)
}

/// URLs a [`ScriptedTransport`] was asked to open; stays readable after the
/// transport moves into a service.
#[derive(Clone, Default)]
pub struct OpenLog(Arc<Mutex<Vec<Url>>>);

impl OpenLog {
    pub fn urls(&self) -> Vec<String> {
        self.0
            .lock()
            .expect("open log lock")
            .iter()
            .map(Url::to_string)
            .collect()
    }
}

#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<StreamResponse>>>,
    opened: OpenLog,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<StreamResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            opened: OpenLog::default(),
        }
    }

    pub fn open_log(&self) -> OpenLog {
        self.opened.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, url: &Url) -> Result<StreamResponse> {
        self.opened.0.lock().expect("open log lock").push(url.clone());
        let next = self.responses.lock().expect("responses lock").pop_front();
        next.unwrap_or_else(|| Err(anyhow!("no scripted response")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Frame { width: u32, height: u32 },
    Status(StreamStatus),
}

#[derive(Default)]
pub struct RecordingPresenter {
    events: Mutex<Vec<Event>>,
}

impl RecordingPresenter {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("events lock").clone()
    }

    pub fn frame_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, Event::Frame { .. }))
            .count()
    }

    pub fn statuses(&self) -> Vec<StreamStatus> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Status(status) => Some(status),
                Event::Frame { .. } => None,
            })
            .collect()
    }

    pub fn last_status(&self) -> Option<StreamStatus> {
        self.statuses().pop()
    }

    pub async fn wait_for_status(&self, kind: StatusKind) -> StreamStatus {
        wait_until(|| self.statuses().into_iter().rev().find(|s| s.kind == kind)).await
    }

    pub async fn wait_for_frames(&self, count: usize) {
        wait_until(|| (self.frame_count() >= count).then_some(())).await;
    }
}

impl Presenter for RecordingPresenter {
    fn on_frame(&self, frame: Arc<DecodedFrame>) {
        self.events.lock().expect("events lock").push(Event::Frame {
            width: frame.width(),
            height: frame.height(),
        });
    }

    fn on_status(&self, status: StreamStatus) {
        self.events.lock().expect("events lock").push(Event::Status(status));
    }
}

pub async fn wait_until<T>(mut check: impl FnMut() -> Option<T>) -> T {
    for _ in 0..200 {
        if let Some(value) = check() {
            return value;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

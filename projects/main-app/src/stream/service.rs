use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use reqwest::Url;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{info, warn};

use crate::core::{
    errors::StreamError,
    state::{StatusKind, StreamState, StreamStatus},
};

use super::{
    decode::DecodedFrame,
    session::StreamSession,
    traits::{Presenter, Transport},
    url::normalize_stream_url,
};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub default_path: String,
    pub max_frame_bytes: Option<usize>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            default_path: "/stream".to_owned(),
            max_frame_bytes: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceStatus {
    pub state: StreamState,
    pub url: Option<Url>,
}

struct GateState {
    session_id: u64,
    state: StreamState,
    url: Option<Url>,
}

/// Serializes every presenter notification against session replacement. A
/// session task may only notify while its id is the current one, and teardown
/// changes the id under the same lock.
struct SessionGate {
    inner: Mutex<GateState>,
    presenter: Arc<dyn Presenter>,
}

impl SessionGate {
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn frame(&self, session_id: u64, frame: Arc<DecodedFrame>) -> bool {
        let mut gate = self.lock();
        if gate.session_id != session_id || gate.state == StreamState::Idle {
            return false;
        }
        if gate.state == StreamState::Connecting {
            gate.state = StreamState::Streaming;
            info!(
                "session {session_id} streaming at {}x{}",
                frame.width(),
                frame.height()
            );
            self.presenter
                .on_status(StreamStatus::new(StatusKind::Streaming, "Streaming"));
        }
        self.presenter.on_frame(frame);
        true
    }

    fn finish(&self, session_id: u64, status: StreamStatus) {
        let mut gate = self.lock();
        if gate.session_id != session_id || gate.state == StreamState::Idle {
            return;
        }
        gate.state = StreamState::Idle;
        self.presenter.on_status(status);
    }
}

struct ActiveSession {
    id: u64,
    cancel_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns at most one running stream session and the transport used to open it.
pub struct StreamService<T: Transport> {
    transport: Arc<T>,
    options: SessionOptions,
    gate: Arc<SessionGate>,
    next_id: u64,
    active: Option<ActiveSession>,
}

impl<T: Transport> StreamService<T> {
    pub fn new(transport: T, presenter: Arc<dyn Presenter>, options: SessionOptions) -> Self {
        Self {
            transport: Arc::new(transport),
            options,
            gate: Arc::new(SessionGate {
                inner: Mutex::new(GateState {
                    session_id: 0,
                    state: StreamState::Idle,
                    url: None,
                }),
                presenter,
            }),
            next_id: 0,
            active: None,
        }
    }

    /// Validates `input` and replaces whatever session is running with a new one.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, input: &str) -> Result<Url, StreamError> {
        let url = match normalize_stream_url(input, &self.options.default_path) {
            Ok(url) => url,
            Err(err) => {
                warn!("rejected stream url {input:?}: {err}");
                let gate = self.gate.lock();
                if gate.state == StreamState::Idle {
                    self.gate.presenter.on_status(StreamStatus::error("Invalid URL"));
                }
                return Err(err);
            }
        };

        self.teardown(None);

        self.next_id += 1;
        let id = self.next_id;
        let session = StreamSession::new(id, url.clone(), self.options.max_frame_bytes);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        {
            let mut gate = self.gate.lock();
            gate.session_id = id;
            gate.state = StreamState::Connecting;
            gate.url = Some(url.clone());
            self.gate.presenter.on_status(StreamStatus::new(
                StatusKind::Connecting,
                format!("Connecting to {url}"),
            ));
        }

        let handle = tokio::spawn(run_session(
            self.transport.clone(),
            self.gate.clone(),
            session,
            cancel_rx,
        ));
        self.active = Some(ActiveSession {
            id,
            cancel_tx,
            handle,
        });

        info!("session {id} connecting to {url}");
        Ok(url)
    }

    /// Stops the running session, if any. Calling it while idle does nothing.
    pub fn stop(&mut self) {
        self.teardown(Some(StreamStatus::stopped()));
    }

    pub fn status(&self) -> ServiceStatus {
        let gate = self.gate.lock();
        ServiceStatus {
            state: gate.state,
            url: gate.url.clone(),
        }
    }

    pub fn current_url(&self) -> Option<Url> {
        self.status().url
    }

    /// Detaches and cancels the active session. `report` is sent only if that
    /// session had not already ended on its own.
    fn teardown(&mut self, report: Option<StreamStatus>) {
        let Some(active) = self.active.take() else {
            return;
        };

        {
            let mut gate = self.gate.lock();
            let running = gate.session_id == active.id && gate.state != StreamState::Idle;
            gate.session_id = 0;
            gate.state = StreamState::Idle;
            if let Some(status) = report.filter(|_| running) {
                self.gate.presenter.on_status(status);
            }
        }

        let _ = active.cancel_tx.send(true);
        active.handle.abort();
        info!("session {} torn down", active.id);
    }
}

impl<T: Transport> Drop for StreamService<T> {
    fn drop(&mut self) {
        self.teardown(None);
    }
}

async fn run_session<T: Transport>(
    transport: Arc<T>,
    gate: Arc<SessionGate>,
    mut session: StreamSession,
    mut cancel_rx: watch::Receiver<bool>,
) {
    let id = session.id();
    let opened = tokio::select! {
        _ = cancel_rx.changed() => {
            info!("session {id} cancelled while connecting");
            return;
        }
        opened = transport.open(session.url()) => opened,
    };

    let response = match opened {
        Ok(response) => response,
        Err(err) => {
            let message = format!("{err:#}");
            warn!("session {id} failed to open stream: {message}");
            gate.finish(id, session.end(Some(message.as_str()), false));
            return;
        }
    };

    let looks_like_html = response.looks_like_html();
    let mut chunks = response.chunks;
    let network_error = loop {
        tokio::select! {
            _ = cancel_rx.changed() => {
                info!("session {id} cancelled by stop request");
                return;
            }
            next = chunks.next() => match next {
                Some(Ok(chunk)) => {
                    for frame in session.ingest(&chunk).await {
                        if !gate.frame(id, frame) {
                            return;
                        }
                    }
                }
                Some(Err(err)) => break Some(format!("{err:#}")),
                None => break None,
            }
        }
    };

    if let Some(message) = network_error.as_deref() {
        warn!("session {id} stream error: {message}");
    }
    let resolution = session
        .last_image()
        .map(|frame| format!("{}x{}", frame.width(), frame.height()))
        .unwrap_or_else(|| "none".to_owned());
    info!(
        "session {id} ended after {} frames ({} dropped, last {resolution})",
        session.frames_decoded(),
        session.frames_dropped()
    );
    gate.finish(id, session.end(network_error.as_deref(), looks_like_html));
}

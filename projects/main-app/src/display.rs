use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

use crate::{
    core::state::{StatusKind, StreamStatus},
    stream::{decode::DecodedFrame, traits::Presenter},
};

struct DisplayState {
    status: StreamStatus,
    frame: Option<Arc<DecodedFrame>>,
    frames_shown: u64,
}

/// What the web surface shows: the latest status line and the latest frame.
/// Any status other than `Streaming` clears the frame, so a torn-down session
/// never leaves a stale picture behind.
pub struct FrameDisplay {
    state: Mutex<DisplayState>,
}

impl FrameDisplay {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DisplayState {
                status: StreamStatus::idle(),
                frame: None,
                frames_shown: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DisplayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> StreamStatus {
        self.lock().status.clone()
    }

    pub fn frame(&self) -> Option<Arc<DecodedFrame>> {
        self.lock().frame.clone()
    }

    pub fn frames_shown(&self) -> u64 {
        self.lock().frames_shown
    }
}

impl Default for FrameDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Presenter for FrameDisplay {
    fn on_frame(&self, frame: Arc<DecodedFrame>) {
        let mut state = self.lock();
        state.frame = Some(frame);
        state.frames_shown += 1;
    }

    fn on_status(&self, status: StreamStatus) {
        let mut state = self.lock();
        if status.kind != StatusKind::Streaming {
            state.frame = None;
            state.frames_shown = 0;
        }
        if status.is_error() {
            info!("status: {} (error)", status.message);
        } else {
            info!("status: {}", status.message);
        }
        state.status = status;
    }
}

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Idle,
    Connecting,
    Streaming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Idle,
    Connecting,
    Streaming,
    Error,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamStatus {
    pub kind: StatusKind,
    pub message: String,
}

impl StreamStatus {
    pub fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn idle() -> Self {
        Self::new(StatusKind::Idle, "Idle")
    }

    pub fn stopped() -> Self {
        Self::new(StatusKind::Stopped, "Stream stopped.")
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(StatusKind::Error, message)
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }

    /// Statuses that end a session; the displayed frame does not survive them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            StatusKind::Idle | StatusKind::Error | StatusKind::Stopped
        )
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::session::SessionState;

/// Snapshot of a recording session's progress, for the widget's timer and
/// status display.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Current state of the session state machine
    pub state: SessionState,

    /// When the current session started
    pub started_at: DateTime<Utc>,

    /// Whole seconds elapsed since start, driven by the session's 1 s timer
    pub elapsed_secs: u64,

    /// Number of PCM chunks captured so far
    pub chunks_recorded: usize,

    /// Total captured PCM payload in bytes (2 per sample)
    pub pcm_bytes: usize,
}

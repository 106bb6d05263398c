//! Recording session management
//!
//! This module provides the `RecordingSession` abstraction that manages:
//! - The Idle/Recording/Previewing/Sending state machine
//! - The generation token that invalidates stale async callbacks
//! - PCM and transcript buffers for the current recording
//! - Submission to the chat backend and the elapsed-time counter

mod config;
mod session;
mod stats;

pub use config::{ChatMode, SessionConfig, VoiceMode};
pub use session::{RecordingSession, SessionState, StopOutcome};
pub use stats::SessionStats;

use thiserror::Error;

/// Failure taxonomy for the voice subsystem.
///
/// Every async entry point (frame pump, recognizer pump, timer, network
/// future) converts its failures into one of these and a session-state
/// transition; nothing escapes unhandled. Stale token-mismatched events are
/// not errors at all and never surface here.
#[derive(Debug, Error)]
pub enum VoiceError {
    /// Voice input requested while the widget is not in ask mode.
    #[error("voice input is only available in ask mode")]
    Mode,

    /// The capture or recognition backend required by the configured voice
    /// mode is absent in this environment.
    #[error("{0} is not available in this environment")]
    Unsupported(&'static str),

    /// Send requested with no captured audio or transcript.
    #[error("nothing recorded to send")]
    EmptyRecording,

    /// The capture or recognition backend reported an asynchronous failure.
    /// Fatal to the current session only; the session is cancelled.
    #[error("audio backend error: {0}")]
    Backend(String),

    /// Network call failed or returned a non-success or unparseable
    /// response. The session reverts to idle; never retried automatically.
    #[error("chat transport error: {0}")]
    Transport(String),

    /// Operation requested in a state that does not permit it (for example
    /// a second send while one is outstanding).
    #[error("invalid session state: {0}")]
    InvalidState(&'static str),
}

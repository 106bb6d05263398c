use serde::{Deserialize, Serialize};

/// Which voice pipeline a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceMode {
    /// Capture raw PCM locally and submit it to /speech-chat.
    Record,
    /// Stream through a live recognizer and submit the finalized
    /// transcript to /ask.
    Dictate,
}

/// Widget-level chat mode. Voice input is only permitted in `Ask`; the
/// survey flow redirects elsewhere and never records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    Ask,
    Survey,
}

/// Configuration for a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier, mainly for logs
    pub session_id: String,

    /// Sample rate the capture path runs at, fixed for the session's
    /// lifetime (16 kHz is what the speech backend expects)
    pub sample_rate: u32,

    /// Which voice pipeline to run
    pub voice_mode: VoiceMode,

    /// Slice size for the transport encoder, rounded down to a multiple
    /// of three so sliced and whole-buffer encodings agree
    pub encode_slice_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("voice-{}", uuid::Uuid::new_v4()),
            sample_rate: 16000,
            voice_mode: VoiceMode::Record,
            encode_slice_bytes: crate::transport::DEFAULT_SLICE_BYTES,
        }
    }
}

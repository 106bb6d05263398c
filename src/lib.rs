pub mod audio;
pub mod config;
pub mod error;
pub mod session;
pub mod speech;
pub mod transport;

pub use audio::{
    encode_wav, floats_from_pcm, CaptureBackend, CaptureEvent, PcmFrameBuffer, PushCapture,
    PushHandle,
};
pub use config::Config;
pub use error::VoiceError;
pub use session::{
    ChatMode, RecordingSession, SessionConfig, SessionState, SessionStats, StopOutcome, VoiceMode,
};
pub use speech::{
    PushRecognizer, RecognitionResult, Recognizer, RecognizerEvent, RecognizerHandle,
    TranscriptBuffer,
};
pub use transport::{AskReply, ChatReply, ChatTransport, HttpChatTransport};

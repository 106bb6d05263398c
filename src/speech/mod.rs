pub mod recognizer;
pub mod transcript;

pub use recognizer::{PushRecognizer, RecognitionResult, Recognizer, RecognizerEvent, RecognizerHandle};
pub use transcript::TranscriptBuffer;

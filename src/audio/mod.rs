pub mod buffer;
pub mod capture;
pub mod wav;

pub use buffer::{floats_from_pcm, PcmFrameBuffer};
pub use capture::{CaptureBackend, CaptureEvent, PushCapture, PushHandle};
pub use wav::encode_wav;

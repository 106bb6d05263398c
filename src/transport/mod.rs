pub mod client;
pub mod encode;

pub use client::{AskReply, ChatReply, ChatTransport, HttpChatTransport};
pub use encode::{to_base64, to_base64_sliced, DEFAULT_SLICE_BYTES};

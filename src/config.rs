use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Slice size for the chunked transport encoder, in bytes.
    pub encode_slice_bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct ChatConfig {
    /// Base URL of the chat backend serving /ask and /speech-chat.
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

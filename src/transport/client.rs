use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::error::VoiceError;

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct SpeechChatRequest<'a> {
    audio: &'a str,
    #[serde(rename = "sampleRate")]
    sample_rate: u32,
}

/// Response from `POST /ask`.
#[derive(Debug, Clone, Deserialize)]
pub struct AskReply {
    pub reply: String,
}

/// Response from `POST /speech-chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    /// Server-side transcript of the submitted audio, when available.
    #[serde(default)]
    pub transcript: Option<String>,
    pub reply: String,
}

/// Client side of the chat backend's two endpoints.
///
/// The endpoints themselves are external collaborators; this trait is the
/// seam that lets the session stay agnostic of the actual wire and lets
/// tests substitute a counting double. Failures map to
/// [`VoiceError::Transport`] and are never retried here.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// `POST /ask` with a typed message or finalized transcript.
    async fn ask(&self, message: &str) -> Result<AskReply, VoiceError>;

    /// `POST /speech-chat` with Base64-encoded mono 16-bit PCM.
    async fn speech_chat(&self, audio_b64: &str, sample_rate: u32)
        -> Result<ChatReply, VoiceError>;
}

/// HTTP implementation over `reqwest`.
pub struct HttpChatTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChatTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, VoiceError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| VoiceError::Transport(format!("{path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VoiceError::Transport(format!("{path} returned {status}")));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| VoiceError::Transport(format!("{path}: invalid response: {e}")))
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn ask(&self, message: &str) -> Result<AskReply, VoiceError> {
        info!("POST /ask ({} chars)", message.len());
        self.post_json("/ask", &AskRequest { message }).await
    }

    async fn speech_chat(
        &self,
        audio_b64: &str,
        sample_rate: u32,
    ) -> Result<ChatReply, VoiceError> {
        info!(
            "POST /speech-chat ({} encoded bytes at {} Hz)",
            audio_b64.len(),
            sample_rate
        );
        self.post_json(
            "/speech-chat",
            &SpeechChatRequest {
                audio: audio_b64,
                sample_rate,
            },
        )
        .await
    }
}

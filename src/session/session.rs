use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::config::{ChatMode, SessionConfig, VoiceMode};
use super::stats::SessionStats;
use crate::audio::{encode_wav, CaptureBackend, CaptureEvent, PcmFrameBuffer};
use crate::error::VoiceError;
use crate::speech::{Recognizer, RecognizerEvent, TranscriptBuffer};
use crate::transport::{self, ChatReply, ChatTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Recording,
    Previewing,
    Sending,
}

/// What `stop` hands back for the user to review before sending.
#[derive(Debug, Clone)]
pub enum StopOutcome {
    /// WAV container for local preview playback (record mode). Never
    /// transmitted; the wire carries the raw merged PCM instead.
    Preview(Vec<u8>),
    /// Finalized transcript (dictate mode). Interim guesses are discarded.
    Transcript(String),
}

enum Payload {
    Audio(Vec<u8>),
    Text(String),
}

/// A voice recording session: owns the capture/recognition backend, the
/// PCM and transcript buffers, and the elapsed-time counter.
///
/// Cancellation is generation-based. Every `start` and every cancel bumps
/// `token`; the frame pump, recognizer pump, and timer each capture the
/// token at spawn and re-check it under the state lock before touching
/// anything. A mismatch means the event belongs to a superseded session and
/// is dropped without logging. Backends are never assumed to tear down
/// synchronously, so this gate is the only defense against late callbacks.
pub struct RecordingSession {
    config: SessionConfig,
    transport: Arc<dyn ChatTransport>,
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    state: SessionState,
    token: u64,
    mode: ChatMode,
    buffer: PcmFrameBuffer,
    transcript: TranscriptBuffer,
    started_at: DateTime<Utc>,
    elapsed_secs: u64,
    capture: Option<Box<dyn CaptureBackend>>,
    recognizer: Option<Box<dyn Recognizer>>,
    timer: Option<JoinHandle<()>>,
}

impl Inner {
    /// Shared cancel path: invalidate in-flight callbacks, release the
    /// stream resources, drop captured data. Safe to run from any state;
    /// backend stops are idempotent, so a double close never fails.
    async fn reset(&mut self) {
        self.token += 1;

        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if let Some(capture) = self.capture.as_mut() {
            if let Err(e) = capture.stop().await {
                warn!("Capture stop failed: {e:#}");
            }
        }
        if let Some(recognizer) = self.recognizer.as_mut() {
            if let Err(e) = recognizer.stop().await {
                warn!("Recognizer stop failed: {e:#}");
            }
        }

        self.buffer.clear();
        self.transcript.clear();
        self.elapsed_secs = 0;
        self.state = SessionState::Idle;
    }
}

impl RecordingSession {
    /// Build a session around whichever backends this environment offers.
    /// Capability is decided here, once: a `None` backend means the
    /// corresponding voice mode fails with `Unsupported` at `start`.
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn ChatTransport>,
        capture: Option<Box<dyn CaptureBackend>>,
        recognizer: Option<Box<dyn Recognizer>>,
    ) -> Self {
        info!(
            "Creating voice session {} ({:?} mode, {} Hz)",
            config.session_id, config.voice_mode, config.sample_rate
        );

        Self {
            config,
            transport,
            inner: Arc::new(Mutex::new(Inner {
                state: SessionState::Idle,
                token: 0,
                mode: ChatMode::Ask,
                buffer: PcmFrameBuffer::new(),
                transcript: TranscriptBuffer::new(),
                started_at: Utc::now(),
                elapsed_secs: 0,
                capture,
                recognizer,
                timer: None,
            })),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub async fn set_mode(&self, mode: ChatMode) {
        self.inner.lock().await.mode = mode;
    }

    /// Begin a new recording.
    ///
    /// Mode and capability preconditions fail without touching session
    /// state. Past those, any live session is hard-reset first, so a
    /// double-fired trigger still yields exactly one clean session.
    pub async fn start(&self) -> Result<(), VoiceError> {
        let mut inner = self.inner.lock().await;

        if inner.mode != ChatMode::Ask {
            return Err(VoiceError::Mode);
        }
        match self.config.voice_mode {
            VoiceMode::Record if inner.capture.is_none() => {
                return Err(VoiceError::Unsupported("audio capture"));
            }
            VoiceMode::Dictate if inner.recognizer.is_none() => {
                return Err(VoiceError::Unsupported("speech recognition"));
            }
            _ => {}
        }

        inner.reset().await;

        inner.token += 1;
        let token = inner.token;
        inner.state = SessionState::Recording;
        inner.started_at = Utc::now();

        match self.config.voice_mode {
            VoiceMode::Record => {
                let started = match inner.capture.as_mut() {
                    Some(backend) => {
                        info!("Starting '{}' capture backend", backend.name());
                        backend.start().await
                    }
                    None => return Err(VoiceError::Unsupported("audio capture")),
                };
                match started {
                    Ok(rx) => self.spawn_frame_pump(rx, token),
                    Err(e) => {
                        error!("Failed to start capture backend: {e:#}");
                        inner.reset().await;
                        return Err(VoiceError::Backend(e.to_string()));
                    }
                }
            }
            VoiceMode::Dictate => {
                let started = match inner.recognizer.as_mut() {
                    Some(recognizer) => {
                        info!("Starting '{}' recognizer", recognizer.name());
                        recognizer.start().await
                    }
                    None => return Err(VoiceError::Unsupported("speech recognition")),
                };
                match started {
                    Ok(rx) => self.spawn_recognizer_pump(rx, token),
                    Err(e) => {
                        error!("Failed to start recognizer: {e:#}");
                        inner.reset().await;
                        return Err(VoiceError::Backend(e.to_string()));
                    }
                }
            }
        }

        inner.timer = Some(self.spawn_timer(token));

        info!(
            "Recording started: {} (token {})",
            self.config.session_id, token
        );

        Ok(())
    }

    /// Finalize the recording for review: `Recording -> Previewing`.
    /// Captured data is retained until `send` or `cancel`.
    pub async fn stop(&self) -> Result<StopOutcome, VoiceError> {
        let mut inner = self.inner.lock().await;

        if inner.state != SessionState::Recording {
            return Err(VoiceError::InvalidState("not recording"));
        }

        // Teardown is requested, not awaited to completion; anything that
        // still fires afterwards hits the token gate.
        if let Some(capture) = inner.capture.as_mut() {
            if let Err(e) = capture.stop().await {
                warn!("Capture stop failed: {e:#}");
            }
        }
        if let Some(recognizer) = inner.recognizer.as_mut() {
            if let Err(e) = recognizer.stop().await {
                warn!("Recognizer stop failed: {e:#}");
            }
        }
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }

        inner.state = SessionState::Previewing;

        match self.config.voice_mode {
            VoiceMode::Record => {
                let wav = encode_wav(inner.buffer.chunks(), self.config.sample_rate)
                    .map_err(|e| VoiceError::Backend(e.to_string()))?;
                info!(
                    "Recording stopped: {} chunks, {} PCM bytes",
                    inner.buffer.chunk_count(),
                    inner.buffer.total_byte_len()
                );
                Ok(StopOutcome::Preview(wav))
            }
            VoiceMode::Dictate => {
                let text = inner.transcript.freeze();
                info!("Dictation stopped: {} transcript chars", text.len());
                Ok(StopOutcome::Transcript(text))
            }
        }
    }

    /// Discard the current session from any state. Idempotent.
    pub async fn cancel(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Idle {
            info!("Session cancelled: {}", self.config.session_id);
        }
        inner.reset().await;
    }

    /// Submit the finalized recording: `Previewing -> Sending -> Idle`.
    ///
    /// Record mode merges the PCM buffer, transport-encodes it, and calls
    /// /speech-chat; dictate mode sends the finalized transcript to /ask.
    /// Whatever the outcome, the session is cleared through the cancel path
    /// afterwards (unless a cancel already superseded this send).
    pub async fn send(&self) -> Result<ChatReply, VoiceError> {
        let (token, payload) = {
            let mut inner = self.inner.lock().await;

            match inner.state {
                SessionState::Sending => {
                    return Err(VoiceError::InvalidState("send already in progress"));
                }
                SessionState::Previewing => {}
                _ => return Err(VoiceError::InvalidState("nothing to send")),
            }

            let payload = match self.config.voice_mode {
                VoiceMode::Record => {
                    if inner.buffer.is_empty() {
                        return Err(VoiceError::EmptyRecording);
                    }
                    Payload::Audio(inner.buffer.merge())
                }
                VoiceMode::Dictate => {
                    let text = inner.transcript.freeze();
                    if text.is_empty() {
                        return Err(VoiceError::EmptyRecording);
                    }
                    Payload::Text(text)
                }
            };

            inner.state = SessionState::Sending;
            (inner.token, payload)
        };

        let result = match payload {
            Payload::Audio(pcm) => {
                let audio = transport::to_base64_sliced(&pcm, self.config.encode_slice_bytes);
                self.transport
                    .speech_chat(&audio, self.config.sample_rate)
                    .await
            }
            Payload::Text(text) => {
                self.transport.ask(&text).await.map(|r| ChatReply {
                    transcript: Some(text),
                    reply: r.reply,
                })
            }
        };

        if let Err(e) = &result {
            warn!("Send failed: {e}");
        }

        let mut inner = self.inner.lock().await;
        if inner.token == token {
            inner.reset().await;
        }

        result
    }

    /// Current visible transcript (committed plus open interim guess).
    pub async fn display_text(&self) -> String {
        self.inner.lock().await.transcript.display()
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn stats(&self) -> SessionStats {
        let inner = self.inner.lock().await;
        SessionStats {
            state: inner.state,
            started_at: inner.started_at,
            elapsed_secs: inner.elapsed_secs,
            chunks_recorded: inner.buffer.chunk_count(),
            pcm_bytes: inner.buffer.total_byte_len(),
        }
    }

    fn spawn_frame_pump(&self, mut rx: mpsc::Receiver<CaptureEvent>, token: u64) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let mut guard = inner.lock().await;
                if guard.token != token {
                    // Superseded session; nothing here may be touched.
                    break;
                }
                match event {
                    CaptureEvent::Frame(samples) => {
                        if guard.state == SessionState::Recording {
                            guard.buffer.append(&samples);
                        }
                    }
                    CaptureEvent::Error(message) => {
                        error!("Capture backend error: {message}");
                        guard.reset().await;
                        break;
                    }
                }
            }
        });
    }

    fn spawn_recognizer_pump(&self, mut rx: mpsc::Receiver<RecognizerEvent>, token: u64) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let mut guard = inner.lock().await;
                if guard.token != token {
                    break;
                }
                match event {
                    RecognizerEvent::Results {
                        result_index,
                        results,
                    } => {
                        if guard.state == SessionState::Recording {
                            guard.transcript.apply(result_index, &results);
                        }
                    }
                    RecognizerEvent::Error(message) => {
                        error!("Recognizer error: {message}");
                        guard.reset().await;
                        break;
                    }
                }
            }
        });
    }

    fn spawn_timer(&self, token: u64) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            // interval fires immediately; consume that tick so the counter
            // starts at zero.
            tick.tick().await;
            loop {
                tick.tick().await;
                let mut guard = inner.lock().await;
                if guard.token != token {
                    break;
                }
                if guard.state == SessionState::Recording {
                    guard.elapsed_secs += 1;
                }
            }
        })
    }
}

// Integration tests for the recording session state machine
//
// These drive the session through push backends and a counting chat
// transport double, covering the token gate, the empty-recording guard,
// exactly-once delivery, and the error transitions.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use voice_capture::{
    AskReply, CaptureEvent, ChatMode, ChatReply, ChatTransport, PushCapture, PushHandle,
    PushRecognizer, RecognitionResult, RecognizerHandle, RecordingSession, SessionConfig,
    SessionState, StopOutcome, VoiceError, VoiceMode,
};

#[derive(Default)]
struct FakeTransport {
    ask_calls: AtomicUsize,
    speech_calls: AtomicUsize,
    last_message: Mutex<Option<String>>,
    last_audio: Mutex<Option<String>>,
    fail: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeTransport {
    fn failing() -> Self {
        let transport = Self::default();
        transport.fail.store(true, Ordering::SeqCst);
        transport
    }

    fn gated() -> (Self, Arc<Notify>) {
        let transport = Self::default();
        let notify = Arc::new(Notify::new());
        *transport.gate.lock().unwrap() = Some(Arc::clone(&notify));
        (transport, notify)
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn ask(&self, message: &str) -> Result<AskReply, VoiceError> {
        self.ask_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_message.lock().unwrap() = Some(message.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(VoiceError::Transport("ask failed".into()));
        }
        Ok(AskReply {
            reply: format!("reply to: {message}"),
        })
    }

    async fn speech_chat(
        &self,
        audio_b64: &str,
        _sample_rate: u32,
    ) -> Result<ChatReply, VoiceError> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.speech_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_audio.lock().unwrap() = Some(audio_b64.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(VoiceError::Transport("speech failed".into()));
        }
        Ok(ChatReply {
            transcript: Some("hello".into()),
            reply: "ok".into(),
        })
    }
}

fn record_session(transport: Arc<FakeTransport>) -> (RecordingSession, PushHandle) {
    let (capture, handle) = PushCapture::new();
    let config = SessionConfig {
        voice_mode: VoiceMode::Record,
        ..Default::default()
    };
    let session = RecordingSession::new(config, transport, Some(Box::new(capture)), None);
    (session, handle)
}

fn dictate_session(transport: Arc<FakeTransport>) -> (RecordingSession, RecognizerHandle) {
    let (recognizer, handle) = PushRecognizer::new();
    let config = SessionConfig {
        voice_mode: VoiceMode::Dictate,
        ..Default::default()
    };
    let session = RecordingSession::new(config, transport, None, Some(Box::new(recognizer)));
    (session, handle)
}

async fn wait_for_chunks(session: &RecordingSession, n: usize) {
    for _ in 0..200 {
        if session.stats().await.chunks_recorded >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {n} chunks");
}

async fn wait_for_state(session: &RecordingSession, state: SessionState) {
    for _ in 0..200 {
        if session.state().await == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for state {state:?}");
}

#[tokio::test]
async fn test_silence_recording_round_trip() {
    let transport = Arc::new(FakeTransport::default());
    let (session, handle) = record_session(Arc::clone(&transport));

    session.start().await.unwrap();
    for _ in 0..3 {
        assert!(handle.push_frame(vec![0.0; 4096]).await);
    }
    wait_for_chunks(&session, 3).await;

    // Preview artifact carries all three chunks.
    let outcome = session.stop().await.unwrap();
    let wav = match outcome {
        StopOutcome::Preview(wav) => wav,
        other => panic!("expected preview, got {other:?}"),
    };
    assert_eq!(wav.len(), 44 + 24576);
    assert_eq!(
        u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]),
        24576
    );

    let reply = session.send().await.unwrap();
    assert_eq!(reply.reply, "ok");

    // Exactly one network call, payload decodes back to the raw PCM bytes.
    assert_eq!(transport.speech_calls.load(Ordering::SeqCst), 1);
    let audio = transport.last_audio.lock().unwrap().clone().unwrap();
    assert_eq!(STANDARD.decode(&audio).unwrap().len(), 24576);

    // Session is cleared after a successful send.
    let stats = session.stats().await;
    assert_eq!(stats.state, SessionState::Idle);
    assert_eq!(stats.chunks_recorded, 0);
}

#[tokio::test]
async fn test_empty_send_makes_no_network_call() {
    let transport = Arc::new(FakeTransport::default());
    let (session, _handle) = record_session(Arc::clone(&transport));

    session.start().await.unwrap();
    session.stop().await.unwrap();

    match session.send().await {
        Err(VoiceError::EmptyRecording) => {}
        other => panic!("expected EmptyRecording, got {other:?}"),
    }
    assert_eq!(transport.speech_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stale_callbacks_cannot_touch_the_new_session() {
    let transport = Arc::new(FakeTransport::default());
    let (session, handle) = record_session(transport);

    session.start().await.unwrap();
    let stale_sender = handle.sender().await.unwrap();

    // Restart forces a hard reset; the old channel stays open through our
    // clone, exactly like an in-flight native callback.
    session.start().await.unwrap();
    stale_sender
        .send(CaptureEvent::Frame(vec![0.5; 1024]))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(session.stats().await.chunks_recorded, 0);

    // The new session still records normally.
    assert!(handle.push_frame(vec![0.0; 16]).await);
    wait_for_chunks(&session, 1).await;
}

#[tokio::test]
async fn test_stale_error_does_not_cancel_the_new_session() {
    let transport = Arc::new(FakeTransport::default());
    let (session, handle) = record_session(transport);

    session.start().await.unwrap();
    let stale_sender = handle.sender().await.unwrap();
    session.start().await.unwrap();

    stale_sender
        .send(CaptureEvent::Error("stale device error".into()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(session.state().await, SessionState::Recording);
}

#[tokio::test]
async fn test_stale_recognizer_results_leave_display_text_unchanged() {
    let transport = Arc::new(FakeTransport::default());
    let (session, handle) = dictate_session(transport);

    session.start().await.unwrap();
    let stale_sender = handle.sender().await.unwrap();
    session.start().await.unwrap();

    stale_sender
        .send(voice_capture::RecognizerEvent::Results {
            result_index: 0,
            results: vec![RecognitionResult::finalized("ghost text")],
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(session.display_text().await, "");

    assert!(handle.push_results(0, vec![RecognitionResult::partial("real")]).await);
    for _ in 0..200 {
        if session.display_text().await == "real" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(session.display_text().await, "real");
}

#[tokio::test]
async fn test_voice_requires_ask_mode() {
    let transport = Arc::new(FakeTransport::default());
    let (session, _handle) = record_session(transport);

    session.set_mode(ChatMode::Survey).await;
    match session.start().await {
        Err(VoiceError::Mode) => {}
        other => panic!("expected Mode error, got {other:?}"),
    }
    assert_eq!(session.state().await, SessionState::Idle);

    session.set_mode(ChatMode::Ask).await;
    session.start().await.unwrap();
    assert_eq!(session.state().await, SessionState::Recording);
}

#[tokio::test]
async fn test_missing_backend_is_unsupported() {
    let transport = Arc::new(FakeTransport::default());
    let session = RecordingSession::new(SessionConfig::default(), transport, None, None);

    match session.start().await {
        Err(VoiceError::Unsupported(_)) => {}
        other => panic!("expected Unsupported, got {other:?}"),
    }
    assert_eq!(session.state().await, SessionState::Idle);
}

#[tokio::test]
async fn test_second_send_is_refused_while_sending() {
    let (transport, release) = FakeTransport::gated();
    let transport = Arc::new(transport);
    let (session, handle) = record_session(Arc::clone(&transport));
    let session = Arc::new(session);

    session.start().await.unwrap();
    assert!(handle.push_frame(vec![0.0; 64]).await);
    wait_for_chunks(&session, 1).await;
    session.stop().await.unwrap();

    let sender = Arc::clone(&session);
    let first_send = tokio::spawn(async move { sender.send().await });
    wait_for_state(&session, SessionState::Sending).await;

    match session.send().await {
        Err(VoiceError::InvalidState(_)) => {}
        other => panic!("expected InvalidState, got {other:?}"),
    }

    release.notify_one();
    first_send.await.unwrap().unwrap();
    assert_eq!(transport.speech_calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.state().await, SessionState::Idle);
}

#[tokio::test]
async fn test_transport_failure_reverts_to_idle() {
    let transport = Arc::new(FakeTransport::failing());
    let (session, handle) = record_session(Arc::clone(&transport));

    session.start().await.unwrap();
    assert!(handle.push_frame(vec![0.25; 128]).await);
    wait_for_chunks(&session, 1).await;
    session.stop().await.unwrap();

    match session.send().await {
        Err(VoiceError::Transport(_)) => {}
        other => panic!("expected Transport error, got {other:?}"),
    }

    let stats = session.stats().await;
    assert_eq!(stats.state, SessionState::Idle);
    assert_eq!(stats.chunks_recorded, 0);
    assert_eq!(transport.speech_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_backend_error_cancels_the_session() {
    let transport = Arc::new(FakeTransport::default());
    let (session, handle) = record_session(transport);

    session.start().await.unwrap();
    assert!(handle.push_frame(vec![0.0; 32]).await);
    wait_for_chunks(&session, 1).await;

    assert!(handle.push_error("microphone disconnected").await);
    wait_for_state(&session, SessionState::Idle).await;

    assert_eq!(session.stats().await.chunks_recorded, 0);
}

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let transport = Arc::new(FakeTransport::default());
    let (session, handle) = record_session(transport);

    // Cancel with nothing running is fine.
    session.cancel().await;

    session.start().await.unwrap();
    assert!(handle.push_frame(vec![0.0; 32]).await);
    wait_for_chunks(&session, 1).await;

    session.cancel().await;
    session.cancel().await;

    let stats = session.stats().await;
    assert_eq!(stats.state, SessionState::Idle);
    assert_eq!(stats.chunks_recorded, 0);
}

#[tokio::test]
async fn test_stop_requires_an_active_recording() {
    let transport = Arc::new(FakeTransport::default());
    let (session, _handle) = record_session(transport);

    match session.stop().await {
        Err(VoiceError::InvalidState(_)) => {}
        other => panic!("expected InvalidState, got {other:?}"),
    }
}

#[tokio::test]
async fn test_dictation_commits_finals_and_discards_pending() {
    let transport = Arc::new(FakeTransport::default());
    let (session, handle) = dictate_session(Arc::clone(&transport));

    session.start().await.unwrap();

    assert!(handle.push_results(0, vec![RecognitionResult::partial("hel")]).await);
    for _ in 0..200 {
        if session.display_text().await == "hel" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(session.display_text().await, "hel");

    assert!(handle.push_results(0, vec![RecognitionResult::finalized("hello ")]).await);
    for _ in 0..200 {
        if session.display_text().await.starts_with("hello") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    match session.stop().await.unwrap() {
        StopOutcome::Transcript(text) => assert_eq!(text, "hello"),
        other => panic!("expected transcript, got {other:?}"),
    }

    let reply = session.send().await.unwrap();
    assert_eq!(reply.transcript.as_deref(), Some("hello"));
    assert_eq!(transport.ask_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        transport.last_message.lock().unwrap().as_deref(),
        Some("hello")
    );
    assert_eq!(session.state().await, SessionState::Idle);
}

#[tokio::test]
async fn test_empty_dictation_send_makes_no_network_call() {
    let transport = Arc::new(FakeTransport::default());
    let (session, _handle) = dictate_session(Arc::clone(&transport));

    session.start().await.unwrap();
    session.stop().await.unwrap();

    match session.send().await {
        Err(VoiceError::EmptyRecording) => {}
        other => panic!("expected EmptyRecording, got {other:?}"),
    }
    assert_eq!(transport.ask_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timer_counts_whole_seconds_while_recording() {
    let transport = Arc::new(FakeTransport::default());
    let (session, _handle) = record_session(transport);

    session.start().await.unwrap();
    // Let the timer task register its interval before the clock moves.
    tokio::task::yield_now().await;

    for _ in 0..3 {
        tokio::time::advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
    }

    assert_eq!(session.stats().await.elapsed_secs, 3);

    session.cancel().await;
    assert_eq!(session.stats().await.elapsed_secs, 0);
}

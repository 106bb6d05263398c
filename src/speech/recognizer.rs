use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

/// One entry in a recognizer result set.
#[derive(Debug, Clone)]
pub struct RecognitionResult {
    pub text: String,
    /// Final results will not be revised by the recognizer; non-final ones
    /// are interim guesses for the still-open utterance.
    pub is_final: bool,
}

impl RecognitionResult {
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn finalized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// Event delivered by a speech recognizer.
#[derive(Debug, Clone)]
pub enum RecognizerEvent {
    /// A (possibly revised) result set. `result_index` is the position at
    /// which new information starts; entries before it were already
    /// delivered in a previous event.
    Results {
        result_index: usize,
        results: Vec<RecognitionResult>,
    },
    /// Asynchronous recognizer failure; fatal to the current session only.
    Error(String),
}

/// Streaming speech recognizer.
///
/// Same lifecycle contract as the capture backend: restartable, idempotent
/// stop, and late events after stop are tolerated (the session's token gate
/// drops them).
#[async_trait::async_trait]
pub trait Recognizer: Send + Sync {
    async fn start(&mut self) -> Result<mpsc::Receiver<RecognizerEvent>>;

    async fn stop(&mut self) -> Result<()>;

    fn is_listening(&self) -> bool;

    fn name(&self) -> &str;
}

/// Push-style recognizer, driven by the embedding host.
pub struct PushRecognizer {
    slot: Arc<Mutex<Option<mpsc::Sender<RecognizerEvent>>>>,
    listening: Arc<AtomicBool>,
}

impl PushRecognizer {
    const CHANNEL_CAPACITY: usize = 64;

    pub fn new() -> (Self, RecognizerHandle) {
        let slot = Arc::new(Mutex::new(None));
        let recognizer = Self {
            slot: Arc::clone(&slot),
            listening: Arc::new(AtomicBool::new(false)),
        };
        (recognizer, RecognizerHandle { slot })
    }
}

#[async_trait::async_trait]
impl Recognizer for PushRecognizer {
    async fn start(&mut self) -> Result<mpsc::Receiver<RecognizerEvent>> {
        let (tx, rx) = mpsc::channel(Self::CHANNEL_CAPACITY);
        let mut slot = self.slot.lock().await;
        *slot = Some(tx);
        self.listening.store(true, Ordering::SeqCst);
        info!("Push recognizer started");
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let mut slot = self.slot.lock().await;
        if slot.take().is_some() {
            info!("Push recognizer stopped");
        }
        self.listening.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "push"
    }
}

/// Host-side handle for feeding a [`PushRecognizer`].
#[derive(Clone)]
pub struct RecognizerHandle {
    slot: Arc<Mutex<Option<mpsc::Sender<RecognizerEvent>>>>,
}

impl RecognizerHandle {
    /// Deliver a result set to the active recognition, if any.
    pub async fn push_results(&self, result_index: usize, results: Vec<RecognitionResult>) -> bool {
        self.push(RecognizerEvent::Results {
            result_index,
            results,
        })
        .await
    }

    pub async fn push_error(&self, message: impl Into<String>) -> bool {
        self.push(RecognizerEvent::Error(message.into())).await
    }

    async fn push(&self, event: RecognizerEvent) -> bool {
        let sender = { self.slot.lock().await.clone() };
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Clone of the live channel sender, if recognition is active.
    pub async fn sender(&self) -> Option<mpsc::Sender<RecognizerEvent>> {
        self.slot.lock().await.clone()
    }
}

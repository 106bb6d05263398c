use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

/// Event delivered by a capture backend.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// One chunk of float samples in [-1.0, 1.0], mono, at the session's
    /// sample rate.
    Frame(Vec<f32>),
    /// Asynchronous backend failure; fatal to the current session only.
    Error(String),
}

/// Microphone capture backend.
///
/// `start` may be called again after `stop`, and `stop` must be idempotent.
/// Stopping is a request, not a guarantee: events may still arrive on the
/// old channel afterwards and are discarded by the session's token gate.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Begin capturing. Returns the channel on which events arrive.
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureEvent>>;

    /// Request capture teardown. Must not fail on double close.
    async fn stop(&mut self) -> Result<()>;

    fn is_capturing(&self) -> bool;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Push-style capture backend.
///
/// The embedding host owns the real audio device and pushes float sample
/// chunks through a [`PushHandle`] as they arrive; this backend routes them
/// onto the channel of whichever session is currently capturing. Frames
/// pushed while no capture is active are dropped.
pub struct PushCapture {
    slot: Arc<Mutex<Option<mpsc::Sender<CaptureEvent>>>>,
    capturing: Arc<AtomicBool>,
}

impl PushCapture {
    const CHANNEL_CAPACITY: usize = 64;

    pub fn new() -> (Self, PushHandle) {
        let slot = Arc::new(Mutex::new(None));
        let capture = Self {
            slot: Arc::clone(&slot),
            capturing: Arc::new(AtomicBool::new(false)),
        };
        (capture, PushHandle { slot })
    }
}

#[async_trait::async_trait]
impl CaptureBackend for PushCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureEvent>> {
        let (tx, rx) = mpsc::channel(Self::CHANNEL_CAPACITY);

        let mut slot = self.slot.lock().await;
        *slot = Some(tx);
        self.capturing.store(true, Ordering::SeqCst);

        info!("Push capture started");
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let mut slot = self.slot.lock().await;
        if slot.take().is_some() {
            info!("Push capture stopped");
        }
        self.capturing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "push"
    }
}

/// Host-side handle for feeding a [`PushCapture`] backend.
#[derive(Clone)]
pub struct PushHandle {
    slot: Arc<Mutex<Option<mpsc::Sender<CaptureEvent>>>>,
}

impl PushHandle {
    /// Deliver one chunk of float samples to the active capture, if any.
    /// Returns whether the chunk was accepted.
    pub async fn push_frame(&self, samples: Vec<f32>) -> bool {
        self.push(CaptureEvent::Frame(samples)).await
    }

    /// Report an asynchronous device failure to the active capture.
    pub async fn push_error(&self, message: impl Into<String>) -> bool {
        self.push(CaptureEvent::Error(message.into())).await
    }

    async fn push(&self, event: CaptureEvent) -> bool {
        let sender = { self.slot.lock().await.clone() };
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Clone of the live channel sender, if a capture is active. Lets a
    /// caller keep a route into a session that is later superseded.
    pub async fn sender(&self) -> Option<mpsc::Sender<CaptureEvent>> {
        self.slot.lock().await.clone()
    }
}

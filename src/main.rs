use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use voice_capture::{
    floats_from_pcm, ChatReply, ChatTransport, Config, HttpChatTransport, PushCapture,
    RecordingSession, SessionConfig,
};

#[derive(Parser)]
#[command(name = "voice-capture", about = "Voice-input client for the chat backend")]
struct Args {
    /// Config file stem (config-crate style, extension resolved automatically)
    #[arg(long, default_value = "config/voice-capture")]
    config: String,

    /// Send a typed message to /ask
    #[arg(long)]
    message: Option<String>,

    /// Send a 16 kHz mono WAV file through /speech-chat
    #[arg(long)]
    wav: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v0.1.0", cfg.service.name);
    info!("Chat backend: {}", cfg.chat.base_url);

    let transport: Arc<dyn ChatTransport> = Arc::new(HttpChatTransport::new(
        &cfg.chat.base_url,
        Duration::from_secs(cfg.chat.request_timeout_secs),
    )?);

    if let Some(message) = args.message {
        let reply = transport.ask(&message).await?;
        println!("{}", reply.reply);
        return Ok(());
    }

    if let Some(path) = args.wav {
        let reply = send_wav(
            &path,
            cfg.audio.sample_rate,
            cfg.audio.encode_slice_bytes,
            transport,
        )
        .await?;
        if let Some(transcript) = reply.transcript {
            println!("transcript: {transcript}");
        }
        println!("{}", reply.reply);
        return Ok(());
    }

    info!("Nothing to do; pass --message or --wav");
    Ok(())
}

/// Read a WAV file and feed it through a recording session frame by frame,
/// then stop and send, so the demo exercises the same path a live
/// recording takes.
async fn send_wav(
    path: &Path,
    sample_rate: u32,
    encode_slice_bytes: usize,
    transport: Arc<dyn ChatTransport>,
) -> Result<ChatReply> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();
    anyhow::ensure!(
        spec.channels == 1 && spec.sample_rate == sample_rate && spec.bits_per_sample == 16,
        "Expected {} Hz mono 16-bit, got {} Hz {} ch {} bit",
        sample_rate,
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample
    );

    let samples: Vec<i16> = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read audio samples")?;

    info!(
        "Loaded {}: {:.1}s of audio ({} samples)",
        path.display(),
        samples.len() as f64 / sample_rate as f64,
        samples.len()
    );

    let (capture, handle) = PushCapture::new();
    let session = RecordingSession::new(
        SessionConfig {
            sample_rate,
            encode_slice_bytes,
            ..Default::default()
        },
        transport,
        Some(Box::new(capture)),
        None,
    );

    session.start().await?;

    const FRAME_SAMPLES: usize = 4096;
    let mut frames_pushed = 0usize;
    for frame in samples.chunks(FRAME_SAMPLES) {
        if !handle.push_frame(floats_from_pcm(frame)).await {
            anyhow::bail!("Capture channel closed while feeding frames");
        }
        frames_pushed += 1;
    }

    // Frames travel through the capture channel; wait for the pump to land
    // them all before stopping.
    let mut settled = false;
    for _ in 0..200 {
        if session.stats().await.chunks_recorded >= frames_pushed {
            settled = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    anyhow::ensure!(settled, "Timed out waiting for frames to be buffered");

    session.stop().await?;
    let reply = session.send().await?;
    Ok(reply)
}

use anyhow::{Context, Result};
use std::io::Cursor;

/// Serialize PCM chunks into a canonical mono 16-bit WAV container.
///
/// Deterministic and stateless: the same chunks and sample rate always
/// produce identical bytes. The 44-byte RIFF header is written even for an
/// empty chunk list (`dataBytes = 0`). The result is a local preview
/// artifact only; the wire path carries raw merged PCM instead.
pub fn encode_wav(chunks: &[Vec<i16>], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .context("Failed to create WAV writer")?;

        for chunk in chunks {
            for &sample in chunk {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
        }

        writer.finalize().context("Failed to finalize WAV container")?;
    }

    Ok(cursor.into_inner())
}

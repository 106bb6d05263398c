/// Ordered 16-bit PCM chunks for a single recording.
///
/// Append-only while the session is recording, frozen once it leaves the
/// recording state, cleared on cancel or after a successful send. Chunks are
/// never reordered or dropped here; stale-event filtering happens upstream
/// at the session's token gate.
#[derive(Debug, Default)]
pub struct PcmFrameBuffer {
    chunks: Vec<Vec<i16>>,
}

impl PcmFrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a chunk of float samples in [-1.0, 1.0] to 16-bit signed PCM
    /// and append it, preserving arrival order.
    ///
    /// Scaling is saturating: values outside [-1, 1] are clamped first, then
    /// multiplied by 32767 and truncated toward zero (the `as i16` cast).
    pub fn append(&mut self, samples: &[f32]) {
        let chunk: Vec<i16> = samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
            .collect();
        self.chunks.push(chunk);
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn total_samples(&self) -> usize {
        self.chunks.iter().map(|c| c.len()).sum()
    }

    /// Byte length of the merged buffer (2 bytes per sample). Used to
    /// pre-size the WAV container and the transport buffer.
    pub fn total_byte_len(&self) -> usize {
        self.total_samples() * 2
    }

    pub fn is_empty(&self) -> bool {
        self.total_samples() == 0
    }

    /// Concatenate all chunks into one contiguous little-endian byte
    /// sequence, in chunk order. Zero chunks yields an empty vec; the
    /// empty-recording check belongs to the session, not the buffer.
    pub fn merge(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.total_byte_len());
        for chunk in &self.chunks {
            for &sample in chunk {
                bytes.extend_from_slice(&sample.to_le_bytes());
            }
        }
        bytes
    }

    pub fn chunks(&self) -> &[Vec<i16>] {
        &self.chunks
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}

/// Exact inverse of [`PcmFrameBuffer::append`]: maps 16-bit samples to
/// floats that `append` converts back to the identical samples.
///
/// The half-LSB bias away from zero absorbs the rounding error of the
/// division, which truncation toward zero would otherwise turn into an
/// off-by-one. `i16::MIN` has no preimage under the saturating scale and
/// comes back as -32767.
pub fn floats_from_pcm(samples: &[i16]) -> Vec<f32> {
    samples
        .iter()
        .map(|&s| {
            let s = s as f32;
            (s + 0.5 * s.signum()) / 32767.0
        })
        .collect()
}

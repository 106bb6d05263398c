use super::recognizer::RecognitionResult;

/// Merges incremental recognizer results into a stable display string.
///
/// `committed` only ever grows, one finalized utterance at a time;
/// `pending` holds the latest interim guess and is wholly replaced on every
/// event. Interim text never reaches the finalized transcript: freezing the
/// buffer discards whatever guess was still open.
#[derive(Debug, Default)]
pub struct TranscriptBuffer {
    committed: String,
    pending: String,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one recognizer result set, starting at the event's resume
    /// index. Finalized entries are appended to `committed` (each followed
    /// by a separating space); `pending` is rebuilt from this pass alone,
    /// so the last non-final entry wins and a pass with none clears it.
    /// An utterance that finalizes thereby supersedes its own earlier
    /// partial guess.
    pub fn apply(&mut self, result_index: usize, results: &[RecognitionResult]) {
        if result_index >= results.len() {
            return;
        }

        let mut interim = String::new();
        for result in &results[result_index..] {
            if result.is_final {
                self.committed.push_str(&result.text);
                self.committed.push(' ');
            } else {
                interim = result.text.clone();
            }
        }
        self.pending = interim;
    }

    /// Current visible text: committed plus the open interim guess, trimmed.
    pub fn display(&self) -> String {
        let mut text = self.committed.clone();
        text.push_str(&self.pending);
        text.trim().to_string()
    }

    /// Discard the interim guess and return the finalized transcript.
    pub fn freeze(&mut self) -> String {
        self.pending.clear();
        self.committed.trim().to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.trim().is_empty() && self.pending.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.committed.clear();
        self.pending.clear();
    }
}

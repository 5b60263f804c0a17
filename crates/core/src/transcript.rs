//! Debounced assembly of transcription fragments into utterances.

use crate::timer::Deadline;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Buffers transcription fragments until the speaker pauses.
///
/// Transcriptions arrive in bursts. Every fragment (and every explicit end of
/// speech) pushes the flush deadline out by the debounce period, so a burst is
/// delivered as a single utterance once it settles.
#[derive(Debug)]
pub struct TranscriptAccumulator {
    buffer: String,
    flush: Deadline,
}

impl TranscriptAccumulator {
    pub fn new(debounce: Duration) -> Self {
        Self {
            buffer: String::new(),
            flush: Deadline::new(debounce),
        }
    }

    /// Appends a fragment and schedules finalization.
    ///
    /// Returns false (and does nothing) for blank fragments.
    pub fn on_fragment(&mut self, text: &str) -> bool {
        let appended = self.append(text);
        if appended {
            self.schedule_flush();
        }
        appended
    }

    /// Appends a fragment without touching the flush schedule.
    ///
    /// Used while the user is still speaking; the end of speech schedules the
    /// flush instead.
    pub fn append(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        self.buffer.push(' ');
        self.buffer.push_str(text);
        debug!(buffer = %self.buffer.trim(), "Transcript buffered");
        true
    }

    pub fn on_user_speech_stopped(&mut self) {
        self.schedule_flush();
    }

    pub fn schedule_flush(&mut self) {
        self.flush.rearm();
    }

    /// Takes the buffered utterance immediately, cancelling any pending flush.
    pub fn flush_now(&mut self) -> Option<String> {
        self.flush.cancel();
        let utterance = self.buffer.trim().to_string();
        self.buffer.clear();
        (!utterance.is_empty()).then_some(utterance)
    }

    /// Waits for the debounce deadline and yields the finalized utterance.
    ///
    /// Yields `None` if the deadline fires on an empty buffer. Pends forever
    /// while no flush is scheduled.
    pub async fn flush_due(&mut self) -> Option<String> {
        self.flush.expired().await;
        self.flush_now()
    }

    /// Discards buffered text and any scheduled flush.
    pub fn reset(&mut self) {
        self.flush.cancel();
        self.buffer.clear();
    }

    pub fn buffered(&self) -> &str {
        self.buffer.trim()
    }

    pub fn is_flush_pending(&self) -> bool {
        self.flush.is_armed()
    }
}

impl Default for TranscriptAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

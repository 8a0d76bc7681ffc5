//! Coaching events and the sinks that deliver them.

use tracing::info;

use crate::phrases::Phrase;

/// One thing the runner should hear, stamped with when and where it arose.
#[derive(Debug, Clone, PartialEq)]
pub struct CoachingEvent {
    pub elapsed_sec: u32,
    pub segment_index: Option<usize>,
    pub phrase: Phrase,
}

impl CoachingEvent {
    pub fn new(elapsed_sec: u32, segment_index: Option<usize>, phrase: Phrase) -> Self {
        Self {
            elapsed_sec,
            segment_index,
            phrase,
        }
    }

    pub fn text(&self) -> String {
        self.phrase.to_string()
    }
}

/// Speech or notification output. Delivery, queuing and interruption are
/// the sink's business; the core hands over one phrase per event.
pub trait CoachingSink {
    fn speak(&mut self, phrase: &str);
}

/// Keeps every phrase, for tests and replays.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub phrases: Vec<String>,
}

impl CoachingSink for RecordingSink {
    fn speak(&mut self, phrase: &str) {
        self.phrases.push(phrase.to_string());
    }
}

/// Logs phrases instead of speaking them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl CoachingSink for TracingSink {
    fn speak(&mut self, phrase: &str) {
        info!(phrase, "coach");
    }
}

pub fn deliver<'a>(events: impl IntoIterator<Item = &'a CoachingEvent>, sink: &mut dyn CoachingSink) {
    for event in events {
        sink.speak(&event.text());
    }
}

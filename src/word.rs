use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of one sentence or matching sub-question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubResult {
    pub tested: String,
    pub sentence: String,
    pub correct: bool,
}

/// One vocabulary pair under test together with its live counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: usize,
    pub language1: String,
    pub language2: String,
    #[serde(default)]
    pub language1_sentence: Option<String>,
    #[serde(default)]
    pub language2_sentence: Option<String>,
    pub times_correct: u32,
    pub times_failed: u32,
    pub times_skipped: u32,
    pub times_checked_answer: u32,
    pub total_answer_time_ms: u64,
    pub answer_attempts: u32,
    #[serde(default)]
    pub sub_results: Vec<SubResult>,
}

impl Word {
    pub fn new(id: usize, language1: impl Into<String>, language2: impl Into<String>) -> Self {
        Self {
            id,
            language1: language1.into(),
            language2: language2.into(),
            language1_sentence: None,
            language2_sentence: None,
            times_correct: 0,
            times_failed: 0,
            times_skipped: 0,
            times_checked_answer: 0,
            total_answer_time_ms: 0,
            answer_attempts: 0,
            sub_results: Vec::new(),
        }
    }

    pub fn with_sentences(mut self, language1: Option<String>, language2: Option<String>) -> Self {
        self.language1_sentence = language1;
        self.language2_sentence = language2;
        self
    }

    pub fn total_attempts(&self) -> u32 {
        self.times_correct + self.times_failed + self.times_skipped + self.times_checked_answer
    }

    fn record_latency(&mut self, latency: Duration) {
        self.total_answer_time_ms += latency.as_millis() as u64;
        self.answer_attempts += 1;
    }
}

/// What happened to the active word when a question was resolved.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Failed,
    Skipped,
    Checked,
}

/// Apply a resolved outcome to the word at `index`.
///
/// This is the only place word counters change. Latency is recorded for
/// answered questions only; skips and reveals ignore it.
pub fn apply_outcome(words: &mut [Word], index: usize, outcome: Outcome, latency: Option<Duration>) {
    let Some(word) = words.get_mut(index) else {
        return;
    };

    match outcome {
        Outcome::Correct => word.times_correct += 1,
        Outcome::Failed => word.times_failed += 1,
        Outcome::Skipped => word.times_skipped += 1,
        Outcome::Checked => word.times_checked_answer += 1,
    }

    if let (Outcome::Correct | Outcome::Failed, Some(latency)) = (outcome, latency) {
        word.record_latency(latency);
    }
}

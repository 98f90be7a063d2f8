use crate::util::round_percent;
use crate::word::Word;
use itertools::Itertools;
use std::cmp::Ordering;

/// Net score: successes minus every other kind of attempt.
pub fn score(word: &Word) -> i64 {
    i64::from(word.times_correct)
        - i64::from(word.times_failed)
        - i64::from(word.times_skipped)
        - i64::from(word.times_checked_answer)
}

/// Share of correct attempts as a whole percent, 0 without attempts.
pub fn percentage(word: &Word) -> u32 {
    match word.total_attempts() {
        0 => 0,
        total => round_percent(100.0 * f64::from(word.times_correct) / f64::from(total)),
    }
}

pub fn avg_answer_time_seconds(word: &Word) -> f64 {
    match word.answer_attempts {
        0 => 0.0,
        attempts => word.total_answer_time_ms as f64 / f64::from(attempts) / 1000.0,
    }
}

pub fn overall_avg_answer_time_seconds(words: &[Word]) -> f64 {
    let total_ms: u64 = words.iter().map(|w| w.total_answer_time_ms).sum();
    let attempts: u64 = words.iter().map(|w| u64::from(w.answer_attempts)).sum();
    match attempts {
        0 => 0.0,
        n => total_ms as f64 / n as f64 / 1000.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TotalScore {
    pub correct: u64,
    pub total: u64,
}

impl TotalScore {
    pub fn accuracy(&self) -> u32 {
        match self.total {
            0 => 0,
            total => round_percent(100.0 * self.correct as f64 / total as f64),
        }
    }
}

impl std::fmt::Display for TotalScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.correct, self.total)
    }
}

pub fn total_score(words: &[Word]) -> TotalScore {
    words.iter().fold(TotalScore::default(), |acc, w| TotalScore {
        correct: acc.correct + u64::from(w.times_correct),
        total: acc.total + u64::from(w.total_attempts()),
    })
}

/// Seconds with one decimal, e.g. `2.5s`.
pub fn format_seconds(seconds: f64) -> String {
    format!("{seconds:.1}s")
}

/// One row of the per-word results table.
#[derive(Debug, Clone, PartialEq)]
pub struct WordSummary {
    pub id: usize,
    pub prompt: String,
    pub answer: String,
    pub score: i64,
    pub percentage: u32,
    pub avg_time_secs: f64,
    pub attempts: u32,
}

pub fn summarize(words: &[Word]) -> Vec<WordSummary> {
    words
        .iter()
        .map(|w| WordSummary {
            id: w.id,
            prompt: w.language1.clone(),
            answer: w.language2.clone(),
            score: score(w),
            percentage: percentage(w),
            avg_time_secs: avg_answer_time_seconds(w),
            attempts: w.total_attempts(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Word,
    Score,
    Percentage,
    AvgTime,
    Attempts,
}

pub fn rank(rows: &mut [WordSummary], sort_by: SortBy, ascending: bool) {
    rows.sort_by(|a, b| {
        let cmp = match sort_by {
            SortBy::Word => a.prompt.cmp(&b.prompt),
            SortBy::Score => a.score.cmp(&b.score),
            SortBy::Percentage => a.percentage.cmp(&b.percentage),
            SortBy::AvgTime => a
                .avg_time_secs
                .partial_cmp(&b.avg_time_secs)
                .unwrap_or(Ordering::Equal),
            SortBy::Attempts => a.attempts.cmp(&b.attempts),
        };
        if ascending {
            cmp
        } else {
            cmp.reverse()
        }
    });
}

/// The `n` words with the lowest score, slowest first on ties.
pub fn hardest(words: &[Word], n: usize) -> Vec<WordSummary> {
    summarize(words)
        .into_iter()
        .sorted_by(|a, b| {
            a.score.cmp(&b.score).then(
                b.avg_time_secs
                    .partial_cmp(&a.avg_time_secs)
                    .unwrap_or(Ordering::Equal),
            )
        })
        .take(n)
        .collect()
}

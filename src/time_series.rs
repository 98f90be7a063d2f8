use crate::history::HistoryEntry;

/// Accuracy of one past session, `t` counting sessions from the oldest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracyPoint {
    pub t: f64,
    pub accuracy: f64,
}

impl AccuracyPoint {
    pub fn new(t: f64, accuracy: f64) -> Self {
        Self { t, accuracy }
    }
}

impl From<(f64, f64)> for AccuracyPoint {
    fn from(v: (f64, f64)) -> Self {
        AccuracyPoint {
            t: v.0,
            accuracy: v.1,
        }
    }
}

impl From<AccuracyPoint> for (f64, f64) {
    fn from(p: AccuracyPoint) -> Self {
        (p.t, p.accuracy)
    }
}

/// Chart data for a word set, oldest session first. `None` takes every set.
pub fn accuracy_series(entries: &[HistoryEntry], set_name: Option<&str>) -> Vec<AccuracyPoint> {
    entries
        .iter()
        .rev()
        .filter(|e| set_name.map_or(true, |name| e.set_name == name))
        .enumerate()
        .map(|(i, e)| AccuracyPoint::new(i as f64 + 1.0, f64::from(e.result.score().accuracy())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TestResult;
    use crate::word::Word;
    use chrono::Local;

    fn entry(id: i64, set_name: &str, correct: u32, failed: u32) -> HistoryEntry {
        let mut word = Word::new(0, "dog", "perro");
        word.times_correct = correct;
        word.times_failed = failed;
        HistoryEntry {
            id,
            set_name: set_name.to_string(),
            result: TestResult {
                started_at: Local::now(),
                elapsed_ms: 0,
                elapsed: "00:00".to_string(),
                words: vec![word],
                completed: true,
            },
        }
    }

    #[test]
    fn test_point_conversions() {
        let p: AccuracyPoint = (2.0, 75.0).into();
        assert_eq!(p, AccuracyPoint::new(2.0, 75.0));
        let back: (f64, f64) = p.into();
        assert_eq!(back, (2.0, 75.0));
    }

    #[test]
    fn test_accuracy_series_oldest_first() {
        // history lists newest first
        let entries = vec![
            entry(3, "spanish", 4, 0),
            entry(2, "german", 1, 1),
            entry(1, "spanish", 1, 3),
        ];

        let all = accuracy_series(&entries, None);
        assert_eq!(
            all,
            vec![
                AccuracyPoint::new(1.0, 25.0),
                AccuracyPoint::new(2.0, 50.0),
                AccuracyPoint::new(3.0, 100.0),
            ]
        );

        let spanish = accuracy_series(&entries, Some("spanish"));
        assert_eq!(
            spanish,
            vec![AccuracyPoint::new(1.0, 25.0), AccuracyPoint::new(2.0, 100.0)]
        );
        assert!(accuracy_series(&entries, Some("french")).is_empty());
    }
}

use crate::word::Word;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// The quiz mechanic used for a question.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
pub enum Modality {
    #[strum(serialize = "writing")]
    Writing,
    #[strum(serialize = "multi-select")]
    MultiSelect,
    #[strum(serialize = "drag-drop")]
    DragDrop,
    #[strum(serialize = "sentence")]
    Sentence,
}

impl Modality {
    pub const ALL: [Modality; 4] = [
        Modality::Writing,
        Modality::MultiSelect,
        Modality::DragDrop,
        Modality::Sentence,
    ];
}

/// Which language is shown as the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum Direction {
    /// Language 1 is shown, language 2 is expected.
    #[strum(serialize = "1→2")]
    FirstToSecond,
    /// Language 2 is shown, language 1 is expected.
    #[strum(serialize = "2→1")]
    SecondToFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum WordLanguage {
    #[strum(serialize = "language 1")]
    First,
    #[strum(serialize = "language 2")]
    Second,
}

/// Configuration problems detected before a session exists.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetupError {
    #[error("the word list is empty")]
    NoWords,

    #[error("word lists differ in length: {first} words in language 1, {second} in language 2")]
    MismatchedLengths { first: usize, second: usize },

    #[error("{language} has {found} example sentences for {expected} words")]
    MismatchedSentences {
        language: WordLanguage,
        expected: usize,
        found: usize,
    },

    #[error("line {} is blank in {language}", .index + 1)]
    EmptyWord { index: usize, language: WordLanguage },

    #[error("repetition target must be at least 1, got {0}")]
    InvalidRepetitionTarget(u32),
}

/// Immutable configuration for one quiz run.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub language1_words: Vec<String>,
    pub language2_words: Vec<String>,
    pub language1_sentences: Vec<String>,
    pub language2_sentences: Vec<String>,
    pub repetition_target: u32,
    pub option_count: usize,
    pub only_second_language_tested: bool,
    pub alternate_modalities: bool,
    pub modalities: Vec<Modality>,
    pub allow_typos: bool,
    pub progress_on_mistakes: bool,
    pub drag_drop_batch: usize,
    pub feedback_delay: Duration,
    pub drag_drop_delay: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            language1_words: Vec::new(),
            language2_words: Vec::new(),
            language1_sentences: Vec::new(),
            language2_sentences: Vec::new(),
            repetition_target: 3,
            option_count: 4,
            only_second_language_tested: false,
            alternate_modalities: false,
            modalities: vec![Modality::Writing, Modality::MultiSelect],
            allow_typos: true,
            progress_on_mistakes: false,
            drag_drop_batch: 4,
            feedback_delay: Duration::from_millis(1200),
            drag_drop_delay: Duration::from_millis(1500),
        }
    }
}

impl SessionSettings {
    pub fn with_words<S: AsRef<str>>(mut self, language1: &[S], language2: &[S]) -> Self {
        self.language1_words = language1.iter().map(|s| s.as_ref().to_string()).collect();
        self.language2_words = language2.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    /// Check the settings without building anything.
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.repetition_target == 0 {
            return Err(SetupError::InvalidRepetitionTarget(self.repetition_target));
        }

        let (first, second) = (self.language1_words.len(), self.language2_words.len());
        if first != second {
            return Err(SetupError::MismatchedLengths { first, second });
        }
        if first == 0 {
            return Err(SetupError::NoWords);
        }

        for (language, sentences) in [
            (WordLanguage::First, &self.language1_sentences),
            (WordLanguage::Second, &self.language2_sentences),
        ] {
            if !sentences.is_empty() && sentences.len() != first {
                return Err(SetupError::MismatchedSentences {
                    language,
                    expected: first,
                    found: sentences.len(),
                });
            }
        }

        for (index, (l1, l2)) in self
            .language1_words
            .iter()
            .zip(&self.language2_words)
            .enumerate()
        {
            if l1.trim().is_empty() {
                return Err(SetupError::EmptyWord {
                    index,
                    language: WordLanguage::First,
                });
            }
            if l2.trim().is_empty() {
                return Err(SetupError::EmptyWord {
                    index,
                    language: WordLanguage::Second,
                });
            }
        }

        Ok(())
    }

    /// Validate and build one zeroed `Word` per input pair, ids in input order.
    pub fn build_words(&self) -> Result<Vec<Word>, SetupError> {
        self.validate()?;

        let sentence = |list: &[String], i: usize| {
            list.get(i)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(self
            .language1_words
            .iter()
            .zip(&self.language2_words)
            .enumerate()
            .map(|(i, (l1, l2))| {
                Word::new(i, l1.trim(), l2.trim()).with_sentences(
                    sentence(&self.language1_sentences, i),
                    sentence(&self.language2_sentences, i),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn settings(l1: &[&str], l2: &[&str]) -> SessionSettings {
        SessionSettings::default().with_words(l1, l2)
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let s = settings(&["a", "b", "c"], &["x", "y"]);
        assert_eq!(
            s.build_words(),
            Err(SetupError::MismatchedLengths {
                first: 3,
                second: 2
            })
        );
    }

    #[test]
    fn test_zero_repetition_target_rejected() {
        let mut s = settings(&["a"], &["x"]);
        s.repetition_target = 0;
        assert_matches!(s.validate(), Err(SetupError::InvalidRepetitionTarget(0)));
    }

    #[test]
    fn test_blank_word_rejected() {
        let s = settings(&["a", "  "], &["x", "y"]);
        assert_matches!(
            s.validate(),
            Err(SetupError::EmptyWord {
                index: 1,
                language: WordLanguage::First
            })
        );

        let s = settings(&["a", "b"], &["x", ""]);
        assert_matches!(
            s.validate(),
            Err(SetupError::EmptyWord {
                index: 1,
                language: WordLanguage::Second
            })
        );
    }

    #[test]
    fn test_empty_lists_rejected() {
        let s = settings(&[], &[]);
        assert_eq!(s.validate(), Err(SetupError::NoWords));
    }

    #[test]
    fn test_sentence_length_checked() {
        let mut s = settings(&["a", "b"], &["x", "y"]);
        s.language2_sentences = vec!["only one".to_string()];
        assert_matches!(
            s.validate(),
            Err(SetupError::MismatchedSentences {
                language: WordLanguage::Second,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_build_words_assigns_ids_and_sentences() {
        let mut s = settings(&[" dog ", "cat"], &["perro", "gato"]);
        s.language2_sentences = vec!["El perro come.".to_string(), " ".to_string()];
        let words = s.build_words().unwrap();

        assert_eq!(words.len(), 2);
        assert_eq!(words[0].id, 0);
        assert_eq!(words[0].language1, "dog");
        assert_eq!(words[0].language2_sentence.as_deref(), Some("El perro come."));
        assert_eq!(words[1].id, 1);
        assert_eq!(words[1].language2_sentence, None);
        assert_eq!(words[1].language1_sentence, None);
    }

    #[test]
    fn test_error_messages() {
        let err = SetupError::EmptyWord {
            index: 0,
            language: WordLanguage::Second,
        };
        assert_eq!(err.to_string(), "line 1 is blank in language 2");
        assert_eq!(Modality::MultiSelect.to_string(), "multi-select");
    }

    #[test]
    fn test_modality_serde_names() {
        let json = serde_json::to_string(&Modality::DragDrop).unwrap();
        assert_eq!(json, "\"drag-drop\"");
        let parsed: Modality = serde_json::from_str("\"sentence\"").unwrap();
        assert_eq!(parsed, Modality::Sentence);
    }
}

use crate::logging::SessionLogger;
use crate::policy::{
    self, blank_sentence, build_drag_drop, build_options, check_answer, choose_direction,
    choose_modality, count_words_left, display_word, expected_answer, feasible_modality,
    select_next_word, DragDropBoard,
};
use crate::runtime::{Clock, SystemClock};
use crate::scoring::{total_score, TotalScore};
use crate::settings::{Direction, Modality, SessionSettings, SetupError};
use crate::word::{apply_outcome, Outcome, SubResult, Word};
use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// How a question ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Success { typo: bool },
    Failed,
    Checked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingAnswer,
    Resolved(Resolution),
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    Writing,
    MultiSelect { options: Vec<String> },
    DragDrop { board: DragDropBoard },
    /// `blanked` is `sentence` with the answer replaced by underscores.
    Sentence { sentence: String, blanked: String },
}

/// The question currently shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub number: usize,
    pub word_index: usize,
    pub modality: Modality,
    pub direction: Direction,
    pub prompt: String,
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub resolution: Resolution,
    pub expected: String,
    pub guess: Option<String>,
}

/// Final snapshot of a session, handed to the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub started_at: DateTime<Local>,
    pub elapsed_ms: u64,
    pub elapsed: String,
    pub words: Vec<Word>,
    /// False when the session was ended early.
    pub completed: bool,
}

impl TestResult {
    pub fn score(&self) -> TotalScore {
        total_score(&self.words)
    }
}

/// `MM:SS`, or `H:MM:SS` from one hour on.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// One quiz run over a word set.
///
/// The session owns the words exclusively; every counter change goes through
/// [`apply_outcome`]. Actions that do not fit the current phase or question
/// kind return `None`/`false` and leave the state untouched.
pub struct QuizSession {
    settings: SessionSettings,
    words: Vec<Word>,
    phase: Phase,
    question: Option<Question>,
    feedback: Option<Feedback>,
    question_index: usize,
    words_left: usize,
    started_at: Option<DateTime<Local>>,
    started_instant: Option<Instant>,
    shown_at: Option<Instant>,
    resolved_at: Option<Instant>,
    result: Option<TestResult>,
    rng: Box<dyn RngCore>,
    clock: Box<dyn Clock>,
    logger: Option<Box<dyn SessionLogger>>,
}

impl std::fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuizSession")
            .field("phase", &self.phase)
            .field("question", &self.question)
            .field("question_index", &self.question_index)
            .field("words_left", &self.words_left)
            .finish_non_exhaustive()
    }
}

impl QuizSession {
    /// Validate the settings and build the word collection.
    pub fn new(settings: SessionSettings) -> Result<Self, SetupError> {
        let words = settings.build_words()?;
        let words_left = count_words_left(
            &words,
            settings.repetition_target,
            settings.progress_on_mistakes,
        );

        Ok(Self {
            settings,
            words,
            phase: Phase::Idle,
            question: None,
            feedback: None,
            question_index: 0,
            words_left,
            started_at: None,
            started_instant: None,
            shown_at: None,
            resolved_at: None,
            result: None,
            rng: Box::new(StdRng::from_entropy()),
            clock: Box::new(SystemClock),
            logger: None,
        })
    }

    pub fn with_rng<R: RngCore + 'static>(mut self, rng: R) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_logger(mut self, logger: Option<Box<dyn SessionLogger>>) -> Self {
        self.logger = logger;
        self
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn words_left(&self) -> usize {
        self.words_left
    }

    /// Number of questions shown so far.
    pub fn question_index(&self) -> usize {
        self.question_index
    }

    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    pub fn active_word(&self) -> Option<&Word> {
        self.question
            .as_ref()
            .and_then(|q| self.words.get(q.word_index))
    }

    /// Answer the presentation layer may reveal for the current question.
    pub fn expected_answer(&self) -> Option<&str> {
        let question = self.question.as_ref()?;
        self.words
            .get(question.word_index)
            .map(|w| expected_answer(w, question.direction))
    }

    fn log(&self, message: impl FnOnce() -> String) {
        if let Some(logger) = &self.logger {
            logger.debug(&message());
        }
    }

    /// Leave `Idle` and show the first question.
    pub fn start(&mut self) {
        if self.phase != Phase::Idle {
            return;
        }
        self.started_at = Some(Local::now());
        self.started_instant = Some(self.clock.now());
        self.log(|| format!("session started with {} words", self.words.len()));
        self.select_next(None);
    }

    fn select_next(&mut self, exclude: Option<usize>) {
        let next = select_next_word(
            &self.words,
            self.settings.repetition_target,
            self.settings.progress_on_mistakes,
            exclude,
            &mut *self.rng,
        );

        let Some(index) = next else {
            self.complete(true);
            return;
        };

        let direction = choose_direction(&self.settings, &mut *self.rng);
        let chosen = choose_modality(&self.settings, self.question_index, &mut *self.rng);
        let modality = feasible_modality(chosen, &self.words, index, direction);
        let word = &self.words[index];

        let kind = match modality {
            Modality::Writing => QuestionKind::Writing,
            Modality::MultiSelect => QuestionKind::MultiSelect {
                options: build_options(
                    &self.words,
                    index,
                    direction,
                    self.settings.option_count,
                    &mut *self.rng,
                ),
            },
            Modality::DragDrop => QuestionKind::DragDrop {
                board: build_drag_drop(
                    &self.words,
                    index,
                    direction,
                    self.settings.drag_drop_batch,
                    &mut *self.rng,
                ),
            },
            Modality::Sentence => {
                let sentence = policy::answer_sentence(word, direction)
                    .unwrap_or_default()
                    .to_string();
                let blanked = blank_sentence(&sentence, expected_answer(word, direction))
                    .unwrap_or_else(|| sentence.clone());
                QuestionKind::Sentence { sentence, blanked }
            }
        };

        let question = Question {
            number: self.question_index,
            word_index: index,
            modality,
            direction,
            prompt: display_word(word, direction).to_string(),
            kind,
        };
        self.log(|| {
            format!(
                "question {}: word {} as {} ({})",
                question.number, word.id, question.modality, question.direction
            )
        });

        self.question = Some(question);
        self.question_index += 1;
        self.feedback = None;
        self.shown_at = Some(self.clock.now());
        self.resolved_at = None;
        self.phase = Phase::AwaitingAnswer;
    }

    fn awaiting(&self) -> Option<&Question> {
        match self.phase {
            Phase::AwaitingAnswer => self.question.as_ref(),
            _ => None,
        }
    }

    fn resolve(
        &mut self,
        outcome: Outcome,
        resolution: Resolution,
        guess: Option<String>,
    ) -> Option<&Feedback> {
        let question = self.question.as_ref()?;
        let index = question.word_index;
        let expected = expected_answer(&self.words[index], question.direction).to_string();

        let now = self.clock.now();
        let latency = self.shown_at.map(|shown| now.saturating_duration_since(shown));
        apply_outcome(&mut self.words, index, outcome, latency);

        self.words_left = count_words_left(
            &self.words,
            self.settings.repetition_target,
            self.settings.progress_on_mistakes,
        );
        self.log(|| {
            format!(
                "word {} resolved {:?}, {} words left",
                self.words[index].id, resolution, self.words_left
            )
        });

        self.feedback = Some(Feedback {
            resolution,
            expected,
            guess,
        });
        self.phase = Phase::Resolved(resolution);
        self.resolved_at = Some(now);

        if self.words_left == 0 {
            self.complete(true);
        }
        self.feedback.as_ref()
    }

    /// Typed answer for writing and sentence questions. Blank guesses are ignored.
    pub fn submit_answer(&mut self, guess: &str) -> Option<&Feedback> {
        let (index, direction, sentence) = {
            let question = self.awaiting()?;
            let sentence = match &question.kind {
                QuestionKind::Writing => None,
                QuestionKind::Sentence { sentence, .. } => Some(sentence.clone()),
                QuestionKind::MultiSelect { .. } | QuestionKind::DragDrop { .. } => return None,
            };
            (question.word_index, question.direction, sentence)
        };
        if guess.trim().is_empty() {
            return None;
        }

        let expected = expected_answer(&self.words[index], direction).to_string();
        let check = check_answer(guess, &expected, self.settings.allow_typos);

        if let Some(sentence) = sentence {
            self.words[index].sub_results.push(SubResult {
                tested: expected,
                sentence,
                correct: check.passed(),
            });
        }

        let (outcome, resolution) = if check.passed() {
            (
                Outcome::Correct,
                Resolution::Success {
                    typo: check == policy::AnswerCheck::Typo,
                },
            )
        } else {
            (Outcome::Failed, Resolution::Failed)
        };
        self.resolve(outcome, resolution, Some(guess.trim().to_string()))
    }

    /// Pick one of the offered multi-select options.
    pub fn choose_option(&mut self, value: &str) -> Option<&Feedback> {
        let question = self.awaiting()?;
        let QuestionKind::MultiSelect { options } = &question.kind else {
            return None;
        };
        if !options.iter().any(|o| o == value) {
            return None;
        }

        let expected = expected_answer(&self.words[question.word_index], question.direction);
        let correct = value == expected;
        let (outcome, resolution) = if correct {
            (Outcome::Correct, Resolution::Success { typo: false })
        } else {
            (Outcome::Failed, Resolution::Failed)
        };
        self.resolve(outcome, resolution, Some(value.to_string()))
    }

    /// Check a drag-and-drop board: `(prompt position, answer placed on it)`.
    ///
    /// Every pair is recorded as a sub-result of the active word; the question
    /// succeeds only when every prompt received its own answer. Naming the
    /// same prompt twice is ignored like a blank guess.
    pub fn submit_matches(&mut self, matches: &[(usize, String)]) -> Option<&Feedback> {
        let (index, direction, board) = {
            let question = self.awaiting()?;
            let QuestionKind::DragDrop { board } = &question.kind else {
                return None;
            };
            (question.word_index, question.direction, board.clone())
        };
        if matches.is_empty() {
            return None;
        }

        let mut placed = vec![None; board.prompts.len()];
        let mut subs = Vec::with_capacity(matches.len());
        for (position, answer) in matches {
            let Some(expected) = board.expected(&self.words, *position, direction) else {
                continue;
            };
            // a prompt holds one answer; a board placing two is rejected whole
            if placed[*position].is_some() {
                return None;
            }
            let correct = expected == answer.trim();
            placed[*position] = Some(correct);
            subs.push(SubResult {
                tested: answer.trim().to_string(),
                sentence: board.prompts[*position].clone(),
                correct,
            });
        }
        if subs.is_empty() {
            return None;
        }

        let all_correct = placed.iter().all(|p| *p == Some(true));
        let guess = matches
            .iter()
            .map(|(p, a)| format!("{}={}", p + 1, a.trim()))
            .collect::<Vec<_>>()
            .join(" ");
        self.words[index].sub_results.extend(subs);

        let (outcome, resolution) = if all_correct {
            (Outcome::Correct, Resolution::Success { typo: false })
        } else {
            (Outcome::Failed, Resolution::Failed)
        };
        self.resolve(outcome, resolution, Some(guess))
    }

    /// Skip the current word and move on without recording latency.
    pub fn skip(&mut self) -> bool {
        let Some(question) = self.awaiting() else {
            return false;
        };
        let index = question.word_index;
        apply_outcome(&mut self.words, index, Outcome::Skipped, None);
        self.words_left = count_words_left(
            &self.words,
            self.settings.repetition_target,
            self.settings.progress_on_mistakes,
        );
        self.log(|| format!("word {} skipped", self.words[index].id));

        if self.words_left == 0 {
            self.complete(true);
        } else {
            self.select_next(None);
        }
        true
    }

    /// Show the answer; the caller must [`advance`](Self::advance) afterwards.
    pub fn reveal_answer(&mut self) -> Option<&Feedback> {
        self.awaiting()?;
        self.resolve(Outcome::Checked, Resolution::Checked, None)
    }

    /// The "continue" action: move from a resolved question to the next one.
    pub fn advance(&mut self) -> bool {
        let Phase::Resolved(resolution) = self.phase else {
            return false;
        };
        let exclude = match resolution {
            Resolution::Success { .. } => self.question.as_ref().map(|q| q.word_index),
            Resolution::Failed | Resolution::Checked => None,
        };
        self.select_next(exclude);
        true
    }

    fn pending_delay(&self) -> Option<Duration> {
        match (self.phase, &self.question) {
            (Phase::Resolved(Resolution::Checked), _) => None,
            (Phase::Resolved(_), Some(q)) if q.modality == Modality::DragDrop => {
                Some(self.settings.drag_drop_delay)
            }
            (Phase::Resolved(_), _) => Some(self.settings.feedback_delay),
            _ => None,
        }
    }

    /// Deferred auto-advance after a success or failure. Returns true when it advanced.
    pub fn on_tick(&mut self) -> bool {
        let (Some(delay), Some(resolved_at)) = (self.pending_delay(), self.resolved_at) else {
            return false;
        };
        if self.clock.now().saturating_duration_since(resolved_at) >= delay {
            self.advance()
        } else {
            false
        }
    }

    /// Force completion over whatever progress exists.
    pub fn end_session(&mut self) -> Option<&TestResult> {
        match self.phase {
            Phase::Idle => None,
            Phase::Complete => self.result.as_ref(),
            Phase::AwaitingAnswer | Phase::Resolved(_) => {
                self.complete(false);
                self.result.as_ref()
            }
        }
    }

    fn complete(&mut self, completed: bool) {
        let now = self.clock.now();
        let elapsed = self
            .started_instant
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default();

        let result = TestResult {
            started_at: self.started_at.unwrap_or_else(Local::now),
            elapsed_ms: elapsed.as_millis() as u64,
            elapsed: format_elapsed(elapsed),
            words: self.words.clone(),
            completed,
        };
        self.log(|| {
            format!(
                "session {} after {} with {}",
                if completed { "complete" } else { "ended early" },
                result.elapsed,
                result.score()
            )
        });

        self.result = Some(result);
        self.question = None;
        self.resolved_at = None;
        self.phase = Phase::Complete;
    }
}

// Library surface for the binary, headless tests and reuse.
// The quiz core (settings, policy, scoring, session) never touches I/O.
pub mod app_dirs;
pub mod config;
pub mod history;
pub mod logging;
pub mod policy;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod settings;
pub mod time_series;
pub mod util;
pub mod word;
pub mod word_set;

pub use session::{Feedback, Phase, Question, QuestionKind, QuizSession, Resolution, TestResult};
pub use settings::{Direction, Modality, SessionSettings, SetupError};
pub use word::Word;

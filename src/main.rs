use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand, ValueEnum};
use flashquiz::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    history::{export_csv, HistoryEntry, HistoryStore, SqliteHistory},
    logging::session_logger,
    policy::DragDropBoard,
    runtime::{FixedTicker, QuizEvent, Runner, StdinEventSource},
    scoring::{format_seconds, hardest, overall_avg_answer_time_seconds, rank, summarize, SortBy},
    session::{Feedback, Phase, QuestionKind, QuizSession, Resolution, TestResult},
    settings::{Direction, Modality},
    time_series::accuracy_series,
    util::edit_distance,
    word_set::{template, templates, FileSetStore, SetStore, WordSet},
};
use rand::{rngs::StdRng, SeedableRng};
use std::{
    error::Error,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};
use unicode_width::UnicodeWidthStr;

const TICK_RATE_MS: u64 = 100;
const HARDEST_SHOWN: usize = 5;

/// vocabulary flashcards in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Drill a vocabulary list with writing, multiple-choice, matching and fill-in-the-blank questions until every word reaches its repetition target."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// bundled word set to practice (see `flashquiz templates`)
    #[clap(short = 't', long, conflicts_with_all = ["set", "first"])]
    template: Option<String>,

    /// saved word set to practice (see `flashquiz sets`)
    #[clap(long, conflicts_with = "first")]
    set: Option<String>,

    /// file with one language-1 word per line
    #[clap(long, requires = "second")]
    first: Option<PathBuf>,

    /// file with one language-2 word per line, parallel to --first
    #[clap(long, requires = "first")]
    second: Option<PathBuf>,

    /// example sentences for --first, one per line
    #[clap(long, requires = "first")]
    first_sentences: Option<PathBuf>,

    /// example sentences for --second, one per line
    #[clap(long, requires = "second")]
    second_sentences: Option<PathBuf>,

    /// save the words read from --first/--second under this name
    #[clap(long, requires = "first")]
    save_as: Option<String>,

    /// correct answers needed per word
    #[clap(short = 'r', long)]
    repetitions: Option<u32>,

    /// number of multiple-choice options
    #[clap(short = 'o', long)]
    options: Option<usize>,

    /// question types to use, comma separated
    #[clap(short = 'm', long, value_enum, value_delimiter = ',')]
    modes: Vec<ModeArg>,

    /// cycle through question types instead of picking at random
    #[clap(long)]
    alternate: bool,

    /// always show language 1 and ask for language 2
    #[clap(long)]
    second_only: bool,

    /// count near misses as wrong
    #[clap(long)]
    strict: bool,

    /// wrong answers also count towards the repetition target
    #[clap(long)]
    progress_on_mistakes: bool,

    /// seed for a reproducible question order
    #[clap(long)]
    seed: Option<u64>,

    /// do not record this session
    #[clap(long)]
    no_history: bool,

    /// history database location
    #[clap(long, global = true)]
    history_db: Option<PathBuf>,

    /// config file location
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// directory of saved word sets
    #[clap(long, global = true)]
    sets_dir: Option<PathBuf>,

    /// log session events to stderr
    #[clap(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// inspect past sessions
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// list bundled word sets
    Templates,
    /// list saved word sets
    Sets {
        /// remove a saved set
        #[clap(long)]
        delete: Option<String>,
    },
    /// print the effective settings
    Config {
        /// persist the settings given on the command line
        #[clap(long)]
        save: bool,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum HistoryAction {
    List,
    Show { id: i64 },
    Delete { id: i64 },
    Clear,
    /// write every recorded word as CSV
    Export {
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// accuracy per session, oldest first
    Trend { set: Option<String> },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Writing,
    Choice,
    Match,
    Sentence,
}

impl From<ModeArg> for Modality {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Writing => Modality::Writing,
            ModeArg::Choice => Modality::MultiSelect,
            ModeArg::Match => Modality::DragDrop,
            ModeArg::Sentence => Modality::Sentence,
        }
    }
}

impl Cli {
    /// Stored config with the command line laid on top
    fn apply_to(&self, mut config: Config) -> Config {
        if let Some(r) = self.repetitions {
            config.repetition_target = r;
        }
        if let Some(o) = self.options {
            config.option_count = o;
        }
        if !self.modes.is_empty() {
            config.modalities = self.modes.iter().map(|m| Modality::from(*m)).collect();
        }
        config.alternate_modalities |= self.alternate;
        config.only_second_language_tested |= self.second_only;
        config.allow_typos &= !self.strict;
        config.progress_on_mistakes |= self.progress_on_mistakes;
        config.debug_log |= self.debug;
        config
    }

    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }

    fn set_store(&self) -> FileSetStore {
        match &self.sets_dir {
            Some(dir) => FileSetStore::with_dir(dir),
            None => FileSetStore::new(),
        }
    }

    fn history(&self) -> Result<SqliteHistory, Box<dyn Error>> {
        let path = self
            .history_db
            .clone()
            .or_else(AppDirs::history_db_path)
            .ok_or("no location for the history database, pass --history-db")?;
        Ok(SqliteHistory::open(path)?)
    }

    /// Resolve the word source. `None` when nothing was given.
    fn word_set(&self) -> Result<Option<WordSet>, Box<dyn Error>> {
        if let Some(name) = &self.template {
            let set = template(name).ok_or_else(|| format!("unknown template {name:?}"))?;
            return Ok(Some(set));
        }
        if let Some(name) = &self.set {
            return Ok(Some(self.set_store().load(name)?));
        }
        let (Some(first), Some(second)) = (&self.first, &self.second) else {
            return Ok(None);
        };

        let name = self.save_as.clone().unwrap_or_else(|| file_stem(first));
        let mut set = WordSet::from_text(
            &name,
            &fs::read_to_string(first)?,
            &fs::read_to_string(second)?,
        );
        if self.first_sentences.is_some() || self.second_sentences.is_some() {
            let read = |p: &Option<PathBuf>| -> io::Result<String> {
                p.as_ref().map_or(Ok(String::new()), fs::read_to_string)
            };
            set = set.with_sentences(&read(&self.first_sentences)?, &read(&self.second_sentences)?);
        }
        if self.save_as.is_some() {
            self.set_store().save(&set)?;
        }
        Ok(Some(set))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("custom")
        .to_string()
}

fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if debug {
        builder.filter_module("flashquiz", log::LevelFilter::Debug);
    }
    let _ = builder.try_init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let store = cli.config_store();
    let config = cli.apply_to(store.load());
    init_logging(config.debug_log);

    match &cli.command {
        Some(Command::History { action }) => run_history(&cli, action, &mut io::stdout()),
        Some(Command::Templates) => {
            let mut out = io::stdout();
            for set in templates() {
                writeln!(
                    out,
                    "{}  {} words  {} → {}",
                    pad(&set.name, 16),
                    set.len(),
                    set.language1_label,
                    set.language2_label
                )?;
            }
            Ok(())
        }
        Some(Command::Sets { delete }) => {
            let sets = cli.set_store();
            if let Some(name) = delete {
                if !sets.delete(name)? {
                    return Err(format!("no saved set named {name:?}").into());
                }
            }
            for name in sets.list()? {
                println!("{name}");
            }
            Ok(())
        }
        Some(Command::Config { save }) => {
            if *save {
                store.save(&config)?;
                log::info!("saved config to {}", store.path().display());
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        None => {
            let Some(set) = cli.word_set()? else {
                let mut cmd = Cli::command();
                cmd.error(
                    ErrorKind::MissingRequiredArgument,
                    "no words given: use --template, --set or --first with --second",
                )
                .exit();
            };
            run_quiz(&cli, &config, set)
        }
    }
}

fn run_quiz(cli: &Cli, config: &Config, set: WordSet) -> Result<(), Box<dyn Error>> {
    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let settings = set.clone().into_settings(config.to_settings());
    let session = QuizSession::new(settings)?
        .with_rng(rng)
        .with_logger(session_logger(config.debug_log));

    let mut app = QuizApp::new(session, &set, io::stdout());
    let runner = Runner::new(
        StdinEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    app.start()?;
    while app.handle(runner.step())? == Flow::Continue {}

    let QuizApp { session, mut out, .. } = app;
    let Some(result) = session.result() else {
        return Ok(());
    };
    write_results(&mut out, result)?;

    if !cli.no_history {
        match cli.history().and_then(|mut h| Ok(h.append(&set.name, result)?)) {
            Ok(id) => log::debug!("recorded session {id}"),
            Err(e) => log::warn!("could not record session: {e}"),
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Finished,
}

/// Line-based front end over a session
struct QuizApp<W: Write> {
    session: QuizSession,
    labels: (String, String),
    out: W,
}

impl<W: Write> QuizApp<W> {
    fn new(session: QuizSession, set: &WordSet, out: W) -> Self {
        Self {
            session,
            labels: (set.language1_label.clone(), set.language2_label.clone()),
            out,
        }
    }

    fn start(&mut self) -> io::Result<()> {
        writeln!(
            self.out,
            "{} words. Commands: :s skip, :? show answer, :q quit. Enter continues.",
            self.session.words().len()
        )?;
        self.session.start();
        self.write_question()
    }

    fn handle(&mut self, event: QuizEvent) -> io::Result<Flow> {
        match event {
            QuizEvent::Tick => {
                if self.session.on_tick() {
                    self.write_question()?;
                }
            }
            QuizEvent::Closed => {
                self.session.end_session();
            }
            QuizEvent::Line(line) => self.handle_line(line.trim())?,
        }

        Ok(if self.session.is_complete() {
            Flow::Finished
        } else {
            Flow::Continue
        })
    }

    fn handle_line(&mut self, line: &str) -> io::Result<()> {
        if matches!(line, ":q" | ":quit") {
            self.session.end_session();
            return Ok(());
        }

        match self.session.phase() {
            Phase::Resolved(_) => {
                self.session.advance();
                self.write_question()?;
                if !line.is_empty() && self.session.phase() == Phase::AwaitingAnswer {
                    self.answer(line)?;
                }
                Ok(())
            }
            Phase::AwaitingAnswer => self.answer(line),
            Phase::Idle | Phase::Complete => Ok(()),
        }
    }

    fn answer(&mut self, line: &str) -> io::Result<()> {
        match line {
            ":s" | ":skip" => {
                if self.session.skip() {
                    writeln!(self.out, "skipped")?;
                    self.write_question()?;
                }
                return Ok(());
            }
            ":?" | ":show" => {
                let feedback = self.session.reveal_answer().cloned();
                return self.write_feedback(feedback.as_ref());
            }
            _ => {}
        }

        let Some(question) = self.session.question().cloned() else {
            return Ok(());
        };
        let feedback = match &question.kind {
            QuestionKind::Writing | QuestionKind::Sentence { .. } => {
                self.session.submit_answer(line).cloned()
            }
            QuestionKind::MultiSelect { options } => {
                pick_option(line, options).and_then(|o| self.session.choose_option(&o).cloned())
            }
            QuestionKind::DragDrop { board } => parse_matches(line, board)
                .and_then(|m| self.session.submit_matches(&m).cloned()),
        };

        match feedback {
            Some(_) => self.write_feedback(feedback.as_ref()),
            None if line.is_empty() => self.write_input_prompt(),
            None => {
                let hint = match question.kind {
                    QuestionKind::MultiSelect { .. } => "pick an option by number",
                    QuestionKind::DragDrop { .. } => "match every prompt, e.g. 1b 2a",
                    _ => "type the answer",
                };
                writeln!(self.out, "{hint}")?;
                self.write_input_prompt()
            }
        }
    }

    fn write_input_prompt(&mut self) -> io::Result<()> {
        write!(self.out, "> ")?;
        self.out.flush()
    }

    fn write_question(&mut self) -> io::Result<()> {
        if self.session.phase() != Phase::AwaitingAnswer {
            return Ok(());
        }
        let Some(question) = self.session.question() else {
            return Ok(());
        };
        let (from, to) = match question.direction {
            Direction::FirstToSecond => (&self.labels.0, &self.labels.1),
            Direction::SecondToFirst => (&self.labels.1, &self.labels.0),
        };

        writeln!(self.out)?;
        writeln!(
            self.out,
            "#{} {} · {} → {} · {} left",
            question.number + 1,
            question.modality,
            from,
            to,
            self.session.words_left()
        )?;
        match &question.kind {
            QuestionKind::Writing => writeln!(self.out, "  {}", question.prompt)?,
            QuestionKind::MultiSelect { options } => {
                writeln!(self.out, "  {}", question.prompt)?;
                for (i, option) in options.iter().enumerate() {
                    writeln!(self.out, "    {}) {option}", i + 1)?;
                }
            }
            QuestionKind::DragDrop { board } => {
                let width = board.prompts.iter().map(|p| p.width()).max().unwrap_or(0);
                for (i, prompt) in board.prompts.iter().enumerate() {
                    let answer = board.answers.get(i).map(String::as_str).unwrap_or("");
                    writeln!(
                        self.out,
                        "  {}. {}   {}) {answer}",
                        i + 1,
                        pad(prompt, width),
                        option_letter(i)
                    )?;
                }
            }
            QuestionKind::Sentence { blanked, .. } => {
                writeln!(self.out, "  {blanked}")?;
                writeln!(self.out, "  ({})", question.prompt)?;
            }
        }
        self.write_input_prompt()
    }

    fn write_feedback(&mut self, feedback: Option<&Feedback>) -> io::Result<()> {
        let Some(feedback) = feedback else {
            return Ok(());
        };
        match feedback.resolution {
            Resolution::Success { typo: false } => writeln!(self.out, "correct")?,
            Resolution::Success { typo: true } => {
                let off = feedback
                    .guess
                    .as_deref()
                    .map_or(0, |guess| edit_distance(guess, &feedback.expected));
                writeln!(
                    self.out,
                    "correct, watch the spelling: {} ({})",
                    feedback.expected,
                    letters_off(off)
                )?
            }
            Resolution::Failed => writeln!(self.out, "wrong, the answer is {}", feedback.expected)?,
            Resolution::Checked => {
                writeln!(self.out, "the answer is {} (enter to continue)", feedback.expected)?
            }
        }
        self.out.flush()
    }
}

fn letters_off(n: usize) -> String {
    match n {
        1 => "1 letter off".to_string(),
        n => format!("{n} letters off"),
    }
}

fn option_letter(i: usize) -> char {
    (b'a' + (i % 26) as u8) as char
}

/// An option by its 1-based number or by its text.
fn pick_option(input: &str, options: &[String]) -> Option<String> {
    if let Ok(n) = input.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| options.get(i)).cloned();
    }
    options
        .iter()
        .find(|o| o.to_lowercase() == input.to_lowercase())
        .cloned()
}

/// Parse `1b 2a` into `(prompt position, answer text)` pairs.
fn parse_matches(input: &str, board: &DragDropBoard) -> Option<Vec<(usize, String)>> {
    let pairs = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|token| {
            let split = token.find(|c: char| !c.is_ascii_digit())?;
            let (number, letter) = token.split_at(split);
            let position = number.parse::<usize>().ok()?.checked_sub(1)?;
            let mut letters = letter.trim_start_matches('=').chars();
            let answer = letters.next()?.to_ascii_lowercase();
            if letters.next().is_some() || !answer.is_ascii_lowercase() {
                return None;
            }
            let answer = board.answers.get((answer as u8 - b'a') as usize)?;
            (position < board.prompts.len()).then(|| (position, answer.clone()))
        })
        .collect::<Option<Vec<_>>>()?;
    (!pairs.is_empty()).then_some(pairs)
}

/// Left-align by display width
fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(s.width());
    format!("{s}{}", " ".repeat(fill))
}

fn write_results<W: Write>(out: &mut W, result: &TestResult) -> io::Result<()> {
    let score = result.score();
    writeln!(out)?;
    writeln!(
        out,
        "{} in {}",
        if result.completed {
            "Session complete"
        } else {
            "Session ended"
        },
        result.elapsed
    )?;
    writeln!(out, "Score: {score} ({}%)", score.accuracy())?;
    writeln!(
        out,
        "Average answer time: {}",
        format_seconds(overall_avg_answer_time_seconds(&result.words))
    )?;

    let rows: Vec<_> = hardest(&result.words, HARDEST_SHOWN)
        .into_iter()
        .filter(|r| r.score < 0 || r.percentage < 100)
        .collect();
    if !rows.is_empty() {
        writeln!(out, "Hardest words:")?;
        let width = rows.iter().map(|r| r.prompt.width()).max().unwrap_or(0);
        for row in rows {
            writeln!(
                out,
                "  {}  {}  score {}  {}%",
                pad(&row.prompt, width),
                row.answer,
                row.score,
                row.percentage
            )?;
        }
    }
    out.flush()
}

fn write_entry_line<W: Write>(out: &mut W, entry: &HistoryEntry) -> io::Result<()> {
    let score = entry.result.score();
    writeln!(
        out,
        "{:>4}  {}  {}  {:>7}  {:>3}%  {}{}",
        entry.id,
        entry.result.started_at.format("%Y-%m-%d %H:%M"),
        pad(&entry.set_name, 16),
        score.to_string(),
        score.accuracy(),
        entry.result.elapsed,
        if entry.result.completed { "" } else { "  (ended early)" }
    )
}

/// Summary line plus one row per word, worst first. Rows are numbered by
/// the word's line in the original list.
fn write_entry_details<W: Write>(out: &mut W, entry: &HistoryEntry) -> io::Result<()> {
    write_entry_line(out, entry)?;
    let mut rows = summarize(&entry.result.words);
    rank(&mut rows, SortBy::Score, true);
    let width = rows.iter().map(|r| r.prompt.width()).max().unwrap_or(0);
    for row in rows {
        writeln!(
            out,
            "  {:>3}. {}  {}  score {:>3}  {:>3}%  {} over {} answers",
            row.id + 1,
            pad(&row.prompt, width),
            row.answer,
            row.score,
            row.percentage,
            format_seconds(row.avg_time_secs),
            row.attempts
        )?;
    }
    Ok(())
}

fn run_history<W: Write>(
    cli: &Cli,
    action: &HistoryAction,
    out: &mut W,
) -> Result<(), Box<dyn Error>> {
    let mut history = cli.history()?;
    match action {
        HistoryAction::List => {
            for entry in history.list()? {
                write_entry_line(out, &entry)?;
            }
        }
        HistoryAction::Show { id } => {
            let entry = history
                .get(*id)?
                .ok_or_else(|| format!("no session with id {id}"))?;
            write_entry_details(out, &entry)?;
        }
        HistoryAction::Delete { id } => {
            if !history.delete(*id)? {
                return Err(format!("no session with id {id}").into());
            }
        }
        HistoryAction::Clear => history.clear()?,
        HistoryAction::Export { output } => {
            let entries = history.list()?;
            match output {
                Some(path) => export_csv(&entries, fs::File::create(path)?)?,
                None => export_csv(&entries, &mut *out)?,
            }
        }
        HistoryAction::Trend { set } => {
            let entries = history.list()?;
            for point in accuracy_series(&entries, set.as_deref()) {
                let bar = "█".repeat((point.accuracy / 5.0).round() as usize);
                writeln!(out, "{:>4}  {:>3}%  {bar}", point.t, point.accuracy)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

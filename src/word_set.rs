use crate::app_dirs::AppDirs;
use crate::settings::SessionSettings;
use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

static TEMPLATE_DIR: Dir = include_dir!("src/templates");

#[derive(Debug, Error)]
pub enum SetStoreError {
    #[error("no word set named {0:?}")]
    NotFound(String),

    #[error("{0:?} is not a usable set name")]
    InvalidName(String),

    #[error("could not read or write word sets")]
    Io(#[from] std::io::Error),

    #[error("word set file is not valid JSON")]
    Encoding(#[from] serde_json::Error),
}

/// A named pair of parallel word lists with optional example sentences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordSet {
    pub name: String,
    #[serde(default = "default_first_label")]
    pub language1_label: String,
    #[serde(default = "default_second_label")]
    pub language2_label: String,
    pub language1_words: Vec<String>,
    pub language2_words: Vec<String>,
    #[serde(default)]
    pub language1_sentences: Vec<String>,
    #[serde(default)]
    pub language2_sentences: Vec<String>,
}

fn default_first_label() -> String {
    "language 1".to_string()
}

fn default_second_label() -> String {
    "language 2".to_string()
}

/// One entry per line. Trailing blank lines are dropped; blank lines in the
/// middle stay so setup can point at them.
fn lines(text: &str) -> Vec<String> {
    let mut out: Vec<String> = text.lines().map(|l| l.trim().to_string()).collect();
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out
}

impl WordSet {
    pub fn from_text(name: &str, first: &str, second: &str) -> Self {
        Self {
            name: name.to_string(),
            language1_label: default_first_label(),
            language2_label: default_second_label(),
            language1_words: lines(first),
            language2_words: lines(second),
            language1_sentences: Vec::new(),
            language2_sentences: Vec::new(),
        }
    }

    pub fn with_sentences(mut self, first: &str, second: &str) -> Self {
        self.language1_sentences = lines(first);
        self.language2_sentences = lines(second);
        self
    }

    pub fn len(&self) -> usize {
        self.language1_words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.language1_words.is_empty()
    }

    /// Replace the word and sentence lists of `base`, keeping its quiz parameters.
    pub fn into_settings(self, base: SessionSettings) -> SessionSettings {
        SessionSettings {
            language1_words: self.language1_words,
            language2_words: self.language2_words,
            language1_sentences: self.language1_sentences,
            language2_sentences: self.language2_sentences,
            ..base
        }
    }
}

/// Every bundled template, sorted by name.
pub fn templates() -> Vec<WordSet> {
    let mut sets: Vec<WordSet> = TEMPLATE_DIR
        .files()
        .filter(|f| f.path().extension().is_some_and(|ext| ext == "json"))
        .filter_map(|f| {
            let text = f.contents_utf8()?;
            match serde_json::from_str::<WordSet>(text) {
                Ok(set) => Some(set),
                Err(e) => {
                    log::warn!("skipping template {}: {e}", f.path().display());
                    None
                }
            }
        })
        .collect();
    sets.sort_by(|a, b| a.name.cmp(&b.name));
    sets
}

pub fn template(name: &str) -> Option<WordSet> {
    templates().into_iter().find(|s| s.name == name)
}

/// Named word sets the user saved.
pub trait SetStore {
    fn save(&self, set: &WordSet) -> Result<(), SetStoreError>;
    fn load(&self, name: &str) -> Result<WordSet, SetStoreError>;
    fn list(&self) -> Result<Vec<String>, SetStoreError>;
    fn delete(&self, name: &str) -> Result<bool, SetStoreError>;
}

#[derive(Debug, Clone)]
pub struct FileSetStore {
    dir: PathBuf,
}

impl FileSetStore {
    pub fn new() -> Self {
        Self {
            dir: AppDirs::sets_dir(),
        }
    }

    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, SetStoreError> {
        let usable = !name.trim().is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\']);
        if !usable {
            return Err(SetStoreError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }
}

impl Default for FileSetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SetStore for FileSetStore {
    fn save(&self, set: &WordSet) -> Result<(), SetStoreError> {
        let path = self.path_for(&set.name)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(path, serde_json::to_vec_pretty(set)?)?;
        Ok(())
    }

    fn load(&self, name: &str) -> Result<WordSet, SetStoreError> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(SetStoreError::NotFound(name.to_string()));
        }
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn list(&self) -> Result<Vec<String>, SetStoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete(&self, name: &str) -> Result<bool, SetStoreError> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }
}

use crate::app_dirs::AppDirs;
use crate::settings::{Modality, SessionSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub repetition_target: u32,
    pub option_count: usize,
    pub drag_drop_batch: usize,
    pub only_second_language_tested: bool,
    pub alternate_modalities: bool,
    pub modalities: Vec<Modality>,
    pub allow_typos: bool,
    pub progress_on_mistakes: bool,
    pub feedback_delay_ms: u64,
    pub drag_drop_delay_ms: u64,
    pub debug_log: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repetition_target: 3,
            option_count: 4,
            drag_drop_batch: 4,
            only_second_language_tested: false,
            alternate_modalities: false,
            modalities: vec![Modality::Writing, Modality::MultiSelect],
            allow_typos: true,
            progress_on_mistakes: false,
            feedback_delay_ms: 1200,
            drag_drop_delay_ms: 1500,
            debug_log: false,
        }
    }
}

impl Config {
    /// Session settings with every quiz parameter filled in and no words yet.
    pub fn to_settings(&self) -> SessionSettings {
        SessionSettings {
            repetition_target: self.repetition_target,
            option_count: self.option_count,
            only_second_language_tested: self.only_second_language_tested,
            alternate_modalities: self.alternate_modalities,
            modalities: self.modalities.clone(),
            allow_typos: self.allow_typos,
            progress_on_mistakes: self.progress_on_mistakes,
            drag_drop_batch: self.drag_drop_batch,
            feedback_delay: Duration::from_millis(self.feedback_delay_ms),
            drag_drop_delay: Duration::from_millis(self.drag_drop_delay_ms),
            ..SessionSettings::default()
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => log::warn!("ignoring unreadable config {}: {e}", self.path.display()),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            repetition_target: 5,
            option_count: 6,
            drag_drop_batch: 3,
            only_second_language_tested: true,
            alternate_modalities: true,
            modalities: vec![Modality::DragDrop, Modality::Sentence],
            allow_typos: false,
            progress_on_mistakes: true,
            feedback_delay_ms: 500,
            drag_drop_delay_ms: 900,
            debug_log: true,
        };
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn missing_or_broken_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        assert_eq!(store.load(), Config::default());

        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{ "repetition_target": 1, "modalities": ["sentence"] }"#).unwrap();

        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.repetition_target, 1);
        assert_eq!(cfg.modalities, vec![Modality::Sentence]);
        assert_eq!(cfg.option_count, 4);
    }

    #[test]
    fn to_settings_copies_parameters() {
        let cfg = Config {
            repetition_target: 2,
            feedback_delay_ms: 250,
            ..Config::default()
        };
        let settings = cfg.to_settings();
        assert_eq!(settings.repetition_target, 2);
        assert_eq!(settings.feedback_delay, Duration::from_millis(250));
        assert_eq!(settings.drag_drop_delay, Duration::from_millis(1500));
        assert!(settings.language1_words.is_empty());
        assert_eq!(settings.modalities, cfg.modalities);
    }
}

use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "flashquiz";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// History database under $HOME/.local/state/flashquiz when HOME is set
    pub fn history_db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join(APP_NAME);
            Some(state_dir.join("history.db"))
        } else {
            ProjectDirs::from("", "", APP_NAME)
                .map(|proj_dirs| proj_dirs.data_local_dir().join("history.db"))
        }
    }

    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("flashquiz_config.json"))
    }

    /// Directory holding saved word sets
    pub fn sets_dir() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|pd| pd.data_dir().join("sets"))
            .unwrap_or_else(|| PathBuf::from("flashquiz_sets"))
    }
}

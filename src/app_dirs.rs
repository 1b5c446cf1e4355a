use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Score database under $HOME/.local/state/blip, with a
    /// platform-specific fallback.
    pub fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("blip");
            Some(state_dir.join("scores.db"))
        } else {
            ProjectDirs::from("", "", "blip")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("scores.db"))
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "blip").map(|pd| pd.config_dir().join("config.json"))
    }

    /// Per-session history log lives next to the config file.
    pub fn history_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "blip").map(|pd| pd.config_dir().join("history.csv"))
    }
}

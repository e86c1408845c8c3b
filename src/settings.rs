// Application settings, stored as pretty JSON next to the campaigns.
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::transcript::ContextWindow;

pub const DEFAULT_SCENARIO: &str = "You are in a medieval fantasy world. The adventure begins in a small village called Riverdale.";
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub endpoint: String,   // Base url of the generation server.
    pub scenario: String,   // Opening description every session starts with.
    pub context_window: ContextWindow,
    pub debug_mode: bool,   // Log at debug level.
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            scenario: DEFAULT_SCENARIO.to_string(),
            context_window: ContextWindow::Unbounded,
            debug_mode: false,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// `~/gm_ratatui/data`, falling back to `./data` when there is no home directory.
    pub fn data_dir() -> PathBuf {
        match dir::home_dir() {
            Some(home) => home.join("gm_ratatui").join("data"),
            None => PathBuf::from("./data"),
        }
    }

    pub fn settings_path() -> PathBuf {
        Self::data_dir().join("settings.json")
    }

    /// Settings from the default path, defaults when missing or unreadable.
    /// The read error is handed back so it can be logged once logging runs.
    pub fn load() -> (Self, Option<io::Error>) {
        Self::load_or_default(Self::settings_path())
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> (Self, Option<io::Error>) {
        match Self::load_settings_from_file(path) {
            Ok(settings) => (settings, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    pub fn save(&self) -> io::Result<()> {
        self.save_to_file(Self::settings_path())
    }

    pub fn load_settings_from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let data = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&data)?;
        Ok(settings)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        file.write_all(data.as_bytes())?;
        Ok(())
    }
}

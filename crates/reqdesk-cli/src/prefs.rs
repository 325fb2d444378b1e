//! UI preferences
//!
//! Plain string key-value pairs in ~/.local/share/reqdesk/prefs.json

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Key under which the last active side-panel tab is stored
pub const PANEL_TAB_KEY: &str = "panel.tab";

#[derive(Debug, Clone)]
pub struct Prefs {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

fn prefs_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reqdesk")
        .join("prefs.json")
}

impl Prefs {
    pub fn load() -> Self {
        Self::load_from(prefs_file())
    }

    /// Unreadable or malformed files start empty
    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed prefs file {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Store a value and write the file
    pub fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        if self.get(key) == Some(value) {
            return Ok(());
        }
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }

    fn save(&self) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, content)
    }
}

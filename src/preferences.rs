use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Key the theme is stored under
pub const THEME_KEY: &str = "APP_THEME";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "dark" => Some(Theme::Dark),
            "light" => Some(Theme::Light),
            _ => None,
        }
    }
}

/// Small persisted key-value store (JSON object of strings)
#[derive(Debug, Clone)]
pub struct Preferences {
    path: PathBuf,
}

impl Preferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved theme; missing file or unknown value means dark
    pub fn theme(&self) -> Theme {
        match self.read() {
            Ok(values) => values
                .get(THEME_KEY)
                .and_then(|v| Theme::parse(v))
                .unwrap_or_default(),
            Err(e) => {
                warn!("Failed to read preferences, using defaults: {:#}", e);
                Theme::default()
            }
        }
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        let mut values = self.read().unwrap_or_default();
        values.insert(THEME_KEY.to_string(), theme.as_str().to_string());
        self.write(&values)?;

        info!("Theme set to {}", theme.as_str());
        Ok(())
    }

    /// Flip the theme and persist it
    pub fn toggle_theme(&self) -> Result<Theme> {
        let next = self.theme().toggled();
        self.set_theme(next)?;
        Ok(next)
    }

    fn read(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            debug!("No preferences file at {}", self.path.display());
            return Ok(BTreeMap::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        serde_json::from_str(&contents).context("Malformed preferences file")
    }

    /// Write via a temporary file and rename so a crash never truncates it
    fn write(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(values)?;

        fs::write(&temp_path, &contents)?;
        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_theme_is_dark() -> Result<()> {
        let dir = TempDir::new()?;
        let prefs = Preferences::new(dir.path().join("preferences.json"));

        assert_eq!(prefs.theme(), Theme::Dark);
        Ok(())
    }

    #[test]
    fn test_toggle_persists() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("preferences.json");

        assert_eq!(Preferences::new(&path).toggle_theme()?, Theme::Light);
        assert_eq!(Preferences::new(&path).theme(), Theme::Light);
        assert_eq!(Preferences::new(&path).toggle_theme()?, Theme::Dark);

        let raw = fs::read_to_string(&path)?;
        assert!(raw.contains("\"APP_THEME\": \"dark\""));
        Ok(())
    }

    #[test]
    fn test_unknown_value_falls_back_to_dark() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("preferences.json");
        fs::write(&path, r#"{"APP_THEME": "sepia"}"#)?;

        assert_eq!(Preferences::new(&path).theme(), Theme::Dark);
        Ok(())
    }
}

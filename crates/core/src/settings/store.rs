//! Settings stores.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::{debug, info};

use super::error::SettingsError;
use super::types::{MoveSettings, SettingsUpdate};

/// Source of the current [`MoveSettings`].
pub trait SettingsStore: Send + Sync {
    /// Current settings.
    fn settings(&self) -> MoveSettings;

    /// Merges `update` into the current settings and returns the result.
    fn update(&self, update: &SettingsUpdate) -> Result<MoveSettings, SettingsError>;
}

/// Settings kept in memory only.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: RwLock<MoveSettings>,
}

impl MemorySettingsStore {
    pub fn new(settings: MoveSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn settings(&self) -> MoveSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, update: &SettingsUpdate) -> Result<MoveSettings, SettingsError> {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        let next = settings.apply(update)?;
        *settings = next.clone();
        Ok(next)
    }
}

/// Settings persisted to a TOML file, rewritten on every update.
#[derive(Debug)]
pub struct TomlSettingsStore {
    path: PathBuf,
    settings: RwLock<MoveSettings>,
}

impl TomlSettingsStore {
    /// Loads settings from `path`, using defaults when the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let settings = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| SettingsError::Read {
                path: path.clone(),
                source: e,
            })?;
            let settings = toml::from_str(&content).map_err(|e| SettingsError::Parse {
                path: path.clone(),
                source: e,
            })?;
            info!("Loaded move settings from {}", path.display());
            settings
        } else {
            debug!(
                "No settings file at {}, using defaults",
                path.display()
            );
            MoveSettings::default()
        };

        Ok(Self {
            path,
            settings: RwLock::new(settings),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, settings: &MoveSettings) -> Result<(), SettingsError> {
        let content = toml::to_string_pretty(settings)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| SettingsError::Write {
                    path: self.path.clone(),
                    source: e,
                })?;
            }
        }
        std::fs::write(&self.path, content).map_err(|e| SettingsError::Write {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl SettingsStore for TomlSettingsStore {
    fn settings(&self) -> MoveSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, update: &SettingsUpdate) -> Result<MoveSettings, SettingsError> {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        let next = settings.apply(update)?;
        self.save(&next)?;
        *settings = next.clone();
        debug!("Saved move settings to {}", self.path.display());
        Ok(next)
    }
}

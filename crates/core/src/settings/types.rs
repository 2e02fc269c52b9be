//! Settings groups and partial updates.

use serde::{Deserialize, Serialize};

use super::error::SettingsError;

/// Timeout value meaning "keep finished jobs until cleared".
pub const NEVER_EXPIRE: f64 = -1.0;

/// All runtime settings, grouped like the persisted file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveSettings {
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub timeout: TimeoutSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// Delete source directories left empty by a successful move.
    #[serde(default)]
    pub remove_empty: bool,
}

/// Seconds a finished job stays visible. Negative keeps it until cleared,
/// zero removes it immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutSettings {
    #[serde(default = "default_timeout")]
    pub success: f64,
    #[serde(default = "default_timeout")]
    pub error: f64,
}

fn default_timeout() -> f64 {
    NEVER_EXPIRE
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            success: NEVER_EXPIRE,
            error: NEVER_EXPIRE,
        }
    }
}

/// Partial settings change. Absent groups and fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general: Option<GeneralUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_empty: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeoutUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<f64>,
}

impl SettingsUpdate {
    pub fn remove_empty(mut self, enabled: bool) -> Self {
        self.general.get_or_insert_with(Default::default).remove_empty = Some(enabled);
        self
    }

    pub fn success_timeout(mut self, secs: f64) -> Self {
        self.timeout.get_or_insert_with(Default::default).success = Some(secs);
        self
    }

    pub fn error_timeout(mut self, secs: f64) -> Self {
        self.timeout.get_or_insert_with(Default::default).error = Some(secs);
        self
    }
}

impl MoveSettings {
    /// Returns these settings with `update` merged in.
    pub fn apply(&self, update: &SettingsUpdate) -> Result<MoveSettings, SettingsError> {
        let mut next = self.clone();

        if let Some(general) = &update.general {
            if let Some(remove_empty) = general.remove_empty {
                next.general.remove_empty = remove_empty;
            }
        }

        if let Some(timeout) = &update.timeout {
            if let Some(success) = timeout.success {
                next.timeout.success = finite("timeout.success", success)?;
            }
            if let Some(error) = timeout.error {
                next.timeout.error = finite("timeout.error", error)?;
            }
        }

        Ok(next)
    }
}

fn finite(name: &str, value: f64) -> Result<f64, SettingsError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SettingsError::Invalid(format!("{} must be a finite number", name)))
    }
}

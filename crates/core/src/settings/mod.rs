//! Runtime-mutable move settings.
//!
//! Unlike [`crate::config::Config`], which is read once at start-up, these
//! settings can be changed while the service runs and are read again for every
//! terminal transition.

mod error;
mod store;
mod types;

pub use error::SettingsError;
pub use store::{MemorySettingsStore, SettingsStore, TomlSettingsStore};
pub use types::{
    GeneralSettings, GeneralUpdate, MoveSettings, SettingsUpdate, TimeoutSettings, TimeoutUpdate,
    NEVER_EXPIRE,
};

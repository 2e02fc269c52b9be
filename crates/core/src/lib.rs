pub mod config;
pub mod expiry;
pub mod job;
pub mod metrics;
pub mod mover;
pub mod progress;
pub mod scheduler;
pub mod settings;
pub mod size_probe;
pub mod speed;
pub mod testing;
pub mod torrents;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, ServerConfig, SettingsConfig,
};
pub use expiry::{ExpiredJob, ExpiryDecision, ExpiryManager};
pub use job::{JobKey, JobRecord, JobSnapshot, JobStatus, MoveError};
pub use mover::{FsMover, MoveRequest, Mover, MoverConfig, MoverError, MoverEvent};
pub use progress::ProgressTracker;
pub use scheduler::{
    Collaborators, CompletedMove, CompletedResult, MoveScheduler, MoveService, SchedulerConfig,
    ServiceStatus, SubmitOutcome, SubmitRequest,
};
pub use settings::{
    MemorySettingsStore, MoveSettings, SettingsError, SettingsStore, SettingsUpdate,
    TomlSettingsStore,
};
pub use size_probe::{FsSizeProbe, SizeProbe};
pub use speed::SpeedEstimator;
pub use torrents::{FileEnumerator, TorrentRegistry, TorrentSnapshot};

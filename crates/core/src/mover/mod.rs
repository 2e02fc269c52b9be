//! Relocation of a torrent's files from its save path to a new directory.
//!
//! The scheduler is the only caller of a [`Mover`]. Admission is synchronous
//! (`start_move` accepts or rejects the request) while completion is reported
//! later as a [`MoverEvent`] on the channel handed to the mover at construction.
//!
//! # Example
//!
//! ```ignore
//! use movetools_core::mover::{event_channel, FsMover, Mover, MoverConfig, MoveRequest};
//!
//! let (events_tx, mut events_rx) = event_channel();
//! let mover = FsMover::new(MoverConfig::default(), events_tx);
//!
//! mover
//!     .start_move(MoveRequest {
//!         key: "abc".to_string(),
//!         source_path: PathBuf::from("/downloads"),
//!         dest_path: PathBuf::from("/library"),
//!         files: vec![PathBuf::from("Show/episode.mkv")],
//!     })
//!     .await?;
//!
//! let event = events_rx.recv().await;
//! ```

mod cleanup;
mod config;
mod error;
mod fs_mover;
mod traits;
mod types;

pub use cleanup::remove_empty_dirs;
pub use config::MoverConfig;
pub use error::MoverError;
pub use fs_mover::FsMover;
pub use traits::Mover;
pub use types::{event_channel, MoveRequest, MoverEvent, EVENT_CHANNEL_CAPACITY};

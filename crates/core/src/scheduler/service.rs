//! Move service runtime.
//!
//! Wraps a [`MoveScheduler`] in one async mutex and drives it from a single
//! loop that waits on the tick interval, mover events, fired expiry timers
//! and the shutdown signal. Administrative calls take the same mutex, so
//! every mutation lands on one timeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::expiry::ExpiredJob;
use crate::job::{JobKey, JobSnapshot, JobStatus};
use crate::mover::{Mover, MoverEvent};
use crate::settings::{MoveSettings, SettingsError, SettingsStore, SettingsUpdate};
use crate::size_probe::SizeProbe;
use crate::torrents::FileEnumerator;

use super::config::SchedulerConfig;
use super::queue::MoveScheduler;
use super::types::{CompletedMove, CompletedResult, ServiceStatus, SubmitOutcome, SubmitRequest};

/// Collaborators injected into a [`MoveService`].
pub struct Collaborators {
    pub mover: Arc<dyn Mover>,
    /// Receiver of the events `mover` reports.
    pub events: mpsc::Receiver<MoverEvent>,
    pub enumerator: Arc<dyn FileEnumerator>,
    pub settings: Arc<dyn SettingsStore>,
    pub probe: Arc<dyn SizeProbe>,
}

/// Channels owned by the run loop while it runs.
struct LoopChannels {
    events: mpsc::Receiver<MoverEvent>,
    expired: mpsc::UnboundedReceiver<ExpiredJob>,
}

/// The move scheduler with its runtime loop and administrative surface.
pub struct MoveService {
    config: SchedulerConfig,
    scheduler: Arc<Mutex<MoveScheduler>>,
    enumerator: Arc<dyn FileEnumerator>,
    probe: Arc<dyn SizeProbe>,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    channels: Mutex<Option<LoopChannels>>,
    task: Mutex<Option<JoinHandle<LoopChannels>>>,
}

impl MoveService {
    /// Create a stopped service.
    pub fn new(config: SchedulerConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            mover,
            events,
            enumerator,
            settings,
            probe,
        } = collaborators;

        let (scheduler, expired) =
            MoveScheduler::new(&config, mover, Arc::clone(&probe), settings);
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            scheduler: Arc::new(Mutex::new(scheduler)),
            enumerator,
            probe,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            channels: Mutex::new(Some(LoopChannels { events, expired })),
            task: Mutex::new(None),
        }
    }

    /// Start the run loop.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Move service already running");
            return;
        }

        let Some(channels) = self.channels.lock().await.take() else {
            warn!("Move service channels unavailable, not starting");
            self.running.store(false, Ordering::SeqCst);
            return;
        };

        info!(
            "Starting move service (tick every {}ms)",
            self.config.tick_interval_ms
        );

        let scheduler = Arc::clone(&self.scheduler);
        let probe = Arc::clone(&self.probe);
        let interval = self.config.tick_interval();
        let shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(Self::run_loop(
            scheduler,
            probe,
            channels,
            interval,
            shutdown_rx,
        ));
        *self.task.lock().await = Some(handle);
    }

    /// Stop the run loop and cancel every armed expiry timer.
    ///
    /// Job records are kept; a later `start` resumes with them.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Move service not running");
            return;
        }

        info!("Stopping move service");
        let _ = self.shutdown_tx.send(());

        if let Some(handle) = self.task.lock().await.take() {
            match handle.await {
                Ok(channels) => *self.channels.lock().await = Some(channels),
                Err(e) => warn!("Move service loop ended abnormally: {}", e),
            }
        }

        self.scheduler.lock().await.shutdown();
        info!("Move service stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    async fn run_loop(
        scheduler: Arc<Mutex<MoveScheduler>>,
        probe: Arc<dyn SizeProbe>,
        mut channels: LoopChannels,
        interval: std::time::Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> LoopChannels {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Move loop started");
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Move loop received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    Self::run_tick(&scheduler, &probe).await;
                }
                Some(event) = channels.events.recv() => {
                    scheduler.lock().await.handle_event(event);
                }
                Some(fired) = channels.expired.recv() => {
                    scheduler.lock().await.expire(&fired);
                }
            }
        }
        info!("Move loop stopped");
        channels
    }

    /// One scheduler tick: admission under the lock, the destination size
    /// probe on the blocking pool, and the result applied under the lock again.
    async fn run_tick(scheduler: &Mutex<MoveScheduler>, probe: &Arc<dyn SizeProbe>) {
        let target = {
            let mut scheduler = scheduler.lock().await;
            scheduler.admit_next().await;
            scheduler.progress_target()
        };
        let Some(target) = target else {
            return;
        };

        let probe = Arc::clone(probe);
        let paths = target.dest_paths.clone();
        let observed = match tokio::task::spawn_blocking(move || probe.total_size(&paths)).await {
            Ok(size) => size,
            Err(e) => {
                warn!("Size probe for {} failed: {}", target.key, e);
                return;
            }
        };

        scheduler.lock().await.apply_progress(&target, observed);
    }

    /// Run one tick immediately, independent of the loop.
    pub async fn tick(&self) {
        Self::run_tick(&self.scheduler, &self.probe).await;
    }

    /// Apply a mover event immediately, independent of the loop.
    pub async fn handle_event(&self, event: MoverEvent) -> bool {
        self.scheduler.lock().await.handle_event(event)
    }

    /// Submit a move request.
    ///
    /// The source size is probed on the blocking pool before the scheduler
    /// lock is taken.
    pub async fn submit(&self, request: SubmitRequest) -> SubmitOutcome {
        let total_size = self.probe_source(&request).await;
        self.scheduler
            .lock()
            .await
            .submit_sized(request, total_size)
    }

    /// Submit moves of finished torrents to their completed-move destination.
    ///
    /// Sizes are probed first; the submissions then land together under one
    /// lock, in the order of `keys`.
    pub async fn move_completed(&self, keys: &[JobKey]) -> Vec<CompletedMove> {
        let mut prepared = Vec::with_capacity(keys.len());
        for key in keys {
            let entry = match self.enumerator.snapshot(key) {
                None => {
                    debug!("Move completed skipped unknown torrent {}", key);
                    Err(CompletedResult::UnknownTorrent)
                }
                Some(torrent) if !torrent.finished => {
                    debug!("Move completed skipped unfinished torrent {}", key);
                    Err(CompletedResult::NotFinished)
                }
                Some(torrent) => {
                    let request = SubmitRequest {
                        key: key.clone(),
                        files: torrent.files,
                        source_path: torrent.save_path,
                        dest_path: torrent.move_completed_path.unwrap_or_default(),
                    };
                    let total_size = self.probe_source(&request).await;
                    Ok((request, total_size))
                }
            };
            prepared.push((key.clone(), entry));
        }

        let mut scheduler = self.scheduler.lock().await;
        prepared
            .into_iter()
            .map(|(key, entry)| {
                let result = match entry {
                    Ok((request, total_size)) => CompletedResult::Submitted {
                        outcome: scheduler.submit_sized(request, total_size),
                    },
                    Err(skipped) => skipped,
                };
                CompletedMove { key, result }
            })
            .collect()
    }

    async fn probe_source(&self, request: &SubmitRequest) -> u64 {
        let probe = Arc::clone(&self.probe);
        let paths = request.source_files();
        match tokio::task::spawn_blocking(move || probe.total_size(&paths)).await {
            Ok(size) => size,
            Err(e) => {
                warn!("Size probe for {} failed: {}", request.key, e);
                0
            }
        }
    }

    pub async fn cancel_pending(&self, keys: &[JobKey]) -> Vec<JobKey> {
        self.scheduler.lock().await.cancel_pending(keys)
    }

    pub async fn clear_finished(&self, keys: &[JobKey]) -> Vec<JobKey> {
        self.scheduler.lock().await.clear_finished(keys)
    }

    pub async fn clear_all(&self) -> Vec<JobKey> {
        self.scheduler.lock().await.clear_all()
    }

    pub async fn settings(&self) -> MoveSettings {
        self.scheduler.lock().await.settings()
    }

    pub async fn update_settings(
        &self,
        update: &SettingsUpdate,
    ) -> Result<MoveSettings, SettingsError> {
        self.scheduler.lock().await.update_settings(update)
    }

    pub async fn job(&self, key: &str) -> Option<JobSnapshot> {
        self.scheduler.lock().await.job(key)
    }

    pub async fn jobs(&self) -> Vec<JobSnapshot> {
        self.scheduler.lock().await.jobs()
    }

    pub async fn status_token(&self, key: &str) -> Option<JobStatus> {
        self.scheduler.lock().await.status_token(key)
    }

    /// Status line for `key`, empty when there is no record.
    pub async fn message(&self, key: &str) -> String {
        self.scheduler.lock().await.message(key)
    }

    pub async fn status(&self) -> ServiceStatus {
        let scheduler = self.scheduler.lock().await;
        ServiceStatus {
            running: self.is_running(),
            active: scheduler.active().map(str::to_string),
            pending: scheduler.pending().len(),
            jobs: scheduler.len(),
            speed_estimate_bps: scheduler.speed_estimate(),
        }
    }
}

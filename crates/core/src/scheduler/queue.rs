//! Single-active-job move scheduler.
//!
//! Owns the job table, the FIFO of pending keys and the one active slot.
//! Every method takes `&mut self`; callers serialize access (see
//! [`super::MoveService`]), so no two mutations can interleave.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::expiry::{ExpiredJob, ExpiryDecision, ExpiryManager};
use crate::job::{JobKey, JobRecord, JobSnapshot, JobStatus, MoveError};
use crate::metrics::{
    MOVES_FINISHED, MOVES_REJECTED, MOVES_STARTED, MOVES_SUBMITTED, MOVE_DURATION, PENDING_MOVES,
};
use crate::mover::{remove_empty_dirs, MoveRequest, Mover, MoverEvent};
use crate::settings::{MoveSettings, SettingsError, SettingsStore, SettingsUpdate};
use crate::size_probe::{is_contained, SizeProbe};
use crate::speed::SpeedEstimator;

use super::config::SchedulerConfig;
use super::types::{ProgressTarget, SubmitOutcome, SubmitRequest};

/// Queue of move jobs with at most one job moving at a time.
pub struct MoveScheduler {
    jobs: HashMap<JobKey, JobRecord>,
    pending: VecDeque<JobKey>,
    active: Option<JobKey>,
    speed: SpeedEstimator,
    expiry: ExpiryManager,
    mover: Arc<dyn Mover>,
    probe: Arc<dyn SizeProbe>,
    settings: Arc<dyn SettingsStore>,
}

impl MoveScheduler {
    /// Creates an empty scheduler.
    ///
    /// The returned receiver yields fired expiry timers; pass each one to
    /// [`MoveScheduler::expire`].
    pub fn new(
        config: &SchedulerConfig,
        mover: Arc<dyn Mover>,
        probe: Arc<dyn SizeProbe>,
        settings: Arc<dyn SettingsStore>,
    ) -> (Self, mpsc::UnboundedReceiver<ExpiredJob>) {
        let (expiry, expired_rx) = ExpiryManager::channel();
        let scheduler = Self {
            jobs: HashMap::new(),
            pending: VecDeque::new(),
            active: None,
            speed: SpeedEstimator::new(config.default_speed_bps, config.min_speed_sample_bytes),
            expiry,
            mover,
            probe,
            settings,
        };
        PENDING_MOVES.set(0);
        (scheduler, expired_rx)
    }

    /// Submits a move. Returns true if the job was queued.
    pub fn submit(
        &mut self,
        key: &str,
        files: Vec<PathBuf>,
        source_path: PathBuf,
        dest_path: PathBuf,
    ) -> bool {
        self.submit_request(SubmitRequest::new(key, files, source_path, dest_path))
            .is_accepted()
    }

    /// Submits a move and reports what happened to it.
    ///
    /// A queued or moving job for the same key is left untouched. A finished
    /// record for the key is discarded first. Identical or empty paths, and
    /// file entries that are absolute or contain `..`, are recorded as an
    /// error and never queued.
    ///
    /// The source size is probed inline; see [`MoveScheduler::submit_sized`]
    /// to probe elsewhere.
    pub fn submit_request(&mut self, request: SubmitRequest) -> SubmitOutcome {
        let total_size = self.probe.total_size(&request.source_files());
        self.submit_sized(request, total_size)
    }

    /// Like [`MoveScheduler::submit_request`] with an already probed size.
    pub fn submit_sized(&mut self, request: SubmitRequest, total_size: u64) -> SubmitOutcome {
        let SubmitRequest {
            key,
            files,
            source_path,
            dest_path,
        } = request;

        if let Some(existing) = self.jobs.get(&key) {
            if !existing.status().is_terminal() {
                debug!("Ignoring move of {}: already {}", key, existing.status());
                MOVES_REJECTED.with_label_values(&["duplicate"]).inc();
                return SubmitOutcome::Duplicate;
            }
            debug!("Discarding finished record of {}", key);
            self.remove_job(&key);
        }

        let validation = if dest_path == source_path {
            Some(MoveError::same_path())
        } else if dest_path.as_os_str().is_empty() {
            Some(MoveError::empty_path())
        } else if let Some(file) = files.iter().find(|file| !is_contained(file)) {
            debug!("Move of {} lists unsafe entry {}", key, file.display());
            Some(MoveError::unsafe_path())
        } else {
            None
        };

        let record = JobRecord::new(key.clone(), files, source_path, dest_path, total_size);
        self.jobs.insert(key.clone(), record);

        if let Some(error) = validation {
            warn!("Rejected move of {}: {}", key, error);
            MOVES_REJECTED.with_label_values(&[error.kind()]).inc();
            self.fail_job(&key, error.clone());
            return SubmitOutcome::Rejected { error };
        }

        self.pending.push_back(key.clone());
        self.sync_pending_gauge();
        MOVES_SUBMITTED.inc();
        debug!("Queued move of {} ({} bytes)", key, total_size);
        SubmitOutcome::Queued
    }

    /// Admits a queued job if none is active, then refreshes the active job's
    /// progress with an inline size probe.
    pub async fn tick(&mut self) {
        self.admit_next().await;
        self.refresh_active();
    }

    /// Pops pending jobs until the mover accepts one or the queue is empty.
    ///
    /// Jobs the mover refuses fail with "General failure" and the next one is
    /// tried right away. Does nothing while a job is active.
    pub async fn admit_next(&mut self) -> Option<JobKey> {
        if self.active.is_some() {
            return None;
        }

        let mover = Arc::clone(&self.mover);
        let mut admitted = None;

        while let Some(key) = self.pending.pop_front() {
            let request = match self.jobs.get(&key) {
                Some(record) if record.status() == JobStatus::Queued => MoveRequest {
                    key: key.clone(),
                    source_path: record.source_path().clone(),
                    dest_path: record.dest_path().clone(),
                    files: record.files().to_vec(),
                },
                _ => continue,
            };

            match mover.start_move(request).await {
                Ok(()) => {
                    if let Some(record) = self.jobs.get_mut(&key) {
                        record.start(Instant::now());
                    }
                    MOVES_STARTED.inc();
                    info!("Started move of {} with {} mover", key, mover.name());
                    self.active = Some(key.clone());
                    admitted = Some(key);
                    break;
                }
                Err(e) => {
                    warn!("Mover refused {}: {}", key, e);
                    MOVES_REJECTED.with_label_values(&["admission"]).inc();
                    self.fail_job(&key, MoveError::general_failure());
                }
            }
        }

        self.sync_pending_gauge();
        admitted
    }

    /// Probes the active job's destination and updates its progress.
    pub fn refresh_active(&mut self) -> bool {
        let Some(target) = self.progress_target() else {
            return false;
        };
        let observed = self.probe.total_size(&target.dest_paths);
        self.apply_progress(&target, observed)
    }

    /// What to probe for the active job, if there is one.
    pub fn progress_target(&self) -> Option<ProgressTarget> {
        let key = self.active.as_ref()?;
        let record = self.jobs.get(key)?;
        if record.status() != JobStatus::Moving {
            return None;
        }
        Some(ProgressTarget {
            key: key.clone(),
            dest_paths: record.progress().dest_paths().to_vec(),
            started_at: record.progress().started_at()?,
        })
    }

    /// Applies a size probed for `target`.
    ///
    /// Discarded unless the same job is still active and moving.
    pub fn apply_progress(&mut self, target: &ProgressTarget, observed: u64) -> bool {
        if self.active.as_deref() != Some(target.key.as_str()) {
            debug!("Discarding stale progress for {}", target.key);
            return false;
        }

        let speed = self.speed.estimate();
        match self.jobs.get_mut(&target.key) {
            Some(record)
                if record.status() == JobStatus::Moving
                    && record.progress().started_at() == Some(target.started_at) =>
            {
                record
                    .progress_mut()
                    .observe(observed, speed, Instant::now());
                record.refresh_message();
                true
            }
            _ => false,
        }
    }

    /// Handles the mover's success event for `key`.
    pub fn on_move_succeeded(&mut self, key: &str) -> bool {
        if self.active.as_deref() == Some(key) {
            self.active = None;
        }

        let now = Instant::now();
        let Some(record) = self.jobs.get_mut(key) else {
            debug!("Ignoring success for unknown job {}", key);
            return false;
        };
        if !record.complete(now) {
            debug!("Ignoring success for {} in status {}", key, record.status());
            return false;
        }

        let elapsed = record.progress().elapsed(now);
        let total_size = record.total_size();
        let source_path = record.source_path().clone();
        let files = record.files().to_vec();

        MOVES_FINISHED.with_label_values(&["done"]).inc();
        MOVE_DURATION
            .with_label_values(&["done"])
            .observe(elapsed.as_secs_f64());
        self.speed.record_transfer(total_size, elapsed);
        info!("Move of {} done in {:.1}s", key, elapsed.as_secs_f64());

        let settings = self.settings.settings();
        if settings.general.remove_empty {
            Self::remove_empty_source(key, source_path, files);
        }

        self.schedule_expiry(key, settings.timeout.success);
        true
    }

    /// Removes the emptied source directories on the blocking pool, off the
    /// caller's lock. Runs inline when no runtime is available.
    fn remove_empty_source(key: &str, source_path: PathBuf, files: Vec<PathBuf>) {
        let key = key.to_string();
        let cleanup = move || {
            let removed = remove_empty_dirs(&source_path, &files);
            debug!("Removed {} empty directories after moving {}", removed, key);
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(cleanup);
            }
            Err(_) => cleanup(),
        }
    }

    /// Handles the mover's failure event for `key`.
    ///
    /// Only the text after the last colon of `message` is kept as the reason.
    pub fn on_move_failed(&mut self, key: &str, message: &str) -> bool {
        if self.active.as_deref() == Some(key) {
            self.active = None;
        }

        let now = Instant::now();
        let Some(record) = self.jobs.get_mut(key) else {
            debug!("Ignoring failure for unknown job {}", key);
            return false;
        };
        if record.status() != JobStatus::Moving {
            debug!("Ignoring failure for {} in status {}", key, record.status());
            return false;
        }

        let error = MoveError::from_mover_message(message);
        warn!("Move of {} failed: {}", key, error);
        record.fail(error, now);
        let elapsed = record.progress().elapsed(now);

        MOVES_FINISHED.with_label_values(&["error"]).inc();
        MOVE_DURATION
            .with_label_values(&["error"])
            .observe(elapsed.as_secs_f64());

        let timeout = self.settings.settings().timeout.error;
        self.schedule_expiry(key, timeout);
        true
    }

    /// Dispatches a mover event.
    pub fn handle_event(&mut self, event: MoverEvent) -> bool {
        match event {
            MoverEvent::Succeeded { key } => self.on_move_succeeded(&key),
            MoverEvent::Failed { key, message } => self.on_move_failed(&key, &message),
        }
    }

    /// Removes the record a fired timer was armed for.
    ///
    /// Stale timers (cancelled or re-armed since) are ignored.
    pub fn expire(&mut self, fired: &ExpiredJob) -> bool {
        if !self.expiry.acknowledge(fired) {
            return false;
        }
        match self.jobs.get(&fired.key) {
            Some(record) if record.status().is_terminal() => {
                self.jobs.remove(&fired.key);
                debug!("Expired record of {}", fired.key);
                true
            }
            _ => false,
        }
    }

    /// Deletes queued jobs outright. Other statuses and unknown keys are
    /// skipped. Returns the removed keys.
    pub fn cancel_pending(&mut self, keys: &[JobKey]) -> Vec<JobKey> {
        let mut removed = Vec::new();
        for key in keys {
            if self.status_token(key) == Some(JobStatus::Queued) {
                self.pending.retain(|pending| pending != key);
                self.remove_job(key);
                debug!("Cancelled queued move of {}", key);
                removed.push(key.clone());
            }
        }
        self.sync_pending_gauge();
        removed
    }

    /// Deletes the finished records among `keys`, cancelling their timers.
    pub fn clear_finished(&mut self, keys: &[JobKey]) -> Vec<JobKey> {
        let mut removed = Vec::new();
        for key in keys {
            if self.status_token(key).is_some_and(|status| status.is_terminal()) {
                self.remove_job(key);
                removed.push(key.clone());
            }
        }
        if !removed.is_empty() {
            debug!("Cleared {} finished record(s)", removed.len());
        }
        removed
    }

    /// Deletes every finished record.
    pub fn clear_all(&mut self) -> Vec<JobKey> {
        let mut finished: Vec<JobKey> = self
            .jobs
            .values()
            .filter(|record| record.status().is_terminal())
            .map(|record| record.key().to_string())
            .collect();
        finished.sort();
        self.clear_finished(&finished)
    }

    pub fn job(&self, key: &str) -> Option<JobSnapshot> {
        self.jobs.get(key).map(JobRecord::snapshot)
    }

    /// All records, oldest first.
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        let mut records: Vec<&JobRecord> = self.jobs.values().collect();
        records.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.key().cmp(b.key()))
        });
        records.into_iter().map(JobRecord::snapshot).collect()
    }

    pub fn status_token(&self, key: &str) -> Option<JobStatus> {
        self.jobs.get(key).map(JobRecord::status)
    }

    /// Status line for `key`, empty when there is no record.
    pub fn message(&self, key: &str) -> String {
        self.jobs
            .get(key)
            .map(|record| record.message().to_string())
            .unwrap_or_default()
    }

    /// Pending keys in admission order.
    pub fn pending(&self) -> Vec<JobKey> {
        self.pending.iter().cloned().collect()
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn speed_estimate(&self) -> f64 {
        self.speed.estimate()
    }

    pub fn is_expiry_armed(&self, key: &str) -> bool {
        self.expiry.is_armed(key)
    }

    pub fn settings(&self) -> MoveSettings {
        self.settings.settings()
    }

    pub fn update_settings(
        &mut self,
        update: &SettingsUpdate,
    ) -> Result<MoveSettings, SettingsError> {
        let settings = self.settings.update(update)?;
        info!("Move settings updated");
        Ok(settings)
    }

    /// Cancels every armed expiry timer. Records are kept.
    pub fn shutdown(&mut self) {
        let armed = self.expiry.armed_count();
        self.expiry.cancel_all();
        debug!("Cancelled {} expiry timer(s)", armed);
    }

    fn fail_job(&mut self, key: &str, error: MoveError) {
        if let Some(record) = self.jobs.get_mut(key) {
            record.fail(error, Instant::now());
        }
        let timeout = self.settings.settings().timeout.error;
        self.schedule_expiry(key, timeout);
    }

    fn schedule_expiry(&mut self, key: &str, delay_secs: f64) {
        if self.expiry.schedule(key, delay_secs) == ExpiryDecision::Immediate {
            debug!("Removing record of {} immediately", key);
            self.jobs.remove(key);
        }
    }

    fn remove_job(&mut self, key: &str) -> Option<JobRecord> {
        self.expiry.cancel(key);
        self.jobs.remove(key)
    }

    fn sync_pending_gauge(&self) {
        PENDING_MOVES.set(self.pending.len() as i64);
    }
}

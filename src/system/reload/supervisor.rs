//! Database reload supervisor
//!
//! Watches the directory holding the database file, checks the content
//! fingerprint on change and atomically publishes a freshly opened handle.
//! Every failure leaves the published handle untouched.
//!
//! Retired handles are reference counted: each lookup owns an
//! `Arc<DatabaseHandle>` for the duration of its query, so the old mapping is
//! released when the last in-flight lookup drops it.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use notify::event::{AccessKind, AccessMode, EventKind, ModifyKind, RenameMode};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::types::{
    ReloadEvent, ReloadOutcome, ReloadResult, ReloadStatus, ReloadTrigger, SupervisorState,
};
use crate::config::LoadMode;
use crate::errors::{Ip2LocError, Result};
use crate::services::geoip::{ActiveHandleSlot, DatabaseHandle, Fingerprint};

pub struct ReloadSupervisor {
    slot: Arc<ActiveHandleSlot>,
    path: PathBuf,
    load_mode: LoadMode,
    status: RwLock<ReloadStatus>,
    event_sender: broadcast::Sender<ReloadEvent>,
    // Serializes watch-triggered and manual reloads
    reload_lock: Mutex<()>,
}

impl ReloadSupervisor {
    pub fn new(slot: Arc<ActiveHandleSlot>, path: impl Into<PathBuf>, load_mode: LoadMode) -> Self {
        let (sender, _) = broadcast::channel(32);
        let current = slot.load();
        let status = ReloadStatus {
            state: SupervisorState::Watching,
            generation: slot.generation(),
            fingerprint: current.fingerprint(),
            database_type: current.database_type().to_string(),
            last_result: None,
            reload_count: 0,
            failure_count: 0,
        };
        Self {
            slot,
            path: path.into(),
            load_mode,
            status: RwLock::new(status),
            event_sender: sender,
            reload_lock: Mutex::new(()),
        }
    }

    pub fn slot(&self) -> &Arc<ActiveHandleSlot> {
        &self.slot
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> ReloadStatus {
        self.status.read().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.event_sender.subscribe()
    }

    fn set_state(&self, state: SupervisorState) {
        self.status.write().state = state;
        let _ = self.event_sender.send(ReloadEvent::StateChanged(state));
    }

    /// Validate the file and swap if its content changed
    pub async fn check_and_reload(&self) -> ReloadOutcome {
        self.reload_with(ReloadTrigger::Manual).await
    }

    async fn reload_with(&self, trigger: ReloadTrigger) -> ReloadOutcome {
        let _guard = self.reload_lock.lock().await;
        let started_at = Utc::now();

        let outcome = match self.validate_and_swap().await {
            Ok(outcome) => outcome,
            Err(e) => ReloadOutcome::Failed {
                error: e.to_string(),
            },
        };

        match &outcome {
            ReloadOutcome::Unchanged { fingerprint } => {
                debug!(
                    "Database {} unchanged ({}), keeping current handle",
                    self.path.display(),
                    fingerprint
                );
            }
            ReloadOutcome::Reloaded {
                previous,
                current,
                generation,
                retired_in_use,
            } => {
                info!(
                    "Database reloaded: {} -> {} (generation {}, trigger: {})",
                    previous, current, generation, trigger
                );
                if *retired_in_use {
                    debug!("Retired handle {} still in use, release deferred", previous);
                } else {
                    debug!("Retired handle {} released", previous);
                }
            }
            ReloadOutcome::Failed { error } => {
                warn!(
                    "Database reload of {} failed, keeping current handle: {}",
                    self.path.display(),
                    error
                );
            }
        }

        let result = ReloadResult::new(trigger, outcome.clone(), started_at);
        {
            let mut status = self.status.write();
            match &outcome {
                ReloadOutcome::Reloaded {
                    current,
                    generation,
                    ..
                } => {
                    status.reload_count += 1;
                    status.generation = *generation;
                    status.fingerprint = *current;
                    status.database_type = self.slot.load().database_type().to_string();
                }
                ReloadOutcome::Failed { .. } => status.failure_count += 1,
                ReloadOutcome::Unchanged { .. } => {}
            }
            status.last_result = Some(result.clone());
        }
        if outcome.is_failed() {
            self.set_state(SupervisorState::Failed);
        }
        let _ = self.event_sender.send(ReloadEvent::Finished(result));
        self.set_state(SupervisorState::Watching);

        outcome
    }

    async fn validate_and_swap(&self) -> Result<ReloadOutcome> {
        self.set_state(SupervisorState::Validating);
        let current = self.slot.load();

        let path = self.path.clone();
        let fingerprint = run_blocking(move || Fingerprint::of_file(&path)).await?;
        if fingerprint == current.fingerprint() {
            return Ok(ReloadOutcome::Unchanged { fingerprint });
        }

        self.set_state(SupervisorState::Swapping);
        let path = self.path.clone();
        let load_mode = self.load_mode;
        let handle = run_blocking(move || DatabaseHandle::open(&path, load_mode)).await?;

        // The file may have been rewritten back between the two reads
        if handle.fingerprint() == current.fingerprint() {
            return Ok(ReloadOutcome::Unchanged {
                fingerprint: handle.fingerprint(),
            });
        }

        if !handle.kind().supports_location_isp() {
            return Err(Ip2LocError::invalid_method(format!(
                "refusing to swap to a {} database, it cannot serve location + ISP lookups",
                handle.database_type()
            )));
        }

        let new_fingerprint = handle.fingerprint();
        drop(current);
        let previous = self.slot.publish(Arc::new(handle));
        let generation = self.slot.generation();
        let retired_in_use = Arc::strong_count(&previous) > 1;
        let previous_fingerprint = previous.fingerprint();
        drop(previous);

        Ok(ReloadOutcome::Reloaded {
            previous: previous_fingerprint,
            current: new_fingerprint,
            generation,
            retired_in_use,
        })
    }

    /// Start watching the database directory
    ///
    /// Failure to create the watcher or watch the directory is returned to the
    /// caller; everything after that is logged and absorbed by the loop.
    pub fn spawn(self: Arc<Self>, debounce: Duration) -> Result<SupervisorHandle> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| {
                Ip2LocError::config(format!(
                    "database path {} has no file name",
                    self.path.display()
                ))
            })?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = event_tx.send(res);
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        info!(
            "Watching {} for changes to {:?} (debounce: {:?})",
            dir.display(),
            file_name,
            debounce
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let supervisor = Arc::clone(&self);
        let task = tokio::spawn(async move {
            supervisor
                .run(watcher, event_rx, shutdown_rx, file_name, debounce)
                .await;
        });

        Ok(SupervisorHandle {
            supervisor: self,
            shutdown_tx,
            task,
        })
    }

    async fn run(
        &self,
        watcher: RecommendedWatcher,
        mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
        mut shutdown: watch::Receiver<bool>,
        file_name: OsString,
        debounce: Duration,
    ) {
        let mut deadline: Option<Instant> = None;

        loop {
            let quiet = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = shutdown.changed() => break,
                received = events.recv() => match received {
                    Some(Ok(event)) => {
                        if !is_relevant(&event, &file_name) {
                            continue;
                        }
                        debug!("Database change detected: {:?}", event.kind);
                        self.set_state(SupervisorState::ChangeDetected);
                        if debounce.is_zero() {
                            self.reload_with(ReloadTrigger::Watch).await;
                        } else {
                            deadline = Some(Instant::now() + debounce);
                        }
                    }
                    Some(Err(e)) => warn!("File watch error: {}", e),
                    None => {
                        error!("File watcher channel closed, stopping reload supervisor");
                        break;
                    }
                },
                _ = quiet => {
                    deadline = None;
                    self.reload_with(ReloadTrigger::Watch).await;
                }
            }
        }

        drop(watcher);
        self.set_state(SupervisorState::Stopped);
        info!("Reload supervisor stopped");
    }
}

/// Only create / data-write events for the database file itself count
fn is_relevant(event: &Event, file_name: &OsStr) -> bool {
    let matches = |path: &PathBuf| path.file_name() == Some(file_name);
    match event.kind {
        EventKind::Create(_)
        | EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any)
        | EventKind::Access(AccessKind::Close(AccessMode::Write))
        | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.iter().any(matches),
        // 不区分方向的 rename（FSEvents 等），文件仍在原处才算移入
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            event.paths.iter().any(|path| matches(path) && path.exists())
        }
        // paths = [from, to]
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().is_some_and(matches)
        }
        _ => false,
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Ip2LocError::file_operation(format!("blocking task failed: {}", e)))?
}

/// Running supervisor task
pub struct SupervisorHandle {
    supervisor: Arc<ReloadSupervisor>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SupervisorHandle {
    pub fn supervisor(&self) -> &Arc<ReloadSupervisor> {
        &self.supervisor
    }

    pub fn status(&self) -> ReloadStatus {
        self.supervisor.status()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.supervisor.subscribe()
    }

    /// Stop the watch loop and wait for it to exit
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        self.task
            .await
            .map_err(|e| Ip2LocError::watch(format!("reload supervisor task failed: {}", e)))
    }
}

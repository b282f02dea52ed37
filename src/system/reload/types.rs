//! Reload type definitions
//!
//! - `SupervisorState`: where the supervisor loop currently is
//! - `ReloadTrigger`: what started a reload check
//! - `ReloadOutcome` / `ReloadResult`: result of one check
//! - `ReloadEvent`: broadcast to subscribers
//! - `ReloadStatus`: snapshot for the health endpoint

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::services::geoip::Fingerprint;

/// Supervisor loop state
///
/// `Watching -> ChangeDetected -> Validating -> Swapping -> Watching`, with
/// `Failed` returning to `Watching` without touching the published handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    #[default]
    Watching,
    ChangeDetected,
    Validating,
    Swapping,
    Failed,
    Stopped,
}

impl std::fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SupervisorState::Watching => "watching",
            SupervisorState::ChangeDetected => "change_detected",
            SupervisorState::Validating => "validating",
            SupervisorState::Swapping => "swapping",
            SupervisorState::Failed => "failed",
            SupervisorState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadTrigger {
    /// Filesystem change notification
    Watch,
    /// `ReloadSupervisor::check_and_reload`
    Manual,
}

impl std::fmt::Display for ReloadTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReloadTrigger::Watch => write!(f, "watch"),
            ReloadTrigger::Manual => write!(f, "manual"),
        }
    }
}

/// Outcome of one validate-and-swap pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReloadOutcome {
    /// File content matches the published handle
    Unchanged { fingerprint: Fingerprint },
    /// A new handle was published
    Reloaded {
        previous: Fingerprint,
        current: Fingerprint,
        generation: u64,
        /// The retired handle was still held by in-flight lookups
        retired_in_use: bool,
    },
    /// Nothing was published; the previous handle stays active
    Failed { error: String },
}

impl ReloadOutcome {
    pub fn is_reloaded(&self) -> bool {
        matches!(self, ReloadOutcome::Reloaded { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ReloadOutcome::Failed { .. })
    }
}

/// Result of a reload check
#[derive(Debug, Clone, Serialize)]
pub struct ReloadResult {
    pub trigger: ReloadTrigger,
    pub outcome: ReloadOutcome,
    /// When the check started
    pub started_at: DateTime<Utc>,
    /// When the check finished
    pub finished_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ReloadResult {
    pub fn new(trigger: ReloadTrigger, outcome: ReloadOutcome, started_at: DateTime<Utc>) -> Self {
        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;
        Self {
            trigger,
            outcome,
            started_at,
            finished_at,
            duration_ms,
        }
    }
}

/// Events emitted by the supervisor
#[derive(Debug, Clone)]
pub enum ReloadEvent {
    StateChanged(SupervisorState),
    Finished(ReloadResult),
}

/// Current status of the reload system
#[derive(Debug, Clone, Serialize)]
pub struct ReloadStatus {
    pub state: SupervisorState,
    /// Generation of the published handle (1 = initial)
    pub generation: u64,
    pub fingerprint: Fingerprint,
    pub database_type: String,
    pub last_result: Option<ReloadResult>,
    pub reload_count: u64,
    pub failure_count: u64,
}

//! Database hot reload
//!
//! - `ReloadSupervisor`: watches the database file and swaps the active handle
//! - `SupervisorHandle`: running watch task, used for shutdown
//! - `ReloadEvent` / `ReloadStatus`: observability for tests and `/health`
//!
//! # Usage
//!
//! ```ignore
//! let supervisor = Arc::new(ReloadSupervisor::new(slot, path, LoadMode::Memory));
//! let handle = supervisor.spawn(Duration::from_millis(200))?;
//! // ...
//! handle.shutdown().await?;
//! ```

mod supervisor;
mod types;

pub use supervisor::{ReloadSupervisor, SupervisorHandle};
pub use types::{
    ReloadEvent, ReloadOutcome, ReloadResult, ReloadStatus, ReloadTrigger, SupervisorState,
};

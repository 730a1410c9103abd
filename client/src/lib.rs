//! Quotesync client - keeps a local quote collection in step with a remote feed.
//!
//! The pure merge logic lives in `quotesync-engine`. This crate supplies the
//! IO around it: file persistence, an HTTP fetcher, the orchestrator that
//! sequences a sync run, and a timer that drives it.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod notifier;
pub mod orchestrator;
pub mod scheduler;
pub mod storage;
pub mod transport;

pub use config::{Config, ConfigError};
pub use error::{Result, SyncError};
pub use fetcher::{map_remote, PushOutcome, RemoteFetcher};
pub use notifier::{ChannelNotifier, LogNotifier, Notifier, SyncEvent, SyncOutcome};
pub use orchestrator::{now_millis, SyncOrchestrator, SyncState, SyncTarget};
pub use scheduler::{SchedulerHandle, SyncScheduler};
pub use storage::FileStorage;
pub use transport::{HttpTransport, Transport};

//! # sync-engine
//!
//! The vidsync synchronization engine: keeps locally stored playlists and
//! their member videos in step with a quota-limited remote video platform.
//!
//! # Architecture
//!
//! ```text
//! Scheduler / manual trigger
//!         ↓
//!   SyncOrchestrator ──→ ReconciliationEngine (sync-core, pure)
//!         ↓                        ↓
//!   TokenManager → RetryExecutor   PersistenceGateway (external)
//!         ↓                        ↓
//!   SharedQuota → ResponseCache → RemoteGateway (external)
//! ```
//!
//! The engine owns the economics of synchronization: every remote read goes
//! through the response cache, a quota reservation gates every call that
//! misses, transient failures are retried with exponential backoff, and
//! token refresh is single-flight so concurrent runs never stampede the
//! authorization endpoint. The diff itself is pure and lives in
//! `sync-core`; persistence and the remote wire protocol are behind traits
//! so the engine can be exercised entirely against in-memory fakes.
//!
//! # Example
//!
//! ```ignore
//! use vidsync_engine::{EngineConfig, MemoryStore, MockAuthProvider, MockRemoteGateway, SyncService};
//!
//! let service = SyncService::new(
//!     EngineConfig::default(),
//!     Arc::new(MockRemoteGateway::new()),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MockAuthProvider::new()),
//! );
//! service.tokens().initialize(credentials).await;
//! let record = service.trigger_sync(&playlist_id).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod cache;
mod clock;
pub mod cleanup;
pub mod config;
pub mod orchestrator;
pub mod persist;
pub mod quota;
pub mod remote;
pub mod retry;
pub mod scheduler;
pub mod service;

pub use auth::{AuthProvider, Credentials, MockAuthProvider, TokenManager};
pub use cache::{CacheStats, CachedPayload, Fingerprint, ResponseCache};
pub use cleanup::spawn_cache_purge_task;
pub use config::{
    CacheConfig, ConfigError, EngineConfig, QuotaConfig, RemoteConfig, RetryConfig,
    SchedulerConfig, TokenConfig,
};
pub use orchestrator::SyncOrchestrator;
pub use persist::{
    MemoryStore, NewItem, PersistError, PersistenceGateway, PlaylistUpdate,
};
pub use quota::SharedQuota;
pub use remote::{MockRemoteGateway, RemoteGateway, RemoteItem, RemoteItemsPage, RemotePlaylist};
pub use retry::RetryExecutor;
pub use scheduler::spawn_scheduler;
pub use service::{PlaylistStatus, SyncService};

//! Data layer (Dragonfly hot cache + `PostgreSQL` cold store) for the turn
//! orchestration core.
//!
//! `Dragonfly` mirrors the state an in-flight session needs on every phase
//! without a `PostgreSQL` round trip. `PostgreSQL` is the durable store and
//! the one this crate's port implementations are built against: a session's
//! checkpoints, its three channels' message logs, its temporal memory
//! graph, its worker-pool job registry, and its append-only event log.
//!
//! # Modules
//!
//! - [`postgres`] -- connection pool and configuration, plus migrations.
//! - [`dragonfly`] -- hot-path cache operations.
//! - [`checkpoint_store`] -- [`lf_core::checkpoint::CheckpointStore`] impl.
//! - [`channel_store`] -- [`lf_router::ChannelLog`] impl.
//! - [`memory_store`] -- [`lf_memory::MemoryStorage`] impl.
//! - [`worker_registry`] -- durable worker-job records.
//! - [`event_store`] -- [`lf_events::EventStore`] impl.
//! - [`error`] -- shared error types.

pub mod channel_store;
pub mod checkpoint_store;
pub mod dragonfly;
pub mod error;
pub mod event_store;
pub mod memory_store;
pub mod postgres;
pub mod worker_registry;

pub use channel_store::PostgresChannelLog;
pub use checkpoint_store::PostgresCheckpointStore;
pub use dragonfly::DragonflyPool;
pub use error::DbError;
pub use event_store::PostgresEventStore;
pub use memory_store::PostgresMemoryStorage;
pub use postgres::{PostgresConfig, PostgresPool};
pub use worker_registry::{WorkerJobRow, WorkerRegistry};

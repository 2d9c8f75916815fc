//! Distributed command-history store.
//!
//! Records every command/response pair a machine or user produces, fans
//! writes out across per-scope partitions, caches command results with
//! running-average timing, and serves point, merged, and aggregated reads.
//!
//! The entry point is [`HistoryClient`]: connect it with a [`StoreConfig`],
//! optionally resolve a user, then save and query history. All storage I/O is
//! async over a libSQL connection (remote, embedded replica, or local file).

mod cache;
mod client;
mod config;
mod db;
mod directory;
mod error;
mod identity;
mod read;
mod schema;
mod session;
mod stats;
mod write;

pub use client::HistoryClient;
pub use config::StoreConfig;
pub use db::Database;
pub use error::StoreError;
pub use identity::MachineIdentity;
pub use read::HYBRID_WINDOW_SECS;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

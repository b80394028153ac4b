//! `PostgreSQL` persistence mirror for the Arbiter engine.
//!
//! The engine's in-memory state is authoritative; this crate maintains a
//! lagging, best-effort durable copy by consuming the game master's
//! mirror-op stream. Failed writes are logged and skipped, never rolled
//! back into memory.
//!
//! # Modules
//!
//! - [`postgres`] -- Connection pool configuration and migrations.
//! - [`store`] -- The four-operation persistence interface.
//! - [`mirror`] -- The writer task consuming mirror ops.
//! - [`error`] -- [`DbError`].
//!
//! [`DbError`]: error::DbError

pub mod error;
pub mod mirror;
pub mod postgres;
pub mod store;

pub use error::DbError;
pub use mirror::run_mirror;
pub use postgres::{PostgresConfig, PostgresPool};
pub use store::ActorStore;

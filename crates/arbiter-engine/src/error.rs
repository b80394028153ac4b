//! Error types for the Arbiter engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: arbiter_core::ConfigError,
    },

    /// Rulebook loading failed.
    #[error("rules error: {source}")]
    Rules {
        /// The underlying rulebook error.
        #[from]
        source: arbiter_types::RulesError,
    },

    /// Database connection or migration failed.
    #[error("database error: {source}")]
    Db {
        /// The underlying database error.
        #[from]
        source: arbiter_db::DbError,
    },
}

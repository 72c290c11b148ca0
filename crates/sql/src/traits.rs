//! # Executor traits
//!
//! Traits implemented by statement executors and the backends that create
//! them.

use std::fmt::Debug;

use anyhow::Result;

use crate::types::Row;

/// Executors submit finished statement text to a backing store.
///
/// Failures are reported as `Err`, never as an empty result, so callers can
/// tell "zero rows" apart from "the store rejected the statement".
pub trait Executor: Debug + Send + Sync + 'static {
    /// Execute a statement that returns rows (`SELECT`, or a write with a
    /// `RETURNING` clause).
    ///
    /// # Errors
    ///
    /// Returns an error when the statement cannot be prepared or executed.
    fn query(&self, sql: &str) -> Result<Vec<Row>>;

    /// Execute one or more `;`-separated statements that do not return rows.
    ///
    /// # Errors
    ///
    /// Returns an error when any statement in the batch fails. Statements
    /// that ran before the failing one are not rolled back.
    fn execute(&self, sql: &str) -> Result<()>;
}

/// Implemented by backends to allow them to be connected from configuration.
pub trait Backend: Sized + Sync + Send {
    /// The options used to connect to the backend.
    type ConnectOptions: FromEnv;

    /// Connect using options read from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the options cannot be loaded or the connection
    /// fails.
    fn connect() -> Result<Self> {
        Self::connect_with(Self::ConnectOptions::from_env()?)
    }

    /// Connect to the backend with the specified options.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    fn connect_with(options: Self::ConnectOptions) -> Result<Self>;
}

/// Trait for creating options from environment variables.
pub trait FromEnv: Sized {
    /// Create options from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    fn from_env() -> Result<Self>;
}

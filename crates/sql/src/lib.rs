//! # Tessera SQL
//!
//! Statement execution for the Tessera ORM. The ORM renders finished statement
//! text; this crate submits it to a backing store and hands rows back as
//! generic [`Row`] records.
//!
//! A lightweight `SQLite` backend ([`SqliteExecutor`]) is provided for
//! development and testing. Other stores plug in by implementing [`Executor`].

#![forbid(unsafe_code)]

mod sqlite;
mod traits;
mod types;

pub use crate::sqlite::{ConnectOptions, SqliteExecutor};
pub use crate::traits::{Backend, Executor, FromEnv};
pub use crate::types::{DataType, Field, Row};

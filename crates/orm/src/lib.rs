//! Tessera ORM: typed entities over a relational store.
//!
//! Entities are declared with [`entity!`], which generates the struct, its
//! static [`Schema`] and the [`Entity`] implementation. A [`Session`] carries
//! the statement executor and configuration and provides every operation:
//! predicate queries with association-aware subqueries, recursive graph
//! saves, loads and deletes.
//!
//! # Quick Start
//!
//! ## Define Entities
//!
//! ```ignore
//! use tessera_orm::{Lifecycle, ValidationErrors, entity};
//!
//! entity! {
//!     table = "authors",
//!     #[derive(Debug, Default)]
//!     pub struct Author {
//!         pub name: String,
//!         pub age: i32,
//!     }
//!     relations {
//!         has_many posts: Post => "author_id",
//!     }
//! }
//!
//! impl Lifecycle for Author {
//!     fn validate(&self, errors: &mut ValidationErrors) {
//!         if self.name.is_empty() {
//!             errors.add("name", "must not be empty");
//!         }
//!     }
//! }
//!
//! entity! {
//!     table = "posts",
//!     #[derive(Debug, Default)]
//!     pub struct Post {
//!         pub title: String,
//!     }
//!     relations {
//!         belongs_to author: Author => "author_id",
//!     }
//! }
//!
//! impl Lifecycle for Post {}
//! ```
//!
//! ## Save, Query, Load
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use tessera_orm::{Backend, Predicates, Record, Refinement, Direction, Session, SqliteExecutor};
//!
//! let session = Session::new(Arc::new(SqliteExecutor::connect()?));
//!
//! // saves the author, then each post, then points each post at the author
//! let author = Record::new(Author { name: "Ann".into(), age: 41, ..Author::default() });
//! author.lock().posts.push(Record::new(Post { title: "Hello".into(), ..Post::default() }));
//! session.save(&author)?;
//!
//! // modifiers follow the field name
//! let predicates = Predicates::new().value("name starts_with", "A").list("age between", [30, 50]);
//! let refinement = Refinement::new().order_by("age", Direction::Descending).limit(10);
//! let authors = session.find_all::<Author>(&predicates, &refinement)?;
//!
//! // entity values match through the association targeting their type
//! let posts = session.find_all::<Post>(&Predicates::new().related("author", &author), &Refinement::new())?;
//! ```

#![forbid(unsafe_code)]

mod delete;
mod entity;
mod error;
mod insert;
mod load;
mod persist;
mod predicate;
mod query;
mod record;
mod refine;
mod schema;
mod select;
mod session;
mod translate;
mod update;
mod visit;
mod worker;

pub use delete::DeleteBuilder;
pub use entity::{Entity, FetchValue, FieldType, Lifecycle};
pub use error::{Error, Result, ValidationErrors};
pub use insert::InsertBuilder;
pub use persist::Batch;
pub use predicate::{Criterion, Modifier, Predicates, resolve};
pub use query::{Dialect, literal};
pub use record::{Model, Node, Record, Related, Relation};
pub use refine::{Direction, OrderBy, Refinement};
pub use schema::{Association, AssociationKind, Column, LinkTable, Schema, StorageKind};
pub use select::SelectBuilder;
pub use session::{Session, SessionBuilder, SessionOptions};
// Re-export the executor layer so applications need a single dependency.
pub use tessera_sql::{
    Backend, ConnectOptions, DataType, Executor, Field, FromEnv, Row, SqliteExecutor,
};
pub use translate::translate;
pub use update::UpdateBuilder;
pub use visit::Visited;
pub use worker::{FutureResult, submit};

// Re-exports for ``entity`` macro use only.
#[doc(hidden)]
pub mod __private {
    pub use anyhow;
    pub use sea_query::Value;
}

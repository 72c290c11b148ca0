//! Asynchronous variants of the session operations.
//!
//! Each runs the synchronous operation on tokio's blocking pool, so the
//! per-instance locks are held by a blocking thread rather than across an
//! await point. A runtime must be available when the future is polled.

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::predicate::Predicates;
use crate::record::Record;
use crate::refine::Refinement;
use crate::session::Session;

/// Boxed future resolving to an operation's result.
pub type FutureResult<T> = BoxFuture<'static, Result<T>>;

/// Run `operation` on the blocking pool.
pub fn submit<T, F>(operation: F) -> FutureResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    async move {
        tokio::task::spawn_blocking(operation)
            .await
            .map_err(|e| Error::Execution(anyhow::Error::new(e).context("worker task failed")))?
    }
    .boxed()
}

impl Session {
    /// [`Session::save`] on the blocking pool.
    pub fn save_async<E: Entity>(&self, record: Record<E>) -> FutureResult<()> {
        let session = self.clone();
        submit(move || session.save(&record))
    }

    /// [`Session::destroy`] on the blocking pool.
    pub fn destroy_async<E: Entity>(&self, record: Record<E>) -> FutureResult<()> {
        let session = self.clone();
        submit(move || session.destroy(&record))
    }

    /// [`Session::refresh`] on the blocking pool.
    pub fn refresh_async<E: Entity>(&self, record: Record<E>) -> FutureResult<()> {
        let session = self.clone();
        submit(move || session.refresh(&record))
    }

    /// [`Session::find_all`] on the blocking pool.
    pub fn find_all_async<E: Entity>(
        &self, predicates: Predicates, refinement: Refinement,
    ) -> FutureResult<Vec<Record<E>>> {
        let session = self.clone();
        submit(move || session.find_all(&predicates, &refinement))
    }

    /// [`Session::find_one`] on the blocking pool.
    pub fn find_one_async<E: Entity>(
        &self, predicates: Predicates, refinement: Refinement,
    ) -> FutureResult<Option<Record<E>>> {
        let session = self.clone();
        submit(move || session.find_one(&predicates, &refinement))
    }

    /// [`Session::all`] on the blocking pool.
    pub fn all_async<E: Entity>(&self) -> FutureResult<Vec<Record<E>>> {
        let session = self.clone();
        submit(move || session.all())
    }
}

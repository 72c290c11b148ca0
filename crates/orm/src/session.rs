//! Session: the store handle, configuration and read operations.

use std::sync::Arc;

use anyhow::Context;
use fromenv::FromEnv;
use tracing::instrument;

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::load;
use crate::predicate::Predicates;
use crate::record::Record;
use crate::refine::Refinement;
use crate::select::SelectBuilder;
use crate::translate::translate;
use crate::visit::Visited;
use crate::{Executor, Row};

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Database qualifier prefixed to every table name.
    pub database: String,
    /// Recursion budget for saves. `0` saves nothing.
    pub max_save_depth: u32,
    /// Recursion budget for loads. `0` maps scalar fields without resolving
    /// associations, for finders, saves and explicit loads alike.
    pub max_load_depth: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            database: "main".to_string(),
            max_save_depth: 3,
            max_load_depth: 3,
        }
    }
}

#[derive(Debug, Clone, FromEnv)]
pub struct EnvOptions {
    #[env(from = "ORM_DATABASE", default = "main")]
    database: String,
    #[env(from = "ORM_MAX_SAVE_DEPTH", default = "3")]
    max_save_depth: String,
    #[env(from = "ORM_MAX_LOAD_DEPTH", default = "3")]
    max_load_depth: String,
}

impl tessera_sql::FromEnv for SessionOptions {
    fn from_env() -> anyhow::Result<Self> {
        let env = EnvOptions::from_env().finalize().context("issue loading session options")?;
        Ok(Self {
            database: env.database,
            max_save_depth: env.max_save_depth.parse().context("invalid ORM_MAX_SAVE_DEPTH")?,
            max_load_depth: env.max_load_depth.parse().context("invalid ORM_MAX_LOAD_DEPTH")?,
        })
    }
}

/// Builder for [`Session`].
#[derive(Debug, Default)]
pub struct SessionBuilder {
    executor: Option<Arc<dyn Executor>>,
    options: SessionOptions,
}

impl SessionBuilder {
    /// Set the statement executor.
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Replace all options.
    #[must_use]
    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the database qualifier.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.options.database = database.into();
        self
    }

    /// Set the save recursion budget.
    #[must_use]
    pub const fn max_save_depth(mut self, depth: u32) -> Self {
        self.options.max_save_depth = depth;
        self
    }

    /// Set the load recursion budget.
    #[must_use]
    pub const fn max_load_depth(mut self, depth: u32) -> Self {
        self.options.max_load_depth = depth;
        self
    }

    /// Build the session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSet`] when no executor was provided.
    pub fn build(self) -> Result<Session> {
        let executor = self.executor.ok_or(Error::NotSet("executor"))?;
        Ok(Session {
            executor,
            options: Arc::new(self.options),
        })
    }
}

/// Entry point for every ORM operation.
///
/// Cheap to clone; clones share the executor and options. Sessions hold no
/// per-call state, so one session may serve many threads.
#[derive(Clone, Debug)]
pub struct Session {
    executor: Arc<dyn Executor>,
    options: Arc<SessionOptions>,
}

impl Session {
    /// Start building a session.
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// A session with default options over `executor`.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            options: Arc::new(SessionOptions::default()),
        }
    }

    /// Session options.
    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub(crate) fn database(&self) -> &str {
        &self.options.database
    }

    pub(crate) fn query(&self, sql: &str) -> Result<Vec<Row>> {
        self.executor.query(sql).map_err(Error::Execution)
    }

    pub(crate) fn execute(&self, sql: &str) -> Result<()> {
        self.executor.execute(sql).map_err(Error::Execution)
    }

    /// Translate a query over `E` without running it.
    ///
    /// # Errors
    ///
    /// See [`translate`](crate::translate()).
    pub fn translate<E: Entity>(
        &self, predicates: &Predicates, refinement: &Refinement,
    ) -> Result<Option<String>> {
        translate::<E>(self.database(), predicates, refinement)
    }

    /// Every entity matching `predicates`, loaded to the session's load
    /// depth. An empty predicate map matches nothing.
    ///
    /// # Errors
    ///
    /// Returns translation errors before anything runs, or
    /// [`Error::Execution`] / [`Error::Mapping`] while loading.
    #[instrument(level = "debug", skip_all, fields(entity = E::NAME))]
    pub fn find_all<E: Entity>(
        &self, predicates: &Predicates, refinement: &Refinement,
    ) -> Result<Vec<Record<E>>> {
        let Some(sql) = self.translate::<E>(predicates, refinement)? else {
            return Ok(Vec::new());
        };
        self.materialize(&sql)
    }

    /// The first entity matching `predicates`.
    ///
    /// # Errors
    ///
    /// As for [`Session::find_all`].
    pub fn find_one<E: Entity>(
        &self, predicates: &Predicates, refinement: &Refinement,
    ) -> Result<Option<Record<E>>> {
        let refinement = refinement.clone().limit(1);
        Ok(self.find_all(predicates, &refinement)?.into_iter().next())
    }

    /// Whether [`Session::find_one`] yields an entity.
    ///
    /// # Errors
    ///
    /// As for [`Session::find_all`], including [`Error::Mapping`] when the
    /// matching row cannot be materialized.
    pub fn exists<E: Entity>(
        &self, predicates: &Predicates, refinement: &Refinement,
    ) -> Result<bool> {
        Ok(self.find_one::<E>(predicates, refinement)?.is_some())
    }

    /// Every entity of type `E`, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`] or [`Error::Mapping`].
    #[instrument(level = "debug", skip_all, fields(entity = E::NAME))]
    pub fn all<E: Entity>(&self) -> Result<Vec<Record<E>>> {
        let sql = SelectBuilder::new(self.database(), E::TABLE)
            .order_by("id", sea_query::Order::Asc)
            .build();
        self.materialize(&sql)
    }

    /// Polling finders are not provided; use [`Session::find_all`] in a loop.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::Unsupported`].
    pub fn find_all_poll<E: Entity>(
        &self, _predicates: &Predicates, _refinement: &Refinement,
    ) -> Result<Vec<Record<E>>> {
        Err(Error::Unsupported("find_all_poll"))
    }

    /// Polling finders are not provided; use [`Session::find_one`] in a loop.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::Unsupported`].
    pub fn find_one_poll<E: Entity>(
        &self, _predicates: &Predicates, _refinement: &Refinement,
    ) -> Result<Option<Record<E>>> {
        Err(Error::Unsupported("find_one_poll"))
    }

    fn materialize<E: Entity>(&self, sql: &str) -> Result<Vec<Record<E>>> {
        let rows = self.query(sql)?;
        tracing::debug!(entity = E::NAME, rows = rows.len(), "materializing rows");

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let record = Record::<E>::default();
            {
                let mut entity = record.lock();
                let mut visited = Visited::new();
                load::hydrate(self, &mut *entity, row, self.options.max_load_depth, &mut visited)?;
            }
            records.push(record);
        }
        Ok(records)
    }
}

//! Save and destroy: write entity graphs to the store.

use std::fmt;

use anyhow::anyhow;
use tracing::instrument;

use crate::delete::DeleteBuilder;
use crate::entity::{Entity, row_key};
use crate::error::{Error, Result, ValidationErrors};
use crate::insert::InsertBuilder;
use crate::load::load_model;
use crate::record::{Node, Record};
use crate::schema::{Association, AssociationKind, Schema};
use crate::session::Session;
use crate::update::UpdateBuilder;
use crate::visit::Visited;

/// Statements collected while walking a graph, executed together once the
/// walk completes. Inserts are not batched: they run immediately so the new
/// key is known to the statements that follow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch(Vec<String>);

impl Batch {
    /// Append a statement.
    pub fn push(&mut self, statement: String) {
        self.0.push(statement);
    }

    /// Append every statement of `other`.
    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Whether there is nothing to execute.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Statements in execution order.
    #[must_use]
    pub fn statements(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

impl Session {
    /// Validate and save `record` with every reachable related entity, to the
    /// session's save depth, then reload it.
    ///
    /// The reload replaces the members of every association with freshly
    /// loaded records. Member handles held elsewhere keep pointing at the old
    /// instances, which are no longer reachable from `record`: edit members
    /// through `record` after a save.
    ///
    /// Each entity of the graph is locked only while its own row is written,
    /// so concurrent saves of graphs that reference each other do not block
    /// on one another. Saves of the same record run one at a time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] before anything is written, or
    /// [`Error::Execution`] when a statement fails. Statements already run
    /// are not rolled back.
    #[instrument(level = "debug", skip_all, fields(entity = E::NAME))]
    pub fn save<E: Entity>(&self, record: &Record<E>) -> Result<()> {
        let _operation = record.operation();

        {
            let mut entity = record.lock();
            let mut errors = ValidationErrors::default();
            entity.validate(&mut errors);
            if !errors.is_empty() {
                return Err(Error::Validation {
                    entity: E::NAME,
                    errors,
                });
            }
            entity.before_save();
        }

        let mut visited = Visited::new();
        let batch = save_node(self, record, self.options().max_save_depth, &mut visited)?;
        if !batch.is_empty() {
            tracing::debug!(statements = batch.len(), "executing batch");
            self.execute(&batch.to_string())?;
        }

        let mut entity = record.lock();
        if entity.is_persisted() {
            let mut visited = Visited::new();
            load_model(self, &mut *entity, self.options().max_load_depth, &mut visited)?;
        }
        entity.after_save();
        Ok(())
    }

    /// Save `record` and its graph with an explicit depth budget and
    /// visitation cache, returning the deferred statements unexecuted.
    ///
    /// Inserts still run immediately. Validation and hooks are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`] when an insert fails.
    pub fn save_graph<E: Entity>(
        &self, record: &Record<E>, depth: u32, visited: &mut Visited,
    ) -> Result<Batch> {
        let _operation = record.operation();
        save_node(self, record, depth, visited)
    }

    /// Delete the row of `record`. Related rows are not touched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotPersisted`] for an entity without a key, or
    /// [`Error::Execution`].
    #[instrument(level = "debug", skip_all, fields(entity = E::NAME))]
    pub fn destroy<E: Entity>(&self, record: &Record<E>) -> Result<()> {
        let _operation = record.operation();
        let mut entity = record.lock();
        let key = entity.key();
        if key <= 0 {
            return Err(Error::NotPersisted { entity: E::NAME });
        }

        entity.before_destroy();
        self.execute(&DeleteBuilder::new(self.database(), E::TABLE).key(key).build())?;
        entity.after_destroy();
        Ok(())
    }
}

/// What remains of a node once its own row is written: its key, the deferred
/// update, and handles to its members.
struct Staged {
    schema: &'static Schema,
    key: i64,
    update: Option<String>,
    members: Vec<(&'static Association, Vec<Box<dyn Node>>)>,
}

fn save_node(
    session: &Session, node: &dyn Node, depth: u32, visited: &mut Visited,
) -> Result<Batch> {
    if depth == 0 || visited.contains(node) {
        return Ok(Batch::default());
    }
    let Some(staged) = stage(session, node, visited)? else {
        return Ok(Batch::default());
    };

    let database = session.database();
    let mut batch = Batch::default();
    if let Some(update) = staged.update {
        batch.push(update);
    }

    for (association, members) in staged.members {
        for member in members {
            let nested = save_node(session, &*member, depth - 1, visited)?;
            let member_key = visited.key_of(&*member);

            if let Some(statement) = link(database, staged.schema, association, staged.key, member_key)
            {
                batch.push(statement);
            } else {
                tracing::warn!(
                    entity = staged.schema.name,
                    association = association.field,
                    "skipping foreign key: related entity has no key"
                );
            }
            batch.extend(nested);
        }
    }

    Ok(batch)
}

/// Write the row of `node` under its entity lock: insert it when unsaved,
/// otherwise prepare its update. The lock is released on return, before any
/// member is visited. Returns `None` when another instance of the same row
/// was already saved in this pass.
fn stage(session: &Session, node: &dyn Node, visited: &mut Visited) -> Result<Option<Staged>> {
    let mut model = node.lock();
    let schema = model.descriptor();
    let database = session.database();

    if visited.contains_row(schema.name, model.primary_key()) {
        visited.record(node.identity(), schema.name, model.primary_key());
        return Ok(None);
    }

    let mut update = None;
    if model.primary_key() <= 0 {
        let sql =
            InsertBuilder::new(database, schema.table).values(model.scalars()).returning("id").build();
        let key = session
            .query(&sql)?
            .first()
            .and_then(|row| row_key(row, "id"))
            .ok_or_else(|| Error::Execution(anyhow!("insert into {} returned no key", schema.table)))?;
        model.assign_key(key);
    } else {
        let builder = UpdateBuilder::new(database, schema.table)
            .values(model.scalars())
            .key(model.primary_key());
        if !builder.is_empty() {
            update = Some(builder.build());
        }
    }

    let key = model.primary_key();
    visited.record(node.identity(), schema.name, key);

    let members = schema
        .associations
        .iter()
        .filter_map(|association| {
            model.related(association).map(|relation| (association, relation.members()))
        })
        .collect();

    Ok(Some(Staged {
        schema,
        key,
        update,
        members,
    }))
}

/// Statement binding `owner` to `member` through `association`.
fn link(
    database: &str, schema: &Schema, association: &Association, owner: i64, member: i64,
) -> Option<String> {
    if owner <= 0 || member <= 0 {
        return None;
    }
    let statement = match association.kind {
        AssociationKind::BelongsTo { foreign_key } => UpdateBuilder::new(database, schema.table)
            .set(foreign_key, member)
            .key(owner)
            .build(),
        AssociationKind::HasOne { foreign_key } | AssociationKind::HasMany { foreign_key } => {
            UpdateBuilder::new(database, association.target_table)
                .set(foreign_key, owner)
                .key(member)
                .build()
        }
        AssociationKind::ManyToMany { link } => InsertBuilder::new(database, link.table)
            .set(link.local_column, owner)
            .set(link.remote_column, member)
            .on_conflict_do_nothing(&[link.local_column, link.remote_column])
            .build(),
    };
    Some(statement)
}

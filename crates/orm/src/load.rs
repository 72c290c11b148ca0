//! Load and refresh: reconstruct entities and their associations from rows.

use sea_query::{Expr, Order};
use tracing::instrument;

use crate::entity::{Entity, row_key};
use crate::error::{Error, Result};
use crate::query::column_ref;
use crate::record::{Model, Record};
use crate::schema::{Association, AssociationKind, Schema};
use crate::select::SelectBuilder;
use crate::session::Session;
use crate::visit::Visited;
use crate::Row;

impl Session {
    /// Reload `record` and its associations from the store, to the session's
    /// load depth.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotPersisted`] for an entity without a key and
    /// [`Error::NotFound`] when its row is gone.
    #[instrument(level = "debug", skip_all, fields(entity = E::NAME))]
    pub fn refresh<E: Entity>(&self, record: &Record<E>) -> Result<()> {
        let _operation = record.operation();
        let mut entity = record.lock();
        let mut visited = Visited::new();
        load_model(self, &mut *entity, self.options().max_load_depth.max(1), &mut visited)
    }

    /// Reload `record` with an explicit depth budget and visitation cache.
    ///
    /// A budget of `0` reloads scalar fields only and leaves associations as
    /// they are.
    ///
    /// # Errors
    ///
    /// As for [`Session::refresh`].
    pub fn load_graph<E: Entity>(
        &self, record: &Record<E>, depth: u32, visited: &mut Visited,
    ) -> Result<()> {
        let _operation = record.operation();
        let mut entity = record.lock();
        load_model(self, &mut *entity, depth, visited)
    }

    /// Re-resolve exactly one scalar column or one association of `record`.
    /// Every other field is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] when `field` is neither a column nor an
    /// association, otherwise as for [`Session::refresh`].
    #[instrument(level = "debug", skip(self, record), fields(entity = E::NAME))]
    pub fn refresh_field<E: Entity>(&self, record: &Record<E>, field: &str) -> Result<()> {
        let _operation = record.operation();
        let mut entity = record.lock();
        let schema = E::schema();
        let key = entity.key();

        if let Some(column) = schema.column(field) {
            let row = fetch_row(self, schema, key)?;
            return entity
                .apply_row(&row, Some(column.name))
                .map_err(|source| Error::Mapping {
                    entity: schema.name,
                    source,
                });
        }

        let Some(association) = schema.association(field) else {
            return Err(Error::UnknownField {
                entity: schema.name,
                field: field.to_string(),
            });
        };
        let row = fetch_row(self, schema, key)?;
        let mut visited = Visited::new();
        visited.visit_row(schema.name, key);
        let depth = self.options().max_load_depth.max(1);
        populate(self, &mut *entity, association, &row, depth, &mut visited)
    }
}

/// Fetch the row of `model` and hydrate it. Depth `0` maps scalars only.
///
/// Associations are replaced with fresh records, so the only shared instance
/// locked here is the caller's.
pub(crate) fn load_model(
    session: &Session, model: &mut dyn Model, depth: u32, visited: &mut Visited,
) -> Result<()> {
    let schema = model.descriptor();
    let row = fetch_row(session, schema, model.primary_key())?;
    hydrate(session, model, &row, depth, visited)
}

/// Map `row` onto `model`, then populate its associations with members
/// hydrated at `depth - 1`. A row already hydrated in this pass keeps its
/// associations as they are.
pub(crate) fn hydrate(
    session: &Session, model: &mut dyn Model, row: &Row, depth: u32, visited: &mut Visited,
) -> Result<()> {
    let schema = model.descriptor();
    model.copy_row(row, None).map_err(|source| Error::Mapping {
        entity: schema.name,
        source,
    })?;

    if depth == 0 || !visited.visit_row(schema.name, model.primary_key()) {
        return Ok(());
    }
    for association in schema.associations {
        populate(session, model, association, row, depth, visited)?;
    }
    Ok(())
}

fn fetch_row(session: &Session, schema: &Schema, key: i64) -> Result<Row> {
    if key <= 0 {
        return Err(Error::NotPersisted { entity: schema.name });
    }
    let database = session.database();
    let sql = SelectBuilder::new(database, schema.table)
        .r#where(Expr::col(column_ref(database, schema.table, "id")).eq(key))
        .limit(1)
        .build();

    session.query(&sql)?.into_iter().next().ok_or(Error::NotFound {
        entity: schema.name,
        key,
    })
}

/// Replace the contents of one association with freshly fetched members.
fn populate(
    session: &Session, model: &mut dyn Model, association: &Association, owner_row: &Row,
    depth: u32, visited: &mut Visited,
) -> Result<()> {
    let database = session.database();
    let target = association.target_table;
    let key = model.primary_key();
    let select = SelectBuilder::new(database, target);

    let select = match association.kind {
        AssociationKind::BelongsTo { foreign_key } => {
            let Some(reference) = row_key(owner_row, foreign_key) else {
                if let Some(relation) = model.related_mut(association) {
                    relation.reset(0);
                }
                return Ok(());
            };
            select.r#where(Expr::col(column_ref(database, target, "id")).eq(reference)).limit(1)
        }
        AssociationKind::HasOne { foreign_key } => select
            .r#where(Expr::col(column_ref(database, target, foreign_key)).eq(key))
            .order_by("id", Order::Asc)
            .limit(1),
        AssociationKind::HasMany { foreign_key } => select
            .r#where(Expr::col(column_ref(database, target, foreign_key)).eq(key))
            .order_by("id", Order::Asc),
        AssociationKind::ManyToMany { link } => {
            let linked = SelectBuilder::new(database, link.table)
                .column(link.remote_column)
                .r#where(Expr::col(column_ref(database, link.table, link.local_column)).eq(key));
            select
                .r#where(
                    Expr::col(column_ref(database, target, "id")).in_subquery(linked.into_statement()),
                )
                .order_by("id", Order::Asc)
        }
    };

    let rows = session.query(&select.build())?;
    tracing::debug!(
        association = association.field,
        members = rows.len(),
        "populating association"
    );

    let Some(relation) = model.related_mut(association) else {
        return Ok(());
    };
    let members = relation.reset(rows.len());
    for (member, row) in members.iter().zip(&rows) {
        let mut guard = member.lock();
        hydrate(session, &mut *guard, row, depth - 1, visited)?;
    }
    Ok(())
}

//! Query translation: predicate map plus refinement to a SELECT statement.

use sea_query::{Expr, SimpleExpr};

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::predicate::{Criterion, Modifier, Predicates, resolve, split_key};
use crate::query::column_ref;
use crate::refine::Refinement;
use crate::schema::{Association, AssociationKind, Schema};
use crate::select::SelectBuilder;

/// Translate `predicates` and `refinement` into a statement over `E`.
///
/// Fragments are joined with `AND` in predicate order. Entity-valued
/// predicates become `id IN (subquery)` through the unique association whose
/// target is the value's type. An empty predicate map yields `None`: it
/// matches nothing rather than everything.
///
/// # Errors
///
/// Returns [`Error::UnknownField`], [`Error::InvalidModifier`],
/// [`Error::NoAssociation`], [`Error::AmbiguousAssociation`] or
/// [`Error::NotPersisted`] without producing any statement text.
pub fn translate<E: Entity>(
    database: &str, predicates: &Predicates, refinement: &Refinement,
) -> Result<Option<String>> {
    if predicates.is_empty() {
        return Ok(None);
    }
    let schema = E::schema();

    let mut select = SelectBuilder::new(database, schema.table);

    for field in &refinement.distinct {
        select = select.column(scalar(schema, field)?);
    }
    if !refinement.distinct.is_empty() {
        select = select.distinct();
    }

    for (key, criterion) in predicates.iter() {
        select = select.r#where(fragment(database, schema, key, criterion)?);
    }

    for field in &refinement.group_by {
        select = select.group_by(scalar(schema, field)?);
    }
    for order in &refinement.order_by {
        select = select.order_by(scalar(schema, &order.field)?, order.direction.into());
    }
    if refinement.limit > 0 {
        select = select.limit(refinement.limit);
    }

    Ok(Some(select.build()))
}

fn scalar(schema: &Schema, field: &str) -> Result<&'static str> {
    schema.column(field).map(|column| column.name).ok_or_else(|| Error::UnknownField {
        entity: schema.name,
        field: field.to_string(),
    })
}

fn fragment(
    database: &str, schema: &'static Schema, key: &str, criterion: &Criterion,
) -> Result<SimpleExpr> {
    let (field, token) = split_key(key);

    if let Some(column) = schema.column(field) {
        let modifier = Modifier::parse(field, token)?;
        let target: SimpleExpr = Expr::col(column_ref(database, schema.table, column.name)).into();
        return resolve(modifier, criterion, column, target);
    }

    let &Criterion::Related { entity, key } = criterion else {
        return Err(Error::UnknownField {
            entity: schema.name,
            field: field.to_string(),
        });
    };
    if let Some(token) = token {
        return Err(Error::invalid_modifier(field, token, "entity values only match by equality"));
    }

    let association = association_for(schema, entity)?;
    if key <= 0 {
        return Err(Error::NotPersisted { entity });
    }
    Ok(subquery(database, schema, association, key))
}

fn association_for(schema: &'static Schema, target: &'static str) -> Result<&'static Association> {
    let matching: Vec<&'static Association> =
        schema.associations.iter().filter(|association| association.target == target).collect();

    match matching.as_slice() {
        [] => Err(Error::NoAssociation {
            entity: schema.name,
            target,
        }),
        [association] => Ok(*association),
        _ => Err(Error::AmbiguousAssociation {
            entity: schema.name,
            target,
            count: matching.len(),
        }),
    }
}

/// `id IN (SELECT ...)` selecting owners related to the target row `key`.
fn subquery(
    database: &str, schema: &Schema, association: &Association, key: i64,
) -> SimpleExpr {
    let inner = match association.kind {
        AssociationKind::HasOne { foreign_key } | AssociationKind::HasMany { foreign_key } => {
            let target = association.target_table;
            SelectBuilder::new(database, target)
                .column(foreign_key)
                .r#where(Expr::col(column_ref(database, target, "id")).eq(key))
        }
        AssociationKind::BelongsTo { foreign_key } => SelectBuilder::new(database, schema.table)
            .column("id")
            .r#where(Expr::col(column_ref(database, schema.table, foreign_key)).eq(key)),
        AssociationKind::ManyToMany { link } => SelectBuilder::new(database, link.table)
            .column(link.local_column)
            .r#where(Expr::col(column_ref(database, link.table, link.remote_column)).eq(key)),
    };

    tracing::debug!(
        entity = schema.name,
        association = association.field,
        key,
        "association predicate"
    );
    Expr::col(column_ref(database, schema.table, "id")).in_subquery(inner.into_statement())
}

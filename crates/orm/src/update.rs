use sea_query::{Alias, Expr, SimpleExpr, Value};

use crate::query::{Dialect, table_ref};

/// Builder for constructing UPDATE queries.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    database: String,
    table: String,
    set_clauses: Vec<(String, Value)>,
    filters: Vec<SimpleExpr>,
}

impl UpdateBuilder {
    /// Creates a new UPDATE query builder over `database.table`.
    #[must_use]
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            set_clauses: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Sets a column to a new value.
    #[must_use]
    pub fn set<V>(mut self, column: impl Into<String>, value: V) -> Self
    where
        V: Into<Value>,
    {
        self.set_clauses.push((column.into(), value.into()));
        self
    }

    /// Sets several columns.
    #[must_use]
    pub fn values<C: Into<String>>(mut self, values: impl IntoIterator<Item = (C, Value)>) -> Self {
        self.set_clauses.extend(values.into_iter().map(|(column, value)| (column.into(), value)));
        self
    }

    /// Adds a WHERE clause filter.
    #[must_use]
    pub fn r#where(mut self, filter: SimpleExpr) -> Self {
        self.filters.push(filter);
        self
    }

    /// Restrict the update to the row whose `id` is `key`.
    #[must_use]
    pub fn key(self, key: i64) -> Self {
        self.r#where(Expr::col(Alias::new("id")).eq(key))
    }

    /// Whether no column is set; such an update is never emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set_clauses.is_empty()
    }

    /// Build and render the UPDATE statement.
    #[must_use]
    pub fn build(self) -> String {
        let mut statement = sea_query::Query::update();
        statement.table(table_ref(&self.database, &self.table));

        for (column, value) in self.set_clauses {
            statement.value(Alias::new(column), value);
        }

        for expr in self.filters {
            statement.and_where(expr);
        }

        let sql = statement.to_string(Dialect::default());
        tracing::debug!(table = %self.table, sql = %sql, "UpdateBuilder generated SQL");
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_by_key() {
        let builder = UpdateBuilder::new("main", "posts").set("author_id", 3).key(9);
        assert!(!builder.is_empty());
        assert_eq!(builder.build(), r#"UPDATE "main"."posts" SET "author_id" = 3 WHERE "id" = 9"#);
    }

    #[test]
    fn nothing_to_set() {
        assert!(UpdateBuilder::new("main", "tags").key(1).is_empty());
    }
}

use sea_query::{Alias, OnConflict, SimpleExpr, Value};

use crate::query::{Dialect, table_ref};

/// Builder for constructing INSERT queries.
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    database: String,
    table: String,
    values: Vec<(String, Value)>,
    conflict: Vec<String>,
    returning: Vec<String>,
}

impl InsertBuilder {
    /// Creates a new INSERT query builder into `database.table`.
    #[must_use]
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            values: Vec::new(),
            conflict: Vec::new(),
            returning: Vec::new(),
        }
    }

    /// Sets a column value for the insert.
    #[must_use]
    pub fn set<V>(mut self, column: impl Into<String>, value: V) -> Self
    where
        V: Into<Value>,
    {
        self.values.push((column.into(), value.into()));
        self
    }

    /// Sets several column values.
    #[must_use]
    pub fn values<C: Into<String>>(mut self, values: impl IntoIterator<Item = (C, Value)>) -> Self {
        self.values.extend(values.into_iter().map(|(column, value)| (column.into(), value)));
        self
    }

    /// Ignore the insert when a row with the same `columns` exists.
    #[must_use]
    pub fn on_conflict_do_nothing(mut self, columns: &[&str]) -> Self {
        self.conflict = columns.iter().map(ToString::to_string).collect();
        self
    }

    /// Specifies columns to return from the inserted row.
    #[must_use]
    pub fn returning(mut self, column: impl Into<String>) -> Self {
        self.returning.push(column.into());
        self
    }

    /// Build and render the INSERT statement. Without values the row is
    /// inserted with column defaults.
    #[must_use]
    pub fn build(self) -> String {
        let mut statement = sea_query::Query::insert();
        statement.into_table(table_ref(&self.database, &self.table));

        if self.values.is_empty() {
            statement.or_default_values();
        } else {
            let columns: Vec<_> = self.values.iter().map(|(column, _)| Alias::new(column)).collect();
            let row: Vec<SimpleExpr> =
                self.values.into_iter().map(|(_, value)| SimpleExpr::Value(value)).collect();
            statement.columns(columns);
            statement.values_panic(row);
        }

        if !self.conflict.is_empty() {
            statement.on_conflict(
                OnConflict::columns(self.conflict.iter().map(Alias::new)).do_nothing().to_owned(),
            );
        }

        for column in &self.returning {
            statement.returning_col(Alias::new(column));
        }

        let sql = statement.to_string(Dialect::default());
        tracing::debug!(table = %self.table, sql = %sql, "InsertBuilder generated SQL");
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_and_returning() {
        let sql = InsertBuilder::new("main", "authors")
            .set("name", "O'Brien")
            .set("age", 41)
            .returning("id")
            .build();
        assert_eq!(
            sql,
            r#"INSERT INTO "main"."authors" ("name", "age") VALUES ('O''Brien', 41) RETURNING "id""#
        );
    }

    #[test]
    fn link_rows_ignore_duplicates() {
        let sql = InsertBuilder::new("main", "post_tags")
            .set("post_id", 1)
            .set("tag_id", 2)
            .on_conflict_do_nothing(&["post_id", "tag_id"])
            .build();
        assert!(sql.ends_with(r#"ON CONFLICT ("post_id", "tag_id") DO NOTHING"#), "{sql}");
    }

    #[test]
    fn defaults_without_values() {
        let sql = InsertBuilder::new("main", "tags").returning("id").build();
        assert!(sql.contains("DEFAULT VALUES"), "{sql}");
    }
}

use sea_query::{Alias, Expr, SimpleExpr};

use crate::query::{Dialect, table_ref};

/// Builder for constructing DELETE queries.
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    database: String,
    table: String,
    filters: Vec<SimpleExpr>,
}

impl DeleteBuilder {
    /// Creates a new DELETE query builder over `database.table`.
    #[must_use]
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            filters: Vec::new(),
        }
    }

    /// Adds a WHERE clause filter.
    #[must_use]
    pub fn r#where(mut self, filter: SimpleExpr) -> Self {
        self.filters.push(filter);
        self
    }

    /// Restrict the delete to the row whose `id` is `key`.
    #[must_use]
    pub fn key(self, key: i64) -> Self {
        self.r#where(Expr::col(Alias::new("id")).eq(key))
    }

    /// Build and render the DELETE statement.
    #[must_use]
    pub fn build(self) -> String {
        let mut statement = sea_query::Query::delete();
        statement.from_table(table_ref(&self.database, &self.table));

        for filter in self.filters {
            statement.and_where(filter);
        }

        let sql = statement.to_string(Dialect::default());
        tracing::debug!(table = %self.table, sql = %sql, "DeleteBuilder generated SQL");
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_by_key() {
        let sql = DeleteBuilder::new("main", "authors").key(4).build();
        assert_eq!(sql, r#"DELETE FROM "main"."authors" WHERE "id" = 4"#);
    }
}

use sea_query::{Alias, Asterisk, Order, SelectStatement, SimpleExpr};

use crate::query::{Dialect, table_ref};

/// Builder for constructing SELECT queries.
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    database: String,
    table: String,
    distinct: bool,
    columns: Vec<String>,
    filters: Vec<SimpleExpr>,
    group_by: Vec<String>,
    order: Vec<(String, Order)>,
    limit: Option<u64>,
}

impl SelectBuilder {
    /// Creates a new SELECT query builder over `database.table`.
    #[must_use]
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            distinct: false,
            columns: Vec::new(),
            filters: Vec::new(),
            group_by: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Adds a projected column. Without any, every column is selected.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// Select distinct values of the projected columns.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Adds a WHERE clause filter. Filters are joined with `AND`.
    #[must_use]
    pub fn r#where(mut self, filter: SimpleExpr) -> Self {
        self.filters.push(filter);
        self
    }

    /// Adds a GROUP BY column.
    #[must_use]
    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    /// Adds an ORDER BY column.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order.push((column.into(), order));
        self
    }

    /// Sets the maximum number of rows to return.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Build the statement without rendering it, for use as a subquery.
    #[must_use]
    pub fn into_statement(self) -> SelectStatement {
        let mut statement = sea_query::Query::select();

        if self.distinct {
            statement.distinct();
        }
        if self.columns.is_empty() {
            statement.column(Asterisk);
        } else {
            statement.columns(self.columns.iter().map(Alias::new));
        }

        statement.from(table_ref(&self.database, &self.table));

        for filter in self.filters {
            statement.and_where(filter);
        }

        for column in &self.group_by {
            statement.group_by_col(Alias::new(column));
        }

        for (column, order) in self.order {
            statement.order_by(Alias::new(column), order);
        }

        if let Some(limit) = self.limit {
            statement.limit(limit);
        }

        statement
    }

    /// Build and render the SELECT statement.
    #[must_use]
    pub fn build(self) -> String {
        let table = self.table.clone();
        let sql = self.into_statement().to_string(Dialect::default());

        tracing::debug!(table = %table, sql = %sql, "SelectBuilder generated SQL");
        sql
    }
}

//! Statement rendering.
//!
//! Statements are rendered to text with every value inlined as a literal by
//! [`Dialect`]. [`literal`] is the only place a value becomes statement text.


use sea_query::backend::{
    EscapeBuilder, OperLeftAssocDecider, PrecedenceDecider, QuotedBuilder, TableRefBuilder,
};
use sea_query::prepare::SqlWriter;
use sea_query::{
    Alias, BinOper, ColumnRef, IntoIden, Oper, Quote, SimpleExpr, SubQueryStatement, TableRef,
    Value,
};

/// `SQLite` flavoured renderer: double-quoted identifiers, single-quoted
/// strings with doubled embedded quotes.
#[derive(Debug, Clone, Copy)]
pub struct Dialect {
    quote: Quote,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            quote: Quote::new(b'"'),
        }
    }
}

impl QuotedBuilder for Dialect {
    fn quote(&self) -> Quote {
        self.quote
    }
}

impl EscapeBuilder for Dialect {
    fn escape_string(&self, string: &str) -> String {
        string.replace('\'', "''")
    }

    fn unescape_string(&self, string: &str) -> String {
        string.replace("''", "'")
    }
}

impl TableRefBuilder for Dialect {}

impl OperLeftAssocDecider for Dialect {
    fn well_known_left_associative(&self, op: &BinOper) -> bool {
        matches!(
            op,
            BinOper::And | BinOper::Or | BinOper::Add | BinOper::Sub | BinOper::Mul | BinOper::Mod
        )
    }
}

impl PrecedenceDecider for Dialect {
    fn inner_expr_well_known_greater_precedence(
        &self, inner: &SimpleExpr, _outer_oper: &Oper,
    ) -> bool {
        // leaves never need parentheses
        matches!(inner, SimpleExpr::Column(_) | SimpleExpr::Value(_))
    }
}

impl sea_query::backend::QueryBuilder for Dialect {
    fn prepare_query_statement(&self, query: &SubQueryStatement, sql: &mut dyn SqlWriter) {
        match query {
            SubQueryStatement::SelectStatement(s) => self.prepare_select_statement(s, sql),
            SubQueryStatement::InsertStatement(s) => self.prepare_insert_statement(s, sql),
            SubQueryStatement::UpdateStatement(s) => self.prepare_update_statement(s, sql),
            SubQueryStatement::DeleteStatement(s) => self.prepare_delete_statement(s, sql),
            SubQueryStatement::WithStatement(s) => self.prepare_with_query(s, sql),
        }
    }

    fn prepare_value(&self, value: &Value, sql: &mut dyn SqlWriter) {
        sql.push_param(value.clone(), self);
    }

    fn placeholder(&self) -> (&str, bool) {
        ("?", false)
    }

    fn insert_default_values(&self, _num_rows: u32, sql: &mut dyn SqlWriter) {
        sql.write_str("DEFAULT VALUES").unwrap_or_default();
    }
}

/// Render a value as a statement literal.
#[must_use]
pub fn literal(value: &Value) -> String {
    sea_query::backend::QueryBuilder::value_to_string(&Dialect::default(), value)
}

/// `database.table`
pub(crate) fn table_ref(database: &str, table: &str) -> TableRef {
    TableRef::SchemaTable(Alias::new(database).into_iden(), Alias::new(table).into_iden())
}

/// `database.table.column`
pub(crate) fn column_ref(database: &str, table: &str, column: &str) -> ColumnRef {
    ColumnRef::SchemaTableColumn(
        Alias::new(database).into_iden(),
        Alias::new(table).into_iden(),
        Alias::new(column).into_iden(),
    )
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn literals() {
        assert_eq!(literal(&Value::from("it's")), "'it''s'");
        assert_eq!(literal(&Value::from(42_i32)), "42");
        assert_eq!(literal(&Value::from(-7_i64)), "-7");
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).expect("date");
        assert_eq!(literal(&Value::from(date)), "'2024-01-15'");
    }
}

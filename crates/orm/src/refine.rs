//! Result refinements: distinct, grouping, ordering and limit.

use std::fmt;
use std::str::FromStr;

use sea_query::Order;

use crate::error::{Error, Result};

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            _ => Err(Error::invalid_modifier("order_by", token, "expected `asc` or `desc`")),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        })
    }
}

impl From<Direction> for Order {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Ascending => Self::Asc,
            Direction::Descending => Self::Desc,
        }
    }
}

/// One ordering field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Field name.
    pub field: String,
    /// Direction.
    pub direction: Direction,
}

/// Optional refinements applied to a translated query.
///
/// Field names are checked against the entity's scalar columns when the
/// query is translated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Refinement {
    /// Fields whose combined values must be distinct.
    pub distinct: Vec<String>,
    /// Grouping fields.
    pub group_by: Vec<String>,
    /// Ordering fields, applied in order.
    pub order_by: Vec<OrderBy>,
    /// Row limit; `0` means unlimited.
    pub limit: u64,
}

impl Refinement {
    /// No refinement.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a distinct field.
    #[must_use]
    pub fn distinct(mut self, field: impl Into<String>) -> Self {
        self.distinct.push(field.into());
        self
    }

    /// Add a grouping field.
    #[must_use]
    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by.push(field.into());
        self
    }

    /// Add an ordering field.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Add an ordering field with a textual direction (`asc`, `desc`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidModifier`] for any other direction token.
    pub fn order_by_token(self, field: impl Into<String>, direction: &str) -> Result<Self> {
        Ok(self.order_by(field, direction.parse()?))
    }

    /// Limit the number of rows; `0` removes the limit.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_tokens() {
        assert_eq!("ASC".parse::<Direction>().unwrap(), Direction::Ascending);
        assert_eq!("descending".parse::<Direction>().unwrap(), Direction::Descending);
        assert!(matches!("up".parse::<Direction>(), Err(Error::InvalidModifier { .. })));
    }

    #[test]
    fn builder_accumulates() {
        let refinement = Refinement::new()
            .distinct("name")
            .order_by_token("age", "desc")
            .unwrap()
            .order_by("name", Direction::Ascending)
            .limit(5);
        assert_eq!(refinement.distinct, ["name"]);
        assert_eq!(refinement.order_by.len(), 2);
        assert_eq!(refinement.order_by[0].direction, Direction::Descending);
        assert_eq!(refinement.limit, 5);
    }
}

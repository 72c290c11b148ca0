//! Predicate maps and the modifier resolver.
//!
//! A predicate key is a field name optionally followed by a space and a
//! modifier token: `"name"`, `"name starts_with"`, `"age between"`,
//! `"age >="`. Values are scalars, lists (for `in` and `between`) or a
//! reference to a related entity.

use std::fmt;
use std::str::FromStr;

use sea_query::{ExprTrait, SimpleExpr, Value};

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::record::Record;
use crate::schema::{Column, StorageKind};

/// Comparison value of one predicate entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// A single value.
    Scalar(Value),
    /// An ordered list of values, for `in` and `between`.
    List(Vec<Value>),
    /// A persisted entity of type `entity`, matched through an association.
    Related {
        /// Entity name of the referenced type.
        entity: &'static str,
        /// Primary key of the referenced entity.
        key: i64,
    },
}

/// Insertion-ordered predicate map with unique keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicates {
    entries: Vec<(String, Criterion)>,
}

impl Predicates {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `criterion` under `key`, replacing an existing entry in place.
    #[must_use]
    pub fn insert(mut self, key: impl Into<String>, criterion: Criterion) -> Self {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            entry.1 = criterion;
        } else {
            self.entries.push((key, criterion));
        }
        self
    }

    /// Compare `key` against a single value.
    #[must_use]
    pub fn value(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, Criterion::Scalar(value.into()))
    }

    /// Compare `key` against a list of values.
    #[must_use]
    pub fn list<V: Into<Value>>(
        self, key: impl Into<String>, values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.insert(key, Criterion::List(values.into_iter().map(Into::into).collect()))
    }

    /// Match rows associated with `record`.
    ///
    /// The association is chosen by the record's type; `key` only has to be
    /// unique within the map.
    #[must_use]
    pub fn related<E: Entity>(self, key: impl Into<String>, record: &Record<E>) -> Self {
        let criterion = Criterion::Related {
            entity: E::NAME,
            key: record.key(),
        };
        self.insert(key, criterion)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Criterion)> {
        self.entries.iter().map(|(key, criterion)| (key.as_str(), criterion))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split `"field modifier"` at the first space.
pub(crate) fn split_key(key: &str) -> (&str, Option<&str>) {
    match key.trim().split_once(' ') {
        Some((field, modifier)) => (field, Some(modifier.trim())),
        None => (key.trim(), None),
    }
}

/// Predicate modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// Equality; the modifier is absent.
    Equals,
    /// `LIKE '%v%'`
    Contains,
    /// `LIKE 'v%'`
    StartsWith,
    /// `LIKE '%v'`
    EndsWith,
    /// `IN (a, b, ...)`
    In,
    /// `BETWEEN a AND b`
    Between,
    /// `<`
    LessThan,
    /// `>`
    GreaterThan,
    /// `<=`
    AtMost,
    /// `>=`
    AtLeast,
}

impl Modifier {
    /// Parse an optional modifier token. No token means [`Modifier::Equals`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidModifier`] for an unrecognized token.
    pub fn parse(field: &str, token: Option<&str>) -> Result<Self> {
        token.map_or(Ok(Self::Equals), |token| {
            token.parse().map_err(|reason| Error::invalid_modifier(field, token, reason))
        })
    }
}

impl FromStr for Modifier {
    type Err = &'static str;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.to_ascii_lowercase().as_str() {
            "contains" => Ok(Self::Contains),
            "starts_with" => Ok(Self::StartsWith),
            "ends_with" => Ok(Self::EndsWith),
            "in" => Ok(Self::In),
            "between" => Ok(Self::Between),
            "<" => Ok(Self::LessThan),
            ">" => Ok(Self::GreaterThan),
            "<=" => Ok(Self::AtMost),
            ">=" => Ok(Self::AtLeast),
            _ => Err("unrecognized modifier"),
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Equals => "=",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::In => "in",
            Self::Between => "between",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::AtMost => "<=",
            Self::AtLeast => ">=",
        })
    }
}

/// Resolve one `column modifier value` triple into a filter fragment.
///
/// # Errors
///
/// Returns [`Error::InvalidModifier`] when the modifier does not fit the
/// column's storage kind or the value's shape.
pub fn resolve(
    modifier: Modifier, criterion: &Criterion, column: &Column, target: SimpleExpr,
) -> Result<SimpleExpr> {
    let invalid = |reason| Error::invalid_modifier(column.name, modifier.to_string(), reason);

    match (modifier, criterion) {
        (_, Criterion::Related { .. }) => {
            Err(invalid("an entity value can only match an association"))
        }
        (Modifier::Contains | Modifier::StartsWith | Modifier::EndsWith, Criterion::Scalar(value)) => {
            let Value::String(Some(text)) = value else {
                return Err(invalid("pattern modifiers need a text value"));
            };
            if column.kind != StorageKind::Text {
                return Err(invalid("pattern modifiers need a text column"));
            }
            let pattern = match modifier {
                Modifier::Contains => format!("%{text}%"),
                Modifier::StartsWith => format!("{text}%"),
                _ => format!("%{text}"),
            };
            Ok(target.like(pattern))
        }
        (Modifier::In, Criterion::List(values)) => {
            if values.is_empty() {
                return Err(invalid("`in` needs at least one value"));
            }
            Ok(target.is_in(values.iter().cloned()))
        }
        (Modifier::Between, Criterion::List(values)) => {
            if !column.kind.is_ordered() {
                return Err(invalid("`between` needs a numeric, temporal or text column"));
            }
            let [low, high] = values.as_slice() else {
                return Err(invalid("`between` needs exactly two values"));
            };
            Ok(target.between(low.clone(), high.clone()))
        }
        (Modifier::LessThan, Criterion::Scalar(value)) => Ok(target.lt(value.clone())),
        (Modifier::GreaterThan, Criterion::Scalar(value)) => Ok(target.gt(value.clone())),
        (Modifier::AtMost, Criterion::Scalar(value)) => Ok(target.lte(value.clone())),
        (Modifier::AtLeast, Criterion::Scalar(value)) => Ok(target.gte(value.clone())),
        (Modifier::Equals, Criterion::Scalar(value)) => {
            if is_null(value) {
                Ok(target.is_null())
            } else {
                Ok(target.eq(value.clone()))
            }
        }
        (Modifier::In | Modifier::Between, Criterion::Scalar(_)) => {
            Err(invalid("this modifier needs a list value"))
        }
        (_, Criterion::List(_)) => Err(invalid("list values need `in` or `between`")),
    }
}

const fn is_null(value: &Value) -> bool {
    matches!(
        value,
        Value::Bool(None)
            | Value::TinyInt(None)
            | Value::SmallInt(None)
            | Value::Int(None)
            | Value::BigInt(None)
            | Value::TinyUnsigned(None)
            | Value::SmallUnsigned(None)
            | Value::Unsigned(None)
            | Value::BigUnsigned(None)
            | Value::Float(None)
            | Value::Double(None)
            | Value::String(None)
            | Value::Char(None)
            | Value::Bytes(None)
            | Value::ChronoDate(None)
            | Value::ChronoTime(None)
            | Value::ChronoDateTime(None)
            | Value::ChronoDateTimeUtc(None)
    )
}

//! Error taxonomy for translation, persistence and loading.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by ORM operations.
///
/// Translation errors (`UnknownField`, `NoAssociation`, `AmbiguousAssociation`,
/// `InvalidModifier`) are raised before any statement text is produced.
#[derive(Error, Debug)]
pub enum Error {
    /// The entity failed its validation gate. Nothing was written.
    #[error("{entity} failed validation: {errors}")]
    Validation {
        /// Entity name.
        entity: &'static str,
        /// Field to message mapping reported by the entity.
        errors: ValidationErrors,
    },

    /// A predicate or refinement named a field the entity does not declare.
    #[error("{entity} has no field `{field}`")]
    UnknownField {
        /// Entity name.
        entity: &'static str,
        /// The offending field name.
        field: String,
    },

    /// A related-entity predicate whose type matches no declared association.
    #[error("{entity} has no association targeting {target}")]
    NoAssociation {
        /// Entity name.
        entity: &'static str,
        /// Type of the predicate value.
        target: &'static str,
    },

    /// A related-entity predicate whose type matches several associations.
    #[error("{entity} declares {count} associations targeting {target}")]
    AmbiguousAssociation {
        /// Entity name.
        entity: &'static str,
        /// Type of the predicate value.
        target: &'static str,
        /// Number of matching associations.
        count: usize,
    },

    /// A modifier is not valid for the field's storage kind or the value's shape.
    #[error("modifier `{modifier}` cannot be applied to `{field}`: {reason}")]
    InvalidModifier {
        /// Field the modifier was applied to.
        field: String,
        /// The modifier token.
        modifier: String,
        /// Why the combination was rejected.
        reason: &'static str,
    },

    /// The executor rejected or failed a statement.
    ///
    /// A failed save may leave earlier statements of the same call committed:
    /// statements are not wrapped in a transaction.
    #[error("statement execution failed")]
    Execution(#[source] anyhow::Error),

    /// A row value could not be converted into an entity field.
    #[error("row could not be mapped onto {entity}")]
    Mapping {
        /// Entity name.
        entity: &'static str,
        /// Conversion failure.
        #[source]
        source: anyhow::Error,
    },

    /// A session was used before its store handle was configured.
    #[error("{0} has not been set")]
    NotSet(&'static str),

    /// The operation needs a persisted entity, but its key is unset.
    #[error("{entity} has not been persisted")]
    NotPersisted {
        /// Entity name.
        entity: &'static str,
    },

    /// No row exists for the entity's key.
    #[error("{entity} {key} was not found")]
    NotFound {
        /// Entity name.
        entity: &'static str,
        /// Primary key that was looked up.
        key: i64,
    },

    /// The operation is intentionally not provided.
    #[error("`{0}` is not supported")]
    Unsupported(&'static str),
}

impl Error {
    pub(crate) fn invalid_modifier(
        field: impl Into<String>, modifier: impl Into<String>, reason: &'static str,
    ) -> Self {
        Self::InvalidModifier {
            field: field.into(),
            modifier: modifier.into(),
            reason,
        }
    }
}

/// Field-level validation failures, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    /// Record a failure for `field`. A later message for the same field wins.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    /// Message recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Whether no failures were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over `(field, message)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(field, message)| (field.as_str(), message.as_str()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> =
            self.iter().map(|(field, message)| format!("{field}: {message}")).collect();
        write!(f, "{}", joined.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn validation_message_lists_fields() {
        let mut errors = ValidationErrors::default();
        errors.add("name", "must not be empty");
        errors.add("age", "must be positive");

        let err = Error::Validation {
            entity: "Author",
            errors,
        };
        assert_eq!(
            err.to_string(),
            "Author failed validation: age: must be positive, name: must not be empty"
        );
    }

    #[test]
    fn execution_keeps_source() {
        let err = Error::Execution(anyhow::anyhow!("no such table: authors"));
        let source = err.source().expect("source");
        assert!(source.to_string().contains("no such table"));
    }
}

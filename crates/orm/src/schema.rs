//! Static schema descriptors.
//!
//! Every entity type exposes one [`Schema`], built at compile time by the
//! [`entity!`](crate::entity) macro. The translator and the persistence and
//! load engines consume it as plain data.

/// Storage kind of a scalar column. Drives which predicate modifiers apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Text.
    Text,
    /// Integer.
    Integer,
    /// Floating point.
    Real,
    /// Boolean.
    Boolean,
    /// Date, time or timestamp.
    Temporal,
    /// Raw bytes.
    Binary,
}

impl StorageKind {
    /// Whether values of this kind are ordered, so `BETWEEN` is meaningful.
    #[must_use]
    pub const fn is_ordered(self) -> bool {
        matches!(self, Self::Text | Self::Integer | Self::Real | Self::Temporal)
    }
}

/// A scalar column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Column name, identical to the field name.
    pub name: &'static str,
    /// Storage kind.
    pub kind: StorageKind,
    /// Whether this is the primary key.
    pub primary_key: bool,
}

impl Column {
    /// A non-key column.
    #[must_use]
    pub const fn new(name: &'static str, kind: StorageKind) -> Self {
        Self {
            name,
            kind,
            primary_key: false,
        }
    }

    /// The integer primary key column.
    #[must_use]
    pub const fn primary_key(name: &'static str) -> Self {
        Self {
            name,
            kind: StorageKind::Integer,
            primary_key: true,
        }
    }
}

/// Link table joining the two sides of a many-to-many association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTable {
    /// Link table name.
    pub table: &'static str,
    /// Column referencing the owning entity.
    pub local_column: &'static str,
    /// Column referencing the target entity.
    pub remote_column: &'static str,
}

impl LinkTable {
    /// Describe a link table.
    #[must_use]
    pub const fn new(
        table: &'static str, local_column: &'static str, remote_column: &'static str,
    ) -> Self {
        Self {
            table,
            local_column,
            remote_column,
        }
    }
}

/// Association kinds with their kind-specific payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    /// This entity holds `foreign_key`, referencing the target.
    BelongsTo {
        /// Column on this entity's table.
        foreign_key: &'static str,
    },
    /// The target holds `foreign_key`, referencing this entity. Single-valued.
    HasOne {
        /// Column on the target's table.
        foreign_key: &'static str,
    },
    /// The target holds `foreign_key`, referencing this entity. Collection-valued.
    HasMany {
        /// Column on the target's table.
        foreign_key: &'static str,
    },
    /// Both sides are joined through a link table.
    ManyToMany {
        /// The link table.
        link: LinkTable,
    },
}

/// A declared association field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Association {
    /// Field name on the owning entity.
    pub field: &'static str,
    /// Entity name of the target type.
    pub target: &'static str,
    /// Table of the target type.
    pub target_table: &'static str,
    /// Kind and payload.
    pub kind: AssociationKind,
}

impl Association {
    /// This entity references the target through `foreign_key`.
    #[must_use]
    pub const fn belongs_to(
        field: &'static str, target: &'static str, target_table: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            field,
            target,
            target_table,
            kind: AssociationKind::BelongsTo { foreign_key },
        }
    }

    /// A single target references this entity through `foreign_key`.
    #[must_use]
    pub const fn has_one(
        field: &'static str, target: &'static str, target_table: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            field,
            target,
            target_table,
            kind: AssociationKind::HasOne { foreign_key },
        }
    }

    /// Many targets reference this entity through `foreign_key`.
    #[must_use]
    pub const fn has_many(
        field: &'static str, target: &'static str, target_table: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            field,
            target,
            target_table,
            kind: AssociationKind::HasMany { foreign_key },
        }
    }

    /// Both sides are joined through `link`.
    #[must_use]
    pub const fn many_to_many(
        field: &'static str, target: &'static str, target_table: &'static str, link: LinkTable,
    ) -> Self {
        Self {
            field,
            target,
            target_table,
            kind: AssociationKind::ManyToMany { link },
        }
    }

    /// The column that carries the relationship: the foreign key, or the link
    /// table column referencing the owner.
    #[must_use]
    pub const fn foreign_key(&self) -> &'static str {
        match self.kind {
            AssociationKind::BelongsTo { foreign_key }
            | AssociationKind::HasOne { foreign_key }
            | AssociationKind::HasMany { foreign_key } => foreign_key,
            AssociationKind::ManyToMany { link } => link.local_column,
        }
    }
}

/// Schema of one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    /// Entity name.
    pub name: &'static str,
    /// Table name.
    pub table: &'static str,
    /// Scalar columns in declaration order, primary key first.
    pub columns: &'static [Column],
    /// Associations in declaration order.
    pub associations: &'static [Association],
}

impl Schema {
    /// Look up a scalar column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Look up an association by field name.
    #[must_use]
    pub fn association(&self, field: &str) -> Option<&'static Association> {
        self.associations.iter().find(|association| association.field == field)
    }

    /// Name of the primary key column.
    #[must_use]
    pub fn primary_key(&self) -> &'static str {
        self.columns.iter().find(|column| column.primary_key).map_or("id", |column| column.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static TAGGED: Schema = Schema {
        name: "Post",
        table: "posts",
        columns: &[
            Column::primary_key("id"),
            Column::new("title", StorageKind::Text),
            Column::new("draft", StorageKind::Boolean),
        ],
        associations: &[
            Association::belongs_to("author", "Author", "authors", "author_id"),
            Association::many_to_many(
                "tags",
                "Tag",
                "tags",
                LinkTable::new("post_tags", "post_id", "tag_id"),
            ),
        ],
    };

    #[test]
    fn lookups() {
        assert_eq!(TAGGED.primary_key(), "id");
        assert_eq!(TAGGED.column("draft").map(|c| c.kind), Some(StorageKind::Boolean));
        assert!(TAGGED.column("author").is_none());
        assert_eq!(TAGGED.association("author").map(Association::foreign_key), Some("author_id"));
        assert_eq!(TAGGED.association("tags").map(Association::foreign_key), Some("post_id"));
    }

    #[test]
    fn ordered_kinds() {
        assert!(StorageKind::Temporal.is_ordered());
        assert!(StorageKind::Text.is_ordered());
        assert!(!StorageKind::Boolean.is_ordered());
        assert!(!StorageKind::Binary.is_ordered());
    }
}

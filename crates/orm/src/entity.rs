use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sea_query::Value;

use crate::error::ValidationErrors;
use crate::record::Relation;
use crate::schema::{Schema, StorageKind};
use crate::{DataType, Row};

/// Trait for types that can be extracted from database rows.
///
/// Conversions are lenient about the representation the store chose: an
/// `INTEGER` column may come back as any integer variant, a boolean as `0`/`1`
/// and timestamps as text.
pub trait FetchValue: Sized {
    /// Fetch a value from a row by column name.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is missing or the value cannot be converted to the target type.
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self>;
}

/// Scalar field types: convertible to and from the store, with a storage kind.
pub trait FieldType: FetchValue + Into<Value> + Clone {
    /// Storage kind used to validate predicate modifiers.
    const KIND: StorageKind;
}

/// Declares an ORM entity with automatic `Entity` trait implementation.
///
/// The primary key field `id: i64` is added to the struct. Scalar fields are
/// stored in columns of the same name. Associations are declared in an
/// optional `relations` block:
///
/// - `belongs_to field: Target => "fk"`, the foreign key is on this table
/// - `has_one field: Target => "fk"`, the foreign key is on the target table
/// - `has_many field: Target => "fk"`, as `has_one`, collection-valued
/// - `many_to_many field: Target => ("link_table", "local_column", "remote_column")`
///
/// The type must also implement [`Lifecycle`] (an empty `impl` uses the
/// default hooks).
///
/// # Examples
///
/// ```ignore
/// entity! {
///     table = "posts",
///     #[derive(Debug, Default)]
///     pub struct Post {
///         pub title: String,
///         pub rating: f64,
///     }
///     relations {
///         belongs_to author: Author => "author_id",
///         many_to_many tags: Tag => ("post_tags", "post_id", "tag_id"),
///     }
/// }
///
/// impl Lifecycle for Post {}
/// ```
#[macro_export]
macro_rules! entity {
    (@relation_type belongs_to $target:ty) => { ::core::option::Option<$crate::Record<$target>> };
    (@relation_type has_one $target:ty) => { ::core::option::Option<$crate::Record<$target>> };
    (@relation_type has_many $target:ty) => { $crate::Related<$target> };
    (@relation_type many_to_many $target:ty) => { $crate::Related<$target> };

    (@association belongs_to $field:ident $target:ty => $fk:literal) => {
        $crate::Association::belongs_to(
            stringify!($field),
            <$target as $crate::Entity>::NAME,
            <$target as $crate::Entity>::TABLE,
            $fk,
        )
    };
    (@association has_one $field:ident $target:ty => $fk:literal) => {
        $crate::Association::has_one(
            stringify!($field),
            <$target as $crate::Entity>::NAME,
            <$target as $crate::Entity>::TABLE,
            $fk,
        )
    };
    (@association has_many $field:ident $target:ty => $fk:literal) => {
        $crate::Association::has_many(
            stringify!($field),
            <$target as $crate::Entity>::NAME,
            <$target as $crate::Entity>::TABLE,
            $fk,
        )
    };
    (@association many_to_many $field:ident $target:ty =>
        ($link:literal, $local:literal, $remote:literal)
    ) => {
        $crate::Association::many_to_many(
            stringify!($field),
            <$target as $crate::Entity>::NAME,
            <$target as $crate::Entity>::TABLE,
            $crate::LinkTable::new($link, $local, $remote),
        )
    };

    (
        table = $table:literal,
        $(#[$meta:meta])*
        pub struct $struct_name:ident {
            $(
                $(#[$field_meta:meta])*
                pub $field_name:ident : $field_type:ty
            ),* $(,)?
        }
        $(
            relations {
                $( $kind:ident $relation:ident : $target:ty => $fk:tt ),* $(,)?
            }
        )?
    ) => {
        #[allow(missing_docs)]
        $(#[$meta])*
        pub struct $struct_name {
            pub id: i64,
            $(
                $(#[$field_meta])*
                pub $field_name : $field_type,
            )*
            $($(
                pub $relation : $crate::entity!(@relation_type $kind $target),
            )*)?
        }

        impl $crate::Entity for $struct_name {
            const NAME: &'static str = stringify!($struct_name);
            const TABLE: &'static str = $table;

            fn schema() -> &'static $crate::Schema {
                static SCHEMA: $crate::Schema = $crate::Schema {
                    name: stringify!($struct_name),
                    table: $table,
                    columns: &[
                        $crate::Column::primary_key("id"),
                        $(
                            $crate::Column::new(
                                stringify!($field_name),
                                <$field_type as $crate::FieldType>::KIND,
                            ),
                        )*
                    ],
                    associations: &[
                        $($(
                            $crate::entity!(@association $kind $relation $target => $fk),
                        )*)?
                    ],
                };
                &SCHEMA
            }

            fn key(&self) -> i64 {
                self.id
            }

            fn set_key(&mut self, key: i64) {
                self.id = key;
            }

            fn values(&self) -> ::std::vec::Vec<(&'static str, $crate::__private::Value)> {
                vec![
                    $(
                        (stringify!($field_name), self.$field_name.clone().into()),
                    )*
                ]
            }

            fn apply_row(
                &mut self, row: &$crate::Row, only: ::core::option::Option<&str>,
            ) -> $crate::__private::anyhow::Result<()> {
                if only.is_none_or(|column| column == "id") && row.contains("id") {
                    self.id = <i64 as $crate::FetchValue>::fetch(row, "id")?;
                }
                $(
                    if only.is_none_or(|column| column == stringify!($field_name))
                        && row.contains(stringify!($field_name))
                    {
                        self.$field_name =
                            <$field_type as $crate::FetchValue>::fetch(row, stringify!($field_name))?;
                    }
                )*
                Ok(())
            }

            fn relation(&self, field: &str) -> ::core::option::Option<&dyn $crate::Relation> {
                match field {
                    $($(
                        stringify!($relation) => {
                            ::core::option::Option::Some(&self.$relation as &dyn $crate::Relation)
                        }
                    )*)?
                    _ => ::core::option::Option::None,
                }
            }

            fn relation_mut(
                &mut self, field: &str,
            ) -> ::core::option::Option<&mut dyn $crate::Relation> {
                match field {
                    $($(
                        stringify!($relation) => ::core::option::Option::Some(
                            &mut self.$relation as &mut dyn $crate::Relation,
                        ),
                    )*)?
                    _ => ::core::option::Option::None,
                }
            }
        }
    };
}

/// Lifecycle hooks and the validation gate.
///
/// Every method has a no-op default. Hooks run only for the entity passed to
/// [`Session::save`](crate::Session::save) or
/// [`Session::destroy`](crate::Session::destroy), not for related entities
/// saved along with it.
pub trait Lifecycle {
    /// Report field-level problems. A non-empty result aborts the save before
    /// any statement is emitted.
    fn validate(&self, errors: &mut ValidationErrors) {
        let _ = errors;
    }

    /// Runs after validation passes, before any statement is emitted.
    fn before_save(&mut self) {}

    /// Runs after the statement batch and the resynchronizing load complete.
    fn after_save(&mut self) {}

    /// Runs before the `DELETE` is emitted.
    fn before_destroy(&mut self) {}

    /// Runs after the `DELETE` succeeds.
    fn after_destroy(&mut self) {}
}

/// Trait for persisted entity types.
///
/// Typically implemented via the `entity!` macro rather than manually.
pub trait Entity: Lifecycle + Default + Send + 'static {
    /// Entity name, used to match related-entity predicates and in errors.
    const NAME: &'static str;

    /// The database table name for this entity.
    const TABLE: &'static str;

    /// Static schema descriptor.
    fn schema() -> &'static Schema;

    /// Primary key; `<= 0` while unsaved.
    fn key(&self) -> i64;

    /// Set the primary key.
    fn set_key(&mut self, key: i64);

    /// Non-key scalar values in declaration order.
    fn values(&self) -> Vec<(&'static str, Value)>;

    /// Copy row columns onto scalar fields. Columns absent from the row are
    /// left untouched; `only` restricts the copy to a single column.
    ///
    /// # Errors
    ///
    /// Returns an error if a present column cannot be converted to the field type.
    fn apply_row(&mut self, row: &Row, only: Option<&str>) -> Result<()>;

    /// The association field named `field`.
    fn relation(&self, field: &str) -> Option<&dyn Relation>;

    /// The association field named `field`, mutably.
    fn relation_mut(&mut self, field: &str) -> Option<&mut dyn Relation>;

    /// Whether the entity has been saved.
    fn is_persisted(&self) -> bool {
        self.key() > 0
    }
}

macro_rules! field_type {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FieldType for $ty {
                const KIND: StorageKind = StorageKind::$kind;
            }
        )*
    };
}

field_type! {
    bool => Boolean,
    i32 => Integer,
    i64 => Integer,
    u32 => Integer,
    f32 => Real,
    f64 => Real,
    String => Text,
    Vec<u8> => Binary,
    DateTime<Utc> => Temporal,
    NaiveDateTime => Temporal,
    NaiveDate => Temporal,
}

impl<T> FieldType for Option<T>
where
    T: FieldType + sea_query::Nullable,
{
    const KIND: StorageKind = T::KIND;
}

// Inbound conversion
impl FetchValue for bool {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_bool(row_field(row, col)?)
    }
}

impl FetchValue for i32 {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        Ok(Self::try_from(as_i64(row_field(row, col)?)?)?)
    }
}

impl FetchValue for i64 {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_i64(row_field(row, col)?)
    }
}

impl FetchValue for u32 {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        Ok(Self::try_from(as_i64(row_field(row, col)?)?)?)
    }
}

impl FetchValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        Ok(as_f64(row_field(row, col)?)? as Self)
    }
}

impl FetchValue for f64 {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_f64(row_field(row, col)?)
    }
}

impl FetchValue for String {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_string(row_field(row, col)?)
    }
}

impl FetchValue for Vec<u8> {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_binary(row_field(row, col)?)
    }
}

impl FetchValue for DateTime<Utc> {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_timestamp(row_field(row, col)?)
    }
}

impl FetchValue for NaiveDateTime {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        Ok(as_timestamp(row_field(row, col)?)?.naive_utc())
    }
}

impl FetchValue for NaiveDate {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_date(row_field(row, col)?)
    }
}

impl<T: FetchValue> FetchValue for Option<T> {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        match row_field(row, col) {
            Ok(field) if !field.is_null() => Ok(Some(T::fetch(row, col)?)),
            _ => Ok(None),
        }
    }
}

pub(crate) fn row_field<'a>(row: &'a Row, name: &str) -> Result<&'a DataType> {
    row.get(name).ok_or_else(|| anyhow!("missing column '{name}'"))
}

/// Integer key stored in `col`, if present and not null.
pub(crate) fn row_key(row: &Row, col: &str) -> Option<i64> {
    row.get(col).and_then(|value| as_i64(value).ok())
}

fn as_bool(value: &DataType) -> Result<bool> {
    match value {
        DataType::Boolean(Some(v)) => Ok(*v),
        DataType::Int32(Some(v)) => Ok(*v != 0),
        DataType::Int64(Some(v)) => Ok(*v != 0),
        _ => bail!("expected boolean data type"),
    }
}

fn as_i64(value: &DataType) -> Result<i64> {
    match value {
        DataType::Int32(Some(v)) => Ok(i64::from(*v)),
        DataType::Int64(Some(v)) => Ok(*v),
        DataType::Uint32(Some(v)) => Ok(i64::from(*v)),
        DataType::Uint64(Some(v)) => Ok(i64::try_from(*v)?),
        DataType::Boolean(Some(v)) => Ok(i64::from(*v)),
        _ => bail!("expected integer data type"),
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(value: &DataType) -> Result<f64> {
    match value {
        DataType::Float(Some(v)) => Ok(f64::from(*v)),
        DataType::Double(Some(v)) => Ok(*v),
        DataType::Int32(Some(v)) => Ok(f64::from(*v)),
        DataType::Int64(Some(v)) => Ok(*v as f64),
        _ => bail!("expected floating point data type"),
    }
}

fn as_string(value: &DataType) -> Result<String> {
    match value {
        DataType::Str(Some(raw))
        | DataType::Date(Some(raw))
        | DataType::Time(Some(raw))
        | DataType::Timestamp(Some(raw)) => Ok(raw.clone()),
        _ => bail!("expected string data type"),
    }
}

fn as_binary(value: &DataType) -> Result<Vec<u8>> {
    match value {
        DataType::Binary(Some(bytes)) => Ok(bytes.clone()),
        DataType::Str(Some(raw)) => Ok(raw.clone().into_bytes()),
        _ => bail!("expected binary data type"),
    }
}

const OFFSET_FORMATS: [&str; 3] =
    ["%Y-%m-%d %H:%M:%S%.f %:z", "%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f %z"];

fn as_timestamp(value: &DataType) -> Result<DateTime<Utc>> {
    match value {
        DataType::Timestamp(Some(raw)) | DataType::Str(Some(raw)) => {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
                return Ok(parsed.with_timezone(&Utc));
            }

            for format in OFFSET_FORMATS {
                if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
                    return Ok(parsed.with_timezone(&Utc));
                }
            }

            if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
                return Ok(DateTime::<Utc>::from_naive_utc_and_offset(parsed, Utc));
            }

            bail!(
                "unsupported timestamp: {raw}; expected RFC3339 or \"%Y-%m-%d %H:%M:%S%.f\" format"
            )
        }
        _ => bail!("expected timestamp data type"),
    }
}

fn as_date(value: &DataType) -> Result<NaiveDate> {
    match value {
        DataType::Date(Some(raw)) | DataType::Str(Some(raw)) => {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_e| anyhow!("unsupported date: {raw}; expected \"%Y-%m-%d\" format"))
        }
        _ => bail!("expected date data type"),
    }
}

//! Shared entity handles and association containers.
//!
//! A [`Record`] is the unit of identity and exclusivity. It carries two
//! locks: the operation lock serializes session operations on one instance
//! for the whole call, and the entity lock guards the fields. Engines take an
//! entity lock only while reading or writing that one entity and never hold
//! it while locking another shared instance, so operations on distinct
//! instances never wait on each other. Association fields hold records
//! (`Option<Record<T>>` or [`Related<T>`]), so an entity graph may contain
//! cycles.

use std::fmt;
use std::sync::Arc;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use sea_query::Value;

use crate::entity::Entity;
use crate::query::literal;
use crate::schema::{Association, Schema};
use crate::Row;

struct Slot<E> {
    operation: Mutex<()>,
    entity: Mutex<E>,
}

/// Shared handle to an entity instance guarded by per-instance locks.
///
/// Clones share the same instance.
pub struct Record<E>(Arc<Slot<E>>);

impl<E: Entity> Record<E> {
    /// Wrap an entity.
    #[must_use]
    pub fn new(entity: E) -> Self {
        Self(Arc::new(Slot {
            operation: Mutex::new(()),
            entity: Mutex::new(entity),
        }))
    }

    /// Acquire the entity lock.
    ///
    /// The lock is not reentrant: do not hold the guard while calling a
    /// session operation that reaches the same record.
    pub fn lock(&self) -> MutexGuard<'_, E> {
        self.0.entity.lock()
    }

    /// Primary key.
    #[must_use]
    pub fn key(&self) -> i64 {
        self.0.entity.lock().key()
    }

    /// Whether both handles point at the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Serialize one session operation on this instance.
    pub(crate) fn operation(&self) -> MutexGuard<'_, ()> {
        self.0.operation.lock()
    }
}

impl<E> Clone for Record<E> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<E: Entity> Default for Record<E> {
    fn default() -> Self {
        Self::new(E::default())
    }
}

impl<E: Entity> From<E> for Record<E> {
    fn from(entity: E) -> Self {
        Self::new(entity)
    }
}

impl<E: Entity + fmt::Debug> fmt::Debug for Record<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // cyclic graphs would otherwise recurse forever
        match self.0.entity.try_lock() {
            Some(entity) => f.debug_tuple("Record").field(&*entity).finish(),
            None => f.debug_tuple("Record").field(&format_args!("<locked>")).finish(),
        }
    }
}

/// Equality of the rendered representation: table plus scalar values.
/// Distinct instances with the same values are equal.
impl<E: Entity> PartialEq for Record<E> {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let left = render(&*self.0.entity.lock());
        left == render(&*other.0.entity.lock())
    }
}

impl<E: Entity> fmt::Display for Record<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(&*self.0.entity.lock()))
    }
}

/// `table(id=1 AND name='Ann')`; the key is left out while unset.
pub(crate) fn render(model: &dyn Model) -> String {
    let schema = model.descriptor();
    let mut pairs = Vec::new();
    let key = model.primary_key();
    if key > 0 {
        pairs.push(format!("{}={key}", schema.primary_key()));
    }
    for (column, value) in model.scalars() {
        pairs.push(format!("{column}={}", literal(&value)));
    }
    format!("{}({})", schema.table, pairs.join(" AND "))
}

/// Collection-valued association bound to its owner through the entity
/// declaration. Order is preserved.
pub struct Related<T>(Vec<Record<T>>);

impl<T: Entity> Related<T> {
    /// Append a member.
    pub fn push(&mut self, record: Record<T>) {
        self.0.push(record);
    }

    /// Members in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Record<T>> {
        self.0.iter()
    }

    /// Member at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Record<T>> {
        self.0.get(index)
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remove the member at `index`. The row itself is not touched.
    pub fn remove(&mut self, index: usize) -> Record<T> {
        self.0.remove(index)
    }

    /// Drop every member. Rows are not touched.
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl<T> Default for Related<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Clone for Related<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Entity + fmt::Debug> fmt::Debug for Related<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl<'a, T: Entity> IntoIterator for &'a Related<T> {
    type IntoIter = std::slice::Iter<'a, Record<T>>;
    type Item = &'a Record<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<T: Entity> FromIterator<Record<T>> for Related<T> {
    fn from_iter<I: IntoIterator<Item = Record<T>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Object-safe view of an entity, used by the engines to walk graphs of
/// mixed types. Implemented for every [`Entity`].
pub trait Model {
    /// Schema of the concrete type.
    fn descriptor(&self) -> &'static Schema;
    /// Primary key.
    fn primary_key(&self) -> i64;
    /// Set the primary key.
    fn assign_key(&mut self, key: i64);
    /// Non-key scalar values.
    fn scalars(&self) -> Vec<(&'static str, Value)>;
    /// See [`Entity::apply_row`].
    ///
    /// # Errors
    ///
    /// Returns an error if a column cannot be converted.
    fn copy_row(&mut self, row: &Row, only: Option<&str>) -> anyhow::Result<()>;
    /// The value held by an association field.
    fn related(&self, association: &Association) -> Option<&dyn Relation>;
    /// The value held by an association field, mutably.
    fn related_mut(&mut self, association: &Association) -> Option<&mut dyn Relation>;
}

impl<E: Entity> Model for E {
    fn descriptor(&self) -> &'static Schema {
        E::schema()
    }

    fn primary_key(&self) -> i64 {
        self.key()
    }

    fn assign_key(&mut self, key: i64) {
        self.set_key(key);
    }

    fn scalars(&self) -> Vec<(&'static str, Value)> {
        self.values()
    }

    fn copy_row(&mut self, row: &Row, only: Option<&str>) -> anyhow::Result<()> {
        self.apply_row(row, only)
    }

    fn related(&self, association: &Association) -> Option<&dyn Relation> {
        self.relation(association.field)
    }

    fn related_mut(&mut self, association: &Association) -> Option<&mut dyn Relation> {
        self.relation_mut(association.field)
    }
}

/// Type-erased [`Record`].
pub trait Node: Send + Sync {
    /// Stable identity of the shared instance.
    fn identity(&self) -> usize;
    /// Acquire the instance lock.
    fn lock(&self) -> MappedMutexGuard<'_, dyn Model>;
}

impl<E: Entity> Node for Record<E> {
    fn identity(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }

    fn lock(&self) -> MappedMutexGuard<'_, dyn Model> {
        MutexGuard::map(self.0.entity.lock(), erase::<E>)
    }
}

fn erase<E: Entity>(entity: &mut E) -> &mut (dyn Model + 'static) {
    entity
}

/// Value held by an association field.
pub trait Relation: Send {
    /// Handles to the current members (zero or one for single-valued
    /// associations), usable after the owner's lock is released.
    fn members(&self) -> Vec<Box<dyn Node>>;

    /// Replace the contents with `count` fresh default members and return
    /// handles to them. Single-valued associations keep at most one.
    fn reset(&mut self, count: usize) -> Vec<Box<dyn Node>>;
}

impl<T: Entity> Relation for Option<Record<T>> {
    fn members(&self) -> Vec<Box<dyn Node>> {
        self.iter().map(|record| Box::new(record.clone()) as Box<dyn Node>).collect()
    }

    fn reset(&mut self, count: usize) -> Vec<Box<dyn Node>> {
        if count == 0 {
            *self = None;
            return Vec::new();
        }
        let record = Record::<T>::default();
        *self = Some(record.clone());
        vec![Box::new(record)]
    }
}

impl<T: Entity> Relation for Related<T> {
    fn members(&self) -> Vec<Box<dyn Node>> {
        self.0.iter().map(|record| Box::new(record.clone()) as Box<dyn Node>).collect()
    }

    fn reset(&mut self, count: usize) -> Vec<Box<dyn Node>> {
        self.0 = (0..count).map(|_| Record::<T>::default()).collect();
        self.0.iter().map(|record| Box::new(record.clone()) as Box<dyn Node>).collect()
    }
}

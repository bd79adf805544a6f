//! Read-only introspection shared by the set and the registries.

use core::fmt;

/// What a debugger or tooling collaborator may read from a collection.
pub trait CollectionView {
    type Item;

    /// Number of live values.
    fn len(&self) -> usize;

    /// Current backing capacity (always prime).
    fn capacity(&self) -> usize;

    /// Copy of the live values in current storage order.
    fn snapshot(&self) -> Vec<Self::Item>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared `Debug` body: `Name { len, capacity, items }`.
pub(crate) fn fmt_collection<C>(f: &mut fmt::Formatter<'_>, name: &str, c: &C) -> fmt::Result
where
    C: CollectionView + ?Sized,
    C::Item: fmt::Debug,
{
    f.debug_struct(name)
        .field("len", &c.len())
        .field("capacity", &c.capacity())
        .field("items", &c.snapshot())
        .finish()
}

//! DenseHashSet: chained hash set with caller-supplied hashes, dense entry
//! storage and an enumeration guard.
//!
//! Layout
//! - `buckets[hash % capacity]` holds a one-based link to the most recently
//!   inserted live entry of that bucket (`0` = empty).
//! - `entries[0..len)` are the live entries, packed with no holes. Each entry
//!   links to the next-older entry of its bucket through `prev`.
//! - Removal unlinks the entry, then moves the last entry into the hole and
//!   rewrites the single link that pointed at it.

use crate::error::SetError;
use crate::guard::{EnumerationFlag, EnumerationGuard};
use crate::prime::{self, DEFAULT_CAPACITY, MAX_CAPACITY};
use crate::view::{self, CollectionView};
use core::cell::{RefCell, RefMut};
use core::fmt;
use core::iter::FusedIterator;
use tracing::{debug, error};

/// One-based index into `entries`; `NIL` ends a chain or marks an empty bucket.
type Link = u32;
const NIL: Link = 0;

#[inline]
fn link(index: usize) -> Link {
    // index < capacity <= MAX_CAPACITY < u32::MAX
    (index + 1) as Link
}

#[inline]
fn index_of(link: Link) -> Option<usize> {
    link.checked_sub(1).map(|i| i as usize)
}

#[derive(Debug)]
struct Entry<T> {
    value: T,
    hash: u32,
    prev: Link,
}

struct Table<T> {
    buckets: Box<[Link]>,
    // Reserved to exactly `capacity`; never reallocates outside `grow`.
    entries: Vec<Entry<T>>,
    capacity: usize,
}

impl<T> Table<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buckets: vec![NIL; capacity].into_boxed_slice(),
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[inline]
    fn bucket_of(&self, hash: u32) -> usize {
        hash as usize % self.capacity
    }

    fn corrupt(&self, bucket: usize) -> SetError {
        error!(
            bucket,
            capacity = self.capacity,
            len = self.entries.len(),
            "collision chain exceeded table capacity"
        );
        SetError::Corruption {
            bucket,
            capacity: self.capacity,
        }
    }

    /// Append a value known to be absent, growing first when full.
    fn push(&mut self, value: T, hash: u32) -> Result<(), SetError> {
        if self.entries.len() == self.capacity {
            self.grow()?;
        }
        let bucket = self.bucket_of(hash);
        let prev = self.buckets[bucket];
        self.entries.push(Entry { value, hash, prev });
        self.buckets[bucket] = link(self.entries.len() - 1);
        Ok(())
    }

    /// Reallocate at the next prime >= 2x and rethread every chain in index
    /// order, which replays the original insertion order per bucket.
    fn grow(&mut self) -> Result<(), SetError> {
        if self.capacity >= MAX_CAPACITY {
            return Err(SetError::CapacityExhausted { max: MAX_CAPACITY });
        }
        let capacity = prime::grown(self.capacity);
        let mut entries = Vec::with_capacity(capacity);
        entries.append(&mut self.entries);
        let mut buckets = vec![NIL; capacity].into_boxed_slice();
        for (i, entry) in entries.iter_mut().enumerate() {
            let bucket = entry.hash as usize % capacity;
            entry.prev = buckets[bucket];
            buckets[bucket] = link(i);
        }
        debug!(
            from = self.capacity,
            to = capacity,
            len = entries.len(),
            "grew dense hash set"
        );
        self.buckets = buckets;
        self.entries = entries;
        self.capacity = capacity;
        Ok(())
    }

    /// Move the last entry into `index` and drop the vacated tail slot.
    /// `index` must already be unlinked from its chain.
    fn compact(&mut self, index: usize) -> Result<T, SetError> {
        let last = self.entries.len() - 1;
        if index != last {
            self.relink(last, index)?;
        }
        Ok(self.entries.swap_remove(index).value)
    }

    /// Rewrite the one link that references entry `from` to reference `to`.
    fn relink(&mut self, from: usize, to: usize) -> Result<(), SetError> {
        let bucket = self.bucket_of(self.entries[from].hash);
        let (old, new) = (link(from), link(to));
        if self.buckets[bucket] == old {
            self.buckets[bucket] = new;
            return Ok(());
        }
        let mut cur = self.buckets[bucket];
        let mut hops = 0;
        while let Some(i) = index_of(cur) {
            let Some(entry) = self.entries.get_mut(i) else {
                break;
            };
            if entry.prev == old {
                entry.prev = new;
                return Ok(());
            }
            cur = entry.prev;
            hops += 1;
            if hops > self.capacity {
                break;
            }
        }
        // `from` is live, so it must be reachable from its own bucket.
        Err(self.corrupt(bucket))
    }
}

impl<T: PartialEq> Table<T> {
    fn find(&self, value: &T, hash: u32) -> Result<Option<usize>, SetError> {
        let bucket = self.bucket_of(hash);
        let mut cur = self.buckets[bucket];
        let mut hops = 0;
        while let Some(i) = index_of(cur) {
            let Some(entry) = self.entries.get(i) else {
                return Err(self.corrupt(bucket));
            };
            if entry.value == *value {
                return Ok(Some(i));
            }
            cur = entry.prev;
            hops += 1;
            if hops > self.capacity {
                return Err(self.corrupt(bucket));
            }
        }
        Ok(None)
    }

    fn remove(&mut self, value: &T, hash: u32) -> Result<Option<T>, SetError> {
        let bucket = self.bucket_of(hash);
        let mut prev: Option<usize> = None;
        let mut cur = self.buckets[bucket];
        let mut hops = 0;
        while let Some(i) = index_of(cur) {
            let Some(entry) = self.entries.get(i) else {
                return Err(self.corrupt(bucket));
            };
            let next = entry.prev;
            if entry.value == *value {
                match prev {
                    None => self.buckets[bucket] = next,
                    Some(p) => self.entries[p].prev = next,
                }
                return self.compact(i).map(Some);
            }
            hops += 1;
            if hops > self.capacity {
                return Err(self.corrupt(bucket));
            }
            prev = Some(i);
            cur = next;
        }
        Ok(None)
    }
}

/// Hash set storing unique values under externally supplied 32-bit hashes.
///
/// The set never hashes on its own: every `insert`/`remove`/`contains` call
/// passes the hash, and the same value must always be passed with the same
/// hash. Values live in a dense array, so enumeration touches exactly `len`
/// slots. Capacity is prime, starts at the requested size rounded up, and
/// only grows.
///
/// All operations take `&self`. While an [`Enumerator`] is open, `insert`
/// and `remove` fail with [`SetError::ConcurrentModification`] instead of
/// mutating storage the enumeration reads.
pub struct DenseHashSet<T> {
    table: RefCell<Table<T>>,
    enumeration: EnumerationFlag,
}

impl<T> DenseHashSet<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a set whose capacity is the smallest prime `>= requested`
    /// (and `>= 2`).
    ///
    /// # Panics
    /// If `requested` exceeds [`MAX_CAPACITY`](crate::prime::MAX_CAPACITY).
    pub fn with_capacity(requested: usize) -> Self {
        match Self::try_with_capacity(requested) {
            Ok(set) => set,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn try_with_capacity(requested: usize) -> Result<Self, SetError> {
        if requested > MAX_CAPACITY {
            return Err(SetError::InvalidArgument(
                "requested capacity exceeds MAX_CAPACITY",
            ));
        }
        Ok(Self {
            table: RefCell::new(Table::with_capacity(prime::capacity_for(requested))),
            enumeration: EnumerationFlag::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.table.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.table.borrow().capacity
    }

    pub fn is_enumerating(&self) -> bool {
        self.enumeration.is_open()
    }

    fn table_mut(&self) -> Result<RefMut<'_, Table<T>>, SetError> {
        if let Err(e) = self.enumeration.ensure_closed() {
            debug!("mutation rejected while enumeration is open");
            return Err(e);
        }
        // Fails only when reentered from `T: PartialEq` mid-mutation.
        self.table
            .try_borrow_mut()
            .map_err(|_| SetError::ConcurrentModification)
    }

    /// Insert `value` under `hash`.
    ///
    /// Fails with `DuplicateValue` if an equal value is present; the set is
    /// left untouched, capacity included. O(1) average, O(len) when growing.
    pub fn insert(&self, value: T, hash: u32) -> Result<(), SetError>
    where
        T: PartialEq,
    {
        let mut table = self.table_mut()?;
        if table.find(&value, hash)?.is_some() {
            return Err(SetError::DuplicateValue);
        }
        table.push(value, hash)
    }

    /// Remove the value equal to `value` stored under `hash`.
    ///
    /// Returns the removed value, or `None` when nothing matched; removing an
    /// absent value is a no-op, not an error. The last live entry is moved
    /// into the freed slot, so storage order changes after a removal.
    pub fn remove(&self, value: &T, hash: u32) -> Result<Option<T>, SetError>
    where
        T: PartialEq,
    {
        // The RefMut is released before the caller drops the returned value.
        let removed = self.table_mut()?.remove(value, hash)?;
        if removed.is_none() {
            debug!(hash, "remove of absent value ignored");
        }
        Ok(removed)
    }

    pub fn contains(&self, value: &T, hash: u32) -> Result<bool, SetError>
    where
        T: PartialEq,
    {
        Ok(self.table.borrow().find(value, hash)?.is_some())
    }

    /// Open an enumeration over the values present right now.
    ///
    /// Raises the guard until the enumerator is exhausted or dropped. Only
    /// one enumeration may be open at a time.
    pub fn enumerate(&self) -> Result<Enumerator<'_, T>, SetError> {
        let guard = self.enumeration.open()?;
        let count = match self.table.try_borrow() {
            Ok(table) => table.entries.len(),
            Err(_) => return Err(SetError::ConcurrentModification),
        };
        Ok(Enumerator {
            set: self,
            index: 0,
            count,
            guard: Some(guard),
        })
    }

    /// Copy the live values in current storage order. Ignores the guard.
    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.table
            .borrow()
            .entries
            .iter()
            .map(|e| e.value.clone())
            .collect()
    }
}

impl<T> Default for DenseHashSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> CollectionView for DenseHashSet<T> {
    type Item = T;

    fn len(&self) -> usize {
        DenseHashSet::len(self)
    }

    fn capacity(&self) -> usize {
        DenseHashSet::capacity(self)
    }

    fn snapshot(&self) -> Vec<T> {
        DenseHashSet::snapshot(self)
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for DenseHashSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        view::fmt_collection(f, "DenseHashSet", self)
    }
}

/// Single-pass enumeration over the values present when it was opened.
///
/// Yields clones; for `Rc`-backed values a clone is a count bump. The guard
/// is lowered when the last value has been yielded or the enumerator is
/// dropped, whichever comes first.
pub struct Enumerator<'a, T> {
    set: &'a DenseHashSet<T>,
    index: usize,
    count: usize,
    guard: Option<EnumerationGuard<'a>>,
}

impl<'a, T> Enumerator<'a, T> {
    /// End the enumeration early.
    pub fn release(mut self) {
        self.guard = None;
    }
}

impl<'a, T: Clone> Iterator for Enumerator<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.index < self.count {
            // Mutation is refused while the guard is up, so the table cannot
            // be mutably borrowed here.
            let value = self.set.table.borrow().entries[self.index].value.clone();
            self.index += 1;
            Some(value)
        } else {
            self.guard = None;
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.count - self.index;
        (n, Some(n))
    }
}

impl<'a, T: Clone> ExactSizeIterator for Enumerator<'a, T> {}
impl<'a, T: Clone> FusedIterator for Enumerator<'a, T> {}

#[cfg(test)]
impl<T: PartialEq> DenseHashSet<T> {
    /// Check every structural invariant; panics with a description on failure.
    pub(crate) fn assert_invariants(&self) {
        let t = self.table.borrow();
        assert!(prime::is_prime(t.capacity), "capacity {} not prime", t.capacity);
        assert!(t.capacity >= prime::MIN_CAPACITY);
        assert!(t.entries.len() <= t.capacity);
        assert_eq!(t.buckets.len(), t.capacity);
        assert!(t.entries.capacity() >= t.capacity);

        let mut seen = vec![0usize; t.entries.len()];
        for (b, &head) in t.buckets.iter().enumerate() {
            let mut cur = head;
            let mut hops = 0;
            while let Some(i) = index_of(cur) {
                assert!(i < t.entries.len(), "bucket {b} links past len");
                assert_eq!(t.bucket_of(t.entries[i].hash), b, "entry {i} in wrong chain");
                seen[i] += 1;
                cur = t.entries[i].prev;
                hops += 1;
                assert!(hops <= t.capacity, "chain {b} longer than capacity");
            }
        }
        assert!(seen.iter().all(|&n| n == 1), "entries not reachable exactly once: {seen:?}");

        for i in 0..t.entries.len() {
            for j in (i + 1)..t.entries.len() {
                assert!(t.entries[i].value != t.entries[j].value, "duplicate at {i} and {j}");
            }
        }
    }

    /// Raw `(buckets, (hash, prev) per entry, capacity)`.
    pub(crate) fn raw_layout(&self) -> (Vec<Link>, Vec<(u32, Link)>, usize) {
        let t = self.table.borrow();
        (
            t.buckets.to_vec(),
            t.entries.iter().map(|e| (e.hash, e.prev)).collect(),
            t.capacity,
        )
    }

    /// Point entry 0 at itself, forming a cycle in its chain.
    pub(crate) fn corrupt_first_link(&self) {
        let mut t = self.table.borrow_mut();
        t.entries[0].prev = link(0);
    }
}

//! Enumeration guard.
//!
//! Single-threaded flag that marks a set as being enumerated. While the flag
//! is raised, mutation fails fast instead of touching storage an iteration is
//! reading. This is a reentrancy check, not a lock: it is a plain flag, so a
//! second enumeration cannot be opened on top of the first.

use crate::error::SetError;
use core::cell::Cell;
use core::marker::PhantomData;

/// Per-instance enumeration flag. Embed this in a collection and open it with
/// `let _g = self.guard.open()?;`.
#[derive(Debug)]
pub struct EnumerationFlag {
    open: Cell<bool>,
    // Keep !Send + !Sync in line with single-threaded design.
    _nosend: PhantomData<*mut ()>,
}

impl EnumerationFlag {
    /// Create a lowered flag. Const so it can be a field default.
    pub const fn new() -> Self {
        Self {
            open: Cell::new(false),
            _nosend: PhantomData,
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    /// Fails with `ConcurrentModification` while an enumeration is open.
    #[inline]
    pub fn ensure_closed(&self) -> Result<(), SetError> {
        if self.open.get() {
            Err(SetError::ConcurrentModification)
        } else {
            Ok(())
        }
    }

    /// Raise the flag. Fails if it is already raised.
    #[inline]
    pub fn open(&self) -> Result<EnumerationGuard<'_>, SetError> {
        self.ensure_closed()?;
        self.open.set(true);
        Ok(EnumerationGuard { owner: self })
    }
}

impl Default for EnumerationFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard returned by `EnumerationFlag::open`; lowers the flag on drop.
#[derive(Debug)]
pub struct EnumerationGuard<'a> {
    owner: &'a EnumerationFlag,
}

impl<'a> Drop for EnumerationGuard<'a> {
    fn drop(&mut self) {
        debug_assert!(self.owner.open.get());
        self.owner.open.set(false);
    }
}

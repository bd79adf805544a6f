//! Error type shared by the set and the registries built on it.

/// Failure modes of `DenseHashSet` and the registries.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SetError {
    /// A construction argument was out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The value is already present; the set is unchanged.
    #[error("value is already present in the set")]
    DuplicateValue,
    /// A collision chain was longer than the table capacity. Only reachable
    /// when hashing or link bookkeeping is broken; treat as an assertion.
    #[error("collision chain in bucket {bucket} exceeded capacity {capacity}; the table is corrupt")]
    Corruption { bucket: usize, capacity: usize },
    /// Insert/remove (or a second enumeration) was attempted while an
    /// enumeration of the same set was open.
    #[error("the set was modified while an enumeration was open")]
    ConcurrentModification,
    /// The table is full at the largest supported capacity.
    #[error("capacity cannot grow beyond {max}")]
    CapacityExhausted { max: usize },
}

impl SetError {
    /// True for errors that signal a broken internal invariant.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SetError::Corruption { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::SetError;

    #[test]
    fn only_corruption_is_fatal() {
        assert!(SetError::Corruption {
            bucket: 0,
            capacity: 2
        }
        .is_fatal());
        assert!(!SetError::DuplicateValue.is_fatal());
        assert!(!SetError::ConcurrentModification.is_fatal());
        assert!(!SetError::InvalidArgument("capacity").is_fatal());
        assert!(!SetError::CapacityExhausted { max: 7 }.is_fatal());
    }

    #[test]
    fn messages_name_the_failure() {
        let e = SetError::Corruption {
            bucket: 3,
            capacity: 5,
        };
        assert_eq!(
            e.to_string(),
            "collision chain in bucket 3 exceeded capacity 5; the table is corrupt"
        );
        assert_eq!(
            SetError::ConcurrentModification.to_string(),
            "the set was modified while an enumeration was open"
        );
    }
}

//! Prime capacity sizing.

/// Smallest capacity a table may have.
pub const MIN_CAPACITY: usize = 2;

/// Capacity requested by `new()`.
pub const DEFAULT_CAPACITY: usize = 7;

/// Multiplier applied to the capacity before rounding up on growth.
pub const GROWTH_FACTOR: usize = 2;

/// Largest supported capacity. `2^31 - 1` is prime, and keeps one-based
/// `u32` links from overflowing.
pub const MAX_CAPACITY: usize = 2_147_483_647;

/// Trial division up to the square root.
pub fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    let mut d = 2;
    while d <= n / d {
        if n % d == 0 {
            return false;
        }
        d += 1;
    }
    true
}

/// Smallest prime `>= max(requested, MIN_CAPACITY)`.
///
/// Callers keep `requested <= MAX_CAPACITY`; since `MAX_CAPACITY` is prime
/// the result never exceeds it.
pub fn capacity_for(requested: usize) -> usize {
    let mut n = requested.max(MIN_CAPACITY);
    while !is_prime(n) {
        n += 1;
    }
    n
}

/// Capacity after one growth step from `current`, clamped to `MAX_CAPACITY`.
pub(crate) fn grown(current: usize) -> usize {
    capacity_for(current.saturating_mul(GROWTH_FACTOR).min(MAX_CAPACITY))
}

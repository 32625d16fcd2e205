//! Equality Functions
//!
//! `Atom::set` skips notification when the new value is "the same" as the
//! current one. What "the same" means is decided by the atom's equality
//! function, chosen at creation time.

/// Signature of an atom's equality gate.
pub type EqualityFn<T> = fn(&T, &T) -> bool;

/// Default equality, using `PartialEq`.
pub fn equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

/// Never considers two values equal, so every `set` notifies.
///
/// Useful for values without a meaningful `PartialEq`, or when every write
/// should be treated as a fresh value.
pub fn never_equal<T>(_: &T, _: &T) -> bool {
    false
}

/// `f64` equality that treats NaN as equal to NaN.
///
/// With plain `PartialEq`, setting NaN over NaN would notify on every write.
pub fn f64_equals_nan_safe(a: &f64, b: &f64) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a == b
}

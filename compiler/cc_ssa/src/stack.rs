//! Stack safety for the recursive AST walks.
//!
//! Statement and expression nesting depth is controlled by the user's
//! source, so lowering grows the stack on demand instead of overflowing.

/// Grow the stack if less than 256KB remains, allocating 2MB segments.
#[inline]
pub(crate) fn ensure_sufficient_stack<R, F: FnOnce() -> R>(f: F) -> R {
    stacker::maybe_grow(256 * 1024, 2 * 1024 * 1024, f)
}

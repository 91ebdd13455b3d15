//! Arena indices for the flattened function AST.
//!
//! Statements, expressions and local variables are referenced by `u32`
//! newtypes rather than boxes: equality is an integer compare and the
//! nodes live contiguously in one [`AstArena`](crate::AstArena).

use std::fmt;

macro_rules! define_index {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Create an index from its raw value.
            #[inline]
            pub const fn new(raw: u32) -> Self {
                $name(raw)
            }

            /// Get the raw `u32` value.
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            /// Get the index as `usize` (for indexing into `Vec`s).
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

define_index!(
    /// Index into the expression arena.
    ExprId
);

define_index!(
    /// Index into the statement arena.
    StmtId
);

define_index!(
    /// Resolved identity of one local declaration (or parameter).
    ///
    /// Scoping is resolved before lowering: two declarations that share a
    /// spelling in different scopes get different `VarId`s. The id is
    /// stable across every SSA version of the variable.
    VarId
);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_roundtrip() {
        let id = StmtId::new(7);
        assert_eq!(id.raw(), 7);
        assert_eq!(id.index(), 7);
        assert_eq!(format!("{id:?}"), "StmtId(7)");
    }

    #[test]
    fn var_display() {
        assert_eq!(VarId::new(3).to_string(), "%3");
        assert!(VarId::new(1) < VarId::new(2));
    }
}

//! Source-level types for the C front end.
//!
//! This crate holds what the parser hands to the middle end:
//! - [`Span`] byte ranges for diagnostics
//! - [`Name`] interned identifiers and the [`StringInterner`]
//! - the flattened function AST ([`AstArena`], [`StmtId`], [`ExprId`])
//! - resolved local variable identities ([`VarId`], [`VarTable`])
//! - [`FunctionBuilder`] for constructing function bodies without a parser
//!
//! # Design
//!
//! - **Intern everything**: labels, callees and variable spellings are `Name(u32)`
//! - **Flatten everything**: no `Box<Stmt>`, nodes are `u32` indices into an arena

/// Compile-time assertion that a type has a specific size.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

pub mod ast;
mod builder;
mod ids;
mod interner;
mod name;
mod span;

pub use ast::{
    AstArena, BinaryOp, Declarator, Expr, ExprKind, ForInit, FunctionDef, IncDecKind, Stmt,
    StmtKind, UnaryOp, VarInfo, VarTable,
};
pub use builder::FunctionBuilder;
pub use ids::{ExprId, StmtId, VarId};
pub use interner::{InternError, StringInterner};
pub use name::Name;
pub use span::Span;

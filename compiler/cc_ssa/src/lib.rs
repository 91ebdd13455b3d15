//! Control-flow graph construction and SSA conversion for the C middle end.
//!
//! One function at a time, this crate turns the parser's flattened AST into
//! a CFG in static single assignment form:
//!
//! 1. **Lowering** ([`lower_function`]): statements become basic blocks
//!    ending in [`Jump`]s; expressions become primitive [`Instr`]s.
//! 2. **Cleanup** ([`cleanup`]): empty blocks are bypassed and unreachable
//!    blocks removed. Dead statements are reported as regions.
//! 3. **Ordering** ([`compute_order`]): postorder numbering of reachable blocks.
//! 4. **Dominance** ([`compute_dominance`]): the [`DominatorTree`] and each
//!    block's dominance frontier.
//! 5. **Phi insertion** ([`insert_phis`]): phis on the iterated dominance
//!    frontier of each variable's definition sites.
//! 6. **Renaming** ([`rename_variables`]): every definition gets a fresh
//!    version; every use is bound to the definition that reaches it.
//!
//! [`build_ssa`] runs the whole pipeline. [`compute_liveness`] and the
//! verifier ([`verify`]) operate on its output.
//!
//! # Design
//!
//! - Blocks live in an arena indexed by [`BlockId`]; [`Cfg::connect`] is the
//!   only way to change an edge, so predecessor sets never go stale.
//! - Impossible edges keep dead placeholder blocks attached to the graph
//!   without letting control flow into them.
//! - Every pass returns `Result<_, Ice>`: an [`Ice`] is an internal compiler
//!   error, never a user-facing diagnostic.

mod cfg;
mod cleanup;
mod defs;
mod dominance;
mod error;
pub mod ir;
pub mod liveness;
mod lower;
mod order;
mod phi;
mod pipeline;
mod rename;
mod stack;
mod verify;

#[cfg(test)]
mod test_helpers;

pub use cfg::{BasicBlock, Cfg};
pub use cleanup::{cleanup, CleanupReport};
pub use defs::DefSites;
pub use dominance::{compute_dominance, DominatorTree};
pub use error::Ice;
pub use ir::{BlockId, Instr, Jump, Operand, PhiFunction, SsaVar, TempId};
pub use liveness::{compute_liveness, BlockLiveness, LiveSet};
pub use lower::lower_function;
pub use order::compute_order;
pub use phi::insert_phis;
pub use pipeline::{build_ssa, PipelineConfig};
pub use rename::rename_variables;
pub use verify::{verify, verify_ssa, verify_structure};

//! Shared test utilities for the SSA passes.
//!
//! Only compiled in test builds.

use cc_ir::{FunctionBuilder, StmtId};

use crate::cfg::Cfg;
use crate::cleanup::cleanup;
use crate::dominance::compute_dominance;
use crate::ir::BlockId;
use crate::lower::lower_function;
use crate::order::compute_order;

/// Shorthand for `BlockId::new(n)`.
pub(crate) fn b(n: u32) -> BlockId {
    BlockId::new(n)
}

/// Lower and clean up.
#[allow(clippy::unwrap_used)]
pub(crate) fn cleaned(fb: FunctionBuilder<'_>, body: StmtId) -> Cfg {
    let (def, arena) = fb.finish(body);
    let mut cfg = lower_function(&def, &arena).unwrap();
    cleanup(&mut cfg);
    cfg
}

/// Lower, clean up, order and compute dominance: ready for phi insertion.
#[allow(clippy::unwrap_used)]
pub(crate) fn analyzed(fb: FunctionBuilder<'_>, body: StmtId) -> Cfg {
    let mut cfg = cleaned(fb, body);
    compute_order(&mut cfg).unwrap();
    compute_dominance(&mut cfg).unwrap();
    cfg
}

/// Human-readable dump for assertion messages.
pub(crate) fn dump(cfg: &Cfg) -> String {
    cfg.to_string()
}

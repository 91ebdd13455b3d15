//! Jump targets visible at a point in the statement walk.

use cc_ir::StmtId;
use rustc_hash::FxHashMap;

use crate::ir::BlockId;

/// Where `break`, `continue` and `case` labels transfer control.
///
/// Passed down the walk by value: entering a loop or switch produces a
/// modified copy, so leaving it restores the outer targets automatically.
/// Labels are function-scoped and live on the lowerer instead.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct LoweringContext<'c> {
    pub(crate) break_target: Option<BlockId>,
    pub(crate) continue_target: Option<BlockId>,
    /// Block for each `case`/`default` statement of the innermost switch.
    pub(crate) cases: Option<&'c FxHashMap<StmtId, BlockId>>,
}

impl<'c> LoweringContext<'c> {
    /// Context inside a loop body.
    pub(crate) fn in_loop(self, break_target: BlockId, continue_target: BlockId) -> Self {
        Self {
            break_target: Some(break_target),
            continue_target: Some(continue_target),
            ..self
        }
    }

    /// Context inside a switch body. `continue` still targets the enclosing loop.
    pub(crate) fn in_switch(
        self,
        break_target: BlockId,
        cases: &'c FxHashMap<StmtId, BlockId>,
    ) -> Self {
        Self {
            break_target: Some(break_target),
            continue_target: self.continue_target,
            cases: Some(cases),
        }
    }
}

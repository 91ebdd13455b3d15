//! Where each source variable is declared and defined.

use std::collections::BTreeSet;

use cc_ir::VarId;

use crate::cfg::Cfg;
use crate::error::Ice;
use crate::ir::{BlockId, Instr};

/// Definition sites of every variable over the reachable blocks.
///
/// A declaration counts as a definition site even though it assigns
/// nothing: the variable holds an indeterminate value from that point, and
/// that value is what merges with later assignments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DefSites {
    blocks: Vec<BTreeSet<BlockId>>,
    declared_in: Vec<Option<BlockId>>,
}

impl DefSites {
    /// Scan the reachable blocks. Requires cleanup.
    pub fn collect(cfg: &Cfg) -> Result<Self, Ice> {
        let Some(reachable) = cfg.reachable() else {
            return Err(Ice::PassOrder {
                pass: "DefSites::collect",
                missing: "cleanup",
            });
        };

        let num_vars = cfg.num_vars();
        let mut sites = Self {
            blocks: vec![BTreeSet::new(); num_vars],
            declared_in: vec![None; num_vars],
        };
        let check = |var: VarId| {
            if var.index() < num_vars {
                Ok(var.index())
            } else {
                Err(Ice::UnknownVariable { var })
            }
        };

        for &id in reachable {
            for instr in &cfg.block(id).instrs {
                match instr {
                    Instr::Declare { var } => {
                        let index = check(*var)?;
                        if sites.declared_in[index].is_some() {
                            return Err(Ice::DuplicateDeclaration { var: *var });
                        }
                        sites.declared_in[index] = Some(id);
                        sites.blocks[index].insert(id);
                    }
                    Instr::Param { dst, .. } | Instr::Assign { dst, .. } => {
                        let index = check(dst.var)?;
                        sites.blocks[index].insert(id);
                    }
                    Instr::Copy { .. }
                    | Instr::Unary { .. }
                    | Instr::Binary { .. }
                    | Instr::Call { .. } => {}
                }
            }
        }
        Ok(sites)
    }

    /// Blocks that declare or assign `var`.
    pub fn blocks(&self, var: VarId) -> &BTreeSet<BlockId> {
        &self.blocks[var.index()]
    }

    /// The block holding `var`'s declaration. `None` for parameters and for
    /// variables whose declaration is unreachable.
    pub fn declaring_block(&self, var: VarId) -> Option<BlockId> {
        self.declared_in[var.index()]
    }
}

//! SSA variable renaming.
//!
//! Visits the reachable blocks in dominator-tree preorder. Every definition
//! (phi target, parameter, assignment) gets the next version of its
//! variable and is pushed onto that variable's reaching-definition chain.
//! Every use is bound to the most recent definition on the chain that
//! dominates the use.
//!
//! Chains are append-only: a definition that does not dominate a later
//! lookup is simply skipped, so nothing has to be popped when the walk
//! leaves a subtree.
//!
//! Phi operands are filled from the predecessor side: after a block is
//! renamed, each phi in each live successor receives the definition that
//! reaches the end of this block. A use no definition reaches keeps
//! version 0.

use cc_ir::VarId;
use rustc_hash::FxHashSet;

use crate::cfg::Cfg;
use crate::dominance::{DominatorTree, Point};
use crate::error::Ice;
use crate::ir::{BlockId, Instr, Operand, SsaVar};

/// One definition on a variable's reaching-definition chain.
#[derive(Clone, Copy, Debug)]
struct ReachingDef {
    value: SsaVar,
    block: BlockId,
    point: Point,
    /// Previous definition of the same variable, in creation order.
    prev: Option<u32>,
}

struct Renamer<'d> {
    dom: &'d DominatorTree,
    defs: Vec<ReachingDef>,
    /// Most recent definition of each variable.
    heads: Vec<Option<u32>>,
    /// Last version handed out for each variable.
    versions: Vec<u32>,
}

impl<'d> Renamer<'d> {
    fn new(dom: &'d DominatorTree, num_vars: usize) -> Self {
        Self {
            dom,
            defs: Vec::new(),
            heads: vec![None; num_vars],
            versions: vec![0; num_vars],
        }
    }

    fn slot(&self, var: VarId) -> Result<usize, Ice> {
        if var.index() < self.heads.len() {
            Ok(var.index())
        } else {
            Err(Ice::UnknownVariable { var })
        }
    }

    /// Create the next version of `var`, defined at `point` in `block`.
    fn define(&mut self, var: VarId, block: BlockId, point: Point) -> Result<SsaVar, Ice> {
        let slot = self.slot(var)?;
        self.versions[slot] += 1;
        let value = SsaVar::new(var, self.versions[slot]);
        let index = u32::try_from(self.defs.len())
            .map_err(|_| Ice::Malformed("too many SSA definitions".to_owned()))?;
        self.defs.push(ReachingDef {
            value,
            block,
            point,
            prev: self.heads[slot],
        });
        self.heads[slot] = Some(index);
        Ok(value)
    }

    /// The version of `var` that reaches `point` in `block`.
    fn lookup(&self, var: VarId, block: BlockId, point: Point) -> Result<SsaVar, Ice> {
        let mut cursor = self.heads[self.slot(var)?];
        while let Some(index) = cursor {
            let def = &self.defs[index as usize];
            if self.dom.reaches((def.block, def.point), (block, point)) {
                return Ok(def.value);
            }
            cursor = def.prev;
        }
        Ok(SsaVar::unversioned(var))
    }

    fn rename_block(&mut self, cfg: &mut Cfg, block: BlockId) -> Result<(), Ice> {
        let bb = cfg.block_mut(block);

        let mut seen = FxHashSet::default();
        for phi in &mut bb.phis {
            let var = phi.var();
            if !seen.insert(var) {
                return Err(Ice::DuplicatePhi { var, block });
            }
            phi.target = self.define(var, block, Point::Phi)?;
        }

        for (index, instr) in (0u32..).zip(bb.instrs.iter_mut()) {
            let point = Point::Instr(index);
            for operand in instr.operands_mut() {
                if let Operand::Var(used) = operand {
                    *used = self.lookup(used.var, block, point)?;
                }
            }
            if let Instr::Declare { var } = instr {
                if self.lookup(*var, block, point)?.is_defined() {
                    return Err(Ice::RedefinedBeforeDeclaration { var: *var, block });
                }
            }
            if let Some(dst) = instr.defined_var_mut() {
                *dst = self.define(dst.var, block, point)?;
            }
        }

        if let Some(Operand::Var(used)) = bb.terminator_operand_mut() {
            *used = self.lookup(used.var, block, Point::End)?;
        }

        let succs = bb.terminator().live_successors();
        for succ in succs {
            for phi in &mut cfg.block_mut(succ).phis {
                let value = self.lookup(phi.var(), block, Point::End)?;
                if !phi.set_incoming(block, value) {
                    return Err(Ice::Malformed(format!(
                        "phi for {} in {succ} has no slot for predecessor {block}",
                        phi.var()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Rename every variable definition and use into SSA form.
///
/// Requires [`compute_dominance`](crate::compute_dominance); phis should
/// already be placed by [`insert_phis`](crate::insert_phis). Returns the
/// number of SSA definitions created.
pub fn rename_variables(cfg: &mut Cfg) -> Result<usize, Ice> {
    let Some(dom) = cfg.dominators.take() else {
        return Err(Ice::PassOrder {
            pass: "rename_variables",
            missing: "compute_dominance",
        });
    };

    let mut renamer = Renamer::new(&dom, cfg.num_vars());
    let mut result = Ok(());
    for &block in dom.preorder() {
        result = renamer.rename_block(cfg, block);
        if result.is_err() {
            break;
        }
    }
    let definitions = renamer.defs.len();
    cfg.dominators = Some(dom);
    result?;

    tracing::debug!(definitions, "renamed variables into SSA form");
    Ok(definitions)
}

//! Consistency checks over the CFG and its SSA form.
//!
//! Neither check repairs anything: the first violation is returned as an
//! [`Ice`]. The pipeline runs both after renaming when verification is on;
//! tests run them after every transformation.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::cfg::Cfg;
use crate::dominance::{live_preds, DominatorTree, Point};
use crate::error::Ice;
use crate::ir::{BlockId, Jump, SsaVar};

/// Run every check that the CFG's current state supports.
///
/// The structural check always runs. Once dominance is known, every
/// reachable block must be in the dominator tree, and the SSA check runs.
pub fn verify(cfg: &Cfg) -> Result<(), Ice> {
    verify_structure(cfg)?;
    let Some(dom) = cfg.dominators() else {
        return Ok(());
    };
    if let Some(reachable) = cfg.reachable() {
        if let Some(&orphan) = reachable.iter().find(|&&id| !dom.contains(id)) {
            return Err(Ice::Malformed(format!(
                "entry does not dominate reachable block {orphan}"
            )));
        }
    }
    verify_ssa(cfg)
}

/// Check the block graph itself.
///
/// - every live block has a terminator
/// - predecessor sets match the terminators that name each block
/// - live successors of a live block are live
/// - after cleanup, the reachable list is closed under live successors
/// - every phi has one slot per live predecessor, and at most one phi
///   exists per variable in a block
pub fn verify_structure(cfg: &Cfg) -> Result<(), Ice> {
    let mut expected: Vec<BTreeSet<BlockId>> = vec![BTreeSet::new(); cfg.num_blocks()];
    for block in cfg.live_blocks() {
        if matches!(block.terminator(), Jump::Missing) {
            return Err(Ice::MissingTerminator { block: block.id });
        }
        for succ in block.terminator().successors() {
            if succ.index() >= cfg.num_blocks() {
                return Err(Ice::Malformed(format!(
                    "{} jumps to nonexistent block {succ}",
                    block.id
                )));
            }
            expected[succ.index()].insert(block.id);
        }
        for succ in block.terminator().live_successors() {
            if cfg.block(succ).is_removed() {
                return Err(Ice::Malformed(format!(
                    "{} jumps to removed block {succ}",
                    block.id
                )));
            }
        }
    }

    for block in cfg.live_blocks() {
        if *block.preds() != expected[block.id.index()] {
            return Err(Ice::Malformed(format!(
                "predecessors of {} are {:?}, terminators say {:?}",
                block.id,
                block.preds(),
                expected[block.id.index()]
            )));
        }

        let preds: Vec<BlockId> = live_preds(cfg, block.id).into_iter().collect();
        let mut seen = FxHashSet::default();
        for phi in &block.phis {
            if !seen.insert(phi.var()) {
                return Err(Ice::DuplicatePhi {
                    var: phi.var(),
                    block: block.id,
                });
            }
            if !phi.preds().eq(preds.iter().copied()) {
                return Err(Ice::Malformed(format!(
                    "phi for {} in {} does not match its live predecessors",
                    phi.var(),
                    block.id
                )));
            }
        }
    }

    if let Some(reachable) = cfg.reachable() {
        let members: FxHashSet<BlockId> = reachable.iter().copied().collect();
        if !members.contains(&cfg.entry()) {
            return Err(Ice::Malformed("entry block is not reachable".to_owned()));
        }
        for &id in reachable {
            let block = cfg.block(id);
            if block.is_removed() {
                return Err(Ice::Malformed(format!("reachable block {id} is removed")));
            }
            for succ in block.terminator().live_successors() {
                if !members.contains(&succ) {
                    return Err(Ice::Malformed(format!(
                        "{succ} is reachable from {id} but not listed"
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Check single assignment and dominance of definitions over uses.
///
/// Requires dominance information. Version 0 ("no reaching definition")
/// is exempt from both checks.
pub fn verify_ssa(cfg: &Cfg) -> Result<(), Ice> {
    let Some(dom) = cfg.dominators() else {
        return Err(Ice::PassOrder {
            pass: "verify_ssa",
            missing: "compute_dominance",
        });
    };

    let defs = collect_definitions(cfg, dom)?;
    let check = |value: SsaVar, block: BlockId, point: Point| -> Result<(), Ice> {
        if !value.is_defined() {
            return Ok(());
        }
        match defs.get(&value) {
            Some(&def) if dom.reaches(def, (block, point)) => Ok(()),
            _ => Err(Ice::NonDominatingDefinition { value, block }),
        }
    };

    for &id in dom.preorder() {
        let block = cfg.block(id);
        for phi in &block.phis {
            for &(pred, value) in &phi.incoming {
                check(value, pred, Point::End)?;
            }
        }
        for (index, instr) in (0u32..).zip(&block.instrs) {
            for used in instr.used_vars() {
                check(used, id, Point::Instr(index))?;
            }
        }
        if let Some(used) = block.terminator().operand().and_then(|op| op.as_var()) {
            check(used, id, Point::End)?;
        }
    }

    tracing::trace!(definitions = defs.len(), "SSA form verified");
    Ok(())
}

/// Where each versioned value is defined; a second definition is an error.
fn collect_definitions(
    cfg: &Cfg,
    dom: &DominatorTree,
) -> Result<FxHashMap<SsaVar, (BlockId, Point)>, Ice> {
    let mut defs = FxHashMap::default();
    let mut record = |value: SsaVar, at: (BlockId, Point)| -> Result<(), Ice> {
        if !value.is_defined() {
            return Err(Ice::Malformed(format!(
                "definition of {value} in {} has no version",
                at.0
            )));
        }
        if defs.insert(value, at).is_some() {
            return Err(Ice::Malformed(format!("{value} is defined twice")));
        }
        Ok(())
    };

    for &id in dom.preorder() {
        let block = cfg.block(id);
        for phi in &block.phis {
            record(phi.target, (id, Point::Phi))?;
        }
        for (index, instr) in (0u32..).zip(&block.instrs) {
            if let Some(dst) = instr.defined_var() {
                record(dst, (id, Point::Instr(index)))?;
            }
        }
    }
    Ok(defs)
}

//! Phi placement on the iterated dominance frontier.
//!
//! For each variable with two or more definition sites, every block in the
//! iterated dominance frontier of those sites gets one phi function, with
//! one incoming slot per live predecessor.
//!
//! Blocks that dominate the variable's declaring block never get a phi for
//! it. A variable declared inside a loop body is a fresh object on every
//! iteration, so the loop header is no merge point for it even though the
//! body's definitions reach it along the back edge. Joins the declaration
//! does not dominate (a `goto` into the scope) still merge normally.

use cc_ir::VarId;
use rustc_hash::FxHashSet;

use crate::cfg::Cfg;
use crate::defs::DefSites;
use crate::dominance::{live_preds, DominatorTree};
use crate::error::Ice;
use crate::ir::{BlockId, PhiFunction};

/// Insert phi functions. Returns how many were added.
///
/// Requires [`compute_dominance`](crate::compute_dominance). Running it
/// again adds nothing: blocks that already have a phi for a variable are
/// skipped.
pub fn insert_phis(cfg: &mut Cfg) -> Result<usize, Ice> {
    if cfg.dominators().is_none() {
        return Err(Ice::PassOrder {
            pass: "insert_phis",
            missing: "compute_dominance",
        });
    }
    let sites = DefSites::collect(cfg)?;
    let Some(dom) = cfg.dominators.take() else {
        return Err(Ice::PassOrder {
            pass: "insert_phis",
            missing: "compute_dominance",
        });
    };

    let mut inserted = 0;
    for var in (0u32..).take(cfg.num_vars()).map(VarId::new) {
        inserted += place_var(cfg, &dom, &sites, var);
    }

    tracing::debug!(phis = inserted, "inserted phi functions");
    cfg.dominators = Some(dom);
    cfg.def_sites = Some(sites);
    Ok(inserted)
}

fn place_var(cfg: &mut Cfg, dom: &DominatorTree, sites: &DefSites, var: VarId) -> usize {
    let defs = sites.blocks(var);
    if defs.len() < 2 {
        return 0;
    }
    let declared_in = sites.declaring_block(var).unwrap_or(cfg.entry());

    let mut has_phi: FxHashSet<BlockId> = dom
        .rpo()
        .iter()
        .copied()
        .filter(|&id| cfg.block(id).phi_for(var).is_some())
        .collect();
    let mut queued: FxHashSet<BlockId> = defs.iter().copied().collect();
    let mut worklist: Vec<BlockId> = defs.iter().copied().collect();
    let mut inserted = 0;

    while let Some(block) = worklist.pop() {
        let frontier: Vec<BlockId> = cfg.block(block).frontier.iter().copied().collect();
        for join in frontier {
            if has_phi.contains(&join) || dom.dominates(join, declared_in) {
                continue;
            }
            let phi = PhiFunction::new(var, live_preds(cfg, join));
            tracing::trace!(var = %var, block = %join, "placed phi");
            cfg.block_mut(join).phis.push(phi);
            has_phi.insert(join);
            inserted += 1;
            if queued.insert(join) {
                worklist.push(join);
            }
        }
    }
    inserted
}

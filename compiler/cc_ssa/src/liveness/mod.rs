//! Backward dataflow liveness on SSA form.
//!
//! Computes which SSA values are live at every block boundary, for the
//! register allocator and for dead-definition elimination downstream.
//!
//! # Algorithm
//!
//! 1. **Precompute gen/kill** for each block (forward scan).
//!    - `gen(B)` = values used in B before being defined in B, including
//!      the terminator's operand. Phi operands are *not* uses of B.
//!    - `kill(B)` = values defined in B, phi targets included.
//! 2. **Postorder iteration** until no set changes:
//!    - `live_out(B) = ∪ live_in(S) ∪ phi_uses(S, B)` over live successors S,
//!      where `phi_uses(S, B)` are the operands S's phis take from B.
//!    - `live_in(B) = gen(B) ∪ (live_out(B) - kill(B))`.
//!
//! Phi targets are defined at block entry, so they appear in neither
//! `live_in` of their own block nor any predecessor's `live_out`.
//! Version-0 references (no reaching definition) are not tracked.

use rustc_hash::FxHashSet;

use crate::cfg::{BasicBlock, Cfg};
use crate::error::Ice;
use crate::ir::{BlockId, SsaVar};

/// Set of live SSA values at a block boundary.
pub type LiveSet = FxHashSet<SsaVar>;

/// Liveness for every block, indexed by `BlockId::index()`.
///
/// Removed and unreachable blocks have empty sets.
#[derive(Clone, Debug, Default)]
pub struct BlockLiveness {
    pub live_in: Vec<LiveSet>,
    pub live_out: Vec<LiveSet>,
}

impl BlockLiveness {
    pub fn live_in(&self, block: BlockId) -> &LiveSet {
        &self.live_in[block.index()]
    }

    pub fn live_out(&self, block: BlockId) -> &LiveSet {
        &self.live_out[block.index()]
    }
}

/// Compute liveness. Requires [`compute_order`](crate::compute_order) and
/// is meaningful after [`rename_variables`](crate::rename_variables).
pub fn compute_liveness(cfg: &Cfg) -> Result<BlockLiveness, Ice> {
    let rpo = match cfg.reachable() {
        Some(rpo) if cfg.is_ordered() => rpo,
        _ => {
            return Err(Ice::PassOrder {
                pass: "compute_liveness",
                missing: "compute_order",
            })
        }
    };
    let num_blocks = cfg.num_blocks();
    tracing::debug!(blocks = rpo.len(), "computing liveness");

    let mut gen: Vec<LiveSet> = vec![LiveSet::default(); num_blocks];
    let mut kill: Vec<LiveSet> = vec![LiveSet::default(); num_blocks];
    for &id in rpo {
        let (block_gen, block_kill) = compute_gen_kill(cfg.block(id));
        gen[id.index()] = block_gen;
        kill[id.index()] = block_kill;
    }

    let mut live_in: Vec<LiveSet> = vec![LiveSet::default(); num_blocks];
    let mut live_out: Vec<LiveSet> = vec![LiveSet::default(); num_blocks];

    let mut iteration = 0u32;
    loop {
        iteration += 1;
        let mut changed = false;

        // Reverse of RPO: successors before predecessors, mostly.
        for &id in rpo.iter().rev() {
            let idx = id.index();

            let mut new_live_out = LiveSet::default();
            for succ in cfg.block(id).terminator().live_successors() {
                new_live_out.extend(live_in[succ.index()].iter().copied());
                for phi in &cfg.block(succ).phis {
                    if let Some(value) = phi.incoming_from(id) {
                        if value.is_defined() {
                            new_live_out.insert(value);
                        }
                    }
                }
            }

            let mut new_live_in = gen[idx].clone();
            for &value in &new_live_out {
                if !kill[idx].contains(&value) {
                    new_live_in.insert(value);
                }
            }

            if new_live_in != live_in[idx] || new_live_out != live_out[idx] {
                changed = true;
                live_in[idx] = new_live_in;
                live_out[idx] = new_live_out;
            }
        }

        if !changed {
            break;
        }
    }

    tracing::debug!(iterations = iteration, "liveness converged");
    Ok(BlockLiveness { live_in, live_out })
}

/// Gen and kill for one block, walking phis then instructions forward.
fn compute_gen_kill(block: &BasicBlock) -> (LiveSet, LiveSet) {
    let mut gen = LiveSet::default();
    let mut kill = LiveSet::default();

    for phi in &block.phis {
        kill.insert(phi.target);
    }
    for instr in &block.instrs {
        for used in instr.used_vars() {
            if used.is_defined() && !kill.contains(&used) {
                gen.insert(used);
            }
        }
        if let Some(def) = instr.defined_var() {
            kill.insert(def);
        }
    }
    if let Some(used) = block.terminator().operand().and_then(|op| op.as_var()) {
        if used.is_defined() && !kill.contains(&used) {
            gen.insert(used);
        }
    }

    (gen, kill)
}

//! Depth-first ordering of the reachable blocks.
//!
//! Assigns every reachable block its reverse-postorder index and its
//! height (depth at which the DFS first reached it), then rewrites
//! [`Cfg::reachable`] into reverse postorder. The dominator computation
//! iterates in that order and the dominator-tree walk uses heights to
//! order siblings.

use crate::cfg::Cfg;
use crate::error::Ice;
use crate::ir::BlockId;

/// Compute a postorder of the blocks reachable from the entry.
///
/// Iterative DFS with an explicit stack; successors are visited in the
/// order the terminator lists them. Returns `(postorder, heights)` where
/// `heights` is indexed by block index.
pub(crate) fn postorder(cfg: &Cfg) -> (Vec<BlockId>, Vec<Option<u32>>) {
    let num_blocks = cfg.num_blocks();
    let mut heights: Vec<Option<u32>> = vec![None; num_blocks];
    let mut postorder = Vec::with_capacity(num_blocks);

    // Stack entries: (block, depth, children_pushed).
    let mut stack: Vec<(BlockId, u32, bool)> = vec![(cfg.entry(), 0, false)];

    while let Some(&mut (block, depth, ref mut children_pushed)) = stack.last_mut() {
        if *children_pushed {
            postorder.push(block);
            stack.pop();
            continue;
        }
        *children_pushed = true;

        if heights[block.index()].is_some() {
            // Reached along another path first.
            stack.pop();
            continue;
        }
        heights[block.index()] = Some(depth);

        // Reverse so the first-listed successor is explored first.
        let succs = cfg.block(block).terminator().live_successors();
        for &succ in succs.iter().rev() {
            if heights[succ.index()].is_none() && !cfg.block(succ).is_removed() {
                stack.push((succ, depth + 1, false));
            }
        }
    }

    (postorder, heights)
}

/// Number the reachable blocks and store reverse postorder on the graph.
pub fn compute_order(cfg: &mut Cfg) -> Result<(), Ice> {
    let Some(reachable) = cfg.reachable() else {
        return Err(Ice::PassOrder {
            pass: "compute_order",
            missing: "cleanup",
        });
    };
    let reachable = reachable.to_vec();

    let (postorder, heights) = postorder(cfg);
    let mut rpo: Vec<BlockId> = postorder.into_iter().rev().collect();

    // Blocks cleanup kept that the DFS cannot reach mean the graph was
    // edited after cleanup. Keep them, unordered, at the end; the dominator
    // tree leaves them out.
    for &id in &reachable {
        if heights[id.index()].is_none() {
            tracing::warn!(block = %id, "reachable block missed by ordering DFS");
            rpo.push(id);
        }
    }

    for block in &mut cfg.blocks {
        block.rpo_index = None;
        block.height = heights[block.id.index()];
    }
    for (index, &id) in (0u32..).zip(&rpo) {
        cfg.block_mut(id).rpo_index = Some(index);
    }

    tracing::debug!(blocks = rpo.len(), "ordered reachable blocks");
    cfg.reachable = Some(rpo);
    cfg.ordered = true;
    Ok(())
}

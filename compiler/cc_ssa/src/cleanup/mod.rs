//! CFG cleanup: collapse empty blocks, then drop unreachable ones.
//!
//! Lowering is deliberately naive: every `if` gets a merge block, every
//! loop a header, every `return` a dead placeholder. Cleanup removes that
//! scaffolding before analyses run.
//!
//! 1. **Reachability.** A forward walk over live edges from the entry,
//!    taken once up front. Collapsing only ever bypasses blocks, so the
//!    reached set stays valid for the later steps.
//! 2. **Collapse.** A reachable empty block whose terminator always
//!    continues to one other block is bypassed: its predecessors jump
//!    straight to the target. Repeated until nothing changes. Unreached
//!    blocks are left alone so their statement spans survive for step 3.
//! 3. **Removal.** Every unreached block is removed. Connected groups of
//!    removed blocks that held statements become dead-code regions for the
//!    caller to report, split wherever live code sits between two dead
//!    statements.

use cc_ir::Span;
use rustc_hash::FxHashSet;

use crate::cfg::Cfg;
use crate::ir::BlockId;

/// What cleanup changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Empty blocks bypassed and removed.
    pub collapsed: usize,
    /// Blocks removed because the entry cannot reach them.
    pub unreachable: usize,
    /// Statement spans of each unreachable region, sorted. A region never
    /// straddles live code. Regions without statements (pure scaffolding)
    /// are omitted.
    pub dead_regions: Vec<Vec<Span>>,
}

/// Collapse empty blocks and remove unreachable ones.
///
/// Afterwards [`Cfg::reachable`] lists exactly the blocks reachable from the
/// entry; every other block is removed and its edges severed.
pub fn cleanup(cfg: &mut Cfg) -> CleanupReport {
    cfg.invalidate_analyses();
    let reached = reachable_from_entry(cfg);
    let mut live_spans: Vec<Span> = cfg
        .live_blocks()
        .filter(|b| reached[b.id.index()])
        .flat_map(|b| b.spans.iter().copied())
        .filter(|span| !span.is_empty())
        .collect();
    live_spans.sort();

    let collapsed = collapse_empty_blocks(cfg, &reached);
    let (unreachable, dead_regions) = remove_unreachable(cfg, &reached, &live_spans);

    let reachable: Vec<BlockId> = cfg.live_blocks().map(|b| b.id).collect();
    tracing::debug!(
        collapsed,
        unreachable,
        dead_regions = dead_regions.len(),
        reachable = reachable.len(),
        "cleaned up CFG"
    );
    cfg.reachable = Some(reachable);

    CleanupReport {
        collapsed,
        unreachable,
        dead_regions,
    }
}

fn reachable_from_entry(cfg: &Cfg) -> Vec<bool> {
    let mut reached = vec![false; cfg.num_blocks()];
    let entry = cfg.entry();
    reached[entry.index()] = true;
    let mut stack = vec![entry];
    while let Some(id) = stack.pop() {
        for succ in cfg.block(id).terminator().live_successors() {
            if !reached[succ.index()] {
                reached[succ.index()] = true;
                stack.push(succ);
            }
        }
    }
    reached
}

/// The block `id` can be bypassed in favour of, if any.
///
/// The entry is never bypassed, nor is an unreached block, nor a block
/// reached through an impossible edge: that block is the dead placeholder
/// of a `return` or `break` and must keep its identity.
fn collapse_target(cfg: &Cfg, reached: &[bool], id: BlockId) -> Option<BlockId> {
    let block = cfg.block(id);
    if !reached[id.index()]
        || block.is_removed()
        || block.is_entry
        || !block.is_empty()
        || block.preds().is_empty()
    {
        return None;
    }
    let target = block.terminator().single_target()?;
    if target == id {
        return None;
    }
    let via_impossible = block
        .preds()
        .iter()
        .any(|&pred| cfg.block(pred).terminator().is_impossible_target(id));
    if via_impossible {
        return None;
    }
    Some(target)
}

fn collapse_empty_blocks(cfg: &mut Cfg, reached: &[bool]) -> usize {
    let mut collapsed = 0;
    loop {
        let mut changed = false;
        let candidates: Vec<BlockId> = cfg.live_blocks().map(|b| b.id).collect();
        for id in candidates {
            let Some(target) = collapse_target(cfg, reached, id) else {
                continue;
            };
            let preds: Vec<BlockId> = cfg.block(id).preds().iter().copied().collect();
            for pred in preds {
                let jump = cfg.block(pred).terminator().retarget(id, target);
                cfg.connect(pred, jump);
            }
            cfg.remove_block(id);
            tracing::trace!(block = %id, target = %target, "collapsed empty block");
            collapsed += 1;
            changed = true;
        }
        if !changed {
            return collapsed;
        }
    }
}

fn remove_unreachable(
    cfg: &mut Cfg,
    reached: &[bool],
    live_spans: &[Span],
) -> (usize, Vec<Vec<Span>>) {
    let dead: Vec<BlockId> = cfg
        .live_blocks()
        .filter(|b| !reached[b.id.index()])
        .map(|b| b.id)
        .collect();
    let regions = dead_regions(cfg, &dead, live_spans);

    for &id in &dead {
        cfg.remove_block(id);
    }
    (dead.len(), regions)
}

/// Group unreachable blocks into connected regions (edges in either
/// direction, impossible edges included) and collect their statement spans.
///
/// Statement-free blocks such as an unreachable `if` merge can join dead
/// tails from different branches, so each group is further split at live
/// statements lying between its spans.
fn dead_regions(cfg: &Cfg, dead: &[BlockId], live_spans: &[Span]) -> Vec<Vec<Span>> {
    let dead_set: FxHashSet<BlockId> = dead.iter().copied().collect();
    let mut visited: FxHashSet<BlockId> = FxHashSet::default();
    let mut regions = Vec::new();

    for &start in dead {
        if !visited.insert(start) {
            continue;
        }
        let mut spans = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let block = cfg.block(id);
            spans.extend_from_slice(&block.spans);
            let neighbours = block
                .terminator()
                .successors()
                .into_iter()
                .chain(block.preds().iter().copied());
            for next in neighbours {
                if dead_set.contains(&next) && visited.insert(next) {
                    stack.push(next);
                }
            }
        }
        spans.sort();
        spans.dedup();
        regions.extend(split_at_live_code(spans, live_spans));
    }

    regions.sort();
    regions
}

/// Break sorted dead `spans` into runs with no live statement between
/// consecutive members. Live spans enclosing dead ones (the `if` around a
/// dead branch) do not split.
fn split_at_live_code(spans: Vec<Span>, live_spans: &[Span]) -> Vec<Vec<Span>> {
    let mut runs = Vec::new();
    let mut run: Vec<Span> = Vec::new();
    let mut run_end = 0;
    for span in spans {
        let split = !run.is_empty()
            && live_spans
                .iter()
                .any(|live| live.start >= run_end && live.end <= span.start);
        if split {
            runs.push(std::mem::take(&mut run));
        }
        run_end = if run.is_empty() { span.end } else { run_end.max(span.end) };
        run.push(span);
    }
    if !run.is_empty() {
        runs.push(run);
    }
    runs
}

#[cfg(test)]
mod tests;

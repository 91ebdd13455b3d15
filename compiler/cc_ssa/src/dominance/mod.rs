//! Dominator tree and dominance frontiers.
//!
//! Uses the Cooper-Harvey-Kennedy iterative algorithm over reverse
//! postorder. Only live edges count: an impossible edge never makes its
//! source a dominator-relevant predecessor.
//!
//! Dominance queries are O(1) via preorder intervals of the dominator
//! tree. Siblings in the tree are ordered by `(height, id)`, which fixes
//! the block order SSA renaming visits.
//!
//! Reference: Cooper, Harvey, Kennedy, "A Simple, Fast Dominance Algorithm" (2001)

use std::collections::BTreeSet;

use smallvec::SmallVec;

use crate::cfg::Cfg;
use crate::error::Ice;
use crate::ir::BlockId;

/// Dominator tree over the reachable blocks of one function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DominatorTree {
    /// Reachable blocks in reverse postorder; `rpo[0]` is the entry.
    rpo: Vec<BlockId>,
    /// RPO position of each block, indexed by block index.
    rpo_pos: Vec<Option<u32>>,
    /// Immediate dominator by RPO position. The entry maps to itself.
    idom: Vec<u32>,
    /// Dominator-tree children by RPO position, sorted by `(height, id)`.
    children: Vec<Vec<BlockId>>,
    /// Dominator-tree preorder.
    preorder: Vec<BlockId>,
    /// Preorder number by RPO position.
    pre: Vec<u32>,
    /// Largest preorder number in each subtree, by RPO position.
    last: Vec<u32>,
}

/// Position inside a block.
///
/// Phis execute before the first instruction; the terminator after the last.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Point {
    Phi,
    Instr(u32),
    End,
}

/// Predecessors of `block` that can actually transfer control to it.
pub(crate) fn live_preds(cfg: &Cfg, block: BlockId) -> SmallVec<[BlockId; 4]> {
    cfg.block(block)
        .preds()
        .iter()
        .copied()
        .filter(|&pred| {
            let pred = cfg.block(pred);
            !pred.is_removed() && pred.terminator().can_reach(block)
        })
        .collect()
}

impl DominatorTree {
    /// Build the dominator tree. Requires [`compute_order`](crate::compute_order).
    pub fn build(cfg: &Cfg) -> Result<Self, Ice> {
        let rpo = match cfg.reachable() {
            Some(rpo) if cfg.is_ordered() => rpo.to_vec(),
            _ => {
                return Err(Ice::PassOrder {
                    pass: "DominatorTree::build",
                    missing: "compute_order",
                })
            }
        };
        let n = rpo.len();

        let mut rpo_pos: Vec<Option<u32>> = vec![None; cfg.num_blocks()];
        for (pos, &id) in (0u32..).zip(&rpo) {
            rpo_pos[id.index()] = Some(pos);
        }

        // Live predecessors by RPO position, restricted to the tree.
        let preds: Vec<SmallVec<[u32; 4]>> = rpo
            .iter()
            .map(|&id| {
                live_preds(cfg, id)
                    .into_iter()
                    .filter_map(|pred| rpo_pos[pred.index()])
                    .collect()
            })
            .collect();

        let mut idom: Vec<Option<u32>> = vec![None; n];
        if n > 0 {
            idom[0] = Some(0);
        }

        let mut changed = true;
        let mut iterations = 0u32;
        while changed {
            changed = false;
            iterations += 1;
            for pos in 1..n {
                let mut new_idom = None;
                for &pred in &preds[pos] {
                    if idom[pred as usize].is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => Self::intersect(pred, current, &idom),
                    });
                }
                if new_idom.is_some() && idom[pos] != new_idom {
                    idom[pos] = new_idom;
                    changed = true;
                }
            }
        }

        // Blocks ordering appended without reaching them have no path from
        // the entry and never resolve. They sit at the end of the RPO and are
        // left out of the tree.
        let n = idom.iter().take_while(|dom| dom.is_some()).count();
        if let Some(pos) = (n..idom.len()).find(|&pos| idom[pos].is_some()) {
            return Err(Ice::Malformed(format!(
                "{} has a dominator but follows unresolved {}",
                rpo[pos], rpo[n]
            )));
        }
        let mut rpo = rpo;
        for id in rpo.drain(n..) {
            tracing::warn!(block = %id, "ordered block has no dominator, left out of the tree");
            rpo_pos[id.index()] = None;
        }
        let resolved: Vec<u32> = idom.into_iter().flatten().collect();

        let mut children: Vec<Vec<BlockId>> = vec![Vec::new(); n];
        for pos in 1..n {
            children[resolved[pos] as usize].push(rpo[pos]);
        }
        let height = |id: BlockId| cfg.block(id).height.unwrap_or(u32::MAX);
        for kids in &mut children {
            kids.sort_by_key(|&id| (height(id), id));
        }

        let mut tree = Self {
            rpo,
            rpo_pos,
            idom: resolved,
            children,
            preorder: Vec::with_capacity(n),
            pre: vec![0; n],
            last: vec![0; n],
        };
        tree.number_preorder();

        tracing::debug!(blocks = n, iterations, "built dominator tree");
        Ok(tree)
    }

    /// CHK intersect: walk two fingers upward until they meet.
    ///
    /// Positions are RPO positions, so a dominator always has the smaller one.
    fn intersect(mut a: u32, mut b: u32, idom: &[Option<u32>]) -> u32 {
        while a != b {
            while a > b {
                let Some(next) = idom[a as usize] else {
                    debug_assert!(false, "intersect: broken idom chain at {a}");
                    return a;
                };
                a = next;
            }
            while b > a {
                let Some(next) = idom[b as usize] else {
                    debug_assert!(false, "intersect: broken idom chain at {b}");
                    return b;
                };
                b = next;
            }
        }
        a
    }

    /// Fill `preorder`, `pre` and `last` with an iterative DFS of the tree.
    fn number_preorder(&mut self) {
        if self.rpo.is_empty() {
            return;
        }
        let mut counter = 0u32;
        // Stack entries: (RPO position, next child index).
        let mut stack: Vec<(usize, usize)> = vec![(0, 0)];
        self.pre[0] = 0;
        self.preorder.push(self.rpo[0]);
        counter += 1;

        while let Some(&mut (pos, ref mut next)) = stack.last_mut() {
            if let Some(&child) = self.children[pos].get(*next) {
                *next += 1;
                let child_pos = self.pos(child);
                self.pre[child_pos] = counter;
                self.preorder.push(child);
                counter += 1;
                stack.push((child_pos, 0));
            } else {
                self.last[pos] = counter - 1;
                stack.pop();
            }
        }
    }

    fn pos(&self, block: BlockId) -> usize {
        self.rpo_pos[block.index()].map_or(usize::MAX, |p| p as usize)
    }

    fn try_pos(&self, block: BlockId) -> Option<usize> {
        self.rpo_pos.get(block.index()).copied().flatten().map(|p| p as usize)
    }

    /// Whether `block` is part of the tree (reachable and ordered).
    pub fn contains(&self, block: BlockId) -> bool {
        self.try_pos(block).is_some()
    }

    /// Immediate dominator of `block`. `None` for blocks outside the tree
    /// and, unlike [`dominator_list`](Self::dominator_list), for the entry,
    /// so walks up the tree stop at the root.
    pub fn idom(&self, block: BlockId) -> Option<BlockId> {
        let pos = self.try_pos(block)?;
        if pos == 0 {
            return None;
        }
        Some(self.rpo[self.idom[pos] as usize])
    }

    /// Immediate dominator of every tree block, indexed by RPO position.
    /// The entry is its own immediate dominator.
    pub fn dominator_list(&self) -> impl ExactSizeIterator<Item = BlockId> + '_ {
        self.idom.iter().map(|&pos| self.rpo[pos as usize])
    }

    /// Does `a` dominate `b`? A block dominates itself.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        match (self.try_pos(a), self.try_pos(b)) {
            (Some(pa), Some(pb)) => self.pre[pa] <= self.pre[pb] && self.pre[pb] <= self.last[pa],
            _ => false,
        }
    }

    /// Does `a` dominate `b` with `a != b`?
    pub fn strictly_dominates(&self, a: BlockId, b: BlockId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Does a definition at `def` execute before, and on every path to, `at`?
    pub(crate) fn reaches(&self, def: (BlockId, Point), at: (BlockId, Point)) -> bool {
        if def.0 == at.0 {
            def.1 < at.1 && self.contains(at.0)
        } else {
            self.strictly_dominates(def.0, at.0)
        }
    }

    /// Children of `block` in the dominator tree, ordered by `(height, id)`.
    pub fn children(&self, block: BlockId) -> &[BlockId] {
        match self.try_pos(block) {
            Some(pos) => &self.children[pos],
            None => &[],
        }
    }

    /// Dominator-tree preorder starting at the entry.
    pub fn preorder(&self) -> &[BlockId] {
        &self.preorder
    }

    /// Reachable blocks in reverse postorder.
    pub fn rpo(&self) -> &[BlockId] {
        &self.rpo
    }

    pub fn len(&self) -> usize {
        self.rpo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rpo.is_empty()
    }
}

/// Build the dominator tree and every block's dominance frontier.
///
/// For each join point `b` (two or more live predecessors), walk up the
/// dominator tree from each predecessor until reaching `idom(b)`; every
/// block passed has `b` in its frontier. The entry has no idom, so any
/// back edge into it makes it a join and the walk runs up to the root.
pub fn compute_dominance(cfg: &mut Cfg) -> Result<(), Ice> {
    let tree = DominatorTree::build(cfg)?;

    let mut frontiers: Vec<BTreeSet<BlockId>> = vec![BTreeSet::new(); cfg.num_blocks()];
    for &block in tree.rpo() {
        let preds: SmallVec<[BlockId; 4]> = live_preds(cfg, block)
            .into_iter()
            .filter(|&pred| tree.contains(pred))
            .collect();
        let stop = tree.idom(block);
        if preds.is_empty() || (preds.len() < 2 && stop.is_some()) {
            continue;
        }
        for pred in preds {
            let mut runner = Some(pred);
            while let Some(current) = runner {
                if Some(current) == stop {
                    break;
                }
                frontiers[current.index()].insert(block);
                runner = tree.idom(current);
            }
        }
    }

    for (block, frontier) in cfg.blocks.iter_mut().zip(frontiers) {
        block.frontier = frontier;
    }
    cfg.dominators = Some(tree);
    cfg.def_sites = None;
    Ok(())
}

//! Basic blocks and the per-function control-flow graph.
//!
//! Blocks live in an arena owned by [`Cfg`] and refer to each other by
//! [`BlockId`]. A block's terminator and predecessor set are private: the
//! only way to change an edge is [`Cfg::connect`], which keeps every
//! successor's predecessor set in sync with the terminators that name it.
//!
//! Analysis results are stored on the graph as passes run:
//! cleanup fills the reachable set, [`compute_order`](crate::compute_order)
//! the RPO indices and heights, [`compute_dominance`](crate::compute_dominance)
//! the dominator tree and frontiers, phi insertion the definition sites.

use std::collections::BTreeSet;
use std::fmt;

use cc_ir::Span;

use crate::defs::DefSites;
use crate::dominance::DominatorTree;
use crate::ir::{BlockId, Instr, Jump, Operand, PhiFunction};

/// One basic block: phis, straight-line instructions, one terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicBlock {
    pub id: BlockId,
    pub is_entry: bool,
    pub phis: Vec<PhiFunction>,
    pub instrs: Vec<Instr>,
    /// Spans of the statements whose code begins in this block.
    pub spans: Vec<Span>,
    /// Reverse-postorder position among reachable blocks.
    pub rpo_index: Option<u32>,
    /// Depth at which the ordering DFS first reached this block.
    pub height: Option<u32>,
    /// Dominance frontier.
    pub frontier: BTreeSet<BlockId>,
    terminator: Jump,
    preds: BTreeSet<BlockId>,
    removed: bool,
}

impl BasicBlock {
    fn new(id: BlockId, is_entry: bool) -> Self {
        Self {
            id,
            is_entry,
            phis: Vec::new(),
            instrs: Vec::new(),
            spans: Vec::new(),
            rpo_index: None,
            height: None,
            frontier: BTreeSet::new(),
            terminator: Jump::Missing,
            preds: BTreeSet::new(),
            removed: false,
        }
    }

    #[inline]
    pub fn terminator(&self) -> &Jump {
        &self.terminator
    }

    /// Blocks whose terminator names this block, live or impossible.
    #[inline]
    pub fn preds(&self) -> &BTreeSet<BlockId> {
        &self.preds
    }

    /// Rewrite the value the terminator reads. Targets cannot change here.
    pub fn terminator_operand_mut(&mut self) -> Option<&mut Operand> {
        self.terminator.operand_mut()
    }

    /// No phis and no instructions.
    pub fn is_empty(&self) -> bool {
        self.phis.is_empty() && self.instrs.is_empty()
    }

    /// Whether cleanup has deleted this block from the graph.
    #[inline]
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// The phi for `var`, if this block has one.
    pub fn phi_for(&self, var: cc_ir::VarId) -> Option<&PhiFunction> {
        self.phis.iter().find(|phi| phi.var() == var)
    }
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.id)?;
        if !self.preds.is_empty() {
            write!(f, " ; preds:")?;
            for pred in &self.preds {
                write!(f, " {pred}")?;
            }
        }
        writeln!(f)?;
        for phi in &self.phis {
            writeln!(f, "    {phi}")?;
        }
        for instr in &self.instrs {
            writeln!(f, "    {instr}")?;
        }
        writeln!(f, "    {}", self.terminator)
    }
}

/// Control-flow graph of one function.
#[derive(Clone, Debug)]
pub struct Cfg {
    pub(crate) blocks: Vec<BasicBlock>,
    entry: BlockId,
    num_vars: usize,
    num_temps: u32,
    pub(crate) reachable: Option<Vec<BlockId>>,
    pub(crate) ordered: bool,
    pub(crate) dominators: Option<DominatorTree>,
    pub(crate) def_sites: Option<DefSites>,
}

impl Cfg {
    /// Create a graph holding only the entry block.
    pub fn new(num_vars: usize) -> Self {
        let entry = BlockId::new(0);
        Self {
            blocks: vec![BasicBlock::new(entry, true)],
            entry,
            num_vars,
            num_temps: 0,
            reachable: None,
            ordered: false,
            dominators: None,
            def_sites: None,
        }
    }

    /// Allocate a fresh, unterminated block.
    pub fn new_block(&mut self) -> BlockId {
        let raw = u32::try_from(self.blocks.len())
            .unwrap_or_else(|_| panic!("CFG exceeds u32::MAX blocks"));
        let id = BlockId::new(raw);
        self.blocks.push(BasicBlock::new(id, false));
        id
    }

    /// Set `from`'s terminator, updating predecessor sets on both the old
    /// and the new successors.
    pub fn connect(&mut self, from: BlockId, jump: Jump) {
        let old = std::mem::replace(&mut self.blocks[from.index()].terminator, jump);
        for succ in old.successors() {
            self.blocks[succ.index()].preds.remove(&from);
        }
        let new_succs = self.blocks[from.index()].terminator.successors();
        for succ in new_succs {
            self.blocks[succ.index()].preds.insert(from);
        }
    }

    /// Sever `block`'s outgoing edges and drop it from the live block set.
    pub fn remove_block(&mut self, block: BlockId) {
        self.connect(block, Jump::Missing);
        self.blocks[block.index()].removed = true;
    }

    #[inline]
    pub fn entry(&self) -> BlockId {
        self.entry
    }

    #[inline]
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    #[inline]
    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.index()]
    }

    /// Every block ever allocated, removed ones included.
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Blocks that have not been removed, in id order.
    pub fn live_blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.iter().filter(|b| !b.removed)
    }

    /// Number of allocated block ids.
    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Number of source variables (the size of the function's `VarTable`).
    #[inline]
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    #[inline]
    pub fn num_temps(&self) -> u32 {
        self.num_temps
    }

    pub(crate) fn set_num_temps(&mut self, num_temps: u32) {
        self.num_temps = num_temps;
    }

    /// Blocks reachable from the entry, once cleanup has run.
    ///
    /// In id order after cleanup; in reverse postorder once
    /// [`compute_order`](crate::compute_order) has run.
    pub fn reachable(&self) -> Option<&[BlockId]> {
        self.reachable.as_deref()
    }

    pub fn dominators(&self) -> Option<&DominatorTree> {
        self.dominators.as_ref()
    }

    pub fn def_sites(&self) -> Option<&DefSites> {
        self.def_sites.as_ref()
    }

    /// Whether reachability-dependent analyses are current.
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Drop every analysis derived from the block graph.
    pub(crate) fn invalidate_analyses(&mut self) {
        self.ordered = false;
        self.dominators = None;
        self.def_sites = None;
        for block in &mut self.blocks {
            block.rpo_index = None;
            block.height = None;
            block.frontier.clear();
        }
    }
}

impl fmt::Display for Cfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reachable() {
            Some(reachable) => {
                for &id in reachable {
                    write!(f, "{}", self.block(id))?;
                }
            }
            None => {
                for block in self.live_blocks() {
                    write!(f, "{block}")?;
                }
            }
        }
        Ok(())
    }
}

//! SSA IR: the contents of a basic block.
//!
//! Lowering fills blocks with [`Instr`]s that reference source variables as
//! unversioned [`SsaVar`]s (`version == 0`). Renaming later assigns every
//! definition a fresh version and rewrites every use to the version that
//! reaches it.
//!
//! - **[`Instr`]**: one primitive operation
//! - **[`Jump`]**: the terminator; determines the block's successors
//! - **[`PhiFunction`]**: a merge of variable versions at a join point
//! - **[`Operand`]**: a constant, a temporary, or a (versioned) variable

use std::fmt;

use cc_ir::{BinaryOp, Name, UnaryOp, VarId};
use smallvec::{smallvec, SmallVec};

// ── ID newtypes ─────────────────────────────────────────────────────

/// Handle of a basic block in its function's [`Cfg`](crate::Cfg) arena.
///
/// Ids are allocated sequentially per function; blocks removed by cleanup
/// keep their id, so the live set is not necessarily contiguous.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    /// Create a block ID from a raw index.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Expression temporary produced by the sequencer.
///
/// Temporaries are assigned exactly once when created, so they are already
/// in SSA form and renaming never touches them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TempId(u32);

impl TempId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A source variable at one SSA version.
///
/// Version 0 means "unversioned": either not yet renamed, or (after
/// renaming) a use that no definition reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SsaVar {
    pub var: VarId,
    pub version: u32,
}

impl SsaVar {
    /// Reference to `var` before renaming.
    #[inline]
    pub const fn unversioned(var: VarId) -> Self {
        Self { var, version: 0 }
    }

    #[inline]
    pub const fn new(var: VarId, version: u32) -> Self {
        Self { var, version }
    }

    /// Whether some definition has been bound to this reference.
    #[inline]
    pub const fn is_defined(self) -> bool {
        self.version != 0
    }
}

impl fmt::Display for SsaVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.var, self.version)
    }
}

// ── Operands ────────────────────────────────────────────────────────

/// Value read by an instruction or terminator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    Const(i64),
    Temp(TempId),
    Var(SsaVar),
}

impl Operand {
    /// The variable read by this operand, if any.
    #[inline]
    pub fn as_var(&self) -> Option<SsaVar> {
        match self {
            Operand::Var(v) => Some(*v),
            Operand::Const(_) | Operand::Temp(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Const(v) => write!(f, "{v}"),
            Operand::Temp(t) => write!(f, "{t}"),
            Operand::Var(v) => write!(f, "{v}"),
        }
    }
}

// ── Instructions ────────────────────────────────────────────────────

/// A single branch-free operation inside a basic block.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Instr {
    /// Binds the `index`-th incoming argument to a parameter variable.
    Param { dst: SsaVar, index: u32 },
    /// Marks where a block-scoped variable comes into scope. Defines nothing.
    Declare { var: VarId },
    /// Write to a source variable: `dst = value`.
    Assign { dst: SsaVar, value: Operand },
    /// Snapshot a value into a temporary (post-increment keeps the old value).
    Copy { dst: TempId, src: Operand },
    Unary {
        dst: TempId,
        op: UnaryOp,
        operand: Operand,
    },
    Binary {
        dst: TempId,
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
    },
    Call {
        dst: TempId,
        func: Name,
        args: Vec<Operand>,
    },
}

impl Instr {
    /// The source variable written by this instruction, if any.
    pub fn defined_var(&self) -> Option<SsaVar> {
        match self {
            Instr::Param { dst, .. } | Instr::Assign { dst, .. } => Some(*dst),
            Instr::Declare { .. }
            | Instr::Copy { .. }
            | Instr::Unary { .. }
            | Instr::Binary { .. }
            | Instr::Call { .. } => None,
        }
    }

    /// Mutable access to the written variable (renaming assigns its version).
    pub fn defined_var_mut(&mut self) -> Option<&mut SsaVar> {
        match self {
            Instr::Param { dst, .. } | Instr::Assign { dst, .. } => Some(dst),
            Instr::Declare { .. }
            | Instr::Copy { .. }
            | Instr::Unary { .. }
            | Instr::Binary { .. }
            | Instr::Call { .. } => None,
        }
    }

    /// Every operand read by this instruction, in evaluation order.
    pub fn operands(&self) -> SmallVec<[&Operand; 2]> {
        match self {
            Instr::Param { .. } | Instr::Declare { .. } => SmallVec::new(),
            Instr::Assign { value: op, .. }
            | Instr::Copy { src: op, .. }
            | Instr::Unary { operand: op, .. } => smallvec![op],
            Instr::Binary { lhs, rhs, .. } => smallvec![lhs, rhs],
            Instr::Call { args, .. } => args.iter().collect(),
        }
    }

    /// Mutable counterpart of [`operands`](Self::operands).
    pub fn operands_mut(&mut self) -> SmallVec<[&mut Operand; 2]> {
        match self {
            Instr::Param { .. } | Instr::Declare { .. } => SmallVec::new(),
            Instr::Assign { value: op, .. }
            | Instr::Copy { src: op, .. }
            | Instr::Unary { operand: op, .. } => smallvec![op],
            Instr::Binary { lhs, rhs, .. } => smallvec![lhs, rhs],
            Instr::Call { args, .. } => args.iter_mut().collect(),
        }
    }

    /// Variables read by this instruction.
    pub fn used_vars(&self) -> impl Iterator<Item = SsaVar> + '_ {
        self.operands().into_iter().filter_map(Operand::as_var)
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Param { dst, index } => write!(f, "{dst} = param {index}"),
            Instr::Declare { var } => write!(f, "declare {var}"),
            Instr::Assign { dst, value } => write!(f, "{dst} = {value}"),
            Instr::Copy { dst, src } => write!(f, "{dst} = copy {src}"),
            Instr::Unary { dst, op, operand } => write!(f, "{dst} = {op}{operand}"),
            Instr::Binary { dst, op, lhs, rhs } => write!(f, "{dst} = {lhs} {op} {rhs}"),
            Instr::Call { dst, func, args } => {
                write!(f, "{dst} = call @{}(", func.raw())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

// ── Phi functions ───────────────────────────────────────────────────

/// `target = φ(pred₁: v₁, pred₂: v₂, ...)`.
///
/// One incoming slot per predecessor of the owning block, kept sorted by
/// predecessor id. Slots hold an unversioned placeholder until renaming
/// resolves them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PhiFunction {
    pub target: SsaVar,
    pub incoming: Vec<(BlockId, SsaVar)>,
}

impl PhiFunction {
    /// Create a phi for `var` with an unresolved slot per predecessor.
    pub fn new(var: VarId, preds: impl IntoIterator<Item = BlockId>) -> Self {
        let mut incoming: Vec<_> = preds
            .into_iter()
            .map(|pred| (pred, SsaVar::unversioned(var)))
            .collect();
        incoming.sort_by_key(|&(pred, _)| pred);
        incoming.dedup_by_key(|&mut (pred, _)| pred);
        Self {
            target: SsaVar::unversioned(var),
            incoming,
        }
    }

    /// The variable this phi merges.
    #[inline]
    pub fn var(&self) -> VarId {
        self.target.var
    }

    /// Version flowing in from `pred`, if `pred` has a slot.
    pub fn incoming_from(&self, pred: BlockId) -> Option<SsaVar> {
        self.incoming
            .binary_search_by_key(&pred, |&(p, _)| p)
            .ok()
            .map(|i| self.incoming[i].1)
    }

    /// Fill the slot for `pred`. Returns `false` if `pred` has no slot.
    pub fn set_incoming(&mut self, pred: BlockId, value: SsaVar) -> bool {
        match self.incoming.binary_search_by_key(&pred, |&(p, _)| p) {
            Ok(i) => {
                self.incoming[i].1 = value;
                true
            }
            Err(_) => false,
        }
    }

    /// Predecessors that have a slot, in ascending order.
    pub fn preds(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.incoming.iter().map(|&(p, _)| p)
    }
}

impl fmt::Display for PhiFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = phi(", self.target)?;
        for (i, (pred, value)) in self.incoming.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{pred}: {value}")?;
        }
        write!(f, ")")
    }
}

// ── Terminators ─────────────────────────────────────────────────────

/// Block terminator: how control leaves a basic block.
///
/// Some variants carry an "impossible" target: a placeholder block that
/// lowering keeps writing into after an unconditional transfer (`return`,
/// `break`, `goto`). The edge exists in the graph so construction stays
/// linear, but control never takes it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Jump {
    /// Not yet terminated. Surviving past lowering is a builder bug.
    #[default]
    Missing,
    Unconditional { target: BlockId },
    Conditional {
        cond: Operand,
        then_block: BlockId,
        else_block: BlockId,
    },
    /// `return value;`: control leaves the function. `dead` is never entered.
    Impossible {
        dead: BlockId,
        value: Option<Operand>,
    },
    /// `break`, `continue`, `goto`: transfers to `target`; `impossible` is the
    /// placeholder that receives any code written after the statement.
    Constant {
        target: BlockId,
        impossible: BlockId,
    },
    /// Multi-way dispatch for `switch`.
    Select {
        value: Operand,
        options: Vec<(i64, BlockId)>,
        default: BlockId,
    },
}

impl Jump {
    /// Every block this terminator names, including impossible targets.
    ///
    /// Predecessor sets are maintained against this list.
    pub fn successors(&self) -> SmallVec<[BlockId; 2]> {
        let mut succs = self.live_successors();
        match self {
            Jump::Impossible { dead, .. } => succs.push(*dead),
            Jump::Constant { impossible, .. } => succs.push(*impossible),
            _ => {}
        }
        succs
    }

    /// Blocks control can actually transfer to, without duplicates.
    pub fn live_successors(&self) -> SmallVec<[BlockId; 2]> {
        match self {
            Jump::Missing | Jump::Impossible { .. } => SmallVec::new(),
            Jump::Unconditional { target } | Jump::Constant { target, .. } => smallvec![*target],
            Jump::Conditional {
                then_block,
                else_block,
                ..
            } => {
                if then_block == else_block {
                    smallvec![*then_block]
                } else {
                    smallvec![*then_block, *else_block]
                }
            }
            Jump::Select {
                options, default, ..
            } => {
                let mut succs: SmallVec<[BlockId; 2]> = SmallVec::new();
                for &(_, target) in options {
                    if !succs.contains(&target) {
                        succs.push(target);
                    }
                }
                if !succs.contains(default) {
                    succs.push(*default);
                }
                succs
            }
        }
    }

    /// Whether control can flow from this terminator into `block`.
    pub fn can_reach(&self, block: BlockId) -> bool {
        self.live_successors().contains(&block)
    }

    /// Whether `block` is the never-taken side of this terminator.
    pub fn is_impossible_target(&self, block: BlockId) -> bool {
        match self {
            Jump::Impossible { dead, .. } => *dead == block,
            Jump::Constant { impossible, .. } => *impossible == block,
            _ => false,
        }
    }

    /// The single block control always continues to, if there is one.
    pub fn single_target(&self) -> Option<BlockId> {
        match self {
            Jump::Unconditional { target } | Jump::Constant { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Copy of this terminator with every live reference to `from` replaced by `to`.
    ///
    /// Impossible targets are left untouched.
    #[must_use]
    pub fn retarget(&self, from: BlockId, to: BlockId) -> Jump {
        let swap = |b: BlockId| if b == from { to } else { b };
        match self {
            Jump::Missing => Jump::Missing,
            Jump::Unconditional { target } => Jump::Unconditional {
                target: swap(*target),
            },
            Jump::Conditional {
                cond,
                then_block,
                else_block,
            } => Jump::Conditional {
                cond: *cond,
                then_block: swap(*then_block),
                else_block: swap(*else_block),
            },
            Jump::Impossible { dead, value } => Jump::Impossible {
                dead: *dead,
                value: *value,
            },
            Jump::Constant { target, impossible } => Jump::Constant {
                target: swap(*target),
                impossible: *impossible,
            },
            Jump::Select {
                value,
                options,
                default,
            } => Jump::Select {
                value: *value,
                options: options.iter().map(|&(v, b)| (v, swap(b))).collect(),
                default: swap(*default),
            },
        }
    }

    /// The value this terminator reads, if any.
    pub fn operand(&self) -> Option<&Operand> {
        match self {
            Jump::Conditional { cond, .. } => Some(cond),
            Jump::Select { value, .. } => Some(value),
            Jump::Impossible { value, .. } => value.as_ref(),
            Jump::Missing | Jump::Unconditional { .. } | Jump::Constant { .. } => None,
        }
    }

    pub(crate) fn operand_mut(&mut self) -> Option<&mut Operand> {
        match self {
            Jump::Conditional { cond, .. } => Some(cond),
            Jump::Select { value, .. } => Some(value),
            Jump::Impossible { value, .. } => value.as_mut(),
            Jump::Missing | Jump::Unconditional { .. } | Jump::Constant { .. } => None,
        }
    }

    /// Short name of the variant, for logs and export.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Jump::Missing => "missing",
            Jump::Unconditional { .. } => "unconditional",
            Jump::Conditional { .. } => "conditional",
            Jump::Impossible { .. } => "impossible",
            Jump::Constant { .. } => "constant",
            Jump::Select { .. } => "select",
        }
    }
}

impl fmt::Display for Jump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Jump::Missing => write!(f, "<missing>"),
            Jump::Unconditional { target } => write!(f, "jump {target}"),
            Jump::Conditional {
                cond,
                then_block,
                else_block,
            } => write!(f, "branch {cond}, {then_block}, {else_block}"),
            Jump::Impossible { dead, value } => match value {
                Some(v) => write!(f, "return {v} (dead {dead})"),
                None => write!(f, "return (dead {dead})"),
            },
            Jump::Constant { target, impossible } => {
                write!(f, "jump {target} (dead {impossible})")
            }
            Jump::Select {
                value,
                options,
                default,
            } => {
                write!(f, "select {value} [")?;
                for (v, b) in options {
                    write!(f, "{v}: {b}, ")?;
                }
                write!(f, "default: {default}]")
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

//! Statement/expression tree for one C function body.
//!
//! This is the contract with the parser: the tree arrives fully resolved
//! (identifiers bound to [`VarId`]s, labels interned) and free of
//! parser-reported errors. `Error` nodes may still appear if a caller
//! forgets to check for them; lowering treats them as internal errors.

use std::fmt;

use crate::{ExprId, Name, Span, StmtId, VarId};

// ── Operators ───────────────────────────────────────────────────────

/// Binary operator.
///
/// Short-circuit `&&`/`||` and `?:` are desugared into `If` statements by
/// the parser, so every operator here evaluates both operands.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    /// Returns the source-level symbol for this operator.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_symbol())
    }
}

/// Unary operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

impl UnaryOp {
    /// Returns the source-level symbol for this operator.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_symbol())
    }
}

/// `++`/`--` in prefix or postfix position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IncDecKind {
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl IncDecKind {
    /// The arithmetic operator applied to the operand.
    pub const fn op(self) -> BinaryOp {
        match self {
            IncDecKind::PreInc | IncDecKind::PostInc => BinaryOp::Add,
            IncDecKind::PreDec | IncDecKind::PostDec => BinaryOp::Sub,
        }
    }

    /// Whether the expression yields the value before the update.
    pub const fn is_postfix(self) -> bool {
        matches!(self, IncDecKind::PostInc | IncDecKind::PostDec)
    }
}

// ── Expressions ─────────────────────────────────────────────────────

/// Expression node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExprKind {
    /// Integer constant (already folded).
    IntLit(i64),
    /// Read of a local variable or parameter.
    Var(VarId),
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// `target = value` or, with `op`, `target op= value`.
    Assign {
        target: VarId,
        op: Option<BinaryOp>,
        value: ExprId,
    },
    IncDec {
        target: VarId,
        kind: IncDecKind,
    },
    /// Direct call to a named function.
    Call {
        func: Name,
        args: Vec<ExprId>,
    },
    /// `lhs, rhs`: evaluates both, yields `rhs`.
    Comma {
        lhs: ExprId,
        rhs: ExprId,
    },
    /// Parser error node.
    Error,
}

// ── Statements ──────────────────────────────────────────────────────

/// One declarator in a declaration statement: `int a = 1, b;`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Declarator {
    pub var: VarId,
    pub init: Option<ExprId>,
}

/// Initializer clause of a `for` statement.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ForInit {
    None,
    Expr(ExprId),
    Decl(Vec<Declarator>),
}

/// Statement node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StmtKind {
    Expr(ExprId),
    Decl(Vec<Declarator>),
    Compound(Vec<StmtId>),
    If {
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    While {
        cond: ExprId,
        body: StmtId,
    },
    DoWhile {
        body: StmtId,
        cond: ExprId,
    },
    For {
        init: ForInit,
        cond: Option<ExprId>,
        step: Option<ExprId>,
        body: StmtId,
    },
    Switch {
        scrutinee: ExprId,
        body: StmtId,
    },
    /// `case value: body`, only meaningful inside a `Switch` body.
    Case {
        value: i64,
        body: StmtId,
    },
    /// `default: body`, only meaningful inside a `Switch` body.
    Default {
        body: StmtId,
    },
    Break,
    Continue,
    Goto(Name),
    Label {
        name: Name,
        body: StmtId,
    },
    Return(Option<ExprId>),
    Empty,
    /// Parser error node.
    Error,
}

// ── Arena ───────────────────────────────────────────────────────────

/// Flat storage for every node of one function body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AstArena {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
}

impl AstArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an expression.
    pub fn alloc_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = ExprId::new(index_u32(self.exprs.len()));
        self.exprs.push(Expr { kind, span });
        id
    }

    /// Allocate a statement.
    pub fn alloc_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        let id = StmtId::new(index_u32(self.stmts.len()));
        self.stmts.push(Stmt { kind, span });
        id
    }

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }
}

fn index_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or_else(|_| panic!("AST arena exceeds u32::MAX nodes"))
}

// ── Functions ───────────────────────────────────────────────────────

/// Name and declaration site of one local variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VarInfo {
    pub name: Name,
    pub span: Span,
}

/// Every local of one function, indexed by [`VarId`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VarTable {
    vars: Vec<VarInfo>,
}

impl VarTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new local and return its identity.
    pub fn declare(&mut self, name: Name, span: Span) -> VarId {
        let id = VarId::new(index_u32(self.vars.len()));
        self.vars.push(VarInfo { name, span });
        id
    }

    pub fn get(&self, var: VarId) -> Option<&VarInfo> {
        self.vars.get(var.index())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, &VarInfo)> {
        self.vars
            .iter()
            .enumerate()
            .map(|(i, info)| (VarId::new(index_u32(i)), info))
    }
}

/// A parsed and resolved function definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: Name,
    pub params: Vec<VarId>,
    pub body: StmtId,
    pub vars: VarTable,
    pub span: Span,
}

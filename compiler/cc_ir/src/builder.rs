//! Programmatic construction of function ASTs.
//!
//! [`FunctionBuilder`] allocates nodes into an [`AstArena`] and hands out
//! synthetic, strictly increasing spans so every node is distinguishable in
//! diagnostics. It is the entry point for tools that synthesize functions
//! without going through the parser.

use crate::{
    AstArena, BinaryOp, Declarator, ExprId, ExprKind, ForInit, FunctionDef, IncDecKind, Name,
    Span, StmtId, StmtKind, StringInterner, UnaryOp, VarId, VarTable,
};

/// Builds one [`FunctionDef`] node by node.
pub struct FunctionBuilder<'i> {
    interner: &'i StringInterner,
    name: Name,
    arena: AstArena,
    vars: VarTable,
    params: Vec<VarId>,
    cursor: u32,
}

impl<'i> FunctionBuilder<'i> {
    pub fn new(interner: &'i StringInterner, name: &str) -> Self {
        Self {
            interner,
            name: interner.intern(name),
            arena: AstArena::new(),
            vars: VarTable::new(),
            params: Vec::new(),
            cursor: 0,
        }
    }

    fn next_span(&mut self) -> Span {
        let start = self.cursor;
        self.cursor += 2;
        Span::new(start, start + 1)
    }

    /// Intern a label or callee name.
    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    /// Append a parameter.
    pub fn param(&mut self, name: &str) -> VarId {
        let var = self.local(name);
        self.params.push(var);
        var
    }

    /// Register a local; it still needs a `decl` statement to come into scope.
    pub fn local(&mut self, name: &str) -> VarId {
        let span = self.next_span();
        self.vars.declare(self.interner.intern(name), span)
    }

    // ── Expressions ─────────────────────────────────────────────────

    pub fn expr(&mut self, kind: ExprKind) -> ExprId {
        let span = self.next_span();
        self.arena.alloc_expr(kind, span)
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.expr(ExprKind::IntLit(value))
    }

    pub fn var(&mut self, var: VarId) -> ExprId {
        self.expr(ExprKind::Var(var))
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        self.expr(ExprKind::Unary { op, operand })
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.expr(ExprKind::Binary { op, lhs, rhs })
    }

    pub fn assign(&mut self, target: VarId, value: ExprId) -> ExprId {
        self.expr(ExprKind::Assign {
            target,
            op: None,
            value,
        })
    }

    pub fn compound_assign(&mut self, target: VarId, op: BinaryOp, value: ExprId) -> ExprId {
        self.expr(ExprKind::Assign {
            target,
            op: Some(op),
            value,
        })
    }

    pub fn inc_dec(&mut self, target: VarId, kind: IncDecKind) -> ExprId {
        self.expr(ExprKind::IncDec { target, kind })
    }

    pub fn call(&mut self, func: &str, args: Vec<ExprId>) -> ExprId {
        let func = self.name(func);
        self.expr(ExprKind::Call { func, args })
    }

    pub fn comma(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.expr(ExprKind::Comma { lhs, rhs })
    }

    // ── Statements ──────────────────────────────────────────────────

    pub fn stmt(&mut self, kind: StmtKind) -> StmtId {
        let span = self.next_span();
        self.arena.alloc_stmt(kind, span)
    }

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        self.stmt(StmtKind::Expr(expr))
    }

    /// `int var = init;` (or `int var;` without an initializer).
    pub fn decl(&mut self, var: VarId, init: Option<ExprId>) -> StmtId {
        self.stmt(StmtKind::Decl(vec![Declarator { var, init }]))
    }

    pub fn block(&mut self, stmts: Vec<StmtId>) -> StmtId {
        self.stmt(StmtKind::Compound(stmts))
    }

    pub fn if_(&mut self, cond: ExprId, then_branch: StmtId, else_branch: Option<StmtId>) -> StmtId {
        self.stmt(StmtKind::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    pub fn while_(&mut self, cond: ExprId, body: StmtId) -> StmtId {
        self.stmt(StmtKind::While { cond, body })
    }

    pub fn do_while(&mut self, body: StmtId, cond: ExprId) -> StmtId {
        self.stmt(StmtKind::DoWhile { body, cond })
    }

    pub fn for_(
        &mut self,
        init: ForInit,
        cond: Option<ExprId>,
        step: Option<ExprId>,
        body: StmtId,
    ) -> StmtId {
        self.stmt(StmtKind::For {
            init,
            cond,
            step,
            body,
        })
    }

    pub fn switch(&mut self, scrutinee: ExprId, body: StmtId) -> StmtId {
        self.stmt(StmtKind::Switch { scrutinee, body })
    }

    pub fn case(&mut self, value: i64, body: StmtId) -> StmtId {
        self.stmt(StmtKind::Case { value, body })
    }

    pub fn default_(&mut self, body: StmtId) -> StmtId {
        self.stmt(StmtKind::Default { body })
    }

    pub fn break_(&mut self) -> StmtId {
        self.stmt(StmtKind::Break)
    }

    pub fn continue_(&mut self) -> StmtId {
        self.stmt(StmtKind::Continue)
    }

    pub fn goto(&mut self, label: &str) -> StmtId {
        let name = self.name(label);
        self.stmt(StmtKind::Goto(name))
    }

    pub fn label(&mut self, label: &str, body: StmtId) -> StmtId {
        let name = self.name(label);
        self.stmt(StmtKind::Label { name, body })
    }

    pub fn ret(&mut self, value: Option<ExprId>) -> StmtId {
        self.stmt(StmtKind::Return(value))
    }

    pub fn empty(&mut self) -> StmtId {
        self.stmt(StmtKind::Empty)
    }

    /// Read back a node's span (for asserting on diagnostics).
    pub fn stmt_span(&self, stmt: StmtId) -> Span {
        self.arena.stmt(stmt).span
    }

    /// Finish the function with `body` as its top-level statement.
    pub fn finish(mut self, body: StmtId) -> (FunctionDef, AstArena) {
        let span = self.next_span();
        let def = FunctionDef {
            name: self.name,
            params: self.params,
            body,
            vars: self.vars,
            span,
        };
        (def, self.arena)
    }
}

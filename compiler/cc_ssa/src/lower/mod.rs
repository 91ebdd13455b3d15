//! AST → CFG lowering.
//!
//! Walks one function body and produces a [`Cfg`] whose blocks hold
//! sequenced instructions with unversioned variable references.
//!
//! # Shape
//!
//! Every statement is lowered *into* a current block and returns the block
//! where control continues afterwards. Statements that always transfer
//! control (`return`, `break`, `continue`, `goto`) return a fresh
//! placeholder block reached only through an impossible edge; any code that
//! follows them lands there and is later removed by cleanup.
//!
//! - [`LoweringContext`] carries the `break`/`continue`/`case` targets
//! - [`Sequencer`] flattens each expression into instructions
//! - labels are function-scoped and created on first mention, so a forward
//!   `goto` and the label it names share one block

mod context;
mod sequence;

use cc_ir::{AstArena, Declarator, ExprId, ForInit, FunctionDef, Name, StmtId, StmtKind};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::cfg::Cfg;
use crate::error::Ice;
use crate::ir::{BlockId, Instr, Jump, Operand, SsaVar};
use crate::stack::ensure_sufficient_stack;

use self::context::LoweringContext;
use self::sequence::{Sequencer, TempCounter};

/// Lower `func` into a control-flow graph.
///
/// The entry block binds the parameters; falling off the end of the body
/// returns without a value. Every block of the result is terminated.
pub fn lower_function(func: &FunctionDef, arena: &AstArena) -> Result<Cfg, Ice> {
    let mut lowerer = Lowerer {
        arena,
        cfg: Cfg::new(func.vars.len()),
        temps: TempCounter::default(),
        labels: FxHashMap::default(),
        defined_labels: FxHashSet::default(),
    };

    let entry = lowerer.cfg.entry();
    for (index, &param) in (0u32..).zip(&func.params) {
        if param.index() >= func.vars.len() {
            return Err(Ice::UnknownVariable { var: param });
        }
        lowerer.cfg.block_mut(entry).instrs.push(Instr::Param {
            dst: SsaVar::unversioned(param),
            index,
        });
    }

    let exit = lowerer.lower_stmt(LoweringContext::default(), entry, func.body)?;

    // Implicit `return;` at the end of the body. Its dead target is a
    // self-looping sink so that no block is left unterminated.
    let sink = lowerer.cfg.new_block();
    lowerer.cfg.connect(
        sink,
        Jump::Impossible {
            dead: sink,
            value: None,
        },
    );
    lowerer.terminate(
        exit,
        Jump::Impossible {
            dead: sink,
            value: None,
        },
    );

    let Lowerer { mut cfg, temps, .. } = lowerer;
    cfg.set_num_temps(temps.count());

    if let Some(block) = cfg
        .blocks()
        .iter()
        .find(|b| matches!(b.terminator(), Jump::Missing))
    {
        // Only an undefined `goto` label can leave a block unterminated.
        return Err(Ice::MissingTerminator { block: block.id });
    }

    tracing::debug!(
        function = func.name.raw(),
        blocks = cfg.num_blocks(),
        temps = cfg.num_temps(),
        "lowered function to CFG"
    );
    Ok(cfg)
}

struct Lowerer<'a> {
    arena: &'a AstArena,
    cfg: Cfg,
    temps: TempCounter,
    labels: FxHashMap<Name, BlockId>,
    defined_labels: FxHashSet<Name>,
}

impl Lowerer<'_> {
    fn terminate(&mut self, block: BlockId, jump: Jump) {
        debug_assert!(
            matches!(self.cfg.block(block).terminator(), Jump::Missing),
            "{block} terminated twice"
        );
        self.cfg.connect(block, jump);
    }

    /// Sequence `expr` at the end of `block`.
    fn emit_expr(&mut self, block: BlockId, expr: ExprId) -> Result<Operand, Ice> {
        let seq = Sequencer::new(self.arena, self.cfg.num_vars(), &mut self.temps).sequence(expr)?;
        self.cfg.block_mut(block).instrs.extend(seq.instrs);
        Ok(seq.value)
    }

    fn emit_decls(&mut self, block: BlockId, decls: &[Declarator]) -> Result<(), Ice> {
        for decl in decls {
            if decl.var.index() >= self.cfg.num_vars() {
                return Err(Ice::UnknownVariable { var: decl.var });
            }
            self.cfg
                .block_mut(block)
                .instrs
                .push(Instr::Declare { var: decl.var });
            if let Some(init) = decl.init {
                let value = self.emit_expr(block, init)?;
                self.cfg.block_mut(block).instrs.push(Instr::Assign {
                    dst: SsaVar::unversioned(decl.var),
                    value,
                });
            }
        }
        Ok(())
    }

    fn label_block(&mut self, name: Name) -> BlockId {
        if let Some(&block) = self.labels.get(&name) {
            return block;
        }
        let block = self.cfg.new_block();
        self.labels.insert(name, block);
        block
    }

    /// Terminate `block` with an always-taken jump to `target` and return
    /// the placeholder that receives whatever follows.
    fn jump_away(&mut self, block: BlockId, target: BlockId) -> BlockId {
        let impossible = self.cfg.new_block();
        self.terminate(block, Jump::Constant { target, impossible });
        impossible
    }

    fn lower_stmt(
        &mut self,
        ctx: LoweringContext<'_>,
        block: BlockId,
        id: StmtId,
    ) -> Result<BlockId, Ice> {
        ensure_sufficient_stack(|| self.lower_stmt_inner(ctx, block, id))
    }

    fn lower_stmt_inner(
        &mut self,
        ctx: LoweringContext<'_>,
        block: BlockId,
        id: StmtId,
    ) -> Result<BlockId, Ice> {
        let arena = self.arena;
        let stmt = arena.stmt(id);
        let span = stmt.span;

        if !matches!(
            stmt.kind,
            StmtKind::Compound(_)
                | StmtKind::Empty
                | StmtKind::Label { .. }
                | StmtKind::Case { .. }
                | StmtKind::Default { .. }
        ) {
            self.cfg.block_mut(block).spans.push(span);
        }

        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.emit_expr(block, *expr)?;
                Ok(block)
            }
            StmtKind::Decl(decls) => {
                self.emit_decls(block, decls)?;
                Ok(block)
            }
            StmtKind::Compound(stmts) => {
                let mut current = block;
                for &stmt in stmts {
                    current = self.lower_stmt(ctx, current, stmt)?;
                }
                Ok(current)
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => self.lower_if(ctx, block, *cond, *then_branch, *else_branch),
            StmtKind::While { cond, body } => self.lower_while(ctx, block, *cond, *body),
            StmtKind::DoWhile { body, cond } => self.lower_do_while(ctx, block, *body, *cond),
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => self.lower_for(ctx, block, init, *cond, *step, *body),
            StmtKind::Switch { scrutinee, body } => {
                self.lower_switch(ctx, block, *scrutinee, *body)
            }
            StmtKind::Case { body, .. } | StmtKind::Default { body } => {
                let target = ctx
                    .cases
                    .and_then(|cases| cases.get(&id))
                    .copied()
                    .ok_or(Ice::CaseOutsideSwitch { span })?;
                // Fallthrough from the previous case.
                self.terminate(block, Jump::Unconditional { target });
                self.lower_stmt(ctx, target, *body)
            }
            StmtKind::Break => {
                let target = ctx.break_target.ok_or(Ice::BreakOutsideLoop { span })?;
                Ok(self.jump_away(block, target))
            }
            StmtKind::Continue => {
                let target = ctx
                    .continue_target
                    .ok_or(Ice::ContinueOutsideLoop { span })?;
                Ok(self.jump_away(block, target))
            }
            StmtKind::Goto(name) => {
                let target = self.label_block(*name);
                Ok(self.jump_away(block, target))
            }
            StmtKind::Label { name, body } => {
                if !self.defined_labels.insert(*name) {
                    return Err(Ice::DuplicateLabel { name: *name, span });
                }
                let target = self.label_block(*name);
                self.terminate(block, Jump::Unconditional { target });
                self.lower_stmt(ctx, target, *body)
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => Some(self.emit_expr(block, *expr)?),
                    None => None,
                };
                let dead = self.cfg.new_block();
                self.terminate(block, Jump::Impossible { dead, value });
                Ok(dead)
            }
            StmtKind::Empty => Ok(block),
            StmtKind::Error => Err(Ice::ErrorNode { span }),
        }
    }

    fn lower_if(
        &mut self,
        ctx: LoweringContext<'_>,
        block: BlockId,
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    ) -> Result<BlockId, Ice> {
        let cond = self.emit_expr(block, cond)?;
        let then_block = self.cfg.new_block();
        let merge = self.cfg.new_block();
        let else_block = if else_branch.is_some() {
            self.cfg.new_block()
        } else {
            merge
        };
        self.terminate(
            block,
            Jump::Conditional {
                cond,
                then_block,
                else_block,
            },
        );

        let then_exit = self.lower_stmt(ctx, then_block, then_branch)?;
        self.terminate(then_exit, Jump::Unconditional { target: merge });
        if let Some(else_branch) = else_branch {
            let else_exit = self.lower_stmt(ctx, else_block, else_branch)?;
            self.terminate(else_exit, Jump::Unconditional { target: merge });
        }
        Ok(merge)
    }

    fn lower_while(
        &mut self,
        ctx: LoweringContext<'_>,
        block: BlockId,
        cond: ExprId,
        body: StmtId,
    ) -> Result<BlockId, Ice> {
        let header = self.cfg.new_block();
        self.terminate(block, Jump::Unconditional { target: header });
        let cond = self.emit_expr(header, cond)?;

        let body_block = self.cfg.new_block();
        let after = self.cfg.new_block();
        let body_exit = self.lower_stmt(ctx.in_loop(after, header), body_block, body)?;
        self.terminate(body_exit, Jump::Unconditional { target: header });

        self.terminate(
            header,
            Jump::Conditional {
                cond,
                then_block: body_block,
                else_block: after,
            },
        );
        Ok(after)
    }

    fn lower_do_while(
        &mut self,
        ctx: LoweringContext<'_>,
        block: BlockId,
        body: StmtId,
        cond: ExprId,
    ) -> Result<BlockId, Ice> {
        let body_block = self.cfg.new_block();
        self.terminate(block, Jump::Unconditional { target: body_block });

        // `continue` re-evaluates the condition, so it gets its own block.
        let cond_block = self.cfg.new_block();
        let after = self.cfg.new_block();
        let body_exit = self.lower_stmt(ctx.in_loop(after, cond_block), body_block, body)?;
        self.terminate(body_exit, Jump::Unconditional { target: cond_block });

        let cond = self.emit_expr(cond_block, cond)?;
        self.terminate(
            cond_block,
            Jump::Conditional {
                cond,
                then_block: body_block,
                else_block: after,
            },
        );
        Ok(after)
    }

    fn lower_for(
        &mut self,
        ctx: LoweringContext<'_>,
        block: BlockId,
        init: &ForInit,
        cond: Option<ExprId>,
        step: Option<ExprId>,
        body: StmtId,
    ) -> Result<BlockId, Ice> {
        match init {
            ForInit::None => {}
            ForInit::Expr(expr) => {
                self.emit_expr(block, *expr)?;
            }
            ForInit::Decl(decls) => self.emit_decls(block, decls)?,
        }

        let header = self.cfg.new_block();
        self.terminate(block, Jump::Unconditional { target: header });
        let cond = match cond {
            Some(cond) => Some(self.emit_expr(header, cond)?),
            None => None,
        };

        let body_block = self.cfg.new_block();
        let after = self.cfg.new_block();
        // `continue` must still run the step expression.
        let latch = if step.is_some() {
            self.cfg.new_block()
        } else {
            header
        };
        let body_exit = self.lower_stmt(ctx.in_loop(after, latch), body_block, body)?;
        self.terminate(body_exit, Jump::Unconditional { target: latch });

        if let Some(step) = step {
            self.emit_expr(latch, step)?;
            self.terminate(latch, Jump::Unconditional { target: header });
        }

        let jump = match cond {
            Some(cond) => Jump::Conditional {
                cond,
                then_block: body_block,
                else_block: after,
            },
            None => Jump::Unconditional { target: body_block },
        };
        self.terminate(header, jump);
        Ok(after)
    }

    fn lower_switch(
        &mut self,
        ctx: LoweringContext<'_>,
        block: BlockId,
        scrutinee: ExprId,
        body: StmtId,
    ) -> Result<BlockId, Ice> {
        let value = self.emit_expr(block, scrutinee)?;
        let after = self.cfg.new_block();

        let mut labels = Vec::new();
        collect_case_labels(self.arena, body, &mut labels);

        let mut cases = FxHashMap::default();
        let mut options: Vec<(i64, BlockId)> = Vec::new();
        let mut default = None;
        for (stmt, label) in labels {
            let target = self.cfg.new_block();
            cases.insert(stmt, target);
            let span = self.arena.stmt(stmt).span;
            match label {
                Some(value) => {
                    if options.iter().any(|&(v, _)| v == value) {
                        return Err(Ice::DuplicateCase { value, span });
                    }
                    options.push((value, target));
                }
                None => {
                    if default.is_some() {
                        return Err(Ice::Malformed(format!(
                            "second `default` label at {span}"
                        )));
                    }
                    default = Some(target);
                }
            }
        }

        self.terminate(
            block,
            Jump::Select {
                value,
                options,
                default: default.unwrap_or(after),
            },
        );

        // Statements before the first label are never executed.
        let head = self.cfg.new_block();
        let body_exit = self.lower_stmt(ctx.in_switch(after, &cases), head, body)?;
        self.terminate(body_exit, Jump::Unconditional { target: after });
        Ok(after)
    }
}

/// Collect the `case`/`default` statements owned by one switch body, in
/// source order. Nested switches own their own labels.
fn collect_case_labels(arena: &AstArena, id: StmtId, out: &mut Vec<(StmtId, Option<i64>)>) {
    ensure_sufficient_stack(|| match &arena.stmt(id).kind {
        StmtKind::Case { value, body } => {
            out.push((id, Some(*value)));
            collect_case_labels(arena, *body, out);
        }
        StmtKind::Default { body } => {
            out.push((id, None));
            collect_case_labels(arena, *body, out);
        }
        StmtKind::Compound(stmts) => {
            for &stmt in stmts {
                collect_case_labels(arena, stmt, out);
            }
        }
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            collect_case_labels(arena, *then_branch, out);
            if let Some(else_branch) = else_branch {
                collect_case_labels(arena, *else_branch, out);
            }
        }
        StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::For { body, .. }
        | StmtKind::Label { body, .. } => collect_case_labels(arena, *body, out),
        StmtKind::Switch { .. }
        | StmtKind::Expr(_)
        | StmtKind::Decl(_)
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Goto(_)
        | StmtKind::Return(_)
        | StmtKind::Empty
        | StmtKind::Error => {}
    });
}

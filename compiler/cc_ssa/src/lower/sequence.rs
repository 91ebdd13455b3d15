//! Expression sequencing: flatten one expression tree into instructions.
//!
//! The sequencer evaluates operands left to right, gives every intermediate
//! result a fresh [`TempId`], and leaves source variables as unversioned
//! [`SsaVar`] references for renaming to resolve. Assignments become
//! [`Instr::Assign`]; the value of an assignment expression is a read of
//! the assigned variable, which renaming binds to the new version.

use cc_ir::{AstArena, ExprId, ExprKind, VarId};

use crate::error::Ice;
use crate::ir::{Instr, Operand, SsaVar, TempId};
use crate::stack::ensure_sufficient_stack;

/// Instructions for one expression plus the operand holding its value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Sequenced {
    pub(crate) instrs: Vec<Instr>,
    pub(crate) value: Operand,
}

/// Allocates temporaries for one function. Owned by the lowerer.
#[derive(Debug, Default)]
pub(crate) struct TempCounter {
    next: u32,
}

impl TempCounter {
    pub(crate) fn fresh(&mut self) -> TempId {
        let id = TempId::new(self.next);
        self.next += 1;
        id
    }

    pub(crate) fn count(&self) -> u32 {
        self.next
    }
}

pub(crate) struct Sequencer<'a> {
    arena: &'a AstArena,
    num_vars: usize,
    temps: &'a mut TempCounter,
    instrs: Vec<Instr>,
}

impl<'a> Sequencer<'a> {
    pub(crate) fn new(arena: &'a AstArena, num_vars: usize, temps: &'a mut TempCounter) -> Self {
        Self {
            arena,
            num_vars,
            temps,
            instrs: Vec::new(),
        }
    }

    /// Sequence `expr` and return its instructions and result.
    pub(crate) fn sequence(mut self, expr: ExprId) -> Result<Sequenced, Ice> {
        let value = self.expr(expr)?;
        Ok(Sequenced {
            instrs: self.instrs,
            value,
        })
    }

    fn var(&self, var: VarId) -> Result<SsaVar, Ice> {
        if var.index() < self.num_vars {
            Ok(SsaVar::unversioned(var))
        } else {
            Err(Ice::UnknownVariable { var })
        }
    }

    fn expr(&mut self, id: ExprId) -> Result<Operand, Ice> {
        ensure_sufficient_stack(|| self.expr_inner(id))
    }

    fn expr_inner(&mut self, id: ExprId) -> Result<Operand, Ice> {
        let arena = self.arena;
        let expr = arena.expr(id);
        match &expr.kind {
            ExprKind::IntLit(value) => Ok(Operand::Const(*value)),
            ExprKind::Var(var) => Ok(Operand::Var(self.var(*var)?)),
            ExprKind::Unary { op, operand } => {
                let operand = self.expr(*operand)?;
                let dst = self.temps.fresh();
                self.instrs.push(Instr::Unary {
                    dst,
                    op: *op,
                    operand,
                });
                Ok(Operand::Temp(dst))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.expr(*lhs)?;
                let rhs = self.expr(*rhs)?;
                let dst = self.temps.fresh();
                self.instrs.push(Instr::Binary {
                    dst,
                    op: *op,
                    lhs,
                    rhs,
                });
                Ok(Operand::Temp(dst))
            }
            ExprKind::Assign { target, op, value } => {
                let target = self.var(*target)?;
                let mut value = self.expr(*value)?;
                if let Some(op) = op {
                    let dst = self.temps.fresh();
                    self.instrs.push(Instr::Binary {
                        dst,
                        op: *op,
                        lhs: Operand::Var(target),
                        rhs: value,
                    });
                    value = Operand::Temp(dst);
                }
                self.instrs.push(Instr::Assign { dst: target, value });
                Ok(Operand::Var(target))
            }
            ExprKind::IncDec { target, kind } => {
                let target = self.var(*target)?;
                let old = if kind.is_postfix() {
                    let dst = self.temps.fresh();
                    self.instrs.push(Instr::Copy {
                        dst,
                        src: Operand::Var(target),
                    });
                    Some(dst)
                } else {
                    None
                };
                let new = self.temps.fresh();
                self.instrs.push(Instr::Binary {
                    dst: new,
                    op: kind.op(),
                    lhs: Operand::Var(target),
                    rhs: Operand::Const(1),
                });
                self.instrs.push(Instr::Assign {
                    dst: target,
                    value: Operand::Temp(new),
                });
                Ok(old.map_or(Operand::Var(target), Operand::Temp))
            }
            ExprKind::Call { func, args } => {
                let args = args
                    .iter()
                    .map(|&arg| self.expr(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let dst = self.temps.fresh();
                self.instrs.push(Instr::Call {
                    dst,
                    func: *func,
                    args,
                });
                Ok(Operand::Temp(dst))
            }
            ExprKind::Comma { lhs, rhs } => {
                self.expr(*lhs)?;
                self.expr(*rhs)
            }
            ExprKind::Error => Err(Ice::ErrorNode { span: expr.span }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cc_ir::{BinaryOp, FunctionBuilder, IncDecKind, StringInterner};
    use pretty_assertions::assert_eq;

    use super::*;

    fn t(n: u32) -> TempId {
        TempId::new(n)
    }

    fn v(var: VarId) -> Operand {
        Operand::Var(SsaVar::unversioned(var))
    }

    #[test]
    fn binary_operands_evaluated_left_to_right() {
        let interner = StringInterner::new();
        let mut fb = FunctionBuilder::new(&interner, "f");
        let x = fb.local("x");
        let a = fb.var(x);
        let one = fb.int(1);
        let add = fb.binary(BinaryOp::Add, a, one);
        let two = fb.int(2);
        let mul = fb.binary(BinaryOp::Mul, add, two);
        let body = fb.empty();
        let (def, arena) = fb.finish(body);

        let mut temps = TempCounter::default();
        let seq = Sequencer::new(&arena, def.vars.len(), &mut temps)
            .sequence(mul)
            .unwrap();
        assert_eq!(
            seq.instrs,
            vec![
                Instr::Binary {
                    dst: t(0),
                    op: BinaryOp::Add,
                    lhs: v(x),
                    rhs: Operand::Const(1),
                },
                Instr::Binary {
                    dst: t(1),
                    op: BinaryOp::Mul,
                    lhs: Operand::Temp(t(0)),
                    rhs: Operand::Const(2),
                },
            ]
        );
        assert_eq!(seq.value, Operand::Temp(t(1)));
        assert_eq!(temps.count(), 2);
    }

    #[test]
    fn compound_assignment_reads_then_writes() {
        let interner = StringInterner::new();
        let mut fb = FunctionBuilder::new(&interner, "f");
        let x = fb.local("x");
        let three = fb.int(3);
        let e = fb.compound_assign(x, BinaryOp::Sub, three);
        let body = fb.empty();
        let (def, arena) = fb.finish(body);

        let mut temps = TempCounter::default();
        let seq = Sequencer::new(&arena, def.vars.len(), &mut temps)
            .sequence(e)
            .unwrap();
        assert_eq!(
            seq.instrs,
            vec![
                Instr::Binary {
                    dst: t(0),
                    op: BinaryOp::Sub,
                    lhs: v(x),
                    rhs: Operand::Const(3),
                },
                Instr::Assign {
                    dst: SsaVar::unversioned(x),
                    value: Operand::Temp(t(0)),
                },
            ]
        );
        assert_eq!(seq.value, v(x));
    }

    #[test]
    fn postfix_increment_yields_old_value() {
        let interner = StringInterner::new();
        let mut fb = FunctionBuilder::new(&interner, "f");
        let i = fb.local("i");
        let post = fb.inc_dec(i, IncDecKind::PostInc);
        let pre = fb.inc_dec(i, IncDecKind::PreDec);
        let body = fb.empty();
        let (def, arena) = fb.finish(body);

        let mut temps = TempCounter::default();
        let seq = Sequencer::new(&arena, def.vars.len(), &mut temps)
            .sequence(post)
            .unwrap();
        assert_eq!(seq.instrs.len(), 3);
        assert_eq!(
            seq.instrs[0],
            Instr::Copy {
                dst: t(0),
                src: v(i),
            }
        );
        assert_eq!(seq.value, Operand::Temp(t(0)));

        let seq = Sequencer::new(&arena, def.vars.len(), &mut temps)
            .sequence(pre)
            .unwrap();
        assert_eq!(seq.instrs.len(), 2);
        assert_eq!(seq.value, v(i));
    }

    #[test]
    fn call_and_comma() {
        let interner = StringInterner::new();
        let mut fb = FunctionBuilder::new(&interner, "f");
        let x = fb.local("x");
        let one = fb.int(1);
        let set = fb.assign(x, one);
        let read = fb.var(x);
        let call = fb.call("g", vec![read]);
        let comma = fb.comma(set, call);
        let body = fb.empty();
        let (def, arena) = fb.finish(body);

        let mut temps = TempCounter::default();
        let seq = Sequencer::new(&arena, def.vars.len(), &mut temps)
            .sequence(comma)
            .unwrap();
        assert_eq!(seq.instrs.len(), 2);
        assert!(matches!(seq.instrs[1], Instr::Call { ref args, .. } if args == &[v(x)]));
        assert_eq!(seq.value, Operand::Temp(t(0)));
    }

    #[test]
    fn error_node_and_unknown_variable_are_ice() {
        let interner = StringInterner::new();
        let mut fb = FunctionBuilder::new(&interner, "f");
        let err = fb.expr(ExprKind::Error);
        let stray = fb.var(VarId::new(7));
        let body = fb.empty();
        let (def, arena) = fb.finish(body);

        let mut temps = TempCounter::default();
        let result = Sequencer::new(&arena, def.vars.len(), &mut temps).sequence(err);
        assert!(matches!(result, Err(Ice::ErrorNode { .. })));
        let result = Sequencer::new(&arena, def.vars.len(), &mut temps).sequence(stray);
        assert_eq!(
            result,
            Err(Ice::UnknownVariable {
                var: VarId::new(7)
            })
        );
    }
}

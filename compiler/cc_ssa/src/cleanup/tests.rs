#![allow(clippy::unwrap_used)]

use cc_ir::{FunctionBuilder, StmtId, StringInterner};
use pretty_assertions::assert_eq;

use super::*;
use crate::ir::{Instr, Jump, Operand};
use crate::lower_function;

fn b(n: u32) -> BlockId {
    BlockId::new(n)
}

fn preds(cfg: &Cfg, id: BlockId) -> Vec<BlockId> {
    cfg.block(id).preds().iter().copied().collect()
}

fn ret(cfg: &mut Cfg, block: BlockId) {
    let dead = cfg.new_block();
    cfg.connect(dead, Jump::Impossible { dead, value: None });
    cfg.connect(
        block,
        Jump::Impossible {
            dead,
            value: Some(Operand::Const(0)),
        },
    );
}

fn nonempty(cfg: &mut Cfg, block: BlockId) {
    cfg.block_mut(block).instrs.push(Instr::Declare {
        var: cc_ir::VarId::new(0),
    });
}

#[test]
fn collapses_chain_of_empty_blocks() {
    let mut cfg = Cfg::new(1);
    let b1 = cfg.new_block();
    let b2 = cfg.new_block();
    let b3 = cfg.new_block();
    cfg.connect(cfg.entry(), Jump::Unconditional { target: b1 });
    cfg.connect(b1, Jump::Unconditional { target: b2 });
    cfg.connect(b2, Jump::Unconditional { target: b3 });
    nonempty(&mut cfg, b3);
    ret(&mut cfg, b3);

    let report = cleanup(&mut cfg);
    assert_eq!(report.collapsed, 2);
    assert_eq!(
        *cfg.block(b(0)).terminator(),
        Jump::Unconditional { target: b3 }
    );
    assert_eq!(preds(&cfg, b3), vec![b(0)]);
    assert!(cfg.block(b1).is_removed());
    assert!(cfg.block(b2).is_removed());
    assert_eq!(cfg.reachable().unwrap(), &[b(0), b3]);
}

#[test]
fn entry_and_self_loops_survive() {
    let mut cfg = Cfg::new(0);
    let spin = cfg.new_block();
    cfg.connect(cfg.entry(), Jump::Unconditional { target: spin });
    cfg.connect(spin, Jump::Unconditional { target: spin });

    let report = cleanup(&mut cfg);
    assert_eq!(report.collapsed, 0);
    assert_eq!(report.unreachable, 0);
    assert_eq!(cfg.reachable().unwrap(), &[b(0), spin]);
    assert_eq!(preds(&cfg, spin), vec![b(0), spin]);
}

#[test]
fn conditional_arms_collapse_to_common_target() {
    let mut cfg = Cfg::new(1);
    let then_block = cfg.new_block();
    let else_block = cfg.new_block();
    let merge = cfg.new_block();
    cfg.connect(
        cfg.entry(),
        Jump::Conditional {
            cond: Operand::Const(1),
            then_block,
            else_block,
        },
    );
    cfg.connect(then_block, Jump::Unconditional { target: merge });
    cfg.connect(else_block, Jump::Unconditional { target: merge });
    nonempty(&mut cfg, merge);
    ret(&mut cfg, merge);

    cleanup(&mut cfg);
    assert_eq!(cfg.block(b(0)).terminator().live_successors().as_slice(), &[merge]);
    assert_eq!(preds(&cfg, merge), vec![b(0)]);
}

#[test]
fn impossible_target_is_not_collapsed_and_dead_cycle_removed() {
    let mut cfg = Cfg::new(1);
    let dead = cfg.new_block();
    let x = cfg.new_block();
    let y = cfg.new_block();
    cfg.connect(cfg.entry(), Jump::Impossible { dead, value: None });
    cfg.connect(dead, Jump::Unconditional { target: x });
    nonempty(&mut cfg, x);
    nonempty(&mut cfg, y);
    cfg.connect(x, Jump::Unconditional { target: y });
    cfg.connect(y, Jump::Unconditional { target: x });

    let report = cleanup(&mut cfg);
    assert_eq!(report.collapsed, 0);
    assert_eq!(report.unreachable, 3);
    assert_eq!(cfg.reachable().unwrap(), &[b(0)]);
    assert_eq!(preds(&cfg, x), vec![]);
    // Scaffolding only: nothing to report.
    assert!(report.dead_regions.is_empty());
}

#[test]
fn code_after_return_is_one_region() {
    let interner = StringInterner::new();
    let mut fb = FunctionBuilder::new(&interner, "f");
    let x = fb.local("x");
    let one = fb.int(1);
    let r = fb.ret(Some(one));
    let two = fb.int(2);
    let decl = fb.decl(x, Some(two));
    let body = fb.block(vec![r, decl]);
    let decl_span = fb.stmt_span(decl);
    let (def, arena) = fb.finish(body);

    let mut cfg = lower_function(&def, &arena).unwrap();
    let report = cleanup(&mut cfg);
    assert_eq!(report.dead_regions, vec![vec![decl_span]]);
    assert_eq!(cfg.reachable().unwrap(), &[b(0)]);
}

#[test]
fn separate_dead_regions_are_reported_separately() {
    let interner = StringInterner::new();
    let mut fb = FunctionBuilder::new(&interner, "f");
    let c = fb.param("c");
    let one = fb.int(1);
    let r1 = fb.ret(Some(one));
    let g = fb.call("g", vec![]);
    let after_r1 = fb.expr_stmt(g);
    let then_s = fb.block(vec![r1, after_r1]);
    let cond = fb.var(c);
    let if_s = fb.if_(cond, then_s, None);
    let two = fb.int(2);
    let r2 = fb.ret(Some(two));
    let h = fb.call("h", vec![]);
    let after_r2 = fb.expr_stmt(h);
    let body = fb.block(vec![if_s, r2, after_r2]);
    let spans = (fb.stmt_span(after_r1), fb.stmt_span(after_r2));
    let (def, arena) = fb.finish(body);

    let mut cfg = lower_function(&def, &arena).unwrap();
    let report = cleanup(&mut cfg);
    assert_eq!(report.dead_regions, vec![vec![spans.0], vec![spans.1]]);
}

#[test]
fn code_after_break_inside_loop_is_reported() {
    let interner = StringInterner::new();
    let mut fb = FunctionBuilder::new(&interner, "f");
    let brk = fb.break_();
    let cont = fb.continue_();
    let loop_body = fb.block(vec![brk, cont]);
    let one = fb.int(1);
    let loop_s = fb.while_(one, loop_body);
    let body = fb.block(vec![loop_s]);
    let cont_span = fb.stmt_span(cont);
    let (def, arena) = fb.finish(body);

    let mut cfg = lower_function(&def, &arena).unwrap();
    let report = cleanup(&mut cfg);
    assert_eq!(report.collapsed, 1);
    assert_eq!(report.dead_regions, vec![vec![cont_span]]);
    // entry, header, after
    assert_eq!(cfg.reachable().unwrap(), &[b(0), b(1), b(3)]);
}

#[test]
fn every_reachable_block_has_only_reachable_preds() {
    let interner = StringInterner::new();
    let mut fb = FunctionBuilder::new(&interner, "f");
    let c = fb.param("c");
    let x = fb.local("x");
    let decl = fb.decl(x, None);
    let one = fb.int(1);
    let r = fb.ret(Some(one));
    let cond = fb.var(c);
    let if_s = fb.if_(cond, r, None);
    let xr = fb.var(x);
    let set = fb.assign(x, xr);
    let set_s = fb.expr_stmt(set);
    let body = fb.block(vec![decl, if_s, set_s]);
    let (def, arena) = fb.finish(body);

    let mut cfg = lower_function(&def, &arena).unwrap();
    cleanup(&mut cfg);
    let reachable: Vec<BlockId> = cfg.reachable().unwrap().to_vec();
    for &id in &reachable {
        for pred in cfg.block(id).preds() {
            assert!(reachable.contains(pred), "{pred} -> {id} from dead block");
            assert!(cfg.block(*pred).terminator().can_reach(id));
        }
    }
}

/// `while (c) { return 1; L: <jump>; } return 0;`
fn assert_labelled_jump_after_return_reported(jump: fn(&mut FunctionBuilder<'_>) -> StmtId) {
    let interner = StringInterner::new();
    let mut fb = FunctionBuilder::new(&interner, "f");
    let c = fb.param("c");
    let one = fb.int(1);
    let r1 = fb.ret(Some(one));
    let inner = jump(&mut fb);
    let labelled = fb.label("L", inner);
    let loop_body = fb.block(vec![r1, labelled]);
    let cond = fb.var(c);
    let loop_s = fb.while_(cond, loop_body);
    let zero = fb.int(0);
    let r0 = fb.ret(Some(zero));
    let body = fb.block(vec![loop_s, r0]);
    let inner_span = fb.stmt_span(inner);
    let (def, arena) = fb.finish(body);

    let mut cfg = lower_function(&def, &arena).unwrap();
    let report = cleanup(&mut cfg);
    assert_eq!(report.dead_regions, vec![vec![inner_span]]);
}

#[test]
fn dead_continue_in_its_own_block_is_reported() {
    assert_labelled_jump_after_return_reported(|fb| fb.continue_());
}

#[test]
fn dead_break_in_its_own_block_is_reported() {
    assert_labelled_jump_after_return_reported(|fb| fb.break_());
}

#[test]
fn unreached_empty_blocks_are_removed_not_collapsed() {
    let mut cfg = Cfg::new(1);
    let dead = cfg.new_block();
    let hop = cfg.new_block();
    let sink = cfg.new_block();
    cfg.connect(cfg.entry(), Jump::Impossible { dead, value: None });
    cfg.connect(dead, Jump::Unconditional { target: hop });
    cfg.connect(hop, Jump::Unconditional { target: sink });
    cfg.connect(sink, Jump::Unconditional { target: sink });
    cfg.block_mut(hop).spans.push(Span::new(4, 5));

    let report = cleanup(&mut cfg);
    assert_eq!(report.collapsed, 0);
    assert_eq!(report.unreachable, 3);
    assert_eq!(report.dead_regions, vec![vec![Span::new(4, 5)]]);
}

#[test]
fn dead_tails_meeting_at_dead_merge_stay_apart() {
    // if (c) { return 1; g(); } else { return 2; h(); }
    let interner = StringInterner::new();
    let mut fb = FunctionBuilder::new(&interner, "f");
    let c = fb.param("c");
    let one = fb.int(1);
    let r1 = fb.ret(Some(one));
    let g = fb.call("g", vec![]);
    let g_s = fb.expr_stmt(g);
    let then_s = fb.block(vec![r1, g_s]);
    let two = fb.int(2);
    let r2 = fb.ret(Some(two));
    let h = fb.call("h", vec![]);
    let h_s = fb.expr_stmt(h);
    let else_s = fb.block(vec![r2, h_s]);
    let cond = fb.var(c);
    let if_s = fb.if_(cond, then_s, Some(else_s));
    let body = fb.block(vec![if_s]);
    let (g_span, r2_span, h_span) = (fb.stmt_span(g_s), fb.stmt_span(r2), fb.stmt_span(h_s));
    let (def, arena) = fb.finish(body);

    let mut cfg = lower_function(&def, &arena).unwrap();
    let report = cleanup(&mut cfg);
    assert_eq!(report.dead_regions, vec![vec![g_span], vec![h_span]]);
    for region in &report.dead_regions {
        let covered = region.iter().copied().reduce(Span::merge).unwrap();
        assert!(covered.end <= r2_span.start || covered.start >= r2_span.end);
    }
}

#[test]
fn live_code_between_dead_spans_splits_a_run() {
    let dead = vec![Span::new(0, 2), Span::new(3, 4), Span::new(10, 12)];
    let live = [Span::new(6, 8), Span::new(0, 20)];
    assert_eq!(
        split_at_live_code(dead, &live),
        vec![
            vec![Span::new(0, 2), Span::new(3, 4)],
            vec![Span::new(10, 12)],
        ]
    );
}

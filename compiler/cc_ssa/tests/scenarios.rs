//! End-to-end SSA construction through `build_ssa`.
//!
//! Enable tracing output with `RUST_LOG=cc_ssa=debug`.

#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use std::sync::Once;

use cc_diagnostic::{DiagnosticConfig, DiagnosticQueue, ErrorCode};
use cc_ir::{BinaryOp, FunctionBuilder, StmtId, StringInterner};
use cc_ssa::{
    build_ssa, compute_liveness, verify, BlockId, Cfg, Ice, Jump, Operand, PipelineConfig,
};
use pretty_assertions::assert_eq;

static TRACING_INIT: Once = Once::new();

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

fn b(n: u32) -> BlockId {
    BlockId::new(n)
}

fn build(fb: FunctionBuilder<'_>, body: StmtId) -> (Result<Cfg, Ice>, DiagnosticQueue) {
    init_tracing();
    let (def, arena) = fb.finish(body);
    let mut diagnostics = DiagnosticQueue::with_config(DiagnosticConfig::unlimited());
    let result = build_ssa(&def, &arena, &PipelineConfig::strict(), &mut diagnostics);
    (result, diagnostics)
}

fn phi_count(cfg: &Cfg) -> usize {
    cfg.live_blocks().map(|block| block.phis.len()).sum()
}

#[test]
fn straight_line_is_one_block() {
    // int f(){ int a = 1; int b = a + 1; return b; }
    let interner = StringInterner::new();
    let mut fb = FunctionBuilder::new(&interner, "f");
    let a = fb.local("a");
    let bv = fb.local("b");
    let one = fb.int(1);
    let decl_a = fb.decl(a, Some(one));
    let ar = fb.var(a);
    let one = fb.int(1);
    let sum = fb.binary(BinaryOp::Add, ar, one);
    let decl_b = fb.decl(bv, Some(sum));
    let br = fb.var(bv);
    let ret = fb.ret(Some(br));
    let body = fb.block(vec![decl_a, decl_b, ret]);

    let (cfg, diagnostics) = build(fb, body);
    let cfg = cfg.unwrap();

    assert_eq!(cfg.reachable().unwrap(), &[b(0)]);
    assert_eq!(phi_count(&cfg), 0);
    assert_eq!(cfg.dominators().unwrap().len(), 1);
    assert!(diagnostics.is_empty());
}

#[test]
fn diamond_merges_through_one_phi() {
    // int f(int c){ int y; if (c) { y = 1; } else { y = 2; } return y; }
    let interner = StringInterner::new();
    let mut fb = FunctionBuilder::new(&interner, "f");
    let c = fb.param("c");
    let y = fb.local("y");
    let decl = fb.decl(y, None);
    let cond = fb.var(c);
    let one = fb.int(1);
    let set1 = fb.assign(y, one);
    let set1 = fb.expr_stmt(set1);
    let then_s = fb.block(vec![set1]);
    let two = fb.int(2);
    let set2 = fb.assign(y, two);
    let set2 = fb.expr_stmt(set2);
    let else_s = fb.block(vec![set2]);
    let if_s = fb.if_(cond, then_s, Some(else_s));
    let yr = fb.var(y);
    let ret = fb.ret(Some(yr));
    let body = fb.block(vec![decl, if_s, ret]);

    let (cfg, diagnostics) = build(fb, body);
    let cfg = cfg.unwrap();
    assert!(diagnostics.is_empty());

    // bb1 then, bb2 merge, bb3 else.
    let merge = cfg.block(b(2));
    assert_eq!(phi_count(&cfg), 1);
    let phi = merge.phi_for(y).unwrap();
    assert_eq!(phi.preds().collect::<Vec<_>>(), vec![b(1), b(3)]);
    let from_then = phi.incoming_from(b(1)).unwrap();
    let from_else = phi.incoming_from(b(3)).unwrap();
    assert!(from_then.is_defined() && from_else.is_defined());
    assert_ne!(from_then, from_else);
    assert_eq!(
        merge.terminator().operand(),
        Some(&Operand::Var(phi.target))
    );
}

#[test]
fn loop_header_merges_entry_and_back_edge() {
    // int f(){ int x = 0; while (x < 10) { x = x + 1; } return x; }
    let interner = StringInterner::new();
    let mut fb = FunctionBuilder::new(&interner, "f");
    let x = fb.local("x");
    let zero = fb.int(0);
    let decl = fb.decl(x, Some(zero));
    let xr = fb.var(x);
    let ten = fb.int(10);
    let cond = fb.binary(BinaryOp::Lt, xr, ten);
    let xr = fb.var(x);
    let one = fb.int(1);
    let add = fb.binary(BinaryOp::Add, xr, one);
    let set = fb.assign(x, add);
    let set = fb.expr_stmt(set);
    let loop_body = fb.block(vec![set]);
    let loop_s = fb.while_(cond, loop_body);
    let xr = fb.var(x);
    let ret = fb.ret(Some(xr));
    let body = fb.block(vec![decl, loop_s, ret]);

    let (cfg, _) = build(fb, body);
    let cfg = cfg.unwrap();

    let header = cfg.block(b(1));
    assert_eq!(header.preds().iter().copied().collect::<Vec<_>>(), vec![b(0), b(2)]);
    assert_eq!(header.phis.len(), 1);
    let phi = &header.phis[0];
    assert_eq!(phi.var(), x);
    assert_eq!(phi.incoming.len(), 2);
    assert_ne!(phi.incoming_from(b(0)), phi.incoming_from(b(2)));

    // The header value is what the loop exit returns.
    assert_eq!(
        cfg.block(b(3)).terminator().operand(),
        Some(&Operand::Var(phi.target))
    );
    let liveness = compute_liveness(&cfg).unwrap();
    assert!(liveness.live_out(b(1)).contains(&phi.target));
}

#[test]
fn code_after_return_is_reported_once() {
    // int f(){ return 1; int x = 2; }
    let interner = StringInterner::new();
    let mut fb = FunctionBuilder::new(&interner, "f");
    let x = fb.local("x");
    let one = fb.int(1);
    let ret = fb.ret(Some(one));
    let two = fb.int(2);
    let decl = fb.decl(x, Some(two));
    let decl_span = fb.stmt_span(decl);
    let body = fb.block(vec![ret, decl]);

    let (cfg, diagnostics) = build(fb, body);
    let cfg = cfg.unwrap();

    assert_eq!(cfg.reachable().unwrap(), &[b(0)]);
    assert!(!cfg.live_blocks().any(|block| block.spans.contains(&decl_span)));
    assert_eq!(diagnostics.len(), 1);
    let diag = &diagnostics.diagnostics()[0];
    assert_eq!(diag.code, ErrorCode::W1001);
    assert_eq!(diag.primary_span(), Some(decl_span));
}

#[test]
fn dead_labelled_continue_is_reported() {
    // int f(int c){ while (c) { return 1; L: continue; } return 0; }
    let interner = StringInterner::new();
    let mut fb = FunctionBuilder::new(&interner, "f");
    let c = fb.param("c");
    let one = fb.int(1);
    let r1 = fb.ret(Some(one));
    let cont = fb.continue_();
    let labelled = fb.label("L", cont);
    let loop_body = fb.block(vec![r1, labelled]);
    let cond = fb.var(c);
    let loop_s = fb.while_(cond, loop_body);
    let zero = fb.int(0);
    let r0 = fb.ret(Some(zero));
    let cont_span = fb.stmt_span(cont);
    let body = fb.block(vec![loop_s, r0]);

    let (cfg, diagnostics) = build(fb, body);
    cfg.unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics.diagnostics()[0].primary_span(), Some(cont_span));
}

#[test]
fn dead_tails_of_both_branches_are_reported_separately() {
    // int f(int c){ if (c) { return 1; g(); } else { return 2; h(); } }
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

    let (cfg, mut diagnostics) = build(fb, body);
    cfg.unwrap();
    let primaries: Vec<_> = diagnostics
        .flush()
        .iter()
        .map(|diag| diag.primary_span().unwrap())
        .collect();
    assert_eq!(primaries, vec![g_span, h_span]);
    assert!(primaries
        .iter()
        .all(|span| span.end <= r2_span.start || span.start >= r2_span.end));
}

#[test]
fn early_returns_need_no_phis() {
    // int f(int c){ if (c) return 1; return 2; }
    let interner = StringInterner::new();
    let mut fb = FunctionBuilder::new(&interner, "f");
    let c = fb.param("c");
    let cond = fb.var(c);
    let one = fb.int(1);
    let ret1 = fb.ret(Some(one));
    let if_s = fb.if_(cond, ret1, None);
    let two = fb.int(2);
    let ret2 = fb.ret(Some(two));
    let body = fb.block(vec![if_s, ret2]);

    let (cfg, diagnostics) = build(fb, body);
    let cfg = cfg.unwrap();

    assert_eq!(phi_count(&cfg), 0);
    assert!(diagnostics.is_empty());
    let returns: Vec<_> = cfg
        .live_blocks()
        .filter(|block| matches!(block.terminator(), Jump::Impossible { value: Some(_), .. }))
        .map(|block| block.id)
        .collect();
    assert_eq!(returns, vec![b(1), b(2)]);
    verify(&cfg).unwrap();
}

#[test]
fn dead_code_reporting_can_be_disabled() {
    let interner = StringInterner::new();
    let mut fb = FunctionBuilder::new(&interner, "f");
    let ret = fb.ret(None);
    let call = fb.call("g", vec![]);
    let call = fb.expr_stmt(call);
    let body = fb.block(vec![ret, call]);

    let (def, arena) = fb.finish(body);
    let mut diagnostics = DiagnosticQueue::new();
    let config = PipelineConfig {
        report_dead_code: false,
        ..PipelineConfig::strict()
    };
    build_ssa(&def, &arena, &config, &mut diagnostics).unwrap();
    assert!(diagnostics.is_empty());
}

#[test]
fn switch_with_fallthrough_builds() {
    // switch (c) { case 1: x = 1; case 2: x = x + 2; break; default: x = 0; } return x;
    let interner = StringInterner::new();
    let mut fb = FunctionBuilder::new(&interner, "f");
    let c = fb.param("c");
    let x = fb.local("x");
    let decl = fb.decl(x, None);
    let one = fb.int(1);
    let set1 = fb.assign(x, one);
    let set1 = fb.expr_stmt(set1);
    let case1 = fb.case(1, set1);
    let xr = fb.var(x);
    let two = fb.int(2);
    let add = fb.binary(BinaryOp::Add, xr, two);
    let set2 = fb.assign(x, add);
    let set2 = fb.expr_stmt(set2);
    let case2 = fb.case(2, set2);
    let brk = fb.break_();
    let zero = fb.int(0);
    let set0 = fb.assign(x, zero);
    let set0 = fb.expr_stmt(set0);
    let default = fb.default_(set0);
    let switch_body = fb.block(vec![case1, case2, brk, default]);
    let scrutinee = fb.var(c);
    let switch = fb.switch(scrutinee, switch_body);
    let xr = fb.var(x);
    let ret = fb.ret(Some(xr));
    let body = fb.block(vec![decl, switch, ret]);

    let (cfg, diagnostics) = build(fb, body);
    let cfg = cfg.unwrap();
    assert!(diagnostics.is_empty());

    let Jump::Select { options, .. } = cfg.block(b(0)).terminator() else {
        panic!("entry should dispatch on the scrutinee\n{cfg}");
    };
    assert_eq!(options.len(), 2);

    // The case-2 block merges fallthrough from case 1 with direct dispatch.
    let case2_block = options[1].1;
    assert!(cfg.block(case2_block).phi_for(x).is_some(), "{cfg}");
}

#[test]
fn ice_aborts_the_build() {
    let interner = StringInterner::new();
    let mut fb = FunctionBuilder::new(&interner, "f");
    let brk = fb.break_();
    let body = fb.block(vec![brk]);

    let (result, _) = build(fb, body);
    assert!(matches!(result, Err(Ice::BreakOutsideLoop { .. })));
}

//! The SSA construction pipeline for one function.

use cc_diagnostic::{unreachable_code, DiagnosticQueue};
use cc_ir::{AstArena, FunctionDef};

use crate::cfg::Cfg;
use crate::cleanup::cleanup;
use crate::dominance::compute_dominance;
use crate::error::Ice;
use crate::lower::lower_function;
use crate::order::compute_order;
use crate::phi::insert_phis;
use crate::rename::rename_variables;
use crate::verify::verify;

/// Knobs for [`build_ssa`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Run the verifier after renaming.
    pub verify: bool,
    /// Push an unreachable-code warning per dead region found by cleanup.
    pub report_dead_code: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            verify: cfg!(debug_assertions),
            report_dead_code: true,
        }
    }
}

impl PipelineConfig {
    /// Verify after every build regardless of build profile.
    pub fn strict() -> Self {
        PipelineConfig {
            verify: true,
            report_dead_code: true,
        }
    }
}

/// Build the SSA-form CFG of `func`.
///
/// Dead-code warnings go to `diagnostics` and never abort the build. An
/// `Err` means the input or a pass broke an internal invariant; the CFG
/// is discarded.
pub fn build_ssa(
    func: &FunctionDef,
    arena: &AstArena,
    config: &PipelineConfig,
    diagnostics: &mut DiagnosticQueue,
) -> Result<Cfg, Ice> {
    let mut cfg = lower_function(func, arena)?;

    let report = cleanup(&mut cfg);
    if config.report_dead_code {
        for region in &report.dead_regions {
            diagnostics.push(unreachable_code(region));
        }
    }

    compute_order(&mut cfg)?;
    compute_dominance(&mut cfg)?;
    let phis = insert_phis(&mut cfg)?;
    let definitions = rename_variables(&mut cfg)?;

    if config.verify {
        verify(&cfg)?;
    }

    tracing::debug!(
        blocks = cfg.reachable().map_or(0, <[_]>::len),
        phis,
        definitions,
        dead_regions = report.dead_regions.len(),
        "built SSA form"
    );
    Ok(cfg)
}

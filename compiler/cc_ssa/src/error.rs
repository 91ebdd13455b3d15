//! Internal compiler errors raised while building SSA.
//!
//! Every variant here means an upstream stage handed over something it
//! promised not to (an error node, a `break` outside a loop) or a pass
//! broke a graph invariant. None of them describe a problem in the user's
//! program, so they abort the function instead of joining the
//! [`DiagnosticQueue`](cc_diagnostic::DiagnosticQueue).

use cc_diagnostic::{Diagnostic, ErrorCode};
use cc_ir::{Name, Span, VarId};

use crate::ir::{BlockId, SsaVar};

/// Internal compiler error.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Ice {
    #[error("error node reached lowering at {span}")]
    ErrorNode { span: Span },

    #[error("`break` outside of a loop or switch at {span}")]
    BreakOutsideLoop { span: Span },

    #[error("`continue` outside of a loop at {span}")]
    ContinueOutsideLoop { span: Span },

    #[error("`case` or `default` outside of a switch at {span}")]
    CaseOutsideSwitch { span: Span },

    #[error("duplicate case value {value} at {span}")]
    DuplicateCase { value: i64, span: Span },

    #[error("label @{} defined twice (second at {span})", name.raw())]
    DuplicateLabel { name: Name, span: Span },

    #[error("block {block} has no terminator")]
    MissingTerminator { block: BlockId },

    #[error("variable {var} is not in the function's variable table")]
    UnknownVariable { var: VarId },

    #[error("variable {var} is declared more than once")]
    DuplicateDeclaration { var: VarId },

    #[error("variable {var} is defined before its declaration in {block}")]
    RedefinedBeforeDeclaration { var: VarId, block: BlockId },

    #[error("{block} has two phi functions for {var}")]
    DuplicatePhi { var: VarId, block: BlockId },

    #[error("use of {value} in {block} is not dominated by its definition")]
    NonDominatingDefinition { value: SsaVar, block: BlockId },

    #[error("`{pass}` requires {missing}")]
    PassOrder {
        pass: &'static str,
        missing: &'static str,
    },

    #[error("malformed CFG: {0}")]
    Malformed(String),
}

impl Ice {
    /// Render as an `E9001` diagnostic anchored at `span` (usually the
    /// function being compiled).
    pub fn to_diagnostic(&self, span: Span) -> Diagnostic {
        Diagnostic::error(ErrorCode::E9001)
            .with_message(format!("internal compiler error: {self}"))
            .with_label(span, "while building SSA for this function")
            .with_note("this is a bug in the compiler, not in your program")
    }
}

//! Diagnostic system for user-facing compiler messages.
//!
//! - Error codes for searchability
//! - Clear messages (what went wrong)
//! - Primary span (where it went wrong)
//! - Secondary labels (related locations)
//!
//! Internal compiler errors are not diagnostics: they abort the current
//! function and are reported by the caller. Only findings about the user's
//! program (such as unreachable code) flow through [`DiagnosticQueue`].

mod diagnostic;
mod error_code;
pub mod queue;

pub use diagnostic::{unreachable_code, Diagnostic, Label, Severity};
pub use error_code::ErrorCode;
pub use queue::{DiagnosticConfig, DiagnosticQueue};

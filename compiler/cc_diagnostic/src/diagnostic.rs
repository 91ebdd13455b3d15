use std::fmt;

use cc_ir::Span;

use crate::ErrorCode;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source range annotated with a short message.
///
/// The primary label says where the problem is; secondary labels point at
/// related code.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub is_primary: bool,
}

impl Label {
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self::with_role(span, message.into(), true)
    }

    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Self::with_role(span, message.into(), false)
    }

    fn with_role(span: Span, message: String, is_primary: bool) -> Self {
        Label {
            span,
            message,
            is_primary,
        }
    }
}

/// One finding about the user's program, built up with the `with_*`
/// methods.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[must_use = "push diagnostics into a DiagnosticQueue"]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub severity: Severity,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(code: ErrorCode) -> Self {
        Self::blank(code, Severity::Error)
    }

    pub fn warning(code: ErrorCode) -> Self {
        Self::blank(code, Severity::Warning)
    }

    fn blank(code: ErrorCode, severity: Severity) -> Self {
        Diagnostic {
            code,
            severity,
            message: String::new(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_message(self, message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            ..self
        }
    }

    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(span, message));
        self
    }

    pub fn with_secondary_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(span, message));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Span of the first primary label, if any.
    pub fn primary_span(&self) -> Option<Span> {
        self.labels
            .iter()
            .find_map(|label| label.is_primary.then_some(label.span))
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.code, self.message)?;
        for Label {
            span,
            message,
            is_primary,
        } in &self.labels
        {
            let arrow = if *is_primary { "-->" } else { "   " };
            write!(f, "\n  {arrow} {span}: {message}")?;
        }
        self.notes
            .iter()
            .try_for_each(|note| write!(f, "\n  = note: {note}"))
    }
}

/// W1001 for one dead region.
///
/// `statements` holds the dead statements' spans in source order. The
/// primary label covers the whole region; when the region has more than
/// one statement each gets its own secondary label.
pub fn unreachable_code(statements: &[Span]) -> Diagnostic {
    let region = statements
        .iter()
        .copied()
        .reduce(Span::merge)
        .unwrap_or(Span::DUMMY);

    let diag = Diagnostic::warning(ErrorCode::W1001)
        .with_message("unreachable code")
        .with_label(region, "this code will never be executed");
    if statements.len() < 2 {
        return diag;
    }
    statements.iter().fold(diag, |diag, &span| {
        diag.with_secondary_label(span, "unreachable statement")
    })
}

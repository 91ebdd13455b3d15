//! Diagnostic queue for one compilation unit.
//!
//! Stages push diagnostics as they find them; the driver flushes the queue
//! once every function has been built, sorted by source position.

use cc_ir::Span;

use crate::Diagnostic;

/// Filtering applied by [`DiagnosticQueue::push`].
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticConfig {
    /// Errors kept before further errors are dropped; `0` disables the cap.
    /// Warnings never count.
    pub error_limit: usize,
    /// Drop a diagnostic whose code and primary span match a queued one.
    pub deduplicate: bool,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        DiagnosticConfig {
            error_limit: 10,
            deduplicate: true,
        }
    }
}

impl DiagnosticConfig {
    /// Keep everything. Tests use this to see every push.
    pub fn unlimited() -> Self {
        DiagnosticConfig {
            error_limit: 0,
            deduplicate: false,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DiagnosticQueue {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    config: DiagnosticConfig,
}

impl DiagnosticQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DiagnosticConfig) -> Self {
        DiagnosticQueue {
            config,
            ..Self::default()
        }
    }

    /// Queue `diag` unless the config filters it. Returns whether it was kept.
    pub fn push(&mut self, diag: Diagnostic) -> bool {
        let counts = diag.is_error();
        let filtered = (counts && self.limit_reached())
            || (self.config.deduplicate && self.already_queued(&diag));
        if filtered {
            return false;
        }
        self.error_count += usize::from(counts);
        self.diagnostics.push(diag);
        true
    }

    fn already_queued(&self, diag: &Diagnostic) -> bool {
        let key = (diag.code, diag.primary_span());
        self.diagnostics
            .iter()
            .any(|queued| (queued.code, queued.primary_span()) == key)
    }

    pub fn limit_reached(&self) -> bool {
        match self.config.error_limit {
            0 => false,
            limit => self.error_count >= limit,
        }
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Queued diagnostics of either severity.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// In push order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Drain the queue, ordered by primary span. Diagnostics without a
    /// span sort first; ties keep push order.
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        let mut drained = std::mem::take(&mut self.diagnostics);
        drained.sort_by_key(|diag| diag.primary_span().unwrap_or(Span::DUMMY));
        self.error_count = 0;
        drained
    }
}

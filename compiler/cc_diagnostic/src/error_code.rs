use std::fmt;

/// Codes for every diagnostic the middle end can report.
///
/// Format: a letter for the severity class and four digits:
/// - W1xxx: control-flow warnings
/// - E9xxx: internal compiler errors surfaced to the user
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    /// Code that can never execute
    W1001,
    /// Internal compiler error while building the control-flow graph
    E9001,
}

impl ErrorCode {
    /// Get the string representation of this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::W1001 => "W1001",
            ErrorCode::E9001 => "E9001",
        }
    }

    /// Check if this is a warning code (Wxxxx range).
    pub fn is_warning(&self) -> bool {
        self.as_str().starts_with('W')
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_display() {
        assert_eq!(ErrorCode::W1001.to_string(), "W1001");
        assert!(ErrorCode::W1001.is_warning());
        assert!(!ErrorCode::E9001.is_warning());
    }
}

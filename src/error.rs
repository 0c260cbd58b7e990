//! Error types.
//!
//! [`CasError`] covers the algebra layer (parsing, solving, integrating, limits).
//! [`DistError`] is the taxonomy surfaced by distribution operations; algebra failures
//! propagate into it unchanged through `?`.

use thiserror::Error;

/// Source location span for error reporting
/// Represents a range of bytes in the input string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start position (0-indexed byte offset)
    pub start: usize,
    /// End position (exclusive, 0-indexed byte offset)
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Create a span for a single position
    pub fn at(pos: usize) -> Self {
        Span {
            start: pos,
            end: pos + 1,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.end > self.start
    }

    /// Format the span for display (1-indexed for users)
    pub fn display(&self) -> String {
        if !self.is_valid() {
            String::new()
        } else if self.end - self.start == 1 {
            format!(" at position {}", self.start + 1)
        } else {
            format!(" at positions {}-{}", self.start + 1, self.end)
        }
    }
}

fn span_suffix(span: &Option<Span>) -> String {
    span.map(|s| s.display()).unwrap_or_default()
}

/// Errors raised by the expression layer: parsing and symbolic calculus.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CasError {
    #[error("formula cannot be empty")]
    EmptyFormula,

    #[error("invalid syntax: {msg}{}", span_suffix(.span))]
    InvalidSyntax { msg: String, span: Option<Span> },

    #[error("invalid number format: '{value}'{}", span_suffix(.span))]
    InvalidNumber { value: String, span: Option<Span> },

    #[error("invalid token: '{token}'{}", span_suffix(.span))]
    InvalidToken { token: String, span: Option<Span> },

    #[error("expected {expected}, but got '{got}'{}", span_suffix(.span))]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Option<Span>,
    },

    #[error("unexpected end of input")]
    UnexpectedEndOfInput,

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' expects {expected} argument(s), got {got}")]
    InvalidFunctionCall {
        name: String,
        expected: usize,
        got: usize,
    },

    /// The algebra layer has no closed form for the request (integral, inverse, limit).
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// A limit whose leading terms cancel or oscillate.
    #[error("indeterminate limit: {0}")]
    Indeterminate(String),

    #[error("expression exceeds the maximum nesting depth")]
    MaxDepthExceeded,

    #[error("expression exceeds the maximum node count")]
    MaxNodesExceeded,
}

impl CasError {
    pub fn invalid_syntax_at(msg: impl Into<String>, span: Span) -> Self {
        CasError::InvalidSyntax {
            msg: msg.into(),
            span: Some(span),
        }
    }

    pub fn invalid_token_at(token: impl Into<String>, span: Span) -> Self {
        CasError::InvalidToken {
            token: token.into(),
            span: Some(span),
        }
    }

    pub fn unexpected_token_at(
        expected: impl Into<String>,
        got: impl Into<String>,
        span: Span,
    ) -> Self {
        CasError::UnexpectedToken {
            expected: expected.into(),
            got: got.into(),
            span: Some(span),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        CasError::Unsupported(msg.into())
    }
}

/// Errors raised by distribution operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistError {
    /// Malformed distribution: count mismatch, unsorted breakpoints, unknown kind or form.
    #[error("structural error: {0}")]
    Structural(String),

    /// Point outside the support, mismatched operand kinds, or an out-of-range index.
    #[error("domain error: {0}")]
    Domain(String),

    /// No branch, or more than one, maps the test point back onto itself.
    #[error("inversion error: {0}")]
    Inversion(String),

    /// A concrete value was needed but a symbolic parameter remained.
    #[error("parameter error: {0}")]
    Parameter(String),

    /// The algebra layer could not solve or integrate an expression.
    #[error("algebra failure: {0}")]
    Algebra(#[from] CasError),
}

impl DistError {
    pub fn structural(msg: impl Into<String>) -> Self {
        DistError::Structural(msg.into())
    }

    pub fn domain(msg: impl Into<String>) -> Self {
        DistError::Domain(msg.into())
    }

    pub fn inversion(msg: impl Into<String>) -> Self {
        DistError::Inversion(msg.into())
    }

    pub fn parameter(msg: impl Into<String>) -> Self {
        DistError::Parameter(msg.into())
    }
}

/// Result alias for distribution operations.
pub type Result<T> = std::result::Result<T, DistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_display() {
        assert_eq!(Span::at(4).display(), " at position 5");
        assert_eq!(Span::new(2, 6).display(), " at positions 3-6");
        assert_eq!(Span::default().display(), "");
    }

    #[test]
    fn test_error_messages() {
        let e = CasError::invalid_token_at("$", Span::at(0));
        assert_eq!(e.to_string(), "invalid token: '$' at position 1");

        let d: DistError = CasError::unsupported("integral of sin(x)/x").into();
        assert!(matches!(d, DistError::Algebra(_)));
        assert!(d.to_string().starts_with("algebra failure"));
    }
}

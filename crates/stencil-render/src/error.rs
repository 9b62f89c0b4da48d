//! Error types for rendering and validation.

use std::fmt;

use stencil_parser::{ParseError, SyntaxError};
use thiserror::Error;

/// A bound from [`Limits`](crate::Limits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    /// Nesting of blocks or expressions.
    Depth,
    /// Total loop iterations in one render call.
    Iterations,
    /// Size of the rendered output in bytes.
    OutputBytes,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Limit::Depth => "nesting depth",
            Limit::Iterations => "loop iterations",
            Limit::OutputBytes => "output size",
        })
    }
}

/// Error type for [`Engine`](crate::Engine) operations.
///
/// Missing or ill-typed data never produces an error; it degrades to empty
/// output. What remains is malformed template text and bound violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The template failed to parse.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// A configured bound was exceeded.
    #[error("{limit} exceeds the configured maximum of {max}")]
    LimitExceeded { limit: Limit, max: usize },
}

impl RenderError {
    /// Whether the error lies in the template text rather than in resource
    /// bounds.
    pub fn is_template_error(&self) -> bool {
        matches!(self, RenderError::Syntax(_))
    }
}

impl From<ParseError> for RenderError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Syntax(err) => RenderError::Syntax(err),
            ParseError::DepthExceeded { max_depth, .. } => RenderError::LimitExceeded {
                limit: Limit::Depth,
                max: max_depth,
            },
        }
    }
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;

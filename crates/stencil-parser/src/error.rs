//! Error types for template parsing.
//!
//! Parsing fails in one of two ways. A [`SyntaxError`] means the template
//! itself is malformed and should be reported back to whoever wrote it. A
//! [`ParseError::DepthExceeded`] means a well-formed template tripped the
//! nesting bound configured in [`ParseOptions`](crate::ParseOptions); that is
//! a resource failure rather than an authoring mistake.

use std::fmt;

use thiserror::Error;

/// A human-locatable position in a template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    /// Byte offset into the source.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

impl Location {
    /// Computes the line and column of `offset` within `source`.
    ///
    /// Offsets past the end of the source are clamped to its length.
    pub fn locate(source: &str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }

        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |idx| idx + 1);
        let column = before[line_start..].chars().count() + 1;

        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A malformed template: unbalanced blocks, unknown tags, bad expressions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {location}")]
pub struct SyntaxError {
    /// What went wrong, without the position.
    pub message: String,
    /// Where it went wrong.
    pub location: Location,
}

impl SyntaxError {
    pub(crate) fn at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: Location::locate(source, offset),
        }
    }
}

/// Error returned by [`parse`](crate::parse) and [`parse_with`](crate::parse_with).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The template is malformed.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// Blocks or expressions are nested deeper than the configured bound.
    #[error("nesting exceeds the maximum depth of {max_depth} at {location}")]
    DepthExceeded {
        max_depth: usize,
        location: Location,
    },
}

impl ParseError {
    pub(crate) fn syntax(source: &str, offset: usize, message: impl Into<String>) -> Self {
        ParseError::Syntax(SyntaxError::at(source, offset, message))
    }

    pub(crate) fn too_deep(source: &str, offset: usize, max_depth: usize) -> Self {
        ParseError::DepthExceeded {
            max_depth,
            location: Location::locate(source, offset),
        }
    }

    /// Returns the syntax error, if this is one.
    pub fn as_syntax(&self) -> Option<&SyntaxError> {
        match self {
            ParseError::Syntax(err) => Some(err),
            ParseError::DepthExceeded { .. } => None,
        }
    }

    /// Where the failure was detected.
    pub fn location(&self) -> Location {
        match self {
            ParseError::Syntax(err) => err.location,
            ParseError::DepthExceeded { location, .. } => *location,
        }
    }
}

/// Result type for parsing operations.
pub type Result<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_first_character() {
        let loc = Location::locate("hello", 0);
        assert_eq!((loc.line, loc.column), (1, 1));
    }

    #[test]
    fn locate_after_newlines() {
        let loc = Location::locate("ab\ncd\nef", 7);
        assert_eq!((loc.line, loc.column), (3, 2));
    }

    #[test]
    fn locate_counts_characters_not_bytes() {
        // "é" is two bytes
        let loc = Location::locate("éé{{", 4);
        assert_eq!(loc.column, 3);
    }

    #[test]
    fn locate_clamps_past_end() {
        let loc = Location::locate("abc", 99);
        assert_eq!(loc.offset, 3);
        assert_eq!(loc.column, 4);
    }

    #[test]
    fn syntax_error_display_includes_position() {
        let err = SyntaxError::at("x\n  {% y %}", 4, "unknown block tag `y`");
        assert_eq!(err.to_string(), "unknown block tag `y` at line 2, column 3");
    }

    #[test]
    fn depth_error_is_not_syntax() {
        let err = ParseError::too_deep("abc", 1, 4);
        assert!(err.as_syntax().is_none());
        assert!(err.to_string().contains("maximum depth of 4"));
    }
}

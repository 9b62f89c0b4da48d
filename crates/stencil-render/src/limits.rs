//! Resource bounds applied while parsing and rendering.

use serde::{Deserialize, Serialize};
use stencil_parser::{ParseOptions, DEFAULT_MAX_DEPTH};

/// Default bound on total loop iterations per render call.
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// Default bound on rendered output, 16 MiB.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

/// Bounds that keep pathological templates from exhausting the stack or
/// memory.
///
/// Templates that stay within the bounds render exactly as they would
/// without them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum nesting of blocks, and separately of sub-expressions.
    pub max_depth: usize,
    /// Maximum number of loop iterations across a whole render call.
    pub max_iterations: usize,
    /// Maximum rendered output size in bytes; unbounded when `None`
    /// (an explicit `null` in configuration).
    pub max_output_bytes: Option<usize>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_output_bytes: Some(DEFAULT_MAX_OUTPUT_BYTES),
        }
    }
}

impl Limits {
    /// Parse options carrying the same nesting bound.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            max_depth: self.max_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bound_every_resource() {
        let limits = Limits::default();
        assert_eq!(limits.max_depth, 64);
        assert_eq!(limits.max_iterations, 10_000);
        assert_eq!(limits.max_output_bytes, Some(16 * 1024 * 1024));
    }

    #[test]
    fn explicit_null_disables_the_output_bound() {
        let limits: Limits = serde_json::from_str(r#"{"max_output_bytes": null}"#).unwrap();
        assert_eq!(limits.max_output_bytes, None);
        let limits: Limits = serde_json::from_str("{}").unwrap();
        assert_eq!(limits, Limits::default());
    }
}

//! Static validation of template source.

use stencil_parser::{ParseError, SyntaxError, Template};

/// Outcome of validating a template without rendering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Free variables of the template; empty when it is invalid.
    pub referenced_variables: Vec<String>,
    pub errors: Vec<SyntaxError>,
}

impl ValidationResult {
    pub fn valid(template: &Template) -> Self {
        Self {
            is_valid: true,
            referenced_variables: template.free_variables(),
            errors: Vec::new(),
        }
    }

    pub fn invalid(error: SyntaxError) -> Self {
        Self {
            is_valid: false,
            referenced_variables: Vec::new(),
            errors: vec![error],
        }
    }

    pub fn variable_count(&self) -> usize {
        self.referenced_variables.len()
    }
}

/// Validates `source` with default bounds.
///
/// A nesting-bound violation is reported like a syntax error here. Use
/// [`Engine::validate`](crate::Engine::validate) to tell the two apart.
pub fn validate(source: &str) -> ValidationResult {
    match Template::parse(source) {
        Ok(template) => ValidationResult::valid(&template),
        Err(ParseError::Syntax(err)) => ValidationResult::invalid(err),
        Err(ParseError::DepthExceeded {
            max_depth,
            location,
        }) => ValidationResult::invalid(SyntaxError {
            message: format!("nesting exceeds the maximum depth of {}", max_depth),
            location,
        }),
    }
}

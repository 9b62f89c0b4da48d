//! # Stencil Parser - Jinja-style Template Parsing
//!
//! `stencil-parser` turns template source text into a node tree and answers
//! static questions about it, such as which context variables it reads.
//!
//! It is the parsing half of the `stencil` engine; rendering lives in
//! `stencil-render`.
//!
//! ## Core Concepts
//!
//! - [`Template`]: A parsed template, owning its source and its [`Node`] tree
//! - [`ParseOptions`]: Parse-time bounds (nesting depth)
//! - [`ParseError`]: Either a [`SyntaxError`] or a depth-bound violation
//! - [`Template::free_variables`]: Root names the template reads from context
//!
//! ## Quick Start
//!
//! ```rust
//! use stencil_parser::Template;
//!
//! let template = Template::parse(
//!     "Hello {{ name | default('Guest') }}!{% for x in items %} {{ x }}{% endfor %}",
//! )
//! .unwrap();
//!
//! assert_eq!(template.free_variables(), ["name", "items"]);
//! ```
//!
//! ## Syntax
//!
//! | Marker            | Meaning                                          |
//! |-------------------|--------------------------------------------------|
//! | `{{ expr }}`      | Interpolation                                    |
//! | `{% if %}`        | Conditional with `elif` / `else` / `endif`       |
//! | `{% for x in e %}`| Loop with optional `else`, closed by `endfor`    |
//! | `{# … #}`         | Comment                                          |
//! | `{% raw %}`       | Verbatim text up to `{% endraw %}`               |
//!
//! A `-` just inside a marker (`{{-`, `-%}`) strips the whitespace on that side.
//!
//! ## Errors
//!
//! Errors carry a byte offset together with a 1-based line and column:
//!
//! ```rust
//! use stencil_parser::Template;
//!
//! let err = Template::parse("{% if cond %}unclosed").unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "unclosed `if` block, expected `endif` at line 1, column 1"
//! );
//! ```

mod analysis;
pub mod ast;
pub mod error;
mod expr;
mod lexer;
mod parser;

pub use ast::{CompareOp, Conditional, Expr, ExprKind, Literal, Loop, Node, Path, Segment, Span};
pub use error::{Location, ParseError, Result, SyntaxError};

/// Default bound on block and expression nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Options controlling how a template is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum nesting of blocks, and separately of sub-expressions.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Parses `source` with default options.
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        Self::parse_with(source, &ParseOptions::default())
    }

    pub fn parse_with(source: impl Into<String>, options: &ParseOptions) -> Result<Self> {
        let source = source.into();
        let nodes = parser::parse_nodes(&source, options.max_depth)?;
        Ok(Self { source, nodes })
    }

    /// The text this template was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Top-level nodes, in source order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Root variable names the template reads from its context.
    ///
    /// Names bound by an enclosing loop (the loop variable and `loop`) are
    /// excluded where they are bound. The result is ordered by first
    /// occurrence and has no duplicates.
    pub fn free_variables(&self) -> Vec<String> {
        analysis::free_variables(&self.nodes)
    }
}

/// Parses `source` with default options.
pub fn parse(source: &str) -> Result<Template> {
    Template::parse(source)
}

/// Parses `source` with explicit options.
pub fn parse_with(source: &str, options: &ParseOptions) -> Result<Template> {
    Template::parse_with(source, options)
}

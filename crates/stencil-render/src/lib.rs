//! # Stencil Render - Rendering and Validation
//!
//! `stencil-render` evaluates templates parsed by `stencil-parser` against a
//! JSON context, and validates template source statically.
//!
//! ## Core Concepts
//!
//! - [`Engine`]: Parses, renders and validates under one set of [`Limits`]
//! - [`Context`]: The data a template is rendered against, a JSON object
//! - [`ValidationResult`]: Static report listing referenced variables
//! - [`TemplateCache`]: Optional shared cache of parsed templates
//!
//! ## Data Semantics
//!
//! Rendering never fails because of data. A missing variable, a `null`, or a
//! path that does not resolve renders as the attached `default(…)` fallback,
//! or as nothing. A loop over something that is not a sequence or mapping
//! runs zero times. Only the bounds in [`Limits`] can fail a render.
//!
//! ```rust
//! use serde_json::json;
//! use stencil_render::{render, Context, Template};
//!
//! let template = Template::parse("{% if show %}A{% else %}B{% endif %}").unwrap();
//!
//! let shown: Context = serde_json::from_value(json!({"show": 1})).unwrap();
//! assert_eq!(render(&template, &shown).unwrap(), "A");
//! assert_eq!(render(&template, &Context::new()).unwrap(), "B");
//! ```

mod cache;
mod engine;
mod error;
mod limits;
mod renderer;
mod scope;
pub mod value;
mod validate;

pub use cache::{TemplateCache, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_MAX_BYTES};
pub use engine::Engine;
pub use error::{Limit, RenderError, Result};
pub use limits::{Limits, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_OUTPUT_BYTES};
pub use renderer::render_with;
pub use validate::{validate, ValidationResult};

pub use stencil_parser::{Location, ParseError, ParseOptions, SyntaxError, Template};

/// Data a template is rendered against.
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Renders `template` with default [`Limits`].
pub fn render(template: &Template, context: &Context) -> Result<String> {
    render_with(template, context, &Limits::default())
}

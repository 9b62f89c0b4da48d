//! The engine: parsing, rendering and validation under one set of limits.

use std::sync::Arc;

use stencil_parser::Template;
use tracing::debug;

use crate::cache::TemplateCache;
use crate::error::Result;
use crate::renderer::render_with;
use crate::validate::ValidationResult;
use crate::{Context, Limits};

/// Parses, renders and validates templates.
///
/// An `Engine` holds no per-call state and is `Send + Sync`, so a single
/// instance can serve concurrent callers behind an `Arc`.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use stencil_render::{Context, Engine};
///
/// let engine = Engine::new().with_cache(16);
/// let context: Context = serde_json::from_value(json!({"name": "Ada"})).unwrap();
///
/// let output = engine
///     .render_str("Hello {{ name | default('Guest') }}!", &context)
///     .unwrap();
/// assert_eq!(output, "Hello Ada!");
/// ```
#[derive(Debug, Default)]
pub struct Engine {
    limits: Limits,
    cache: Option<TemplateCache>,
}

impl Engine {
    /// Creates an engine with default limits and no cache.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self {
            limits,
            cache: None,
        }
    }

    /// Enables the parsed-template cache, holding up to `capacity` trees.
    pub fn with_cache(self, capacity: usize) -> Self {
        self.with_template_cache(TemplateCache::new(capacity))
    }

    pub fn with_template_cache(mut self, cache: TemplateCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn cache(&self) -> Option<&TemplateCache> {
        self.cache.as_ref()
    }

    /// Parses `source`, consulting the cache when enabled.
    pub fn parse(&self, source: &str) -> Result<Arc<Template>> {
        let options = self.limits.parse_options();
        let template = match &self.cache {
            Some(cache) => cache.get_or_parse(source, &options)?,
            None => Arc::new(Template::parse_with(source, &options)?),
        };
        Ok(template)
    }

    /// Renders an already parsed template.
    pub fn render(&self, template: &Template, context: &Context) -> Result<String> {
        render_with(template, context, &self.limits)
    }

    /// Parses and renders `source` in one step.
    pub fn render_str(&self, source: &str, context: &Context) -> Result<String> {
        let result = self
            .parse(source)
            .and_then(|template| self.render(&template, context));
        match &result {
            Ok(output) => debug!(
                template_len = source.len(),
                output_len = output.len(),
                "rendered template"
            ),
            Err(err) => debug!(error = %err, "template render failed"),
        }
        result
    }

    /// Validates `source` without rendering it.
    ///
    /// Syntax errors are part of the returned report. Only a bound
    /// violation is an `Err`.
    pub fn validate(&self, source: &str) -> Result<ValidationResult> {
        let result = match self.parse(source) {
            Ok(template) => ValidationResult::valid(&template),
            Err(crate::RenderError::Syntax(err)) => ValidationResult::invalid(err),
            Err(err) => {
                debug!(error = %err, "template validation failed");
                return Err(err);
            }
        };
        debug!(
            is_valid = result.is_valid,
            variables = result.variable_count(),
            "validated template"
        );
        Ok(result)
    }
}

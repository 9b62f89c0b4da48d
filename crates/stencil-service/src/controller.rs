//! Request handling logic, independent of HTTP.
//!
//! Controllers take decoded request payloads and produce response payloads.
//! Routing and status codes live in [`routes`](crate::routes).

use serde::{Deserialize, Serialize};
use stencil_render::{Context, Engine, RenderError, SyntaxError};
use tracing::debug;

/// Body of `/render` and `/render-html`.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderRequest {
    pub template: String,
    #[serde(default)]
    pub context: Context,
}

/// Body of `/validate`.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateRequest {
    pub template: String,
}

/// Classifies a failure for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The template text is malformed.
    TemplateError,
    /// Anything else, such as an exceeded bound.
    GeneralError,
}

impl ErrorKind {
    pub fn of(err: &RenderError) -> Self {
        if err.is_template_error() {
            ErrorKind::TemplateError
        } else {
            ErrorKind::GeneralError
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    pub status: &'static str,
    pub message: String,
    pub rendered_output: String,
    /// Keys of the supplied context, in order.
    pub template_variable_names: Vec<String>,
    pub template_length: usize,
    pub output_length: usize,
}

/// A failed render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub status: &'static str,
    pub message: String,
    pub error_kind: ErrorKind,
}

impl Failure {
    pub fn new(error_kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            error_kind,
        }
    }

    fn from_render(err: &RenderError) -> Self {
        let kind = ErrorKind::of(err);
        let message = match kind {
            ErrorKind::TemplateError => format!("Template rendering error: {}", err),
            ErrorKind::GeneralError => format!("Unexpected error: {}", err),
        };
        Self::new(kind, message)
    }
}

/// A syntax error as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl From<&SyntaxError> for ErrorReport {
    fn from(err: &SyntaxError) -> Self {
        Self {
            message: err.message.clone(),
            line: err.location.line,
            column: err.location.column,
            offset: err.location.offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub status: &'static str,
    pub message: String,
    pub is_valid: bool,
    pub referenced_variables: Vec<String>,
    pub variable_count: usize,
    pub template_length: usize,
    pub errors: Vec<ErrorReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

/// Renders the request's template against its context.
pub fn render_template(engine: &Engine, request: &RenderRequest) -> Result<RenderResponse, Failure> {
    match engine.render_str(&request.template, &request.context) {
        Ok(rendered_output) => Ok(RenderResponse {
            status: "success",
            message: "Template rendered successfully".to_string(),
            template_variable_names: request.context.keys().cloned().collect(),
            template_length: request.template.chars().count(),
            output_length: rendered_output.chars().count(),
            rendered_output,
        }),
        Err(err) => {
            debug!(error = %err, "render request failed");
            Err(Failure::from_render(&err))
        }
    }
}

/// Validates a template without rendering it.
pub fn validate_template(engine: &Engine, template: &str) -> ValidateResponse {
    let template_length = template.chars().count();

    let report = match engine.validate(template) {
        Ok(report) => report,
        Err(err) => {
            return ValidateResponse {
                status: "error",
                message: format!("Validation error: {}", err),
                is_valid: false,
                referenced_variables: Vec::new(),
                variable_count: 0,
                template_length,
                errors: Vec::new(),
                error_kind: Some(ErrorKind::GeneralError),
                error_details: Some(err.to_string()),
            }
        }
    };

    match report.errors.first() {
        None => ValidateResponse {
            status: "success",
            message: "Template is valid".to_string(),
            is_valid: true,
            variable_count: report.variable_count(),
            referenced_variables: report.referenced_variables,
            template_length,
            errors: Vec::new(),
            error_kind: None,
            error_details: None,
        },
        Some(first) => ValidateResponse {
            status: "error",
            message: format!("Template validation failed: {}", first),
            is_valid: false,
            referenced_variables: Vec::new(),
            variable_count: 0,
            template_length,
            errors: report.errors.iter().map(ErrorReport::from).collect(),
            error_kind: Some(ErrorKind::TemplateError),
            error_details: Some(first.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stencil_render::Limits;

    fn request(template: &str, context: serde_json::Value) -> RenderRequest {
        serde_json::from_value(json!({"template": template, "context": context})).unwrap()
    }

    #[test]
    fn render_success_reports_lengths_and_context_keys() {
        let engine = Engine::new();
        let response = render_template(&engine, &request("Héllo {{ b }}{{ a }}", json!({"b": "wörld", "a": "!"}))).unwrap();
        assert_eq!(response.status, "success");
        assert_eq!(response.rendered_output, "Héllo wörld!");
        assert_eq!(response.template_variable_names, ["b", "a"]);
        assert_eq!(response.template_length, 20);
        assert_eq!(response.output_length, 12);
    }

    #[test]
    fn context_defaults_to_empty() {
        let request: RenderRequest = serde_json::from_value(json!({"template": "{{ x | default('y') }}"})).unwrap();
        let response = render_template(&Engine::new(), &request).unwrap();
        assert_eq!(response.rendered_output, "y");
        assert!(response.template_variable_names.is_empty());
    }

    #[test]
    fn syntax_error_is_template_error() {
        let failure = render_template(&Engine::new(), &request("{% if cond %}unclosed", json!({}))).unwrap_err();
        assert_eq!(failure.status, "error");
        assert_eq!(failure.error_kind, ErrorKind::TemplateError);
        assert!(failure.message.starts_with("Template rendering error: unclosed `if` block"));
    }

    #[test]
    fn exceeded_bound_is_general_error() {
        let engine = Engine::with_limits(Limits {
            max_iterations: 1,
            ..Limits::default()
        });
        let failure = render_template(&engine, &request("{% for x in xs %}{% endfor %}", json!({"xs": [1, 2]}))).unwrap_err();
        assert_eq!(failure.error_kind, ErrorKind::GeneralError);
        assert!(failure.message.starts_with("Unexpected error:"));
    }

    #[test]
    fn failure_serializes_camel_case() {
        let failure = Failure::new(ErrorKind::TemplateError, "bad");
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            json!({"status": "error", "message": "bad", "errorKind": "template_error"})
        );
    }

    #[test]
    fn validate_success() {
        let response = validate_template(&Engine::new(), "{{ title }} {% for x in items %}{{ x }}{% endfor %}");
        assert!(response.is_valid);
        assert_eq!(response.referenced_variables, ["title", "items"]);
        assert_eq!(response.variable_count, 2);
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("errorKind").is_none());
        assert_eq!(value["isValid"], json!(true));
    }

    #[test]
    fn validate_syntax_error() {
        let response = validate_template(&Engine::new(), "line\n{% if cond %}unclosed");
        assert!(!response.is_valid);
        assert_eq!(response.error_kind, Some(ErrorKind::TemplateError));
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].line, 2);
        assert_eq!(response.errors[0].offset, 5);
        assert!(response.message.starts_with("Template validation failed: "));
        assert!(response.error_details.is_some());
    }

    #[test]
    fn validate_depth_violation_is_general() {
        let engine = Engine::with_limits(Limits {
            max_depth: 1,
            ..Limits::default()
        });
        let response = validate_template(&engine, "{% if a %}{% if b %}{% endif %}{% endif %}");
        assert_eq!(response.error_kind, Some(ErrorKind::GeneralError));
        assert!(response.errors.is_empty());
    }
}

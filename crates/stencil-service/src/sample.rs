//! The built-in demonstration template.

use serde::Serialize;
use serde_json::{json, Value};
use stencil_render::Context;

/// An HTML greeting page exercising defaults, a conditional and a loop.
pub const SAMPLE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{ title | default('Hello World') }}</title>
    <style>
        body {
            font-family: Arial, sans-serif;
            max-width: 800px;
            margin: 0 auto;
            padding: 20px;
            background-color: #f0f0f0;
        }
        .container {
            background-color: white;
            padding: 30px;
            border-radius: 10px;
            box-shadow: 0 2px 10px rgba(0,0,0,0.1);
        }
        h1 {
            color: #333;
            text-align: center;
        }
        .message {
            font-size: 18px;
            text-align: center;
            margin: 20px 0;
        }
        .info {
            background-color: #e7f3ff;
            padding: 15px;
            border-radius: 5px;
            margin: 20px 0;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>{{ heading | default('Hello, World!') }}</h1>
        <div class="message">
            <p>Welcome {{ name | default('Guest') }}!</p>
            <p>{{ message | default('This is a Jinja template rendered by FastAPI.') }}</p>
        </div>
        {% if show_info %}
        <div class="info">
            <h3>Template Information:</h3>
            <ul>
                <li>Service: {{ service_name | default('Jinja Microservice') }}</li>
                <li>Version: {{ version | default('1.0.0') }}</li>
                <li>Rendered at: {{ timestamp | default('N/A') }}</li>
            </ul>
        </div>
        {% endif %}
        {% if items %}
        <div class="info">
            <h3>Items:</h3>
            <ul>
            {% for item in items %}
                <li>{{ item }}</li>
            {% endfor %}
            </ul>
        </div>
        {% endif %}
    </div>
</body>
</html>"#;

pub const SAMPLE_DESCRIPTION: &str = "A complete HTML document with Jinja template variables";

/// Context matching [`SAMPLE_TEMPLATE`].
pub fn sample_context() -> Context {
    match json!({
        "title": "Jinja Template Demo",
        "heading": "Hello from Jinja!",
        "name": "FastAPI User",
        "message": "This HTML was generated using Jinja2 templating engine.",
        "show_info": true,
        "service_name": "Jinja Microservice",
        "version": "1.0.0",
        "timestamp": "2025-08-01",
        "items": ["FastAPI", "Jinja2", "Python", "Templates"],
    }) {
        Value::Object(map) => map,
        _ => Context::new(),
    }
}

/// Body of `GET /sample`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub template: &'static str,
    pub sample_context: Context,
    pub description: &'static str,
}

impl SampleResponse {
    pub fn new() -> Self {
        Self {
            status: "success",
            message: "Sample template retrieved successfully",
            template: SAMPLE_TEMPLATE,
            sample_context: sample_context(),
            description: SAMPLE_DESCRIPTION,
        }
    }
}

impl Default for SampleResponse {
    fn default() -> Self {
        Self::new()
    }
}

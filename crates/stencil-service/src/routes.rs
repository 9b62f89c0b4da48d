//! HTTP routing.
//!
//! | Method | Path                              |
//! |--------|-----------------------------------|
//! | GET    | `/`                               |
//! | POST   | `/api/v1/template/render`         |
//! | POST   | `/api/v1/template/render-html`    |
//! | POST   | `/api/v1/template/validate`       |
//! | GET    | `/api/v1/template/sample`         |
//! | GET    | `/api/v1/template/sample/render`  |
//! | GET    | `/api/v1/template/health`         |

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use stencil_render::Engine;

use crate::controller::{
    self, ErrorKind, Failure, RenderRequest, RenderResponse, ValidateRequest, ValidateResponse,
};
use crate::sample::{self, SampleResponse};

/// Mount point of the template API.
pub const API_PREFIX: &str = "/api/v1/template";

type SharedEngine = Arc<Engine>;

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::TemplateError => StatusCode::BAD_REQUEST,
            ErrorKind::GeneralError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.error_kind.status_code(), Json(self)).into_response()
    }
}

/// Builds the service router around a shared engine.
pub fn router(engine: SharedEngine) -> Router {
    Router::new()
        .route("/", get(root))
        .nest(API_PREFIX, template_routes())
        .with_state(engine)
        .layer(middleware::from_fn(log_requests))
}

fn template_routes() -> Router<SharedEngine> {
    Router::new()
        .route("/render", post(render))
        .route("/render-html", post(render_html))
        .route("/validate", post(validate))
        .route("/sample", get(sample))
        .route("/sample/render", get(sample_render))
        .route("/health", get(health))
}

async fn render(
    State(engine): State<SharedEngine>,
    Json(request): Json<RenderRequest>,
) -> Result<Json<RenderResponse>, Failure> {
    controller::render_template(&engine, &request).map(Json)
}

async fn render_html(
    State(engine): State<SharedEngine>,
    Json(request): Json<RenderRequest>,
) -> Result<Html<String>, Failure> {
    controller::render_template(&engine, &request).map(|response| Html(response.rendered_output))
}

async fn validate(
    State(engine): State<SharedEngine>,
    Json(request): Json<ValidateRequest>,
) -> (StatusCode, Json<ValidateResponse>) {
    let response = controller::validate_template(&engine, &request.template);
    let status = response
        .error_kind
        .map_or(StatusCode::OK, ErrorKind::status_code);
    (status, Json(response))
}

async fn sample() -> Json<SampleResponse> {
    Json(SampleResponse::new())
}

async fn sample_render(State(engine): State<SharedEngine>) -> Result<Html<String>, Failure> {
    let request = RenderRequest {
        template: sample::SAMPLE_TEMPLATE.to_string(),
        context: sample::sample_context(),
    };
    controller::render_template(&engine, &request)
        .map(|response| Html(response.rendered_output))
        .map_err(|_| Failure::new(ErrorKind::GeneralError, "Failed to render sample template"))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    message: &'static str,
    features: [&'static str; 4],
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "Stencil Template Service",
        message: "Template rendering service is operational",
        features: [
            "Template rendering",
            "Template validation",
            "Sample templates",
            "HTML response support",
        ],
    })
}

#[derive(Debug, Serialize)]
struct RootResponse {
    message: &'static str,
    docs: &'static str,
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Stencil template service is running!",
        docs: "/api/v1/template/sample",
    })
}

/// Logs each request with its status code and latency.
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

    if status >= 500 {
        tracing::error!("{} {} {} {:.1}ms", method, path, status, latency_ms);
    } else if status >= 400 {
        tracing::warn!("{} {} {} {:.1}ms", method, path, status, latency_ms);
    } else {
        tracing::info!("{} {} {} {:.1}ms", method, path, status, latency_ms);
    }

    response
}

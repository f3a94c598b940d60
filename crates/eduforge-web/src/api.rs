//! HTTP endpoints for the EduForge web form and JSON API.
//!
//! # Endpoints
//!
//! - `GET /` - The form
//! - `POST /` - Form submit; runs the pipeline and renders the panes
//! - `POST /api/run` - JSON run: `{grade, topic}` -> `{state, panes}`
//! - `GET /api/health` - Liveness and model name
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use eduforge_pipeline::{ChatCompletionsClient, Config, Pipeline};
//! use eduforge_web::{create_router, AppState};
//!
//! # async fn example() {
//! let config = Config::default();
//! let model = Arc::new(ChatCompletionsClient::from_config(&config));
//! let pipeline = Pipeline::from_config(&config, model);
//!
//! let router = create_router(AppState::new(config, pipeline));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:5006").await.unwrap();
//! axum::serve(listener, router).await.unwrap();
//! # }
//! ```

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use eduforge_pipeline::{
    Config, ContentRequest, EduError, Pipeline, PipelineState, BLANK_TOPIC_MESSAGE, MAX_GRADE,
    MIN_GRADE,
};
use eduforge_render::{HtmlPanes, Panes};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::page::{render_page, PageView};

/// Grade preselected on the form.
pub const DEFAULT_GRADE: u8 = 4;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Fields posted by the HTML form.
///
/// The grade arrives as raw text so that a malformed value is reported on the
/// page instead of being rejected by the extractor.
#[derive(Debug, Clone, Deserialize)]
pub struct RunForm {
    /// Grade slider value.
    #[serde(default = "default_grade")]
    pub grade: String,
    /// Topic text field.
    #[serde(default)]
    pub topic: String,
}

fn default_grade() -> String {
    DEFAULT_GRADE.to_string()
}

impl RunForm {
    /// Parses the grade field.
    ///
    /// # Errors
    ///
    /// Returns [`EduError::InvalidRequest`] if the field is not a whole number
    /// in the supported range.
    pub fn parsed_grade(&self) -> eduforge_pipeline::Result<u8> {
        let raw = self.grade.trim();
        let grade = raw.parse::<i64>().map_err(|_| {
            EduError::invalid_request(format!(
                "Grade must be a whole number between {MIN_GRADE} and {MAX_GRADE} (got '{raw}')"
            ))
        })?;
        checked_grade(grade)
    }
}

/// Narrows a submitted grade to the supported range.
fn checked_grade(grade: i64) -> eduforge_pipeline::Result<u8> {
    u8::try_from(grade)
        .ok()
        .filter(|g| (MIN_GRADE..=MAX_GRADE).contains(g))
        .ok_or_else(|| {
            EduError::invalid_request(format!(
                "Grade must be between {MIN_GRADE} and {MAX_GRADE} (got {grade})"
            ))
        })
}

/// Request body for `POST /api/run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    /// Grade level (1-12).
    pub grade: i64,
    /// Topic to generate content for.
    pub topic: String,
}

/// Response body for `POST /api/run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    /// The final pipeline state.
    pub state: PipelineState,
    /// The rendered Markdown panes.
    pub panes: Panes,
}

/// Response body for `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: String,
    /// Model the pipeline talks to.
    pub model: String,
    /// Configured provider.
    pub provider: String,
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Process-wide configuration, read-only after start-up.
    pub config: Config,
    /// The pipeline every request runs through.
    pub pipeline: Arc<Pipeline>,
    /// Held for the duration of a run so that runs never overlap.
    pub run_guard: Arc<Mutex<()>>,
}

impl AppState {
    /// Creates a new `AppState` around `pipeline`.
    #[must_use]
    pub fn new(config: Config, pipeline: Pipeline) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
            run_guard: Arc::new(Mutex::new(())),
        }
    }

    /// Runs the pipeline while holding the run guard.
    async fn run(&self, request: ContentRequest) -> eduforge_pipeline::Result<PipelineState> {
        let _guard = self.run_guard.lock().await;
        self.pipeline.run(request).await
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Internal error type for API handlers.
#[derive(Debug)]
enum ApiError {
    /// The request was rejected before the pipeline ran.
    InvalidRequest(String),
    /// The pipeline failed.
    Pipeline(String),
}

impl From<EduError> for ApiError {
    fn from(err: EduError) -> Self {
        if err.is_user_error() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Pipeline(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InvalidRequest(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Self::Pipeline(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with the form and API endpoints.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/run", post(handle_api_run))
        .route("/health", get(handle_health));

    Router::new()
        .route("/", get(handle_form).post(handle_form_submit))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `GET /`.
async fn handle_form() -> Html<String> {
    Html(render_page(&PageView::new(DEFAULT_GRADE, "")))
}

/// Handler for `POST /`.
///
/// Never fails: a blank topic renders the warning, and a bad grade or any
/// pipeline error is rendered in the draft pane.
async fn handle_form_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RunForm>,
) -> Html<String> {
    let grade = form.parsed_grade();
    let view_grade = grade.as_ref().map_or(DEFAULT_GRADE, |g| *g);

    let panes = if form.topic.trim().is_empty() {
        info!("Form submitted without a topic");
        HtmlPanes::blank_topic()
    } else {
        match grade.and_then(|grade| ContentRequest::new(grade, &form.topic)) {
            Ok(request) => match state.run(request).await {
                Ok(run) => HtmlPanes::from_state(&run),
                Err(e) => {
                    warn!(error = %e, transient = e.is_transient(), "Pipeline run failed");
                    HtmlPanes::error(&e)
                }
            },
            Err(e) => {
                info!(grade = %form.grade, error = %e, "Form submission rejected");
                HtmlPanes::error(&e)
            }
        }
    };

    let view = PageView::new(view_grade, &form.topic).with_panes(panes);
    Html(render_page(&view))
}

/// Handler for `POST /api/run`.
async fn handle_api_run(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunResponse>, ApiError> {
    if request.topic.trim().is_empty() {
        return Err(ApiError::InvalidRequest(BLANK_TOPIC_MESSAGE.to_string()));
    }
    let grade = checked_grade(request.grade)?;
    let request = ContentRequest::new(grade, &request.topic)?;

    let run = state.run(request).await.map_err(|e| {
        warn!(error = %e, transient = e.is_transient(), "Pipeline run failed");
        ApiError::from(e)
    })?;

    let panes = Panes::from_state(&run);
    Ok(Json(RunResponse { state: run, panes }))
}

/// Handler for `GET /api/health`.
async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.pipeline.model_name().to_string(),
        provider: state.config.provider.to_string(),
    })
}

// ============================================================================
// Tests
// ============================================================================

//! EduForge Web
//!
//! The browser form and JSON API in front of the content pipeline.

pub mod api;
mod page;

pub use api::{
    create_router, AppState, ErrorResponse, HealthResponse, RunForm, RunRequest, RunResponse,
    DEFAULT_GRADE,
};
pub use page::{render_page, PageView};

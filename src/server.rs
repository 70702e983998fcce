//! Local web server for the digest.
//!
//! Routes:
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | GET | `/` | rendered HTML page |
//! | GET | `/api/news` | grouped view as JSON |
//!
//! The page is rendered on every request from the in-memory grouped view.

use crate::models::GroupedView;
use crate::outputs::html::render_page;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, instrument};

#[derive(Debug)]
pub struct AppState {
    pub date: NaiveDate,
    pub grouped: GroupedView,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/news", get(news))
        .with_state(Arc::new(state))
}

async fn index(State(state): State<Arc<AppState>>) -> Response {
    match render_page(&state.grouped, state.date) {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render page");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn news(State(state): State<Arc<AppState>>) -> Json<GroupedView> {
    Json(state.grouped.clone())
}

/// Serve the digest on an already-bound listener until the process stops.
#[instrument(level = "info", skip_all)]
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, articles = state.grouped.article_count(), "Serving digest");
    }
    axum::serve(listener, router(state)).await
}

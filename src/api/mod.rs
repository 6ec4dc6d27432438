//! HTTP surface: shared state, the router and the service-level endpoints.
//!
//! Handlers live next to the resource they serve (`kpis`, `activities`, `projects`) and only
//! translate between HTTP and the core operations.

pub mod activities;
pub mod kpis;
pub mod projects;
pub mod response;

use crate::{
    config::settings::ServerConfig,
    core::{registry::KpiRegistry, storage::DocumentBucket, summary::Summarizer},
};
use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::HeaderValue,
    routing::{get, post, put},
};
use chrono::Utc;
use response::ApiResponse;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// Everything a handler needs, cloned per request.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Indicator definitions
    pub registry: Arc<KpiRegistry>,
    /// Where uploaded activity documents live
    pub bucket: DocumentBucket,
    /// Optional report narrative collaborator
    pub summarizer: Option<Arc<dyn Summarizer>>,
}

impl AppState {
    /// Bundles the shared services.
    pub fn new(
        db: DatabaseConnection,
        registry: KpiRegistry,
        bucket: DocumentBucket,
        summarizer: Option<Arc<dyn Summarizer>>,
    ) -> Self {
        Self {
            db,
            registry: Arc::new(registry),
            bucket,
            summarizer,
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|e| warn!(origin, error = %e, "Ignoring invalid CORS origin"))
                .ok()
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Builds the full application router.
pub fn router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status))
        // KPIs
        .route("/api/kpis", get(kpis::list).post(kpis::create))
        .route("/api/kpis/definitions", get(kpis::definitions))
        .route("/api/kpis/evaluate", post(kpis::evaluate))
        .route("/api/kpis/area/:area", get(kpis::by_area))
        .route("/api/kpis/area/:area/latest", get(kpis::latest_by_area))
        .route("/api/kpis/history/:area/:indicator", get(kpis::history))
        .route("/api/kpis/trend/:area/:indicator", get(kpis::trend))
        .route("/api/kpis/stats/:area", get(kpis::stats))
        .route("/api/kpis/report/:area/:period", get(kpis::report))
        .route("/api/kpis/report/:area/:period/text", get(kpis::report_text))
        .route("/api/kpis/:id", get(kpis::get_one).delete(kpis::remove))
        .route("/api/kpis/:id/notes", put(kpis::notes))
        // Activity board
        .route("/api/activities", get(activities::list).post(activities::create))
        .route(
            "/api/activities/:id",
            get(activities::details)
                .put(activities::update)
                .delete(activities::remove),
        )
        .route("/api/activities/:id/status", put(activities::status))
        .route(
            "/api/activities/:id/subtasks",
            get(activities::subtasks).post(activities::add_subtask),
        )
        .route(
            "/api/activities/:id/subtasks/:subtask_id",
            put(activities::update_subtask).delete(activities::delete_subtask),
        )
        .route(
            "/api/activities/:id/documents",
            get(activities::documents).post(activities::upload_document),
        )
        .route(
            "/api/activities/:id/documents/:document_id",
            get(activities::download_document).delete(activities::delete_document),
        )
        .route(
            "/api/activities/:id/comments",
            get(activities::comments).post(activities::add_comment),
        )
        // Report companions
        .route("/api/projects", get(projects::list).post(projects::create))
        .route(
            "/api/action-plan",
            get(projects::action_plan).post(projects::create_action),
        )
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&server.cors_origins))
        .with_state(state)
}

async fn health() -> ApiResponse<Value> {
    ApiResponse::ok(json!({ "status": "ok", "timestamp": Utc::now() }))
}

async fn status(State(state): State<AppState>) -> ApiResponse<Value> {
    let database = match state.db.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            warn!(error = %e, "Database ping failed");
            "unavailable"
        }
    };
    ApiResponse::ok(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "areas": state.registry.areas(),
        "indicators": state.registry.definitions().len(),
        "narratives": state.summarizer.is_some(),
        "timestamp": Utc::now(),
    }))
}

#[cfg(test)]
pub(crate) mod test_support {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{core::storage::temp_bucket, test_utils::setup_test_db};
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use tower::ServiceExt;

    /// Router over a fresh in-memory database and temporary bucket.
    pub async fn test_app() -> (Router, AppState) {
        let db = setup_test_db().await.unwrap();
        let state = AppState::new(db, KpiRegistry::standard(), temp_bucket(), None);
        (router(state.clone(), &ServerConfig::default()), state)
    }

    pub async fn call(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    pub async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Sends a request with an optional JSON body and returns status plus parsed body.
    pub async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = call(app, request).await;
        let status = response.status();
        (status, body_json(response).await)
    }
}

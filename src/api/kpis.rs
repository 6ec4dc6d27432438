//! KPI endpoints: catalog, evaluation, entries, analytics and monthly reports.

use super::{
    AppState,
    response::{ApiJson, ApiPath, ApiQuery, ApiResponse},
};
use crate::{
    core::{
        kpi::{
            self, AreaStatistics, EvaluationPreview, KpiFilter, KpiTrend, NewKpiEntry,
        },
        monthly::{MonthlyReport, generate_monthly_report},
        registry::{KpiDefinition, KpiInput},
        report::format_monthly_report,
        summary::attach_narrative,
    },
    entities::kpi_entry,
    errors::{Error, FieldError, Result},
};
use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

const DEFAULT_WINDOW_DAYS: i64 = 30;
const MAX_WINDOW_DAYS: i64 = 3650;

/// `?area=` filter.
#[derive(Debug, Deserialize)]
pub struct AreaQuery {
    area: Option<String>,
}

/// `?limit=` page size.
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<u64>,
}

/// `?days=` look-back window.
#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    days: Option<i64>,
}

/// `?count=` number of points.
#[derive(Debug, Deserialize)]
pub struct CountQuery {
    count: Option<u64>,
}

/// Body of `POST /api/kpis/evaluate`.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    #[serde(default)]
    area: String,
    #[serde(default)]
    indicator: String,
    #[serde(default)]
    input_data: KpiInput,
}

/// Body of `PUT /api/kpis/:id/notes`.
#[derive(Debug, Deserialize)]
pub struct NotesRequest {
    notes: Option<String>,
}

/// Report body with the time it was assembled.
#[derive(Debug, Serialize)]
pub struct ReportResponse {
    #[serde(flatten)]
    report: MonthlyReport,
    generated_at: DateTime<Utc>,
}

fn window_start(days: Option<i64>) -> Result<DateTime<Utc>> {
    let days = days.unwrap_or(DEFAULT_WINDOW_DAYS);
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(Error::invalid_fields(
            "Invalid time window",
            vec![FieldError::new(
                "days",
                format!("must be between 1 and {MAX_WINDOW_DAYS}"),
            )],
        ));
    }
    Ok(Utc::now() - Duration::days(days))
}

/// `GET /api/kpis/definitions`
pub async fn definitions(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AreaQuery>,
) -> ApiResponse<Vec<KpiDefinition>> {
    let defs = match query.area.as_deref().filter(|a| !a.is_empty()) {
        Some(area) => state.registry.for_area(area).cloned().collect(),
        None => state.registry.definitions().to_vec(),
    };
    ApiResponse::list(defs)
}

/// `POST /api/kpis/evaluate` - computes a value without storing it.
pub async fn evaluate(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<EvaluateRequest>,
) -> Result<ApiResponse<EvaluationPreview>> {
    let preview =
        kpi::evaluate_preview(&state.registry, &body.area, &body.indicator, &body.input_data)?;
    Ok(ApiResponse::ok(preview))
}

/// `POST /api/kpis`
pub async fn create(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewKpiEntry>,
) -> Result<(StatusCode, ApiResponse<kpi_entry::Model>)> {
    let entry = kpi::record_kpi(&state.db, &state.registry, new).await?;
    Ok(ApiResponse::ok(entry)
        .with_message("KPI recorded")
        .created())
}

/// `GET /api/kpis`
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<KpiFilter>,
) -> Result<ApiResponse<Vec<kpi_entry::Model>>> {
    Ok(ApiResponse::list(kpi::list_kpis(&state.db, &filter).await?))
}

/// `GET /api/kpis/area/:area`
pub async fn by_area(
    State(state): State<AppState>,
    ApiPath(area): ApiPath<String>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Result<ApiResponse<Vec<kpi_entry::Model>>> {
    Ok(ApiResponse::list(
        kpi::kpis_by_area(&state.db, &area, query.limit).await?,
    ))
}

/// `GET /api/kpis/area/:area/latest`
pub async fn latest_by_area(
    State(state): State<AppState>,
    ApiPath(area): ApiPath<String>,
) -> Result<ApiResponse<Vec<kpi_entry::Model>>> {
    Ok(ApiResponse::list(
        kpi::latest_kpis_by_area(&state.db, &area).await?,
    ))
}

/// `GET /api/kpis/history/:area/:indicator`
pub async fn history(
    State(state): State<AppState>,
    ApiPath((area, indicator)): ApiPath<(String, String)>,
    ApiQuery(query): ApiQuery<WindowQuery>,
) -> Result<ApiResponse<Vec<kpi_entry::Model>>> {
    let since = window_start(query.days)?;
    Ok(ApiResponse::list(
        kpi::kpi_history(&state.db, &area, &indicator, since).await?,
    ))
}

/// `GET /api/kpis/trend/:area/:indicator`
pub async fn trend(
    State(state): State<AppState>,
    ApiPath((area, indicator)): ApiPath<(String, String)>,
    ApiQuery(query): ApiQuery<CountQuery>,
) -> Result<ApiResponse<KpiTrend>> {
    Ok(ApiResponse::ok(
        kpi::kpi_trend(&state.db, &area, &indicator, query.count).await?,
    ))
}

/// `GET /api/kpis/stats/:area`
pub async fn stats(
    State(state): State<AppState>,
    ApiPath(area): ApiPath<String>,
    ApiQuery(query): ApiQuery<WindowQuery>,
) -> Result<ApiResponse<AreaStatistics>> {
    let since = window_start(query.days)?;
    Ok(ApiResponse::ok(
        kpi::area_statistics(&state.db, &area, since).await?,
    ))
}

async fn build_report(state: &AppState, area: &str, period: &str) -> Result<MonthlyReport> {
    let mut report = generate_monthly_report(&state.db, &state.registry, area, period).await?;
    attach_narrative(&mut report, state.summarizer.as_deref()).await;
    Ok(report)
}

/// `GET /api/kpis/report/:area/:period`
pub async fn report(
    State(state): State<AppState>,
    ApiPath((area, period)): ApiPath<(String, String)>,
) -> Result<ApiResponse<ReportResponse>> {
    let report = build_report(&state, &area, &period).await?;
    Ok(ApiResponse::ok(ReportResponse {
        report,
        generated_at: Utc::now(),
    }))
}

/// `GET /api/kpis/report/:area/:period/text`
pub async fn report_text(
    State(state): State<AppState>,
    ApiPath((area, period)): ApiPath<(String, String)>,
) -> Result<impl IntoResponse> {
    let report = build_report(&state, &area, &period).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format_monthly_report(&report),
    ))
}

/// `GET /api/kpis/:id`
pub async fn get_one(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<kpi_entry::Model>> {
    Ok(ApiResponse::ok(kpi::get_kpi(&state.db, id).await?))
}

/// `PUT /api/kpis/:id/notes`
pub async fn notes(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<NotesRequest>,
) -> Result<ApiResponse<kpi_entry::Model>> {
    let entry = kpi::update_notes(&state.db, id, body.notes).await?;
    Ok(ApiResponse::ok(entry).with_message("Notes updated"))
}

/// `DELETE /api/kpis/:id`
pub async fn remove(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<serde_json::Value>> {
    kpi::delete_kpi(&state.db, id).await?;
    Ok(ApiResponse::ok(serde_json::json!({ "id": id })).with_message("KPI entry deleted"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::api::test_support::{call, send, test_app};
    use axum::{Router, body::Body, http::Request};
    use serde_json::{Value, json};

    fn accuracy(correct: u32, recorded_at: &str) -> Value {
        json!({
            "area": "Inventory",
            "indicator": "Inventory accuracy",
            "input_data": {"correct_units": correct, "total_units": 100},
            "recorded_at": recorded_at,
            "submitted_by": "clerk@store.com"
        })
    }

    async fn post_accuracy(app: &Router, correct: u32, recorded_at: &str) -> (StatusCode, Value) {
        send(app, "POST", "/api/kpis", Some(accuracy(correct, recorded_at))).await
    }

    const HISTORY_URI: &str = "/api/kpis/history/Inventory/Inventory%20accuracy";

    #[test]
    fn test_window_start_bounds() {
        assert!(window_start(None).is_ok());
        assert!(window_start(Some(0)).is_err());
        assert!(window_start(Some(MAX_WINDOW_DAYS + 1)).is_err());
    }

    #[tokio::test]
    async fn test_create_kpi_and_duplicate() {
        let (app, _) = test_app().await;

        let (status, body) = post_accuracy(&app, 99, "2025-03-05T10:00:00Z").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["value"], 99.0);
        assert_eq!(body["data"]["meets_target"], true);
        assert_eq!(body["data"]["period"], "2025-03");

        let (status, body) = post_accuracy(&app, 97, "2025-03-20T10:00:00Z").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_create_kpi_validation_errors() {
        let (app, _) = test_app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/kpis",
            Some(json!({"area": "Inventory", "indicator": "Inventory accuracy",
                        "input_data": {"correct_units": 5}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["field"], "total_units");

        let request = Request::builder()
            .method("POST")
            .uri("/api/kpis")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        assert_eq!(call(&app, request).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_evaluate_and_definitions() {
        let (app, state) = test_app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/kpis/evaluate",
            Some(json!({"area": "Inventory", "indicator": "Inventory accuracy",
                        "input_data": {"correct_units": 90, "total_units": 100}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["value"], 90.0);
        assert_eq!(body["data"]["meets_target"], false);

        let (_, body) = send(&app, "GET", "/api/kpis/definitions?area=Inventory", None).await;
        assert_eq!(body["count"], state.registry.for_area("Inventory").count());
    }

    #[tokio::test]
    async fn test_entry_lifecycle() {
        let (app, _) = test_app().await;
        let (_, created) = post_accuracy(&app, 99, "2025-03-05T10:00:00Z").await;
        let id = created["data"]["id"].as_i64().unwrap();

        let notes = Some(json!({"notes": "Recount done"}));
        let (status, body) = send(&app, "PUT", &format!("/api/kpis/{id}/notes"), notes).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["notes"], "Recount done");

        let (_, body) = send(&app, "GET", "/api/kpis/area/Inventory/latest", None).await;
        assert_eq!(body["count"], 1);

        let (status, _) = send(&app, "DELETE", &format!("/api/kpis/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "GET", &format!("/api/kpis/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "GET", "/api/kpis/not-a-number", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_history_rejects_bad_window() {
        let (app, _) = test_app().await;
        let (status, _) = send(&app, "GET", &format!("{HISTORY_URI}?days=0"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, body) = send(&app, "GET", HISTORY_URI, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn test_monthly_report_json_and_text() {
        let (app, _) = test_app().await;
        post_accuracy(&app, 99, "2025-03-05T10:00:00Z").await;

        let (status, body) = send(&app, "GET", "/api/kpis/report/Inventory/2025-03", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["area"], "Inventory");
        assert_eq!(body["data"]["period"], "2025-03");
        assert!(body["data"]["generated_at"].is_string());
        assert!(body["data"]["narrative"].is_null());

        let response = call(
            &app,
            Request::builder()
                .uri("/api/kpis/report/Inventory/2025-03/text")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("MONTHLY REPORT - INVENTORY"));

        let (status, _) = send(&app, "GET", "/api/kpis/report/Inventory/2025-13", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

//! Projects and action plan endpoints feeding the monthly report.

use super::{
    AppState,
    response::{ApiJson, ApiQuery, ApiResponse},
};
use crate::{
    core::projects::{self, NewActionItem, NewProject},
    entities::{action_plan_item, project},
    errors::Result,
};
use axum::{extract::State, http::StatusCode};
use serde::Deserialize;

/// `?area=&limit=` filters.
#[derive(Debug, Deserialize)]
pub struct AreaQuery {
    area: Option<String>,
    limit: Option<u64>,
}

/// `GET /api/projects`
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AreaQuery>,
) -> Result<ApiResponse<Vec<project::Model>>> {
    Ok(ApiResponse::list(
        projects::list_projects(&state.db, query.area.as_deref(), query.limit).await?,
    ))
}

/// `POST /api/projects`
pub async fn create(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewProject>,
) -> Result<(StatusCode, ApiResponse<project::Model>)> {
    let created = projects::create_project(&state.db, new).await?;
    Ok(ApiResponse::ok(created).created())
}

/// `GET /api/action-plan`
pub async fn action_plan(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AreaQuery>,
) -> Result<ApiResponse<Vec<action_plan_item::Model>>> {
    Ok(ApiResponse::list(
        projects::list_action_plan(&state.db, query.area.as_deref(), query.limit).await?,
    ))
}

/// `POST /api/action-plan`
pub async fn create_action(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewActionItem>,
) -> Result<(StatusCode, ApiResponse<action_plan_item::Model>)> {
    let created = projects::create_action_item(&state.db, new).await?;
    Ok(ApiResponse::ok(created).created())
}

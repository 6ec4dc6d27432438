//! Activity board endpoints.

use super::{
    AppState,
    response::{ApiJson, ApiPath, ApiQuery, ApiResponse},
};
use crate::{
    core::{
        activity::{self, ActivityDetails, ActivityUpdate, NewActivity, SubtaskUpdate},
        storage::sanitize_file_name,
    },
    entities::{activity_comment, activity_document, activity as activity_entity, subtask},
    errors::{Error, FieldError, Result},
};
use axum::{
    extract::{Multipart, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

/// `?direction=` filter.
#[derive(Debug, Deserialize)]
pub struct DirectionQuery {
    direction: Option<String>,
}

/// Body of `PUT /api/activities/:id/status`.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    status: String,
    version: Option<i32>,
}

/// Body of `POST /api/activities/:id/subtasks`.
#[derive(Debug, Deserialize)]
pub struct SubtaskRequest {
    #[serde(default)]
    title: String,
}

/// Body of `POST /api/activities/:id/comments`.
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    author: String,
    #[serde(default)]
    text: String,
}

/// `GET /api/activities`
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DirectionQuery>,
) -> Result<ApiResponse<Vec<activity_entity::Model>>> {
    Ok(ApiResponse::list(
        activity::list_activities(&state.db, query.direction.as_deref()).await?,
    ))
}

/// `POST /api/activities`
pub async fn create(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewActivity>,
) -> Result<(StatusCode, ApiResponse<activity_entity::Model>)> {
    let card = activity::create_activity(&state.db, new).await?;
    Ok(ApiResponse::ok(card)
        .with_message("Activity created")
        .created())
}

/// `GET /api/activities/:id` - the card with its subtasks, documents and comments.
pub async fn details(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<ActivityDetails>> {
    Ok(ApiResponse::ok(
        activity::get_activity_details(&state.db, id).await?,
    ))
}

/// `PUT /api/activities/:id`
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(changes): ApiJson<ActivityUpdate>,
) -> Result<ApiResponse<activity_entity::Model>> {
    let card = activity::update_activity(&state.db, id, changes).await?;
    Ok(ApiResponse::ok(card).with_message("Activity updated"))
}

/// `PUT /api/activities/:id/status`
pub async fn status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> Result<ApiResponse<activity_entity::Model>> {
    let card = activity::update_status(&state.db, id, &body.status, body.version).await?;
    Ok(ApiResponse::ok(card).with_message("Status updated"))
}

/// `DELETE /api/activities/:id`
///
/// Rows go first; stored files are removed afterwards and a failure there is only logged.
pub async fn remove(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<Value>> {
    let file_refs = activity::delete_activity(&state.db, id).await?;
    for file_ref in &file_refs {
        if let Err(e) = state.bucket.remove(file_ref).await {
            warn!(activity_id = id, file_ref, error = %e, "Could not remove activity document");
        }
    }
    Ok(ApiResponse::ok(json!({ "id": id, "documents_removed": file_refs.len() }))
        .with_message("Activity deleted"))
}

/// `GET /api/activities/:id/subtasks`
pub async fn subtasks(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<Vec<subtask::Model>>> {
    Ok(ApiResponse::list(activity::list_subtasks(&state.db, id).await?))
}

/// `POST /api/activities/:id/subtasks`
pub async fn add_subtask(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<SubtaskRequest>,
) -> Result<(StatusCode, ApiResponse<subtask::Model>)> {
    let item = activity::add_subtask(&state.db, id, &body.title).await?;
    Ok(ApiResponse::ok(item).created())
}

/// `PUT /api/activities/:id/subtasks/:subtask_id`
pub async fn update_subtask(
    State(state): State<AppState>,
    ApiPath((id, subtask_id)): ApiPath<(i64, i64)>,
    ApiJson(changes): ApiJson<SubtaskUpdate>,
) -> Result<ApiResponse<subtask::Model>> {
    Ok(ApiResponse::ok(
        activity::update_subtask(&state.db, id, subtask_id, changes).await?,
    ))
}

/// `DELETE /api/activities/:id/subtasks/:subtask_id`
pub async fn delete_subtask(
    State(state): State<AppState>,
    ApiPath((id, subtask_id)): ApiPath<(i64, i64)>,
) -> Result<ApiResponse<Value>> {
    activity::delete_subtask(&state.db, id, subtask_id).await?;
    Ok(ApiResponse::ok(json!({ "id": subtask_id })).with_message("Subtask deleted"))
}

/// `GET /api/activities/:id/documents`
pub async fn documents(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<Vec<activity_document::Model>>> {
    Ok(ApiResponse::list(activity::list_documents(&state.db, id).await?))
}

/// `POST /api/activities/:id/documents` - multipart with a `document` file and optional `name`.
pub async fn upload_document(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    mut multipart: Multipart,
) -> Result<(StatusCode, ApiResponse<activity_document::Model>)> {
    let mut name: Option<String> = None;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("document") => {
                let file_name = field.file_name().unwrap_or("document").to_string();
                let bytes = field.bytes().await?;
                upload = Some((file_name, bytes.to_vec()));
            }
            Some("name") => name = Some(field.text().await?),
            _ => {}
        }
    }

    let (file_name, bytes) = upload.ok_or_else(|| {
        Error::invalid_fields(
            "No file uploaded",
            vec![FieldError::new("document", "is required")],
        )
    })?;
    let document = activity::attach_document(
        &state.db,
        &state.bucket,
        id,
        name.as_deref(),
        &file_name,
        &bytes,
    )
    .await?;
    Ok(ApiResponse::ok(document)
        .with_message("Document uploaded")
        .created())
}

/// `GET /api/activities/:id/documents/:document_id` - the stored file as an attachment.
pub async fn download_document(
    State(state): State<AppState>,
    ApiPath((id, document_id)): ApiPath<(i64, i64)>,
) -> Result<impl IntoResponse> {
    let (document, bytes) =
        activity::download_document(&state.db, &state.bucket, id, document_id).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        sanitize_file_name(&document.name)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// `DELETE /api/activities/:id/documents/:document_id`
pub async fn delete_document(
    State(state): State<AppState>,
    ApiPath((id, document_id)): ApiPath<(i64, i64)>,
) -> Result<ApiResponse<Value>> {
    activity::delete_document(&state.db, &state.bucket, id, document_id).await?;
    Ok(ApiResponse::ok(json!({ "id": document_id })).with_message("Document deleted"))
}

/// `GET /api/activities/:id/comments`
pub async fn comments(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<Vec<activity_comment::Model>>> {
    Ok(ApiResponse::list(activity::list_comments(&state.db, id).await?))
}

/// `POST /api/activities/:id/comments`
pub async fn add_comment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<CommentRequest>,
) -> Result<(StatusCode, ApiResponse<activity_comment::Model>)> {
    let comment = activity::add_comment(&state.db, id, &body.author, &body.text).await?;
    Ok(ApiResponse::ok(comment).created())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use crate::api::test_support::{body_json, call, send, test_app};
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use serde_json::{Value, json};

    fn card() -> Value {
        json!({
            "name": "Quarterly stock count",
            "assignee": "owner@example.com",
            "direction": "Operations",
            "priority": "High",
            "involved_areas": ["Inventory", "Logistics", "Inventory"]
        })
    }

    async fn create_card(app: &axum::Router) -> i64 {
        let (status, body) = send(app, "POST", "/api/activities", Some(card())).await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_create_and_list_activities() {
        let (app, _) = test_app().await;
        let id = create_card(&app).await;

        let (status, body) = send(&app, "GET", "/api/activities?direction=Operations", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["id"], id);
        assert_eq!(body["data"][0]["status"], "To Do");

        let (_, body) = send(&app, "GET", "/api/activities?direction=Finance", None).await;
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn test_create_activity_reports_field_errors() {
        let (app, _) = test_app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/activities",
            Some(json!({"name": "ab", "assignee": "nobody", "direction": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["errors"].as_array().unwrap().len() >= 3);
    }

    #[tokio::test]
    async fn test_status_update_detects_stale_version() {
        let (app, _) = test_app().await;
        let id = create_card(&app).await;
        let uri = format!("/api/activities/{id}/status");

        let (status, body) = send(&app, "PUT", &uri, Some(json!({"status": "In Progress", "version": 1}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "In Progress");
        assert_eq!(body["data"]["version"], 2);

        let (status, _) = send(&app, "PUT", &uri, Some(json!({"status": "Done", "version": 1}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, "PUT", &uri, Some(json!({"status": "Someday"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_children_and_details() {
        let (app, _) = test_app().await;
        let id = create_card(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/activities/{id}/subtasks"),
            Some(json!({"title": "Count aisle 1"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let subtask_id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/api/activities/{id}/subtasks/{subtask_id}"),
            Some(json!({"done": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["done"], true);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/activities/{id}/comments"),
            Some(json!({"author": "Dana", "text": "Started today"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(&app, "GET", &format!("/api/activities/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Quarterly stock count");
        assert_eq!(body["data"]["subtasks"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["comments"][0]["author"], "Dana");

        let (status, _) = send(&app, "GET", "/api/activities/9999/subtasks", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_document_upload_and_delete_card() {
        let (app, state) = test_app().await;
        let id = create_card(&app).await;

        let boundary = "indicore-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nCount plan\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"document\"; filename=\"plan.txt\"\r\n\
             Content-Type: text/plain\r\n\r\naisle 1-4\r\n--{boundary}--\r\n"
        );
        let response = call(
            &app,
            Request::builder()
                .method("POST")
                .uri(format!("/api/activities/{id}/documents"))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let uploaded = body_json(response).await;
        assert_eq!(uploaded["data"]["name"], "Count plan");
        let file_ref = uploaded["data"]["file_ref"].as_str().unwrap().to_string();
        assert_eq!(state.bucket.get(&file_ref).await.unwrap(), b"aisle 1-4");

        let document_id = uploaded["data"]["id"].as_i64().unwrap();
        let uri = format!("/api/activities/{id}/documents/{document_id}");
        let response = call(&app, Request::get(&uri).body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Count_plan\""
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"aisle 1-4");
        let (status, _) = send(&app, "GET", &format!("{uri}0"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, "DELETE", &format!("/api/activities/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["documents_removed"], 1);
        assert!(state.bucket.get(&file_ref).await.is_err());

        let (status, _) = send(&app, "GET", &format!("/api/activities/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

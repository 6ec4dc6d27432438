//! JSON envelope and error mapping shared by every handler.
//!
//! Success bodies look like `{"success": true, "data": ..., "message"?, "count"?}`; errors like
//! `{"success": false, "message": ..., "errors"?: [{field, message}], "detail"?}`. `detail`
//! carries the internal error text and is only emitted by debug builds.

use crate::errors::{Error, FieldError};
use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts,
        multipart::MultipartError,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};

/// Successful response body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wraps `data` in a success envelope.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
            count: None,
        }
    }

    /// Adds a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Same envelope with a 201 status.
    pub fn created(self) -> (StatusCode, Self) {
        (StatusCode::CREATED, self)
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    /// Wraps a list and reports its length in `count`.
    pub fn list(items: Vec<T>) -> Self {
        let count = items.len();
        Self {
            count: Some(count),
            ..Self::ok(items)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldError]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

/// HTTP status for each error kind.
#[must_use]
pub const fn error_status(err: &Error) -> StatusCode {
    match err {
        Error::Validation { .. } => StatusCode::BAD_REQUEST,
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::DuplicateEntry { .. } | Error::Conflict { .. } => StatusCode::CONFLICT,
        Error::Database(_)
        | Error::Storage { .. }
        | Error::Config { .. }
        | Error::Io(_)
        | Error::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = error_status(&self);
        let (message, errors) = match &self {
            Error::Validation { message, fields } => {
                (message.clone(), (!fields.is_empty()).then_some(fields.as_slice()))
            }
            Error::NotFound { .. } | Error::DuplicateEntry { .. } | Error::Conflict { .. } => {
                (self.to_string(), None)
            }
            _ => ("Internal server error".to_string(), None),
        };

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = ErrorBody {
            success: false,
            message,
            errors,
            detail: cfg!(debug_assertions).then(|| self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for Error {
    fn from(err: MultipartError) -> Self {
        Self::validation(format!("Invalid upload: {}", err.body_text()))
    }
}

/// `Json` extractor whose rejections use the service's error envelope.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// `Path` extractor whose rejections use the service's error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct ApiPath<T>(pub T);

/// `Query` extractor whose rejections use the service's error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct ApiQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(error_status(&Error::validation("bad")), StatusCode::BAD_REQUEST);
        assert_eq!(error_status(&Error::not_found("Activity", 1)), StatusCode::NOT_FOUND);
        assert_eq!(
            error_status(&Error::DuplicateEntry { message: "x".into() }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            error_status(&Error::Conflict { message: "x".into() }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            error_status(&Error::Storage { message: "disk".into() }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_list_envelope_counts() {
        let body = serde_json::to_value(ApiResponse::list(vec![1, 2, 3])).unwrap_or_default();
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 3);
        assert!(body.get("message").is_none());
    }
}

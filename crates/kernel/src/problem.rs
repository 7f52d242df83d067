//! Application errors to HTTP problem responses.
//!
//! Status selection looks at the whole error collection, first match wins:
//!
//! | contains      | status | body            |
//! |---------------|--------|-----------------|
//! | Validation    | 400    | problem details |
//! | NotFound      | 404    | problem details |
//! | Forbidden     | 403    | none            |
//! | anything else | 422    | problem details |

use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value as JsonValue;

use vertobank_core::{AppError, ErrorKind};

pub const PROBLEM_TITLE: &str = "Request failed";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProblemDetails {
    pub status: u16,
    pub title: &'static str,
    pub detail: String,
    pub errors: Vec<ProblemError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProblemError {
    pub message: String,
    pub code: Option<JsonValue>,
    pub meta: BTreeMap<String, JsonValue>,
}

fn contains(errors: &[AppError], kind: ErrorKind) -> bool {
    errors.iter().any(|e| e.kind() == kind)
}

/// HTTP status for a failed use case's error collection.
pub fn status_for(errors: &[AppError]) -> StatusCode {
    if contains(errors, ErrorKind::Validation) {
        StatusCode::BAD_REQUEST
    } else if contains(errors, ErrorKind::NotFound) {
        StatusCode::NOT_FOUND
    } else if contains(errors, ErrorKind::Forbidden) {
        StatusCode::FORBIDDEN
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

pub fn problem_details(errors: &[AppError], status: StatusCode) -> ProblemDetails {
    ProblemDetails {
        status: status.as_u16(),
        title: PROBLEM_TITLE,
        detail: errors.iter().map(AppError::message).collect::<Vec<_>>().join(" "),
        errors: errors
            .iter()
            .map(|e| ProblemError {
                message: e.message().to_string(),
                code: e.code().cloned(),
                meta: e.metadata().clone(),
            })
            .collect(),
    }
}

/// A failed use case, renderable as an HTTP response.
#[derive(Debug)]
pub struct Problem(pub Vec<AppError>);

impl From<Vec<AppError>> for Problem {
    fn from(errors: Vec<AppError>) -> Self {
        Self(errors)
    }
}

impl From<AppError> for Problem {
    fn from(error: AppError) -> Self {
        Self(vec![error])
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status == StatusCode::FORBIDDEN {
            return status.into_response();
        }
        (status, Json(problem_details(&self.0, status))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::json;

    use super::*;

    async fn body_json(response: Response) -> JsonValue {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn validation_wins_over_everything() {
        let errors = vec![
            AppError::forbidden("no"),
            AppError::not_found("missing"),
            AppError::validation("bad"),
        ];
        assert_eq!(status_for(&errors), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_wins_over_forbidden_and_domain() {
        let errors = vec![AppError::domain("rule"), AppError::forbidden("no"), AppError::not_found("gone")];
        assert_eq!(status_for(&errors), StatusCode::NOT_FOUND);
    }

    #[test]
    fn forbidden_wins_over_domain() {
        let errors = vec![AppError::domain("rule"), AppError::forbidden("no")];
        assert_eq!(status_for(&errors), StatusCode::FORBIDDEN);
    }

    #[test]
    fn everything_else_is_unprocessable() {
        assert_eq!(status_for(&[AppError::domain("rule")]), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(&[]), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn validation_body_carries_messages_codes_and_metadata() {
        let response = Problem(vec![
            AppError::validation("Name is required.").with_code("name_required"),
            AppError::validation("Price must be positive.").with_meta("field", "price"),
        ])
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({
                "status": 400,
                "title": "Request failed",
                "detail": "Name is required. Price must be positive.",
                "errors": [
                    {
                        "message": "Name is required.",
                        "code": "name_required",
                        "meta": { "code": "name_required" }
                    },
                    {
                        "message": "Price must be positive.",
                        "code": null,
                        "meta": { "field": "price" }
                    }
                ]
            })
        );
    }

    #[tokio::test]
    async fn forbidden_has_no_body() {
        let response = Problem::from(AppError::forbidden("nope")).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn domain_errors_render_as_422() {
        let response = Problem::from(AppError::domain("Item is archived.")).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["status"], json!(422));
    }
}

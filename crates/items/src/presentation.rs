//! HTTP endpoints of the items module.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, post, put},
};
use serde::Deserialize;
use serde_json::json;

use vertobank_core::AppError;
use vertobank_kernel::Problem;

use crate::application::{self, CreateItem, ItemsError, ListItems, codes};
use crate::domain::ItemId;
use crate::infrastructure::ItemsPersistence;

pub fn router(persistence: ItemsPersistence) -> Router {
    Router::new()
        .route("/items", post(create_item).get(list_items))
        .route("/items/:id", delete(delete_item))
        .route("/items/:id/price", put(reprice_item))
        .route("/items/:id/name", put(rename_item))
        .with_state(persistence)
}

#[derive(Debug, Deserialize)]
pub struct RepriceRequest {
    pub price: f64,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

fn error_response(err: ItemsError) -> Response {
    match err {
        ItemsError::Rejected(errors) => Problem(errors).into_response(),
        other => {
            tracing::error!(error = %other, "items request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": "the request could not be completed",
                })),
            )
                .into_response()
        }
    }
}

/// A body or query string that does not fit the expected shape.
fn malformed(rejection: impl std::fmt::Display) -> Response {
    Problem(vec![
        AppError::validation("The request is malformed.")
            .with_code(codes::MALFORMED_REQUEST)
            .with_meta("reason", rejection.to_string()),
    ])
    .into_response()
}

fn parse_id(raw: &str) -> Result<ItemId, Response> {
    raw.parse::<ItemId>().map_err(|_| {
        Problem(vec![
            AppError::validation(format!("'{raw}' is not a valid item id."))
                .with_code(codes::INVALID_ID)
                .with_meta("id", raw),
        ])
        .into_response()
    })
}

async fn create_item(
    State(items): State<ItemsPersistence>,
    body: Result<Json<CreateItem>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return malformed(rejection),
    };
    let ctx = items.begin();
    match application::create_item(&ctx, body).await {
        Ok(view) => (
            StatusCode::CREATED,
            [(header::LOCATION, format!("/items/{}", view.id))],
            Json(view),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

async fn list_items(
    State(items): State<ItemsPersistence>,
    criteria: Result<Query<ListItems>, QueryRejection>,
) -> Response {
    let Query(criteria) = match criteria {
        Ok(criteria) => criteria,
        Err(rejection) => return malformed(rejection),
    };
    let ctx = items.begin();
    match application::list_items(&ctx, criteria).await {
        Ok(views) => (StatusCode::OK, Json(json!({ "items": views }))).into_response(),
        Err(e) => error_response(e),
    }
}

async fn reprice_item(
    State(items): State<ItemsPersistence>,
    Path(id): Path<String>,
    body: Result<Json<RepriceRequest>, JsonRejection>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return malformed(rejection),
    };
    let ctx = items.begin();
    match application::reprice_item(&ctx, id, body.price).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn rename_item(
    State(items): State<ItemsPersistence>,
    Path(id): Path<String>,
    body: Result<Json<RenameRequest>, JsonRejection>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return malformed(rejection),
    };
    let ctx = items.begin();
    match application::rename_item(&ctx, id, &body.name).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn delete_item(State(items): State<ItemsPersistence>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let ctx = items.begin();
    match application::delete_item(&ctx, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

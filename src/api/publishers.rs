//! Publisher endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::publisher::{CreatePublisher, Publisher, UpdatePublisher},
};

/// List publishers
#[utoipa::path(
    get,
    path = "/publishers",
    tag = "catalog",
    responses(
        (status = 200, description = "List of publishers", body = Vec<Publisher>)
    )
)]
pub async fn list_publishers(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Publisher>>> {
    let rows = state.services.catalog.list_publishers().await?;
    Ok(Json(rows))
}

/// Get publisher by ID
#[utoipa::path(
    get,
    path = "/publishers/{id}",
    tag = "catalog",
    params(
        ("id" = i32, Path, description = "Publisher ID")
    ),
    responses(
        (status = 200, description = "Publisher details", body = Publisher),
        (status = 404, description = "Publisher not found")
    )
)]
pub async fn get_publisher(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Publisher>> {
    let row = state.services.catalog.get_publisher(id).await?;
    Ok(Json(row))
}

/// Create a new publisher
#[utoipa::path(
    post,
    path = "/publishers",
    tag = "catalog",
    request_body = CreatePublisher,
    responses(
        (status = 201, description = "Publisher created", body = Publisher),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_publisher(
    State(state): State<crate::AppState>,
    Json(request): Json<CreatePublisher>,
) -> AppResult<(StatusCode, Json<Publisher>)> {
    let created = state.services.catalog.create_publisher(&request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an existing publisher
#[utoipa::path(
    put,
    path = "/publishers/{id}",
    tag = "catalog",
    params(
        ("id" = i32, Path, description = "Publisher ID")
    ),
    request_body = UpdatePublisher,
    responses(
        (status = 200, description = "Publisher updated", body = Publisher),
        (status = 404, description = "Publisher not found")
    )
)]
pub async fn update_publisher(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdatePublisher>,
) -> AppResult<Json<Publisher>> {
    let updated = state.services.catalog.update_publisher(id, &request).await?;
    Ok(Json(updated))
}

/// Delete a publisher
#[utoipa::path(
    delete,
    path = "/publishers/{id}",
    tag = "catalog",
    params(
        ("id" = i32, Path, description = "Publisher ID")
    ),
    responses(
        (status = 204, description = "Publisher deleted"),
        (status = 404, description = "Publisher not found"),
        (status = 409, description = "Publisher still has books")
    )
)]
pub async fn delete_publisher(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_publisher(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Library status, update control and watch directory routes.

use std::path::PathBuf;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use anilib_common::LibraryStatus;
use anilib_db::pool::get_conn;
use anilib_db::queries::watch_directories;
use serde::{Deserialize, Serialize};

use super::error::ApiResult;
use super::AppContext;
use crate::library;

pub fn library_routes() -> Router<AppContext> {
    Router::new()
        .route("/library/status", get(get_status))
        .route("/library/update", post(start_update))
        .route("/library/cancel", post(cancel_update))
        .route(
            "/library/directories",
            get(list_directories).post(add_directory),
        )
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: LibraryStatus,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddDirectoryRequest {
    pub path: PathBuf,
}

async fn get_status(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: ctx.library.status(),
    })
}

/// Start an update in the background; 409 while one is running.
async fn start_update(State(ctx): State<AppContext>) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    ctx.library.start_update()?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StatusResponse {
            status: ctx.library.status(),
        }),
    ))
}

async fn cancel_update(State(ctx): State<AppContext>) -> Json<CancelResponse> {
    Json(CancelResponse {
        cancelled: ctx.library.cancel(),
    })
}

async fn list_directories(State(ctx): State<AppContext>) -> ApiResult<Json<Vec<PathBuf>>> {
    let conn = get_conn(&ctx.pool)?;
    Ok(Json(watch_directories::list_watch_directories(&conn)?))
}

async fn add_directory(
    State(ctx): State<AppContext>,
    Json(request): Json<AddDirectoryRequest>,
) -> ApiResult<(StatusCode, Json<Vec<PathBuf>>)> {
    library::add_watch_directory(&ctx.pool, &request.path)?;
    let conn = get_conn(&ctx.pool)?;
    Ok((
        StatusCode::CREATED,
        Json(watch_directories::list_watch_directories(&conn)?),
    ))
}

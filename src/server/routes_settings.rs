//! Named boolean settings.

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use anilib_common::Error;
use anilib_db::models::Setting;
use anilib_db::pool::get_conn;
use anilib_db::queries::settings;
use serde::{Deserialize, Serialize};

use super::error::ApiResult;
use super::AppContext;

/// Settings the pipeline reads.
const KNOWN_SETTINGS: &[&str] = &[settings::USE_HARDWARE_ACCELERATION];

pub fn settings_routes() -> Router<AppContext> {
    Router::new()
        .route("/settings", get(list_settings))
        .route("/settings/:name", put(update_setting))
}

#[derive(Debug, Serialize)]
pub struct SettingResponse {
    pub name: String,
    pub value: bool,
    /// `false` when the value is the configured default.
    pub stored: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingRequest {
    pub value: bool,
}

/// Every known setting, with configured defaults filled in.
async fn list_settings(State(ctx): State<AppContext>) -> ApiResult<Json<Vec<SettingResponse>>> {
    let conn = get_conn(&ctx.pool)?;
    let stored = settings::list_settings(&conn)?;

    let response = KNOWN_SETTINGS
        .iter()
        .map(|name| match stored.iter().find(|s| s.name == *name) {
            Some(s) => SettingResponse {
                name: s.name.clone(),
                value: s.value,
                stored: true,
            },
            None => SettingResponse {
                name: name.to_string(),
                value: default_value(&ctx, name),
                stored: false,
            },
        })
        .collect();
    Ok(Json(response))
}

async fn update_setting(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
    Json(request): Json<UpdateSettingRequest>,
) -> ApiResult<Json<Setting>> {
    if !KNOWN_SETTINGS.contains(&name.as_str()) {
        return Err(Error::not_found("setting", &name).into());
    }
    let conn = get_conn(&ctx.pool)?;
    let setting = settings::set_setting(&conn, &name, request.value)?;
    tracing::info!(name = %setting.name, value = setting.value, "Setting updated");
    Ok(Json(setting))
}

fn default_value(ctx: &AppContext, name: &str) -> bool {
    match name {
        settings::USE_HARDWARE_ACCELERATION => ctx.config.transcode.use_hardware_acceleration,
        _ => false,
    }
}

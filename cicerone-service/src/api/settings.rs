//! Settings API endpoints for adjusting dynamic configuration at runtime.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::AppState;
use crate::error::ServiceError;

/// Response for GET /api/settings
#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    /// All current settings (file/env values with overrides applied)
    pub settings: HashMap<String, serde_json::Value>,
    /// Keys overridden through this API
    pub overridden: Vec<String>,
}

/// Request body for PUT /api/settings
#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    /// Settings to update (key -> value). Use null to revert a key.
    pub settings: HashMap<String, serde_json::Value>,
}

/// GET /api/settings - retrieve all settings with their current values
pub async fn get_settings_handler(State(state): State<Arc<AppState>>) -> Json<SettingsResponse> {
    let runtime_config = &state.service.runtime_config;

    Json(SettingsResponse {
        settings: runtime_config.dynamic().to_key_value_map(),
        overridden: runtime_config.overridden_keys(),
    })
}

/// PUT /api/settings - update settings (triggers hot reload)
pub async fn update_settings_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, ServiceError> {
    state
        .service
        .runtime_config
        .apply_settings(request.settings)?;

    Ok(get_settings_handler(State(state)).await)
}

use axum::{Json, extract::State};
use serde_json::{Value, json};
use time::format_description::well_known::Rfc3339;

use crate::server::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let timestamp = pbcms_core::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(json!({
        "status": "OK",
        "timestamp": timestamp,
        "environment": state.environment.as_str(),
    }))
}

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::state::AppState;

/// GET / and GET /health
/// Probes the model API through the dispatcher and reports the model pool.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let probe = state.llm.probe().await;
    let status = state.llm.status_info();

    let mut body = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "gemini_ai": if probe.reachable { "connected" } else { "disconnected" },
            "pdf_processor": "available",
            "current_model": status.current_model,
            "available_models": status.available_models,
            "total_models": status.total_models,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    if state.config.debug_mode {
        if let Some(err) = probe.last_error {
            body["services"]["last_error"] = Value::String(err);
        }
    }

    Json(body)
}

fn debug_only(state: &AppState) -> Result<(), AppError> {
    if state.config.debug_mode {
        Ok(())
    } else {
        Err(AppError::NotFound("Not found".to_string()))
    }
}

/// GET /model-status (debug mode only)
pub async fn model_status_handler(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    debug_only(&state)?;
    Ok(Json(json!({
        "model_status": state.llm.status_info(),
        "config": state.config.settings_info(),
    })))
}

/// GET /config (debug mode only)
pub async fn config_handler(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    debug_only(&state)?;
    Ok(Json(state.config.settings_info()))
}

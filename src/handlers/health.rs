use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::utils::logging::*;
use crate::AppState;

pub async fn health_check() -> Json<Value> {
    log_health_check();

    Json(json!({
        "status": "healthy",
        "service": "ws-gestao-contabil",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn ready_check(State(state): State<Arc<AppState>>) -> Result<Json<Value>, StatusCode> {
    log_integration_status_check();

    // Testa a API REST da plataforma
    let supabase_status = match state.supabase.test_connection().await {
        Ok(_) => "connected",
        Err(e) => {
            log_warning(&format!("⚠️ Plataforma indisponível: {}", e));
            "disconnected"
        }
    };

    if supabase_status != "connected" {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(json!({
        "ready": true,
        "service": "ws-gestao-contabil",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "dependencies": {
            "supabase": { "status": supabase_status }
        }
    })))
}

/// Resumo da configuração sem segredos
pub async fn status_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    log_integration_status_check();

    let settings = &state.settings;

    Json(json!({
        "service": "ws-gestao-contabil",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string()),
        "integrations": {
            "supabase": {
                "url": settings.supabase.url,
                "service_role_configured": !settings.supabase.service_role_key.is_empty(),
                "buckets": [settings.supabase.bucket_documentos, settings.supabase.bucket_fechamentos]
            },
            "n8n": {
                "base_url": settings.n8n.base_url,
                "callback_secret_configured": settings.n8n.callback_secret.is_some(),
                "max_tentativas_envio": settings.n8n.max_tentativas_envio
            }
        },
        "conciliacao": {
            "max_tentativas": settings.conciliacao.max_tentativas,
            "limiar_disparo": settings.conciliacao.limiar_disparo,
            "intervalo_monitor_secs": settings.conciliacao.intervalo_monitor_secs
        },
        "realtime": {
            "assinantes": state.notificacoes.assinantes()
        }
    }))
}

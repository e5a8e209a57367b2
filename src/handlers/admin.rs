//! Rotas privilegiadas: usuários (sessão de admin) e operação (X-Admin-Key)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use supabase::LinkRecuperacao;
use uuid::Uuid;

use crate::auth::Sessao;
use crate::models::usuario::{NovaSenhaRequest, RecuperacaoRequest};
use crate::models::{NovoUsuarioRequest, PerfilUsuario};
use crate::services::{alinhamento, usuarios};
use crate::utils::logging::*;
use crate::utils::AppResult;
use crate::AppState;

pub async fn criar_usuario(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    Json(req): Json<NovoUsuarioRequest>,
) -> AppResult<(StatusCode, Json<PerfilUsuario>)> {
    log_request_received("/api/admin/usuarios", "POST");
    let perfil = usuarios::criar_usuario(&state, &sessao, req).await?;
    Ok((StatusCode::CREATED, Json(perfil)))
}

pub async fn redefinir_senha(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    Path(id): Path<Uuid>,
    Json(req): Json<NovaSenhaRequest>,
) -> AppResult<StatusCode> {
    usuarios::redefinir_senha(&state, &sessao, id, &req.senha).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn gerar_recuperacao(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    Json(req): Json<RecuperacaoRequest>,
) -> AppResult<Json<LinkRecuperacao>> {
    Ok(Json(usuarios::gerar_recuperacao(&state, &sessao, req).await?))
}

/// `POST /admin/monitor/executar`: roda um ciclo do monitor de alinhamento agora
pub async fn executar_monitor(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    log_request_received("/admin/monitor/executar", "POST");

    let resumo = alinhamento::executar_ciclo(&state).await?;

    Ok(Json(json!({
        "success": true,
        "avaliadas": resumo.avaliadas,
        "alinhamentos_disparados": resumo.alinhamentos_disparados,
        "retentativas": resumo.retentativas,
        "falhas": resumo.falhas,
        "erros": resumo.erros,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

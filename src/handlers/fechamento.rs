use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use std::sync::Arc;
use supabase::UrlAssinada;
use uuid::Uuid;

use crate::auth::Sessao;
use crate::models::{CriarFechamentoRequest, Fechamento};
use crate::services::fechamento;
use crate::utils::logging::*;
use crate::utils::AppResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FiltroFechamentos {
    pub empresa_id: Option<Uuid>,
}

pub async fn solicitar(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    Json(req): Json<CriarFechamentoRequest>,
) -> AppResult<(StatusCode, Json<Fechamento>)> {
    log_request_received("/api/fechamentos", "POST");
    let fechamento = fechamento::solicitar_fechamento(&state, &sessao, req).await?;
    Ok((StatusCode::ACCEPTED, Json(fechamento)))
}

pub async fn listar(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    Query(filtro): Query<FiltroFechamentos>,
) -> AppResult<Json<Vec<Fechamento>>> {
    Ok(Json(fechamento::listar_fechamentos(&state, &sessao, filtro.empresa_id).await?))
}

pub async fn planilha(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UrlAssinada>> {
    Ok(Json(fechamento::url_planilha(&state, &sessao, id).await?))
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tokio::time::Instant;
use uuid::Uuid;

use crate::auth::Sessao;
use crate::models::CriarConciliacaoRequest;
use crate::services::conciliacao::{self, ConciliacaoComProgresso};
use crate::utils::logging::*;
use crate::utils::{AppResult, Competencia};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FiltroConciliacoes {
    pub empresa_id: Option<Uuid>,
    pub competencia: Option<Competencia>,
}

pub async fn criar(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    Json(req): Json<CriarConciliacaoRequest>,
) -> AppResult<(StatusCode, Json<ConciliacaoComProgresso>)> {
    let start_time = Instant::now();
    log_request_received("/api/conciliacoes", "POST");

    let criada = conciliacao::criar_conciliacao(&state, &sessao, req).await?;
    let resposta = ConciliacaoComProgresso::new(criada, &state.settings.conciliacao, Utc::now());

    log_request_processed("/api/conciliacoes", 201, start_time.elapsed().as_millis() as u64);
    Ok((StatusCode::CREATED, Json(resposta)))
}

pub async fn listar(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    Query(filtro): Query<FiltroConciliacoes>,
) -> AppResult<Json<Vec<ConciliacaoComProgresso>>> {
    let lista =
        conciliacao::listar_conciliacoes(&state, &sessao, filtro.empresa_id, filtro.competencia).await?;
    Ok(Json(lista))
}

pub async fn obter(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ConciliacaoComProgresso>> {
    Ok(Json(conciliacao::obter_conciliacao(&state, &sessao, id).await?))
}

pub async fn reprocessar(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ConciliacaoComProgresso>> {
    log_request_received("/api/conciliacoes/{id}/reprocessar", "POST");

    let atualizada = conciliacao::reprocessar(&state, &sessao, id).await?;
    Ok(Json(ConciliacaoComProgresso::new(
        atualizada,
        &state.settings.conciliacao,
        Utc::now(),
    )))
}

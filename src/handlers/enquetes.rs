use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::Sessao;
use crate::models::enquete::{NovaEnqueteRequest, VotoRequest};
use crate::models::{Enquete, ResultadoEnquete, Voto};
use crate::services::enquetes;
use crate::utils::AppResult;
use crate::AppState;

pub async fn criar(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    Json(req): Json<NovaEnqueteRequest>,
) -> AppResult<(StatusCode, Json<Enquete>)> {
    let enquete = enquetes::criar(&state, &sessao, req).await?;
    Ok((StatusCode::CREATED, Json(enquete)))
}

pub async fn listar(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
) -> AppResult<Json<Vec<Enquete>>> {
    Ok(Json(enquetes::listar(&state, &sessao).await?))
}

pub async fn votar(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    Path(id): Path<Uuid>,
    Json(req): Json<VotoRequest>,
) -> AppResult<Json<Voto>> {
    Ok(Json(enquetes::votar(&state, &sessao, id, req).await?))
}

pub async fn resultado(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ResultadoEnquete>> {
    Ok(Json(enquetes::resultado(&state, &sessao, id).await?))
}

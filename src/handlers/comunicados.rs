use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::Sessao;
use crate::models::{Comunicado, NovoComunicado};
use crate::services::comunicados::{self, ComunicadoVisao};
use crate::utils::AppResult;
use crate::AppState;

pub async fn publicar(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    Json(novo): Json<NovoComunicado>,
) -> AppResult<(StatusCode, Json<Comunicado>)> {
    let comunicado = comunicados::publicar(&state, &sessao, novo).await?;
    Ok((StatusCode::CREATED, Json(comunicado)))
}

pub async fn listar(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
) -> AppResult<Json<Vec<ComunicadoVisao>>> {
    Ok(Json(comunicados::listar(&state, &sessao).await?))
}

pub async fn marcar_lido(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    comunicados::marcar_lido(&state, &sessao, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    extract::{Path, State},
    response::Json,
};
use std::sync::Arc;

use crate::auth::Sessao;
use crate::services::cnpj::DadosEmpresa;
use crate::utils::{AppError, AppResult, Cnpj};
use crate::AppState;

/// `GET /api/cnpj/{cnpj}`: dígitos verificadores antes de consultar a API pública
pub async fn consultar(
    State(state): State<Arc<AppState>>,
    _sessao: Sessao,
    Path(cnpj): Path<String>,
) -> AppResult<Json<DadosEmpresa>> {
    let cnpj: Cnpj = cnpj.parse().map_err(AppError::ValidationError)?;
    Ok(Json(state.cnpj.consultar(&cnpj).await?))
}

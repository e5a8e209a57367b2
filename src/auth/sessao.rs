use axum::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::utils::logging::log_access_denied;
use crate::utils::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Papel {
    Admin,
    Cliente,
}

/// Usuário autenticado da requisição
#[derive(Debug, Clone, Serialize)]
pub struct Sessao {
    pub usuario_id: Uuid,
    pub email: String,
    pub papel: Papel,
    /// Empresa do cliente; admins do escritório não têm vínculo
    pub empresa_id: Option<Uuid>,
}

impl Sessao {
    pub fn is_admin(&self) -> bool {
        self.papel == Papel::Admin
    }

    /// Admin acessa qualquer empresa; cliente apenas a própria
    pub fn pode_acessar(&self, empresa_id: Uuid) -> bool {
        self.is_admin() || self.empresa_id == Some(empresa_id)
    }

    pub fn exigir_acesso(&self, empresa_id: Uuid) -> AppResult<()> {
        if self.pode_acessar(empresa_id) {
            return Ok(());
        }
        log_access_denied(&self.usuario_id.to_string(), &format!("empresa {}", empresa_id));
        Err(AppError::Forbidden("sem acesso a esta empresa".to_string()))
    }

    pub fn exigir_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            return Ok(());
        }
        log_access_denied(&self.usuario_id.to_string(), "rota administrativa");
        Err(AppError::Forbidden("restrito ao escritório".to_string()))
    }

    /// Empresa efetiva de uma listagem: cliente sempre a própria, admin a pedida
    pub fn empresa_da_consulta(&self, pedida: Option<Uuid>) -> AppResult<Option<Uuid>> {
        match (self.papel, pedida) {
            (Papel::Admin, pedida) => Ok(pedida),
            (Papel::Cliente, Some(id)) => {
                self.exigir_acesso(id)?;
                Ok(Some(id))
            }
            (Papel::Cliente, None) => Ok(self.empresa_id),
        }
    }
}

/// Token do header `Authorization` ou, para EventSource, do parâmetro `access_token`
fn extrair_token(parts: &Parts) -> Option<String> {
    if let Some(header) = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return header.strip_prefix("Bearer ").map(|t| t.trim().to_string());
    }

    Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(params)| params.get("access_token").cloned())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Sessao {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extrair_token(parts)
            .ok_or_else(|| AppError::Unauthorized("token de sessão ausente".to_string()))?;

        state.sessoes.validar(&token)
    }
}

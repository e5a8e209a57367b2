/// Middleware das rotas de operação (`/admin/*`)
///
/// Essas rotas são chamadas por ferramentas internas e jobs, não pelo
/// portal, então usam o header `X-Admin-Key` em vez da sessão JWT.

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub const HEADER_ADMIN_KEY: &str = "X-Admin-Key";

#[derive(Debug, PartialEq, Eq)]
enum Decisao {
    Permitir,
    PermitirSemChave,
    Negar,
    Indisponivel,
}

/// - Chave configurada: exige `X-Admin-Key` igual
/// - Sem chave em desenvolvimento: permite com warning
/// - Sem chave em produção (`RUST_ENV=production`): 503
fn decidir(esperada: Option<&str>, recebida: Option<&str>, producao: bool) -> Decisao {
    match (esperada, recebida, producao) {
        (Some(esperada), Some(recebida), _) if esperada == recebida => Decisao::Permitir,
        (Some(_), _, _) => Decisao::Negar,
        (None, _, false) => Decisao::PermitirSemChave,
        (None, _, true) => Decisao::Indisponivel,
    }
}

pub async fn require_admin_key(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let recebida = headers.get(HEADER_ADMIN_KEY).and_then(|v| v.to_str().ok());
    let esperada = std::env::var("ADMIN_API_KEY").ok().filter(|k| !k.is_empty());
    let producao = std::env::var("RUST_ENV")
        .unwrap_or_else(|_| "development".to_string())
        == "production";

    match decidir(esperada.as_deref(), recebida, producao) {
        Decisao::Permitir => {
            tracing::debug!("✅ Acesso de operação liberado");
            Ok(next.run(request).await)
        }
        Decisao::PermitirSemChave => {
            tracing::warn!(
                "⚠️  ADMIN_API_KEY não configurada - acesso liberado em desenvolvimento. \
                 Configure ADMIN_API_KEY em produção!"
            );
            Ok(next.run(request).await)
        }
        Decisao::Negar => {
            tracing::warn!(
                "❌ Acesso de operação negado - X-Admin-Key inválida ou ausente: {:?}",
                recebida.map(|_| "<redacted>")
            );
            Err(resposta(
                StatusCode::UNAUTHORIZED,
                "X-Admin-Key ausente ou inválida",
            ))
        }
        Decisao::Indisponivel => {
            tracing::error!("🚨 ADMIN_API_KEY não configurada em produção! Rotas /admin bloqueadas.");
            Err(resposta(
                StatusCode::SERVICE_UNAVAILABLE,
                "ADMIN_API_KEY não configurada no servidor",
            ))
        }
    }
}

fn resposta(status: StatusCode, mensagem: &str) -> Response {
    (
        status,
        Json(json!({
            "error": mensagem,
            "status": status.as_u16()
        })),
    )
        .into_response()
}

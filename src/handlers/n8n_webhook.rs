use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::Instant;

use crate::models::{StatusCallback, TipoProcesso};
use crate::services::{conciliacao, fechamento};
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;

pub const HEADER_ASSINATURA: &str = "X-N8N-Signature";

/// `POST /webhooks/n8n/status`: status escrito pelos workflows
pub async fn receber_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let start_time = Instant::now();
    log_request_received("/webhooks/n8n/status", "POST");

    if let Some(ref secret) = state.settings.n8n.callback_secret {
        verificar_assinatura(&headers, &body, secret)?;
    }

    let callback: StatusCallback = serde_json::from_slice(&body).map_err(|e| {
        log_validation_error("payload", &format!("Invalid JSON: {}", e));
        AppError::ValidationError(format!("payload de status inválido: {}", e))
    })?;

    let resposta = match callback.tipo {
        TipoProcesso::Conciliacao => {
            let c = conciliacao::aplicar_status_n8n(&state, callback.id, &callback.status, callback.mensagem)
                .await?;
            json!({ "tipo": "conciliacao", "id": c.id, "status": c.status })
        }
        TipoProcesso::Fechamento => {
            let f = fechamento::aplicar_status_n8n(
                &state,
                callback.id,
                &callback.status,
                callback.mensagem,
                callback.planilha_caminho,
            )
            .await?;
            json!({ "tipo": "fechamento", "id": f.id, "status": f.status })
        }
    };

    log_request_processed("/webhooks/n8n/status", 200, start_time.elapsed().as_millis() as u64);
    Ok(Json(resposta))
}

fn verificar_assinatura(headers: &HeaderMap, body: &[u8], secret: &str) -> AppResult<()> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let signature_header = headers
        .get(HEADER_ASSINATURA)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("header {} ausente", HEADER_ASSINATURA)))?;

    // Remove o prefixo "sha256=" se presente
    let signature = signature_header.strip_prefix("sha256=").unwrap_or(signature_header);

    let recebida = hex::decode(signature).map_err(|_| {
        log_validation_error("n8n_signature", "Signature is not hex");
        AppError::Unauthorized("assinatura do callback inválida".to_string())
    })?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::ConfigError(format!("Invalid secret key: {}", e)))?;
    mac.update(body);

    // verify_slice compara em tempo constante
    mac.verify_slice(&recebida).map_err(|_| {
        log_validation_error("n8n_signature", "Invalid signature");
        AppError::Unauthorized("assinatura do callback inválida".to_string())
    })
}

/// Assinatura hex no formato enviado pelo n8n (usado nos testes)
#[cfg(test)]
pub fn assinar(secret: &str, body: &[u8]) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC aceita qualquer chave");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "callback-secret";

    fn headers_com(valor: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_ASSINATURA, HeaderValue::from_str(valor).unwrap());
        headers
    }

    #[test]
    fn test_assinatura_valida_com_e_sem_prefixo() {
        let body = br#"{"tipo":"conciliacao"}"#;
        let assinatura = assinar(SECRET, body);

        assert!(verificar_assinatura(&headers_com(&assinatura), body, SECRET).is_ok());
        assert!(verificar_assinatura(&headers_com(&format!("sha256={}", assinatura)), body, SECRET).is_ok());
    }

    #[test]
    fn test_assinatura_invalida() {
        let body = br#"{"tipo":"conciliacao"}"#;
        let assinatura = assinar("outro", body);
        let erro = verificar_assinatura(&headers_com(&assinatura), body, SECRET).unwrap_err();
        assert!(matches!(erro, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_header_ausente() {
        let erro = verificar_assinatura(&HeaderMap::new(), b"{}", SECRET).unwrap_err();
        assert!(matches!(erro, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_assinatura_hex_maiuscula() {
        let body = br#"{"tipo":"fechamento"}"#;
        let assinatura = assinar(SECRET, body).to_ascii_uppercase();
        assert!(verificar_assinatura(&headers_com(&assinatura), body, SECRET).is_ok());
    }

    #[test]
    fn test_assinatura_que_nao_e_hex() {
        let body = br#"{"tipo":"conciliacao"}"#;
        let erro = verificar_assinatura(&headers_com("sha256=zz-nao-hex"), body, SECRET).unwrap_err();
        assert!(matches!(erro, AppError::Unauthorized(_)));

        let truncada = &assinar(SECRET, body)[..32];
        let erro = verificar_assinatura(&headers_com(truncada), body, SECRET).unwrap_err();
        assert!(matches!(erro, AppError::Unauthorized(_)));
    }
}

//! Montagem do router HTTP
//!
//! - Públicas: health checks, calculadoras e o callback do n8n (assinatura própria)
//! - `/api/*`: sessão JWT (extrator `Sessao` nos handlers)
//! - `/admin/*`: operação, protegidas por `X-Admin-Key`

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    admin, calculadoras, cnpj, comunicados, conciliacao, documentos, enquetes, fechamento,
    health_check, notificacoes, ready_check, receber_status, status_check,
};
use crate::middleware::require_admin_key;
use crate::AppState;

/// Folga para os campos de texto e fronteiras do multipart
const FOLGA_MULTIPART: usize = 64 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    let limite_corpo = state.settings.uploads.max_bytes + FOLGA_MULTIPART;
    let cors = cors_layer(&state.settings.server.cors_origins);

    let api = Router::new()
        // Documentos
        .route("/api/documentos", post(documentos::enviar).get(documentos::listar))
        .route("/api/documentos/:id/download", get(documentos::download))
        .route("/api/documentos/:id", delete(documentos::remover))
        // Conciliação
        .route("/api/conciliacoes", post(conciliacao::criar).get(conciliacao::listar))
        .route("/api/conciliacoes/:id", get(conciliacao::obter))
        .route("/api/conciliacoes/:id/reprocessar", post(conciliacao::reprocessar))
        // Fechamento
        .route("/api/fechamentos", post(fechamento::solicitar).get(fechamento::listar))
        .route("/api/fechamentos/:id/planilha", get(fechamento::planilha))
        // Comunicados e enquetes
        .route("/api/comunicados", post(comunicados::publicar).get(comunicados::listar))
        .route("/api/comunicados/:id/lido", post(comunicados::marcar_lido))
        .route("/api/enquetes", post(enquetes::criar).get(enquetes::listar))
        .route("/api/enquetes/:id/votos", post(enquetes::votar))
        .route("/api/enquetes/:id/resultado", get(enquetes::resultado))
        // Realtime
        .route("/api/notificacoes/stream", get(notificacoes::stream))
        // Usuários (sessão de admin)
        .route("/api/admin/usuarios", post(admin::criar_usuario))
        .route("/api/admin/usuarios/:id/senha", post(admin::redefinir_senha))
        .route("/api/admin/recuperacao", post(admin::gerar_recuperacao))
        // Consultas
        .route("/api/cnpj/:cnpj", get(cnpj::consultar));

    let publicas = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/status", get(status_check))
        .route("/api/calculadoras/inss", post(calculadoras::inss))
        .route("/api/calculadoras/irpf", post(calculadoras::irpf))
        .route("/api/calculadoras/pro-labore", post(calculadoras::pro_labore))
        .route("/webhooks/n8n/status", post(receber_status));

    // ✅ Rotas de operação protegidas com API key
    let operacao = Router::new()
        .route("/admin/monitor/executar", post(admin::executar_monitor))
        .layer(middleware::from_fn(require_admin_key));

    Router::new()
        .merge(publicas)
        .merge(api)
        .merge(operacao)
        .layer(DefaultBodyLimit::max(limite_corpo))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Sem origens configuradas (ou com `*`), libera qualquer origem
fn cors_layer(origens: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origens.is_empty() || origens.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let origens: Vec<HeaderValue> = origens.iter().filter_map(|o| o.parse().ok()).collect();
    cors.allow_origin(origens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{token::emitir_token, Papel};
    use crate::config::Settings;
    use crate::handlers::n8n_webhook::{assinar, HEADER_ASSINATURA};
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use httpmock::prelude::*;
    use httpmock::Method::PATCH;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    const SEGREDO_JWT: &str = "segredo-de-teste";
    const SEGREDO_CALLBACK: &str = "callback-secret";

    fn app(supabase_url: &str, n8n_url: &str) -> Router {
        let settings = Settings::para_testes(supabase_url, n8n_url);
        let state = AppState::new(settings).expect("estado de teste");
        router(Arc::new(state))
    }

    async fn corpo_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("corpo da resposta");
        serde_json::from_slice(&bytes).expect("JSON válido")
    }

    fn conciliacao_json(id: Uuid, status: &str) -> Value {
        json!({
            "id": id,
            "empresa_id": Uuid::new_v4(),
            "competencia": "2025-03",
            "status": status,
            "documento_ids": [],
            "tentativas": 1,
            "iniciado_em": "2025-04-01T12:00:00Z",
            "alinhamento_disparado_em": null,
            "mensagem": null,
            "criado_por": Uuid::new_v4(),
            "criado_em": "2025-04-01T12:00:00Z",
            "atualizado_em": null
        })
    }

    #[tokio::test]
    async fn test_health() {
        let response = app("http://127.0.0.1:1", "http://127.0.0.1:1")
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let corpo = corpo_json(response).await;
        assert_eq!(corpo["status"], "healthy");
    }

    #[tokio::test]
    async fn test_calculadora_inss_publica() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/calculadoras/inss")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "salario": "3000.00" }).to_string()))
            .unwrap();

        let response = app("http://127.0.0.1:1", "http://127.0.0.1:1").oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let corpo = corpo_json(response).await;
        assert!(corpo.get("contribuicao").is_some());
    }

    #[tokio::test]
    async fn test_pro_labore_acima_do_teto() {
        let corpo = json!({ "valor": "79228162514264337593543950335", "regime": "lucro_presumido" });
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/calculadoras/pro-labore")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(corpo.to_string()))
            .unwrap();

        let response = app("http://127.0.0.1:1", "http://127.0.0.1:1").oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_api_sem_token() {
        let response = app("http://127.0.0.1:1", "http://127.0.0.1:1")
            .oneshot(Request::builder().uri("/api/documentos").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_callback_n8n_assinatura_invalida() {
        let corpo = json!({ "tipo": "conciliacao", "id": Uuid::new_v4(), "status": "alinhado" }).to_string();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/webhooks/n8n/status")
            .header(HEADER_ASSINATURA, "sha256=deadbeef")
            .body(Body::from(corpo))
            .unwrap();

        let response = app("http://127.0.0.1:1", "http://127.0.0.1:1").oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_callback_n8n_alinha_conciliacao() {
        let supabase = MockServer::start_async().await;
        let id = Uuid::new_v4();

        let leitura = supabase
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/conciliacoes")
                    .query_param("id", format!("eq.{}", id));
                then.status(200).json_body(json!([conciliacao_json(id, "processando")]));
            })
            .await;
        let escrita = supabase
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/rest/v1/conciliacoes")
                    .query_param("status", "eq.processando")
                    .json_body_partial(r#"{"status":"alinhado"}"#);
                then.status(200).json_body(json!([conciliacao_json(id, "alinhado")]));
            })
            .await;

        let corpo = json!({ "tipo": "conciliacao", "id": id, "status": "alinhado" }).to_string();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/webhooks/n8n/status")
            .header(HEADER_ASSINATURA, format!("sha256={}", assinar(SEGREDO_CALLBACK, corpo.as_bytes())))
            .body(Body::from(corpo))
            .unwrap();

        let response = app(&supabase.base_url(), "http://127.0.0.1:1").oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let corpo = corpo_json(response).await;
        assert_eq!(corpo["status"], "alinhado");
        leitura.assert_hits_async(1).await;
        escrita.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_download_de_outra_empresa() {
        let supabase = MockServer::start_async().await;
        let id = Uuid::new_v4();

        supabase
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/documentos");
                then.status(200).json_body(json!([{
                    "id": id,
                    "empresa_id": Uuid::new_v4(),
                    "competencia": "2025-03",
                    "categoria": "extrato_bancario",
                    "nome_original": "extrato.pdf",
                    "caminho": "x/2025-03/extrato.pdf",
                    "content_type": "application/pdf",
                    "tamanho_bytes": 10,
                    "enviado_por": Uuid::new_v4(),
                    "criado_em": "2025-04-01T12:00:00Z"
                }]));
            })
            .await;

        let token = emitir_token(SEGREDO_JWT, Uuid::new_v4(), Papel::Cliente, Some(Uuid::new_v4()));
        let request = Request::builder()
            .uri(format!("/api/documentos/{}/download", id))
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let response = app(&supabase.base_url(), "http://127.0.0.1:1").oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_fechamento_exige_admin() {
        let empresa = Uuid::new_v4();
        let token = emitir_token(SEGREDO_JWT, Uuid::new_v4(), Papel::Cliente, Some(empresa));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/fechamentos")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "empresa_id": empresa, "competencia": "2025-03" }).to_string()))
            .unwrap();

        let response = app("http://127.0.0.1:1", "http://127.0.0.1:1").oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_cors_com_origens() {
        // Só garante que origens inválidas são ignoradas sem pânico
        let _ = cors_layer(&["https://portal.wsgestao.com.br".to_string(), "não é url\n".to_string()]);
        let _ = cors_layer(&[]);
    }
}

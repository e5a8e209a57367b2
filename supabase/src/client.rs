//! Cliente HTTP para a plataforma

use crate::error::{Result, SupabaseError};
use reqwest::{Client as HttpClient, Method, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

/// Cliente autenticado com a chave `service_role`
///
/// Todas as requisições levam os headers `apikey` e `Authorization: Bearer`.
/// A chave ignora as políticas de RLS, então o controle de acesso por
/// empresa fica a cargo de quem chama.
#[derive(Clone)]
pub struct SupabaseClient {
    http_client: HttpClient,
    base_url: String,
    service_role_key: String,
}

impl SupabaseClient {
    /// Cria um novo cliente
    ///
    /// # Timeouts
    ///
    /// - Total: 30s
    /// - Connect: 5s
    pub fn new(base_url: impl Into<String>, service_role_key: impl Into<String>) -> Result<Self> {
        Self::with_timeouts(base_url, service_role_key, 30, 5)
    }

    /// Cria um novo cliente com timeouts customizados
    pub fn with_timeouts(
        base_url: impl Into<String>,
        service_role_key: impl Into<String>,
        total_timeout_secs: u64,
        connect_timeout_secs: u64,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(SupabaseError::ConfigError("URL da plataforma vazia".to_string()));
        }

        let service_role_key = service_role_key.into();
        if service_role_key.is_empty() {
            return Err(SupabaseError::ConfigError("service_role_key vazia".to_string()));
        }

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(total_timeout_secs))
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .build()
            .map_err(|e| SupabaseError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
            service_role_key,
        })
    }

    /// Monta uma requisição autenticada para `{base_url}{caminho}`
    pub(crate) fn request(&self, method: Method, caminho: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, caminho);

        tracing::debug!("{} {}", method, url);

        self.http_client
            .request(method, &url)
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }

    /// Envia a requisição e converte respostas não-2xx em erro
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        self.handle_response(response).await
    }

    async fn handle_response(&self, response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let status_code = status.as_u16();
        let error_body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

        tracing::error!("Supabase API error ({}): {}", status_code, error_body);

        Err(SupabaseError::ApiError {
            status: status_code,
            message: extrair_mensagem(&error_body),
        })
    }

    /// Verifica se a API REST responde (usado pelo readiness check)
    pub async fn test_connection(&self) -> Result<()> {
        self.send(self.request(Method::GET, "/rest/v1/")).await?;
        Ok(())
    }

    /// URL base sem barra final
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Extrai a mensagem dos formatos de erro de REST, Auth e Storage
fn extrair_mensagem(corpo: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(corpo) else {
        return corpo.to_string();
    };

    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|campo| json.get(*campo).and_then(|v| v.as_str()))
        .unwrap_or(corpo)
        .to_string()
}

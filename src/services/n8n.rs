//! Disparo dos webhooks de workflow do n8n

use reqwest::{Client as HttpClient, StatusCode};
use serde::Serialize;
use std::time::Duration;

use crate::config::settings::N8nSettings;
use crate::models::n8n::{DisparoAlinhamento, DisparoConciliacao, DisparoFechamento};
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};

const INITIAL_BACKOFF_MS: u64 = 200;

#[derive(Clone)]
pub struct N8nClient {
    http_client: HttpClient,
    base_url: String,
    webhook_conciliacao: String,
    webhook_alinhamento: String,
    webhook_fechamento: String,
    max_tentativas: u32,
}

impl N8nClient {
    pub fn new(settings: &N8nSettings) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to create n8n HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            webhook_conciliacao: settings.webhook_conciliacao.clone(),
            webhook_alinhamento: settings.webhook_alinhamento.clone(),
            webhook_fechamento: settings.webhook_fechamento.clone(),
            max_tentativas: settings.max_tentativas_envio.max(1),
        })
    }

    pub async fn disparar_conciliacao(&self, payload: &DisparoConciliacao) -> AppResult<()> {
        let referencia = payload.conciliacao_id.to_string();
        self.disparar(&self.webhook_conciliacao, &referencia, payload).await
    }

    pub async fn disparar_alinhamento(&self, payload: &DisparoAlinhamento) -> AppResult<()> {
        let referencia = payload.conciliacao_id.to_string();
        self.disparar(&self.webhook_alinhamento, &referencia, payload).await
    }

    pub async fn disparar_fechamento(&self, payload: &DisparoFechamento) -> AppResult<()> {
        let referencia = payload.fechamento_id.to_string();
        self.disparar(&self.webhook_fechamento, &referencia, payload).await
    }

    /// POST com retry e backoff exponencial
    ///
    /// Erros de transporte e respostas 5xx são retentados; 4xx falha direto.
    async fn disparar<T: Serialize>(&self, webhook: &str, referencia: &str, payload: &T) -> AppResult<()> {
        let url = format!("{}{}", self.base_url, webhook);
        log_n8n_dispatch(webhook, referencia);

        for attempt in 1..=self.max_tentativas {
            let erro = match self.http_client.post(&url).json(payload).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::info!("✅ Webhook n8n '{}' aceito ({})", webhook, referencia);
                    return Ok(());
                }
                Ok(response) => {
                    let status = response.status();
                    let corpo = response.text().await.unwrap_or_default();
                    let erro = format!("{} respondeu {}: {}", webhook, status, corpo);
                    if !deve_retentar(status) {
                        log_n8n_error(webhook, attempt, &erro);
                        return Err(AppError::N8n(erro));
                    }
                    erro
                }
                Err(e) => format!("falha ao chamar {}: {}", webhook, e),
            };

            log_n8n_error(webhook, attempt, &erro);

            if attempt < self.max_tentativas {
                let backoff_ms = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                tracing::warn!(
                    "⚠️ Tentativa {}/{} falhou. Retry em {}ms...",
                    attempt, self.max_tentativas, backoff_ms
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            } else {
                return Err(AppError::N8n(erro));
            }
        }

        Err(AppError::N8n(format!("{} não foi chamado", webhook)))
    }
}

fn deve_retentar(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

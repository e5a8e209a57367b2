//! Consulta pública de CNPJ (formato BrasilAPI)

use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::utils::{AppError, AppResult, Cnpj};

#[derive(Clone)]
pub struct CnpjClient {
    http_client: HttpClient,
    base_url: String,
}

/// Resposta como a API pública devolve (apenas os campos usados)
#[derive(Debug, Deserialize)]
struct RespostaCnpj {
    razao_social: String,
    #[serde(default)]
    nome_fantasia: Option<String>,
    #[serde(default)]
    descricao_situacao_cadastral: Option<String>,
    #[serde(default)]
    municipio: Option<String>,
    #[serde(default)]
    uf: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DadosEmpresa {
    pub cnpj: String,
    pub razao_social: String,
    pub nome_fantasia: Option<String>,
    pub situacao: Option<String>,
    pub municipio: Option<String>,
    pub uf: Option<String>,
}

impl CnpjClient {
    pub fn new(base_url: &str) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("ws-gestao-contabil/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to create CNPJ HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn consultar(&self, cnpj: &Cnpj) -> AppResult<DadosEmpresa> {
        let url = format!("{}/{}", self.base_url, cnpj.digitos());
        tracing::debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::CnpjApi(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(AppError::NotFound(format!("CNPJ {} não encontrado", cnpj)));
            }
            status => {
                let corpo = response.text().await.unwrap_or_default();
                return Err(AppError::CnpjApi(format!("{}: {}", status, corpo)));
            }
        }

        let dados: RespostaCnpj = response
            .json()
            .await
            .map_err(|e| AppError::CnpjApi(format!("resposta inválida: {}", e)))?;

        Ok(DadosEmpresa {
            cnpj: cnpj.formatado(),
            razao_social: dados.razao_social,
            nome_fantasia: dados.nome_fantasia.filter(|n| !n.trim().is_empty()),
            situacao: dados.descricao_situacao_cadastral,
            municipio: dados.municipio,
            uf: dados.uf,
        })
    }
}

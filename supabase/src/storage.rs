//! Storage API: objetos em buckets privados

use crate::client::SupabaseClient;
use crate::error::{Result, SupabaseError};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// URL assinada com validade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlAssinada {
    pub url: String,
    pub expira_em: chrono::DateTime<chrono::Utc>,
}

/// Codifica cada segmento do caminho mantendo as barras
fn codificar_caminho(caminho: &str) -> String {
    caminho
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl SupabaseClient {
    pub async fn upload(
        &self,
        bucket: &str,
        caminho: &str,
        conteudo: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<String> {
        let endpoint = format!("/storage/v1/object/{}/{}", bucket, codificar_caminho(caminho));
        let request = self
            .request(Method::POST, &endpoint)
            .header("Content-Type", content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(conteudo);

        self.send(request).await?;
        tracing::info!("Objeto enviado: {}/{}", bucket, caminho);
        Ok(format!("{}/{}", bucket, caminho))
    }

    pub async fn criar_url_assinada(
        &self,
        bucket: &str,
        caminho: &str,
        expira_em_segundos: u64,
    ) -> Result<UrlAssinada> {
        #[derive(Deserialize)]
        struct Resposta {
            #[serde(rename = "signedURL")]
            signed_url: String,
        }

        let endpoint = format!("/storage/v1/object/sign/{}/{}", bucket, codificar_caminho(caminho));
        let request = self
            .request(Method::POST, &endpoint)
            .json(&json!({ "expiresIn": expira_em_segundos }));

        let resposta: Resposta = self.send(request).await?.json().await?;

        if resposta.signed_url.is_empty() {
            return Err(SupabaseError::NotFound(format!("{}/{}", bucket, caminho)));
        }

        // signedURL vem relativo a /storage/v1
        let url = if resposta.signed_url.starts_with("http") {
            resposta.signed_url
        } else {
            format!("{}/storage/v1{}", self.base_url(), resposta.signed_url)
        };

        Ok(UrlAssinada {
            url,
            expira_em: chrono::Utc::now() + chrono::Duration::seconds(expira_em_segundos as i64),
        })
    }

    pub async fn remover(&self, bucket: &str, caminhos: &[String]) -> Result<()> {
        if caminhos.is_empty() {
            return Ok(());
        }

        let request = self
            .request(Method::DELETE, &format!("/storage/v1/object/{}", bucket))
            .json(&json!({ "prefixes": caminhos }));

        self.send(request).await?;
        Ok(())
    }
}

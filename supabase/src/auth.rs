//! Auth admin API (GoTrue)
//!
//! Operações privilegiadas que o navegador não pode fazer com a chave anônima.

use crate::client::SupabaseClient;
use crate::error::{Result, SupabaseError};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Dados para criação de usuário
#[derive(Debug, Clone, Serialize)]
pub struct NovoUsuario {
    pub email: String,
    #[serde(rename = "password")]
    pub senha: String,
    #[serde(rename = "email_confirm")]
    pub email_confirmado: bool,
    /// Metadados editáveis pelo próprio usuário (nome, telefone)
    #[serde(rename = "user_metadata")]
    pub metadados: Value,
    /// Metadados controlados pelo servidor (papel, empresa)
    pub app_metadata: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsuarioAuth {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: Value,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRecuperacao {
    pub email: String,
    pub action_link: String,
}

const SENHA_MIN_CARACTERES: usize = 8;

/// Conta caracteres, não bytes: "ação1234" tem 8
fn exigir_senha_minima(senha: &str) -> Result<()> {
    if senha.chars().count() < SENHA_MIN_CARACTERES {
        return Err(SupabaseError::ValidationError(format!(
            "senha deve ter ao menos {} caracteres",
            SENHA_MIN_CARACTERES
        )));
    }
    Ok(())
}

impl SupabaseClient {
    pub async fn criar_usuario(&self, usuario: &NovoUsuario) -> Result<UsuarioAuth> {
        exigir_senha_minima(&usuario.senha)?;

        let request = self
            .request(Method::POST, "/auth/v1/admin/users")
            .json(usuario);

        let criado: UsuarioAuth = self.send(request).await?.json().await?;
        tracing::info!("Usuário criado na plataforma: {}", criado.id);
        Ok(criado)
    }

    pub async fn atualizar_senha(&self, user_id: &str, senha: &str) -> Result<UsuarioAuth> {
        exigir_senha_minima(senha)?;

        let caminho = format!("/auth/v1/admin/users/{}", urlencoding::encode(user_id));
        let request = self
            .request(Method::PUT, &caminho)
            .json(&json!({ "password": senha }));

        let usuario = self.send(request).await?.json().await?;
        Ok(usuario)
    }

    /// Remove o usuário de autenticação (desfaz um cadastro incompleto)
    pub async fn excluir_usuario(&self, user_id: &str) -> Result<()> {
        let caminho = format!("/auth/v1/admin/users/{}", urlencoding::encode(user_id));
        self.send(self.request(Method::DELETE, &caminho)).await?;
        tracing::info!("Usuário removido da plataforma: {}", user_id);
        Ok(())
    }

    /// Gera link de recuperação de senha sem enviar e-mail
    pub async fn gerar_link_recuperacao(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<LinkRecuperacao> {
        let mut corpo = json!({ "type": "recovery", "email": email });
        if let Some(redirect) = redirect_to {
            corpo["redirect_to"] = json!(redirect);
        }

        let request = self
            .request(Method::POST, "/auth/v1/admin/generate_link")
            .json(&corpo);

        let resposta: Value = self.send(request).await?.json().await?;

        // Versões recentes aninham o link em `properties`
        let action_link = resposta
            .get("action_link")
            .or_else(|| resposta.pointer("/properties/action_link"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                SupabaseError::ValidationError("resposta sem action_link".to_string())
            })?;

        Ok(LinkRecuperacao {
            email: email.to_string(),
            action_link: action_link.to_string(),
        })
    }
}

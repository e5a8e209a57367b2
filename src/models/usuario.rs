use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Papel;

pub const SENHA_MIN_CARACTERES: usize = 8;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("regex de e-mail válida")
});

/// Linha da tabela `perfis` (1:1 com o usuário de autenticação)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerfilUsuario {
    pub id: Uuid,
    pub nome: String,
    pub email: String,
    pub papel: Papel,
    pub empresa_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criado_em: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NovoUsuarioRequest {
    pub nome: String,
    pub email: String,
    pub senha: String,
    pub papel: Papel,
    #[serde(default)]
    pub empresa_id: Option<Uuid>,
}

impl NovoUsuarioRequest {
    pub fn validar(&self) -> Result<(), String> {
        if self.nome.trim().is_empty() {
            return Err("nome é obrigatório".to_string());
        }
        validar_email(&self.email)?;
        validar_senha(&self.senha)?;
        if self.papel == Papel::Cliente && self.empresa_id.is_none() {
            return Err("usuário cliente precisa de empresa_id".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NovaSenhaRequest {
    pub senha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecuperacaoRequest {
    pub email: String,
    #[serde(default)]
    pub redirect_to: Option<String>,
}

pub fn validar_email(email: &str) -> Result<(), String> {
    if EMAIL_REGEX.is_match(email.trim()) {
        Ok(())
    } else {
        Err(format!("e-mail inválido: '{}'", email))
    }
}

pub fn validar_senha(senha: &str) -> Result<(), String> {
    if senha.chars().count() < SENHA_MIN_CARACTERES {
        return Err(format!(
            "senha deve ter ao menos {} caracteres",
            SENHA_MIN_CARACTERES
        ));
    }
    Ok(())
}

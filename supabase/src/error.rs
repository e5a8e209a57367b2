//! Tipos de erro para o crate supabase

use thiserror::Error;

/// Erros do cliente da plataforma
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// Erro de requisição HTTP
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Resposta não-2xx da plataforma
    #[error("Supabase API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Erro de parsing JSON
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Nenhuma linha/objeto encontrado
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Erro de configuração
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Erro de validação
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl SupabaseError {
    pub fn status(&self) -> Option<u16> {
        match self {
            SupabaseError::ApiError { status, .. } => Some(*status),
            SupabaseError::NotFound(_) => Some(404),
            _ => None,
        }
    }

    /// Violação de unicidade (PostgREST responde 409)
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Tipo Result padrão para o crate
pub type Result<T> = std::result::Result<T, SupabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_helpers() {
        let conflito = SupabaseError::ApiError { status: 409, message: "duplicate key".into() };
        assert!(conflito.is_conflict());
        assert!(!conflito.is_not_found());

        let ausente = SupabaseError::NotFound("documentos".into());
        assert!(ausente.is_not_found());
        assert_eq!(SupabaseError::ConfigError("x".into()).status(), None);
    }
}

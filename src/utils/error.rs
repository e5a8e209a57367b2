use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Supabase error: {0}")]
    Supabase(#[from] supabase::SupabaseError),
    #[error("n8n error: {0}")]
    N8n(String),
    #[error("CNPJ API error: {0}")]
    CnpjApi(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<calculadoras::CalculoError> for AppError {
    fn from(err: calculadoras::CalculoError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Supabase(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            AppError::Supabase(err) if err.is_conflict() => StatusCode::CONFLICT,
            AppError::Supabase(supabase::SupabaseError::ValidationError(_)) => StatusCode::BAD_REQUEST,
            AppError::Supabase(_) => StatusCode::BAD_GATEWAY,
            AppError::N8n(_) => StatusCode::BAD_GATEWAY,
            AppError::CnpjApi(_) => StatusCode::BAD_GATEWAY,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::JsonError(_) => StatusCode::BAD_REQUEST,
            AppError::HttpError(_) => StatusCode::BAD_GATEWAY,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = json!({
            "error": self.to_string(),
            "status": status.as_u16()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Supabase(supabase::SupabaseError::NotFound("documentos".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Supabase(supabase::SupabaseError::ApiError { status: 500, message: "x".into() })
                .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(AppError::N8n("timeout".into()).status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_calculo_error_vira_validacao() {
        let err: AppError = calculadoras::CalculoError::TabelaInvalida("x".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}

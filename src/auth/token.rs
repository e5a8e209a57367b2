//! Validação dos JWT de sessão emitidos pela plataforma

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Papel, Sessao};
use crate::utils::{AppError, AppResult};

/// Audiência dos tokens de usuários logados
const AUDIENCIA: &str = "authenticated";

/// Metadados controlados pelo servidor (gravados na criação do usuário)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppMetadata {
    #[serde(default)]
    pub papel: Option<Papel>,
    #[serde(default)]
    pub empresa_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    pub aud: String,
    pub exp: usize,
    #[serde(default)]
    pub app_metadata: AppMetadata,
}

#[derive(Clone)]
pub struct ValidadorSessao {
    chave: DecodingKey,
    validation: Validation,
}

impl ValidadorSessao {
    pub fn new(jwt_secret: &str) -> AppResult<Self> {
        if jwt_secret.is_empty() {
            return Err(AppError::ConfigError("supabase.jwt_secret não configurado".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUDIENCIA]);

        Ok(Self {
            chave: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation,
        })
    }

    pub fn validar(&self, token: &str) -> AppResult<Sessao> {
        let dados = decode::<Claims>(token, &self.chave, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Unauthorized("sessão expirada".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                    AppError::Unauthorized("token sem audiência de usuário".to_string())
                }
                _ => AppError::Unauthorized(format!("token inválido: {}", e)),
            }
        })?;

        let claims = dados.claims;

        // Sem papel explícito o usuário é tratado como cliente
        let papel = claims.app_metadata.papel.unwrap_or(Papel::Cliente);

        if papel == Papel::Cliente && claims.app_metadata.empresa_id.is_none() {
            return Err(AppError::Forbidden(
                "usuário cliente sem empresa vinculada".to_string(),
            ));
        }

        Ok(Sessao {
            usuario_id: claims.sub,
            email: claims.email.unwrap_or_default(),
            papel,
            empresa_id: claims.app_metadata.empresa_id,
        })
    }
}

/// Emite um token de sessão assinado (usado pelos testes de handlers)
#[cfg(test)]
pub fn emitir_token(secret: &str, usuario_id: Uuid, papel: Papel, empresa_id: Option<Uuid>) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = Claims {
        sub: usuario_id,
        email: Some(format!("{}@teste.com.br", usuario_id.simple())),
        aud: AUDIENCIA.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        app_metadata: AppMetadata {
            papel: Some(papel),
            empresa_id,
        },
    };

    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("assinatura HS256")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEGREDO: &str = "segredo-de-teste";

    #[test]
    fn test_token_valido_de_cliente() {
        let usuario = Uuid::new_v4();
        let empresa = Uuid::new_v4();
        let token = emitir_token(SEGREDO, usuario, Papel::Cliente, Some(empresa));

        let sessao = ValidadorSessao::new(SEGREDO).unwrap().validar(&token).unwrap();
        assert_eq!(sessao.usuario_id, usuario);
        assert_eq!(sessao.papel, Papel::Cliente);
        assert_eq!(sessao.empresa_id, Some(empresa));
    }

    #[test]
    fn test_segredo_errado() {
        let token = emitir_token("outro-segredo", Uuid::new_v4(), Papel::Admin, None);
        let erro = ValidadorSessao::new(SEGREDO).unwrap().validar(&token).unwrap_err();
        assert!(matches!(erro, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_cliente_sem_empresa() {
        let token = emitir_token(SEGREDO, Uuid::new_v4(), Papel::Cliente, None);
        let erro = ValidadorSessao::new(SEGREDO).unwrap().validar(&token).unwrap_err();
        assert!(matches!(erro, AppError::Forbidden(_)));
    }

    #[test]
    fn test_segredo_vazio() {
        assert!(matches!(ValidadorSessao::new(""), Err(AppError::ConfigError(_))));
    }
}

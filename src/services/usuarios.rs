//! Operações administrativas de usuários (auth admin API)

use serde_json::json;
use supabase::{LinkRecuperacao, NovoUsuario};
use uuid::Uuid;

use crate::auth::Sessao;
use crate::models::usuario::{validar_email, validar_senha, RecuperacaoRequest};
use crate::models::{NovoUsuarioRequest, PerfilUsuario};
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;

pub const TABELA_PERFIS: &str = "perfis";

/// Cria o usuário de autenticação com papel/empresa e o perfil correspondente
pub async fn criar_usuario(
    state: &AppState,
    sessao: &Sessao,
    req: NovoUsuarioRequest,
) -> AppResult<PerfilUsuario> {
    sessao.exigir_admin()?;
    req.validar().map_err(AppError::ValidationError)?;

    let email = req.email.trim().to_lowercase();
    let novo = NovoUsuario {
        email: email.clone(),
        senha: req.senha.clone(),
        email_confirmado: true,
        metadados: json!({ "nome": req.nome.trim() }),
        app_metadata: json!({ "papel": req.papel, "empresa_id": req.empresa_id }),
    };

    let criado = state.supabase.criar_usuario(&novo).await?;
    let id = Uuid::parse_str(&criado.id)
        .map_err(|e| AppError::InternalError(format!("id de usuário inválido '{}': {}", criado.id, e)))?;

    let perfil = PerfilUsuario {
        id,
        nome: req.nome.trim().to_string(),
        email,
        papel: req.papel,
        empresa_id: req.empresa_id,
        criado_em: None,
    };
    let perfil: PerfilUsuario = match state.supabase.insert(TABELA_PERFIS, &perfil).await {
        Ok(perfil) => perfil,
        Err(e) => {
            // Sem perfil o usuário não consegue usar o portal; não deixa login órfão
            if let Err(erro_limpeza) = state.supabase.excluir_usuario(&criado.id).await {
                log_error(&format!(
                    "❌ Usuário {} ficou sem perfil e não pôde ser removido: {}",
                    criado.id, erro_limpeza
                ));
            }
            return Err(e.into());
        }
    };

    log_info(&format!(
        "👤 Usuário {} criado por {} ({:?})",
        perfil.id, sessao.usuario_id, perfil.papel
    ));
    Ok(perfil)
}

pub async fn redefinir_senha(state: &AppState, sessao: &Sessao, usuario_id: Uuid, senha: &str) -> AppResult<()> {
    sessao.exigir_admin()?;
    validar_senha(senha).map_err(AppError::ValidationError)?;

    state
        .supabase
        .atualizar_senha(&usuario_id.to_string(), senha)
        .await?;

    log_info(&format!("🔑 Senha do usuário {} redefinida por {}", usuario_id, sessao.usuario_id));
    Ok(())
}

pub async fn gerar_recuperacao(
    state: &AppState,
    sessao: &Sessao,
    req: RecuperacaoRequest,
) -> AppResult<LinkRecuperacao> {
    sessao.exigir_admin()?;
    validar_email(&req.email).map_err(AppError::ValidationError)?;

    let link = state
        .supabase
        .gerar_link_recuperacao(req.email.trim(), req.redirect_to.as_deref())
        .await?;

    log_info(&format!("🔗 Link de recuperação gerado para {}", link.email));
    Ok(link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Papel;
    use crate::services::testes::{estado, sessao_admin, sessao_cliente};
    use httpmock::prelude::*;
    use httpmock::Method::DELETE;

    fn pedido(empresa_id: Uuid) -> NovoUsuarioRequest {
        serde_json::from_value(json!({
            "nome": "Maria Cliente",
            "email": "Maria@Empresa.com.br",
            "senha": "senha-forte",
            "papel": "cliente",
            "empresa_id": empresa_id
        }))
        .expect("pedido de teste")
    }

    #[tokio::test]
    async fn test_criar_usuario_com_perfil() {
        let supabase = MockServer::start_async().await;
        let (id, empresa) = (Uuid::new_v4(), Uuid::new_v4());

        supabase
            .mock_async(|when, then| {
                when.method(POST).path("/auth/v1/admin/users");
                then.status(200).json_body(json!({ "id": id, "email": "maria@empresa.com.br" }));
            })
            .await;
        let perfil = supabase
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/perfis")
                    .json_body_partial(r#"{"email":"maria@empresa.com.br","papel":"cliente"}"#);
                then.status(201).json_body(json!([{
                    "id": id,
                    "nome": "Maria Cliente",
                    "email": "maria@empresa.com.br",
                    "papel": "cliente",
                    "empresa_id": empresa,
                    "criado_em": "2025-04-01T12:00:00Z"
                }]));
            })
            .await;

        let state = estado(&supabase.base_url(), "http://127.0.0.1:1");
        let criado = criar_usuario(&state, &sessao_admin(), pedido(empresa)).await.expect("usuário");

        assert_eq!(criado.id, id);
        assert_eq!(criado.papel, Papel::Cliente);
        perfil.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_falha_no_perfil_remove_usuario_de_autenticacao() {
        let supabase = MockServer::start_async().await;
        let id = Uuid::new_v4();

        supabase
            .mock_async(|when, then| {
                when.method(POST).path("/auth/v1/admin/users");
                then.status(200).json_body(json!({ "id": id, "email": "maria@empresa.com.br" }));
            })
            .await;
        supabase
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/perfis");
                then.status(500).body("falha interna");
            })
            .await;
        let exclusao = supabase
            .mock_async(|when, then| {
                when.method(DELETE).path(format!("/auth/v1/admin/users/{}", id));
                then.status(200).json_body(json!({}));
            })
            .await;

        let state = estado(&supabase.base_url(), "http://127.0.0.1:1");
        let resultado = criar_usuario(&state, &sessao_admin(), pedido(Uuid::new_v4())).await;

        assert!(resultado.is_err());
        exclusao.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_cliente_nao_cria_usuario() {
        let empresa = Uuid::new_v4();
        let state = estado("http://127.0.0.1:1", "http://127.0.0.1:1");
        let resultado = criar_usuario(&state, &sessao_cliente(empresa), pedido(empresa)).await;

        assert!(matches!(resultado, Err(AppError::Forbidden(_))));
    }
}

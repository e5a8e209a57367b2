use chrono::Utc;
use serde_json::json;
use supabase::{Consulta, Ordem};
use uuid::Uuid;

use super::nao_encontrado;
use crate::auth::Sessao;
use crate::models::enquete::{apurar, NovaEnquete, NovaEnqueteRequest, VotoRequest};
use crate::models::{Enquete, Notificacao, ResultadoEnquete, TipoNotificacao, Voto};
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;

pub const TABELA: &str = "enquetes";
pub const TABELA_VOTOS: &str = "enquete_votos";

pub async fn criar(state: &AppState, sessao: &Sessao, req: NovaEnqueteRequest) -> AppResult<Enquete> {
    sessao.exigir_admin()?;
    let opcoes = req.validar().map_err(AppError::ValidationError)?;

    if matches!(req.encerra_em, Some(encerra) if encerra <= Utc::now()) {
        return Err(AppError::ValidationError("encerra_em deve estar no futuro".to_string()));
    }

    let nova = NovaEnquete {
        pergunta: req.pergunta.trim().to_string(),
        opcoes,
        empresa_id: req.empresa_id,
        encerra_em: req.encerra_em,
        permite_alterar_voto: req.permite_alterar_voto,
        criado_por: sessao.usuario_id,
    };
    let enquete: Enquete = state.supabase.insert(TABELA, &nova).await?;

    log_info(&format!("🗳️ Enquete {} criada com {} opções", enquete.id, enquete.opcoes.len()));

    state.notificacoes.publicar(Notificacao::new(
        enquete.empresa_id,
        TipoNotificacao::EnquetePublicada,
        enquete.pergunta.clone(),
        json!({ "enquete_id": enquete.id }),
    ));
    Ok(enquete)
}

pub async fn listar(state: &AppState, sessao: &Sessao) -> AppResult<Vec<Enquete>> {
    let mut consulta = Consulta::tabela(TABELA).order("criado_em", Ordem::Desc);
    if !sessao.is_admin() {
        if let Some(empresa_id) = sessao.empresa_id {
            consulta = consulta.or(format!("empresa_id.is.null,empresa_id.eq.{}", empresa_id));
        }
    }
    Ok(state.supabase.select(&consulta).await?)
}

/// Enquete visível para a sessão; de outra empresa responde 404
async fn buscar_visivel(state: &AppState, sessao: &Sessao, id: Uuid) -> AppResult<Enquete> {
    let enquete: Enquete = state
        .supabase
        .select_one(&Consulta::tabela(TABELA).eq("id", id))
        .await
        .map_err(nao_encontrado(format!("enquete {}", id)))?;

    if !enquete.visivel_para(sessao.empresa_id, sessao.is_admin()) {
        return Err(AppError::NotFound(format!("enquete {}", id)));
    }
    Ok(enquete)
}

pub async fn votar(state: &AppState, sessao: &Sessao, id: Uuid, req: VotoRequest) -> AppResult<Voto> {
    let enquete = buscar_visivel(state, sessao, id).await?;

    if enquete.encerrada(Utc::now()) {
        return Err(AppError::Conflict("enquete encerrada".to_string()));
    }
    if !enquete.tem_opcao(req.opcao_id) {
        return Err(AppError::ValidationError(format!(
            "opção {} não pertence à enquete",
            req.opcao_id
        )));
    }

    let do_usuario = Consulta::tabela(TABELA_VOTOS)
        .eq("enquete_id", id)
        .eq("usuario_id", sessao.usuario_id);
    let anteriores: Vec<Voto> = state.supabase.select(&do_usuario).await?;

    let voto = match anteriores.into_iter().next() {
        None => {
            let novo = Voto {
                enquete_id: id,
                usuario_id: sessao.usuario_id,
                opcao_id: req.opcao_id,
            };
            state.supabase.insert::<_, Voto>(TABELA_VOTOS, &novo).await?
        }
        Some(anterior) if anterior.opcao_id == req.opcao_id => anterior,
        Some(_) if !enquete.permite_alterar_voto => {
            return Err(AppError::Conflict("voto já registrado nesta enquete".to_string()));
        }
        Some(_) => {
            let linhas: Vec<Voto> = state
                .supabase
                .update(&do_usuario, &json!({ "opcao_id": req.opcao_id }))
                .await?;
            linhas
                .into_iter()
                .next()
                .ok_or_else(|| AppError::Conflict("voto removido durante a alteração".to_string()))?
        }
    };

    tracing::debug!("Voto de {} na enquete {}", sessao.usuario_id, id);
    Ok(voto)
}

pub async fn resultado(state: &AppState, sessao: &Sessao, id: Uuid) -> AppResult<ResultadoEnquete> {
    let enquete = buscar_visivel(state, sessao, id).await?;
    let votos: Vec<Voto> = state
        .supabase
        .select(&Consulta::tabela(TABELA_VOTOS).eq("enquete_id", id))
        .await?;
    Ok(apurar(&enquete, &votos, Utc::now()))
}

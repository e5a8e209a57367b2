use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use supabase::{Consulta, Ordem};
use uuid::Uuid;

use super::nao_encontrado;
use crate::auth::Sessao;
use crate::models::comunicado::{ordenar_para_exibicao, LeituraComunicado};
use crate::models::{Comunicado, NovoComunicado, Notificacao, TipoNotificacao};
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;

pub const TABELA: &str = "comunicados";
pub const TABELA_LEITURAS: &str = "comunicados_leituras";

#[derive(Serialize)]
struct LinhaComunicado<'a> {
    #[serde(flatten)]
    novo: &'a NovoComunicado,
    criado_por: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComunicadoVisao {
    #[serde(flatten)]
    pub comunicado: Comunicado,
    pub lido: bool,
}

pub async fn publicar(state: &AppState, sessao: &Sessao, novo: NovoComunicado) -> AppResult<Comunicado> {
    sessao.exigir_admin()?;
    novo.validar(Utc::now()).map_err(AppError::ValidationError)?;

    let linha = LinhaComunicado {
        novo: &novo,
        criado_por: sessao.usuario_id,
    };
    let comunicado: Comunicado = state.supabase.insert(TABELA, &linha).await?;

    log_info(&format!(
        "📢 Comunicado {} publicado ({:?}, empresa {:?})",
        comunicado.id, comunicado.prioridade, comunicado.empresa_id
    ));

    state.notificacoes.publicar(Notificacao::new(
        comunicado.empresa_id,
        TipoNotificacao::ComunicadoPublicado,
        comunicado.titulo.clone(),
        json!({ "comunicado_id": comunicado.id, "prioridade": comunicado.prioridade }),
    ));
    Ok(comunicado)
}

/// Comunicados vigentes visíveis para a sessão, com marcação de leitura
pub async fn listar(state: &AppState, sessao: &Sessao) -> AppResult<Vec<ComunicadoVisao>> {
    let mut consulta = Consulta::tabela(TABELA).order("criado_em", Ordem::Desc);
    if !sessao.is_admin() {
        let filtro = match sessao.empresa_id {
            Some(empresa_id) => format!("empresa_id.is.null,empresa_id.eq.{}", empresa_id),
            None => "empresa_id.is.null".to_string(),
        };
        consulta = consulta.or(filtro);
    }

    let agora = Utc::now();
    let mut comunicados: Vec<Comunicado> = state.supabase.select(&consulta).await?;
    comunicados.retain(|c| !c.expirado(agora) && c.visivel_para(sessao.empresa_id, sessao.is_admin()));
    ordenar_para_exibicao(&mut comunicados);

    let lidos = ids_lidos(state, sessao.usuario_id, &comunicados).await?;

    Ok(comunicados
        .into_iter()
        .map(|comunicado| ComunicadoVisao {
            lido: lidos.contains(&comunicado.id),
            comunicado,
        })
        .collect())
}

async fn ids_lidos(state: &AppState, usuario_id: Uuid, comunicados: &[Comunicado]) -> AppResult<HashSet<Uuid>> {
    if comunicados.is_empty() {
        return Ok(HashSet::new());
    }

    let consulta = Consulta::tabela(TABELA_LEITURAS)
        .select("comunicado_id,usuario_id")
        .eq("usuario_id", usuario_id)
        .in_("comunicado_id", comunicados.iter().map(|c| c.id));
    let leituras: Vec<LeituraComunicado> = state.supabase.select(&consulta).await?;
    Ok(leituras.into_iter().map(|l| l.comunicado_id).collect())
}

/// Registra a leitura; repetir a chamada não duplica
pub async fn marcar_lido(state: &AppState, sessao: &Sessao, id: Uuid) -> AppResult<()> {
    let comunicado: Comunicado = state
        .supabase
        .select_one(&Consulta::tabela(TABELA).eq("id", id))
        .await
        .map_err(nao_encontrado(format!("comunicado {}", id)))?;

    if !comunicado.visivel_para(sessao.empresa_id, sessao.is_admin()) {
        return Err(AppError::NotFound(format!("comunicado {}", id)));
    }

    let leitura = LeituraComunicado {
        comunicado_id: id,
        usuario_id: sessao.usuario_id,
    };
    state
        .supabase
        .insert_ignorando_duplicados(TABELA_LEITURAS, &leitura, "comunicado_id,usuario_id")
        .await?;
    Ok(())
}

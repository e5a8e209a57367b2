use chrono::Utc;
use serde_json::{json, Map, Value};
use supabase::{Consulta, Ordem, UrlAssinada};
use uuid::Uuid;

use super::conciliacao::{callback_url, listar_por_competencia};
use super::nao_encontrado;
use crate::auth::Sessao;
use crate::models::n8n::DisparoFechamento;
use crate::models::{
    CriarFechamentoRequest, Fechamento, NovoFechamento, Notificacao, StatusConciliacao,
    StatusFechamento, TipoNotificacao,
};
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;

pub const TABELA: &str = "fechamentos";

pub async fn buscar_fechamento(state: &AppState, id: Uuid) -> AppResult<Fechamento> {
    let fechamento = state
        .supabase
        .select_one(&Consulta::tabela(TABELA).eq("id", id))
        .await
        .map_err(nao_encontrado(format!("fechamento {}", id)))?;
    Ok(fechamento)
}

/// Abre (ou reaproveita) o fechamento da competência e dispara o n8n
///
/// Exige ao menos uma conciliação e todas `alinhado`. Um fechamento
/// anterior em `aberto` ou `erro` é reaproveitado. A linha passa para
/// `em_processamento` antes do envio; se o n8n recusar, vai para `erro`
/// e pode ser pedida de novo.
pub async fn solicitar_fechamento(
    state: &AppState,
    sessao: &Sessao,
    req: CriarFechamentoRequest,
) -> AppResult<Fechamento> {
    sessao.exigir_admin()?;

    let conciliacoes = listar_por_competencia(state, req.empresa_id, &req.competencia).await?;
    if conciliacoes.is_empty() {
        return Err(AppError::Conflict(format!(
            "nenhuma conciliação para {} nesta empresa",
            req.competencia
        )));
    }
    if let Some(pendente) = conciliacoes
        .iter()
        .find(|c| c.status != StatusConciliacao::Alinhado)
    {
        return Err(AppError::Conflict(format!(
            "conciliação {} ainda está em {}",
            pendente.id, pendente.status
        )));
    }

    let existentes: Vec<Fechamento> = state
        .supabase
        .select(
            &Consulta::tabela(TABELA)
                .eq("empresa_id", req.empresa_id)
                .eq("competencia", req.competencia.chave()),
        )
        .await?;

    if let Some(bloqueio) = existentes.iter().find(|f| f.status.bloqueia_novo_pedido()) {
        return Err(AppError::Conflict(format!(
            "fechamento {} já está {}",
            bloqueio.id, bloqueio.status
        )));
    }

    let fechamento = match existentes.into_iter().next() {
        Some(anterior) => anterior,
        None => {
            let novo = NovoFechamento {
                empresa_id: req.empresa_id,
                competencia: req.competencia,
                status: StatusFechamento::Aberto,
                solicitado_por: sessao.usuario_id,
            };
            state.supabase.insert(TABELA, &novo).await?
        }
    };

    let mut alteracoes = Map::new();
    alteracoes.insert("mensagem".to_string(), Value::Null);
    let reservado =
        transicionar(state, &fechamento, StatusFechamento::EmProcessamento, alteracoes).await?;

    let disparo = DisparoFechamento {
        fechamento_id: reservado.id,
        empresa_id: reservado.empresa_id,
        competencia: reservado.competencia,
        conciliacao_ids: conciliacoes.iter().map(|c| c.id).collect(),
        bucket: state.settings.supabase.bucket_fechamentos.clone(),
        callback_url: callback_url(state),
    };

    if let Err(e) = state.n8n.disparar_fechamento(&disparo).await {
        let mut alteracoes = Map::new();
        alteracoes.insert("mensagem".to_string(), json!(format!("envio ao n8n falhou: {}", e)));
        if let Err(erro_desfazer) =
            transicionar(state, &reservado, StatusFechamento::Erro, alteracoes).await
        {
            log_error(&format!(
                "❌ Fechamento {} ficou em em_processamento sem envio ao n8n: {}",
                reservado.id, erro_desfazer
            ));
        }
        return Err(e);
    }

    Ok(reservado)
}

pub async fn listar_fechamentos(
    state: &AppState,
    sessao: &Sessao,
    empresa_id: Option<Uuid>,
) -> AppResult<Vec<Fechamento>> {
    let mut consulta = Consulta::tabela(TABELA).order("competencia", Ordem::Desc);
    if let Some(empresa_id) = sessao.empresa_da_consulta(empresa_id)? {
        consulta = consulta.eq("empresa_id", empresa_id);
    }
    Ok(state.supabase.select(&consulta).await?)
}

pub async fn url_planilha(state: &AppState, sessao: &Sessao, id: Uuid) -> AppResult<UrlAssinada> {
    let fechamento = buscar_fechamento(state, id).await?;
    sessao.exigir_acesso(fechamento.empresa_id)?;

    let caminho = match (fechamento.status, fechamento.planilha_caminho.as_deref()) {
        (StatusFechamento::Concluido, Some(caminho)) => caminho,
        _ => {
            return Err(AppError::Conflict(format!(
                "planilha indisponível: fechamento está {}",
                fechamento.status
            )))
        }
    };

    let url = state
        .supabase
        .criar_url_assinada(
            &state.settings.supabase.bucket_fechamentos,
            caminho,
            state.settings.supabase.signed_url_ttl_secs,
        )
        .await?;
    Ok(url)
}

/// Status escrito pelo n8n; `concluido` precisa do caminho da planilha
pub async fn aplicar_status_n8n(
    state: &AppState,
    id: Uuid,
    status: &str,
    mensagem: Option<String>,
    planilha_caminho: Option<String>,
) -> AppResult<Fechamento> {
    let para: StatusFechamento = serde_json::from_value(json!(status))
        .map_err(|_| AppError::ValidationError(format!("status de fechamento desconhecido: {}", status)))?;

    let fechamento = buscar_fechamento(state, id).await?;
    if fechamento.status == para {
        tracing::debug!("Fechamento {} já está em {}", id, para);
        return Ok(fechamento);
    }

    let mut alteracoes = Map::new();
    alteracoes.insert("mensagem".to_string(), json!(mensagem));

    if para == StatusFechamento::Concluido {
        let caminho = planilha_caminho
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::ValidationError("concluido exige planilha_caminho".to_string()))?;
        alteracoes.insert("planilha_caminho".to_string(), json!(caminho));
        alteracoes.insert("concluido_em".to_string(), json!(Utc::now()));
    }

    transicionar(state, &fechamento, para, alteracoes).await
}

async fn transicionar(
    state: &AppState,
    atual: &Fechamento,
    para: StatusFechamento,
    mut alteracoes: Map<String, Value>,
) -> AppResult<Fechamento> {
    atual.status.validar_transicao(para).map_err(AppError::Conflict)?;
    alteracoes.insert("status".to_string(), json!(para));

    let consulta = Consulta::tabela(TABELA)
        .eq("id", atual.id)
        .eq("status", atual.status.as_str());
    let linhas: Vec<Fechamento> = state.supabase.update(&consulta, &alteracoes).await?;

    let atualizado = linhas.into_iter().next().ok_or_else(|| {
        AppError::Conflict(format!("fechamento {} mudou de status durante a operação", atual.id))
    })?;

    log_status_transition("fechamento", &atual.id.to_string(), atual.status.as_str(), para.as_str());

    state.notificacoes.publicar(Notificacao::new(
        Some(atualizado.empresa_id),
        TipoNotificacao::FechamentoAtualizado,
        format!("Fechamento {}: {}", atualizado.competencia, atualizado.status),
        json!({
            "fechamento_id": atualizado.id,
            "status": atualizado.status,
            "mensagem": atualizado.mensagem,
        }),
    ));
    Ok(atualizado)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testes::{conciliacao_json, estado, sessao_admin};
    use crate::utils::Competencia;
    use httpmock::prelude::*;
    use httpmock::Method::PATCH;

    fn fechamento_json(id: Uuid, empresa_id: Uuid, status: &str) -> Value {
        json!({
            "id": id,
            "empresa_id": empresa_id,
            "competencia": "2025-03",
            "status": status,
            "planilha_caminho": null,
            "mensagem": null,
            "solicitado_por": Uuid::new_v4(),
            "criado_em": "2025-04-02T12:00:00Z",
            "concluido_em": null
        })
    }

    fn pedido(empresa_id: Uuid) -> CriarFechamentoRequest {
        let competencia: Competencia = "03/2025".parse().expect("competência");
        CriarFechamentoRequest { empresa_id, competencia }
    }

    async fn conciliacoes_alinhadas(supabase: &MockServer, empresa: Uuid) {
        supabase
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/conciliacoes");
                then.status(200).json_body(json!([
                    conciliacao_json(Uuid::new_v4(), empresa, "alinhado", 1),
                    conciliacao_json(Uuid::new_v4(), empresa, "alinhado", 2)
                ]));
            })
            .await;
    }

    async fn fechamentos_existentes(supabase: &MockServer, linhas: Value) {
        supabase
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/fechamentos");
                then.status(200).json_body(linhas);
            })
            .await;
    }

    #[tokio::test]
    async fn test_solicitar_sem_conciliacoes() {
        let supabase = MockServer::start_async().await;
        supabase
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/conciliacoes");
                then.status(200).json_body(json!([]));
            })
            .await;

        let state = estado(&supabase.base_url(), "http://127.0.0.1:1");
        let resultado = solicitar_fechamento(&state, &sessao_admin(), pedido(Uuid::new_v4())).await;

        assert!(matches!(resultado, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_solicitar_com_conciliacao_em_andamento() {
        let supabase = MockServer::start_async().await;
        let empresa = Uuid::new_v4();
        supabase
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/conciliacoes");
                then.status(200).json_body(json!([
                    conciliacao_json(Uuid::new_v4(), empresa, "alinhado", 1),
                    conciliacao_json(Uuid::new_v4(), empresa, "processando", 1)
                ]));
            })
            .await;

        let state = estado(&supabase.base_url(), "http://127.0.0.1:1");
        let resultado = solicitar_fechamento(&state, &sessao_admin(), pedido(empresa)).await;

        assert!(matches!(resultado, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_solicitar_com_fechamento_em_processamento_ou_concluido() {
        for status in ["em_processamento", "concluido"] {
            let supabase = MockServer::start_async().await;
            let n8n = MockServer::start_async().await;
            let empresa = Uuid::new_v4();
            conciliacoes_alinhadas(&supabase, empresa).await;
            fechamentos_existentes(&supabase, json!([fechamento_json(Uuid::new_v4(), empresa, status)]))
                .await;
            let webhook = n8n
                .mock_async(|when, then| {
                    when.method(POST).path("/webhook/fechamento");
                    then.status(200);
                })
                .await;

            let state = estado(&supabase.base_url(), &n8n.base_url());
            let resultado = solicitar_fechamento(&state, &sessao_admin(), pedido(empresa)).await;

            assert!(matches!(resultado, Err(AppError::Conflict(_))), "status {}", status);
            webhook.assert_hits_async(0).await;
        }
    }

    #[tokio::test]
    async fn test_solicitar_reaproveita_fechamento_com_erro() {
        let supabase = MockServer::start_async().await;
        let n8n = MockServer::start_async().await;
        let (id, empresa) = (Uuid::new_v4(), Uuid::new_v4());
        conciliacoes_alinhadas(&supabase, empresa).await;
        fechamentos_existentes(&supabase, json!([fechamento_json(id, empresa, "erro")])).await;

        let reserva = supabase
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/rest/v1/fechamentos")
                    .query_param("status", "eq.erro")
                    .json_body_partial(r#"{"status":"em_processamento"}"#);
                then.status(200)
                    .json_body(json!([fechamento_json(id, empresa, "em_processamento")]));
            })
            .await;
        let webhook = n8n
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/webhook/fechamento")
                    .json_body_partial(format!(r#"{{"fechamento_id":"{}"}}"#, id));
                then.status(200);
            })
            .await;

        let state = estado(&supabase.base_url(), &n8n.base_url());
        let fechamento = solicitar_fechamento(&state, &sessao_admin(), pedido(empresa))
            .await
            .expect("fechamento");

        assert_eq!(fechamento.status, StatusFechamento::EmProcessamento);
        reserva.assert_hits_async(1).await;
        webhook.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_n8n_recusa_fechamento_vai_para_erro() {
        let supabase = MockServer::start_async().await;
        let n8n = MockServer::start_async().await;
        let (id, empresa) = (Uuid::new_v4(), Uuid::new_v4());
        conciliacoes_alinhadas(&supabase, empresa).await;
        fechamentos_existentes(&supabase, json!([])).await;

        let criacao = supabase
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/fechamentos");
                then.status(201).json_body(json!([fechamento_json(id, empresa, "aberto")]));
            })
            .await;
        let reserva = supabase
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/rest/v1/fechamentos")
                    .query_param("status", "eq.aberto")
                    .json_body_partial(r#"{"status":"em_processamento"}"#);
                then.status(200)
                    .json_body(json!([fechamento_json(id, empresa, "em_processamento")]));
            })
            .await;
        let erro = supabase
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/rest/v1/fechamentos")
                    .query_param("status", "eq.em_processamento")
                    .json_body_partial(r#"{"status":"erro"}"#);
                then.status(200).json_body(json!([fechamento_json(id, empresa, "erro")]));
            })
            .await;
        n8n.mock_async(|when, then| {
            when.method(POST).path("/webhook/fechamento");
            then.status(503);
        })
        .await;

        let state = estado(&supabase.base_url(), &n8n.base_url());
        let resultado = solicitar_fechamento(&state, &sessao_admin(), pedido(empresa)).await;

        assert!(matches!(resultado, Err(AppError::N8n(_))));
        criacao.assert_hits_async(1).await;
        reserva.assert_hits_async(1).await;
        erro.assert_hits_async(1).await;
    }
}

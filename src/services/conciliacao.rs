//! Conciliação: disparo ao n8n e máquina de status

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use supabase::{Consulta, Ordem};
use uuid::Uuid;

use super::documentos::buscar_documentos;
use super::nao_encontrado;
use crate::auth::Sessao;
use crate::config::settings::ConciliacaoSettings;
use crate::models::n8n::{DisparoConciliacao, DocumentoParaN8n};
use crate::models::{
    Conciliacao, CriarConciliacaoRequest, NovaConciliacao, Notificacao, StatusConciliacao,
    TipoNotificacao,
};
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult, Competencia};
use crate::AppState;

pub const TABELA: &str = "conciliacoes";

/// Progresso estimado pelo relógio desde o início da tentativa atual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressoEstimado {
    pub percentual: u8,
    pub segundos_decorridos: u64,
    pub segundos_estimados: u64,
}

impl ProgressoEstimado {
    /// 0 em `pendente`, 100 em `alinhado`, nos demais proporcional ao
    /// tempo decorrido e limitado a 99
    pub fn calcular(
        iniciado_em: Option<DateTime<Utc>>,
        agora: DateTime<Utc>,
        duracao_estimada: u64,
        status: StatusConciliacao,
    ) -> Self {
        let segundos_decorridos = iniciado_em
            .map(|inicio| (agora - inicio).num_seconds().max(0) as u64)
            .unwrap_or(0);

        let percentual = match status {
            StatusConciliacao::Pendente => 0,
            StatusConciliacao::Alinhado => 100,
            _ if duracao_estimada == 0 => 99,
            _ => (segundos_decorridos.saturating_mul(100) / duracao_estimada).min(99) as u8,
        };

        Self {
            percentual,
            segundos_decorridos,
            segundos_estimados: duracao_estimada,
        }
    }
}

pub fn duracao_estimada(config: &ConciliacaoSettings, documentos: usize) -> u64 {
    config.segundos_base + config.segundos_por_documento * documentos as u64
}

#[derive(Debug, Clone, Serialize)]
pub struct ConciliacaoComProgresso {
    #[serde(flatten)]
    pub conciliacao: Conciliacao,
    pub progresso: ProgressoEstimado,
}

impl ConciliacaoComProgresso {
    pub fn new(conciliacao: Conciliacao, config: &ConciliacaoSettings, agora: DateTime<Utc>) -> Self {
        let progresso = ProgressoEstimado::calcular(
            conciliacao.iniciado_em,
            agora,
            duracao_estimada(config, conciliacao.documento_ids.len()),
            conciliacao.status,
        );
        Self { conciliacao, progresso }
    }
}

pub async fn buscar_conciliacao(state: &AppState, id: Uuid) -> AppResult<Conciliacao> {
    let conciliacao = state
        .supabase
        .select_one(&Consulta::tabela(TABELA).eq("id", id))
        .await
        .map_err(nao_encontrado(format!("conciliação {}", id)))?;
    Ok(conciliacao)
}

pub async fn listar_por_competencia(
    state: &AppState,
    empresa_id: Uuid,
    competencia: &Competencia,
) -> AppResult<Vec<Conciliacao>> {
    let consulta = Consulta::tabela(TABELA)
        .eq("empresa_id", empresa_id)
        .eq("competencia", competencia.chave());
    Ok(state.supabase.select(&consulta).await?)
}

pub async fn listar_conciliacoes(
    state: &AppState,
    sessao: &Sessao,
    empresa_id: Option<Uuid>,
    competencia: Option<Competencia>,
) -> AppResult<Vec<ConciliacaoComProgresso>> {
    let mut consulta = Consulta::tabela(TABELA).order("criado_em", Ordem::Desc);
    if let Some(empresa_id) = sessao.empresa_da_consulta(empresa_id)? {
        consulta = consulta.eq("empresa_id", empresa_id);
    }
    if let Some(competencia) = competencia {
        consulta = consulta.eq("competencia", competencia.chave());
    }

    let agora = Utc::now();
    let linhas: Vec<Conciliacao> = state.supabase.select(&consulta).await?;
    Ok(linhas
        .into_iter()
        .map(|c| ConciliacaoComProgresso::new(c, &state.settings.conciliacao, agora))
        .collect())
}

pub async fn obter_conciliacao(
    state: &AppState,
    sessao: &Sessao,
    id: Uuid,
) -> AppResult<ConciliacaoComProgresso> {
    let conciliacao = buscar_conciliacao(state, id).await?;
    sessao.exigir_acesso(conciliacao.empresa_id)?;
    Ok(ConciliacaoComProgresso::new(conciliacao, &state.settings.conciliacao, Utc::now()))
}

/// Cria em `pendente` e dispara o workflow
///
/// Se o n8n não aceitar o disparo a linha continua `pendente` e o erro sobe
/// como 502; o cliente pode tentar de novo pelo reprocessamento.
pub async fn criar_conciliacao(
    state: &AppState,
    sessao: &Sessao,
    req: CriarConciliacaoRequest,
) -> AppResult<Conciliacao> {
    sessao.exigir_acesso(req.empresa_id)?;

    if req.documento_ids.is_empty() {
        return Err(AppError::ValidationError("informe ao menos um documento".to_string()));
    }

    let mut documento_ids = req.documento_ids.clone();
    documento_ids.sort();
    documento_ids.dedup();

    let documentos = buscar_documentos(state, &documento_ids).await?;
    if documentos.len() != documento_ids.len() {
        return Err(AppError::ValidationError("documento inexistente na lista".to_string()));
    }
    if let Some(fora) = documentos
        .iter()
        .find(|d| d.empresa_id != req.empresa_id || d.competencia != req.competencia)
    {
        return Err(AppError::ValidationError(format!(
            "documento {} não pertence à empresa/competência informada",
            fora.id
        )));
    }

    let nova = NovaConciliacao {
        empresa_id: req.empresa_id,
        competencia: req.competencia,
        status: StatusConciliacao::Pendente,
        documento_ids,
        tentativas: 0,
        criado_por: sessao.usuario_id,
    };
    let conciliacao: Conciliacao = state.supabase.insert(TABELA, &nova).await?;

    log_info(&format!(
        "🧾 Conciliação {} criada ({} documentos, competência {})",
        conciliacao.id,
        conciliacao.documento_ids.len(),
        conciliacao.competencia
    ));

    despachar(state, &conciliacao).await
}

/// `erro → pendente` (zera tentativas) e dispara de novo
pub async fn reprocessar(state: &AppState, sessao: &Sessao, id: Uuid) -> AppResult<Conciliacao> {
    let conciliacao = buscar_conciliacao(state, id).await?;
    sessao.exigir_acesso(conciliacao.empresa_id)?;

    // Uma criação cujo disparo falhou fica em pendente e pode ser disparada direto
    let pendente = if conciliacao.status == StatusConciliacao::Pendente {
        conciliacao
    } else {
        let mut alteracoes = Map::new();
        alteracoes.insert("tentativas".to_string(), json!(0));
        alteracoes.insert("mensagem".to_string(), Value::Null);
        alteracoes.insert("iniciado_em".to_string(), Value::Null);
        alteracoes.insert("alinhamento_disparado_em".to_string(), Value::Null);
        transicionar(state, &conciliacao, StatusConciliacao::Pendente, alteracoes).await?
    };

    despachar(state, &pendente).await
}

/// Passa para `processando` e envia a conciliação ao n8n
///
/// Vale para `pendente` (primeiro envio) e `aguardando_retry` (nova tentativa).
/// A linha é reservada antes do envio (escrita condicionada ao status lido),
/// então um callback rápido do n8n já encontra `processando` e duas chamadas
/// concorrentes não disparam duas vezes. Se o n8n recusar, a reserva é
/// desfeita por [`desfazer_reserva`].
pub async fn despachar(state: &AppState, conciliacao: &Conciliacao) -> AppResult<Conciliacao> {
    conciliacao
        .status
        .validar_transicao(
            StatusConciliacao::Processando,
            conciliacao.tentativas,
            state.settings.conciliacao.max_tentativas,
        )
        .map_err(AppError::Conflict)?;

    let tentativa = conciliacao.tentativas + 1;
    let documentos = documentos_para_n8n(state, conciliacao).await?;

    let mut alteracoes = Map::new();
    alteracoes.insert("tentativas".to_string(), json!(tentativa));
    alteracoes.insert("iniciado_em".to_string(), json!(Utc::now()));
    alteracoes.insert("alinhamento_disparado_em".to_string(), Value::Null);
    alteracoes.insert("mensagem".to_string(), Value::Null);
    let reservada = transicionar(state, conciliacao, StatusConciliacao::Processando, alteracoes).await?;

    let disparo = DisparoConciliacao {
        conciliacao_id: conciliacao.id,
        empresa_id: conciliacao.empresa_id,
        competencia: conciliacao.competencia,
        tentativa,
        documentos,
        callback_url: callback_url(state),
    };

    if let Err(e) = state.n8n.disparar_conciliacao(&disparo).await {
        if let Err(erro_desfazer) = desfazer_reserva(state, conciliacao, &reservada, &e).await {
            log_error(&format!(
                "❌ Conciliação {} ficou em processando sem envio ao n8n: {}",
                conciliacao.id, erro_desfazer
            ));
        }
        return Err(e);
    }

    Ok(reservada)
}

async fn documentos_para_n8n(
    state: &AppState,
    conciliacao: &Conciliacao,
) -> AppResult<Vec<DocumentoParaN8n>> {
    let documentos = buscar_documentos(state, &conciliacao.documento_ids).await?;

    let mut para_n8n = Vec::with_capacity(documentos.len());
    for documento in documentos {
        let url = state
            .supabase
            .criar_url_assinada(
                &state.settings.supabase.bucket_documentos,
                &documento.caminho,
                state.settings.supabase.signed_url_ttl_secs,
            )
            .await?;
        para_n8n.push(DocumentoParaN8n {
            id: documento.id,
            nome: documento.nome_original,
            categoria: documento.categoria.as_str().to_string(),
            url: url.url,
        });
    }
    Ok(para_n8n)
}

/// Status de volta quando o n8n recusa o envio
///
/// - `pendente`: volta para `pendente` com as tentativas de antes
/// - `aguardando_retry`: a tentativa conta; volta para `aguardando_retry`
///   ou vai para `erro` se chegou ao teto
pub fn status_apos_falha_de_envio(
    origem: StatusConciliacao,
    tentativa: u32,
    max_tentativas: u32,
) -> StatusConciliacao {
    match origem {
        StatusConciliacao::AguardandoRetry if tentativa >= max_tentativas => StatusConciliacao::Erro,
        StatusConciliacao::AguardandoRetry => StatusConciliacao::AguardandoRetry,
        _ => StatusConciliacao::Pendente,
    }
}

async fn desfazer_reserva(
    state: &AppState,
    origem: &Conciliacao,
    reservada: &Conciliacao,
    erro: &AppError,
) -> AppResult<Conciliacao> {
    let max = state.settings.conciliacao.max_tentativas;
    let para = status_apos_falha_de_envio(origem.status, reservada.tentativas, max);

    let mut alteracoes = Map::new();
    let mensagem = if para == StatusConciliacao::Erro {
        format!("limite de {} tentativas atingido; último envio ao n8n falhou: {}", max, erro)
    } else {
        format!("envio ao n8n falhou: {}", erro)
    };
    alteracoes.insert("mensagem".to_string(), json!(mensagem));
    if para == StatusConciliacao::Pendente {
        alteracoes.insert("tentativas".to_string(), json!(origem.tentativas));
        alteracoes.insert("iniciado_em".to_string(), json!(origem.iniciado_em));
    }

    log_warning(&format!(
        "⚠️ Envio da conciliação {} falhou (tentativa {}); status volta para {}",
        origem.id, reservada.tentativas, para
    ));
    gravar_status(state, reservada, para, alteracoes).await
}

/// Status escrito pelo n8n; repetir o status atual não altera nada
pub async fn aplicar_status_n8n(
    state: &AppState,
    id: Uuid,
    status: &str,
    mensagem: Option<String>,
) -> AppResult<Conciliacao> {
    let para: StatusConciliacao = serde_json::from_value(json!(status))
        .map_err(|_| AppError::ValidationError(format!("status de conciliação desconhecido: {}", status)))?;

    let conciliacao = buscar_conciliacao(state, id).await?;
    if conciliacao.status == para {
        tracing::debug!("Conciliação {} já está em {}", id, para);
        return Ok(conciliacao);
    }

    let mut alteracoes = Map::new();
    alteracoes.insert("mensagem".to_string(), json!(mensagem));
    transicionar(state, &conciliacao, para, alteracoes).await
}

/// Grava a transição condicionada ao status lido
///
/// O filtro `status=eq.<atual>` faz a escrita perder a corrida para outra
/// que tenha mudado a linha antes; nesse caso responde 409.
pub async fn transicionar(
    state: &AppState,
    atual: &Conciliacao,
    para: StatusConciliacao,
    alteracoes: Map<String, Value>,
) -> AppResult<Conciliacao> {
    atual
        .status
        .validar_transicao(para, atual.tentativas, state.settings.conciliacao.max_tentativas)
        .map_err(AppError::Conflict)?;

    gravar_status(state, atual, para, alteracoes).await
}

/// Escrita condicionada ao status lido, sem passar pela máquina de status
async fn gravar_status(
    state: &AppState,
    atual: &Conciliacao,
    para: StatusConciliacao,
    mut alteracoes: Map<String, Value>,
) -> AppResult<Conciliacao> {
    alteracoes.insert("status".to_string(), json!(para));
    alteracoes.insert("atualizado_em".to_string(), json!(Utc::now()));

    let consulta = Consulta::tabela(TABELA)
        .eq("id", atual.id)
        .eq("status", atual.status.as_str());
    let linhas: Vec<Conciliacao> = state.supabase.update(&consulta, &alteracoes).await?;

    let atualizada = linhas.into_iter().next().ok_or_else(|| {
        AppError::Conflict(format!("conciliação {} mudou de status durante a operação", atual.id))
    })?;

    log_status_transition("conciliacao", &atual.id.to_string(), atual.status.as_str(), para.as_str());
    notificar(state, &atualizada);
    Ok(atualizada)
}

fn notificar(state: &AppState, conciliacao: &Conciliacao) {
    state.notificacoes.publicar(Notificacao::new(
        Some(conciliacao.empresa_id),
        TipoNotificacao::ConciliacaoAtualizada,
        format!("Conciliação {}: {}", conciliacao.competencia, conciliacao.status),
        json!({
            "conciliacao_id": conciliacao.id,
            "status": conciliacao.status,
            "tentativas": conciliacao.tentativas,
            "mensagem": conciliacao.mensagem,
        }),
    ));
}

pub(crate) fn callback_url(state: &AppState) -> Option<String> {
    state
        .settings
        .server
        .public_url
        .as_ref()
        .map(|base| format!("{}/webhooks/n8n/status", base.trim_end_matches('/')))
}

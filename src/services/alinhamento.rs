//! Monitor de alinhamento das conciliações em andamento
//!
//! A cada ciclo:
//! - `processando` que passou do limiar do tempo estimado dispara o webhook
//!   de alinhamento uma vez por tentativa;
//! - `aguardando_retry` volta para `processando` com novo envio enquanto
//!   houver tentativas, senão vai para `erro`. A tentativa é gravada antes
//!   do envio, então um n8n fora do ar também consome tentativas.

use chrono::{DateTime, Utc};
use serde_json::{json, Map};
use std::sync::Arc;
use supabase::Consulta;
use tokio::time::{interval, Duration};

use super::conciliacao::{self, duracao_estimada, ProgressoEstimado, TABELA};
use crate::config::settings::ConciliacaoSettings;
use crate::models::n8n::DisparoAlinhamento;
use crate::models::{Conciliacao, StatusConciliacao};
use crate::utils::logging::*;
use crate::utils::AppResult;
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcaoMonitor {
    Nenhuma,
    DispararAlinhamento { progresso: u8 },
    Retentar,
    Falhar,
}

/// Decide o que fazer com uma conciliação neste ciclo
pub fn avaliar(conciliacao: &Conciliacao, agora: DateTime<Utc>, config: &ConciliacaoSettings) -> AcaoMonitor {
    match conciliacao.status {
        StatusConciliacao::Processando => {
            if conciliacao.alinhamento_disparado_em.is_some() {
                return AcaoMonitor::Nenhuma;
            }
            let Some(inicio) = conciliacao.iniciado_em else {
                return AcaoMonitor::Nenhuma;
            };

            let estimado = duracao_estimada(config, conciliacao.documento_ids.len());
            let decorrido = (agora - inicio).num_milliseconds().max(0) as f64 / 1000.0;

            if decorrido >= estimado as f64 * config.limiar_disparo {
                let progresso = ProgressoEstimado::calcular(
                    Some(inicio),
                    agora,
                    estimado,
                    StatusConciliacao::Processando,
                );
                AcaoMonitor::DispararAlinhamento { progresso: progresso.percentual }
            } else {
                AcaoMonitor::Nenhuma
            }
        }
        StatusConciliacao::AguardandoRetry => {
            if conciliacao.tentativas < config.max_tentativas {
                AcaoMonitor::Retentar
            } else {
                AcaoMonitor::Falhar
            }
        }
        _ => AcaoMonitor::Nenhuma,
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResumoCiclo {
    pub avaliadas: usize,
    pub alinhamentos_disparados: usize,
    pub retentativas: usize,
    pub falhas: usize,
    pub erros: usize,
}

/// Um ciclo completo do monitor
pub async fn executar_ciclo(state: &AppState) -> AppResult<ResumoCiclo> {
    let consulta = Consulta::tabela(TABELA).in_(
        "status",
        [
            StatusConciliacao::Processando.as_str(),
            StatusConciliacao::AguardandoRetry.as_str(),
        ],
    );
    let pendentes: Vec<Conciliacao> = state.supabase.select(&consulta).await?;

    let agora = Utc::now();
    let config = &state.settings.conciliacao;
    let mut resumo = ResumoCiclo {
        avaliadas: pendentes.len(),
        ..Default::default()
    };

    for item in &pendentes {
        let resultado = match avaliar(item, agora, config) {
            AcaoMonitor::Nenhuma => continue,
            AcaoMonitor::DispararAlinhamento { progresso } => {
                resumo.alinhamentos_disparados += 1;
                disparar_alinhamento(state, item, progresso).await
            }
            AcaoMonitor::Retentar => {
                resumo.retentativas += 1;
                // Se o envio falhar, despachar já deixa a linha em aguardando_retry ou erro
                conciliacao::despachar(state, item).await.map(|_| ())
            }
            AcaoMonitor::Falhar => {
                resumo.falhas += 1;
                let mut alteracoes = Map::new();
                alteracoes.insert(
                    "mensagem".to_string(),
                    json!(format!("limite de {} tentativas atingido", config.max_tentativas)),
                );
                conciliacao::transicionar(state, item, StatusConciliacao::Erro, alteracoes)
                    .await
                    .map(|_| ())
            }
        };

        if let Err(e) = resultado {
            resumo.erros += 1;
            log_error(&format!("❌ Monitor: conciliação {}: {}", item.id, e));
        }
    }

    if resumo.alinhamentos_disparados + resumo.retentativas + resumo.falhas > 0 {
        log_info(&format!("⏱️ Monitor de alinhamento: {:?}", resumo));
    }
    Ok(resumo)
}

/// Reserva o disparo gravando `alinhamento_disparado_em` antes de chamar o n8n
///
/// A reserva filtra por `alinhamento_disparado_em=is.null`, então só uma
/// instância dispara por tentativa. Se o n8n falhar a reserva é desfeita e o
/// próximo ciclo tenta de novo.
async fn disparar_alinhamento(state: &AppState, item: &Conciliacao, progresso: u8) -> AppResult<()> {
    let reserva = Consulta::tabela(TABELA)
        .eq("id", item.id)
        .eq("status", StatusConciliacao::Processando.as_str())
        .is_null("alinhamento_disparado_em");

    let reservadas: Vec<Conciliacao> = state
        .supabase
        .update(&reserva, &json!({ "alinhamento_disparado_em": Utc::now() }))
        .await?;
    if reservadas.is_empty() {
        tracing::debug!("Alinhamento de {} já reservado por outro ciclo", item.id);
        return Ok(());
    }

    let disparo = DisparoAlinhamento {
        conciliacao_id: item.id,
        empresa_id: item.empresa_id,
        competencia: item.competencia,
        tentativa: item.tentativas,
        progresso_estimado: progresso,
    };

    if let Err(e) = state.n8n.disparar_alinhamento(&disparo).await {
        let desfazer = Consulta::tabela(TABELA).eq("id", item.id);
        let _: Vec<Conciliacao> = state
            .supabase
            .update(&desfazer, &json!({ "alinhamento_disparado_em": null }))
            .await?;
        return Err(e);
    }

    log_info(&format!(
        "🎯 Alinhamento disparado para conciliação {} ({}%, tentativa {})",
        item.id, progresso, item.tentativas
    ));
    Ok(())
}

/// Inicia o monitor em background
pub fn iniciar_monitor(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let segundos = state.settings.conciliacao.intervalo_monitor_secs.max(1);

    tokio::spawn(async move {
        let mut intervalo = interval(Duration::from_secs(segundos));
        log_info(&format!("⏱️ Monitor de alinhamento iniciado (a cada {}s)", segundos));

        loop {
            intervalo.tick().await;
            if let Err(e) = executar_ciclo(&state).await {
                log_warning(&format!("⚠️ Ciclo do monitor falhou: {}", e));
            }
        }
    })
}

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;

use crate::auth::Sessao;
use crate::models::Notificacao;
use crate::utils::logging::*;
use crate::AppState;

/// `GET /api/notificacoes/stream` (Server-Sent Events)
///
/// EventSource não envia headers, então o token também é aceito em
/// `?access_token=`.
pub async fn stream(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    log_info(&format!("🔌 Assinante SSE conectado: {}", sessao.usuario_id));

    let usuario_id = sessao.usuario_id;
    let empresa_id = sessao.empresa_id;
    let is_admin = sessao.is_admin();

    let eventos = BroadcastStream::new(state.notificacoes.assinar()).filter_map(move |item| {
        match item {
            Ok(notificacao) if notificacao.visivel_para(empresa_id, is_admin) => {
                para_evento(&notificacao).map(Ok)
            }
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(perdidas)) => {
                log_warning(&format!(
                    "⚠️ Assinante {} atrasado, {} notificações descartadas",
                    usuario_id, perdidas
                ));
                None
            }
        }
    });

    Sse::new(eventos).keep_alive(KeepAlive::default())
}

fn para_evento(notificacao: &Notificacao) -> Option<Event> {
    Event::default()
        .event(notificacao.tipo.evento())
        .id(notificacao.id.to_string())
        .json_data(notificacao)
        .map_err(|e| log_error(&format!("❌ Falha ao serializar notificação: {}", e)))
        .ok()
}

//! Fan-out de notificações em tempo real

use tokio::sync::broadcast;

use crate::models::Notificacao;

const CAPACIDADE_PADRAO: usize = 256;

/// Canal broadcast compartilhado pelos assinantes SSE
///
/// Entrega melhor esforço: quem não está conectado não recebe, e um
/// assinante lento perde os eventos mais antigos.
#[derive(Clone)]
pub struct NotificacaoHub {
    sender: broadcast::Sender<Notificacao>,
}

impl NotificacaoHub {
    pub fn new() -> Self {
        Self::with_capacity(CAPACIDADE_PADRAO)
    }

    pub fn with_capacity(capacidade: usize) -> Self {
        let (sender, _) = broadcast::channel(capacidade);
        Self { sender }
    }

    /// Publica para quem estiver ouvindo; retorna quantos assinantes receberam
    pub fn publicar(&self, notificacao: Notificacao) -> usize {
        tracing::debug!(
            "📣 Notificação {} ({:?}) para empresa {:?}",
            notificacao.tipo.evento(),
            notificacao.id,
            notificacao.empresa_id
        );
        self.sender.send(notificacao).unwrap_or(0)
    }

    pub fn assinar(&self) -> broadcast::Receiver<Notificacao> {
        self.sender.subscribe()
    }

    pub fn assinantes(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificacaoHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TipoNotificacao;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_publicar_sem_assinantes() {
        let hub = NotificacaoHub::new();
        let n = Notificacao::new(None, TipoNotificacao::ComunicadoPublicado, "Aviso", json!({}));
        assert_eq!(hub.publicar(n), 0);
    }

    #[tokio::test]
    async fn test_assinante_recebe() {
        let hub = NotificacaoHub::new();
        let mut rx = hub.assinar();
        let empresa = Uuid::new_v4();

        hub.publicar(Notificacao::new(
            Some(empresa),
            TipoNotificacao::DocumentoEnviado,
            "Novo documento",
            json!({"nome": "extrato.pdf"}),
        ));

        let recebida = rx.recv().await.unwrap();
        assert_eq!(recebida.empresa_id, Some(empresa));
        assert!(recebida.visivel_para(Some(empresa), false));
        assert!(!recebida.visivel_para(Some(Uuid::new_v4()), false));
    }
}

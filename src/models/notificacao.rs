use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipoNotificacao {
    DocumentoEnviado,
    DocumentoRemovido,
    ConciliacaoAtualizada,
    FechamentoAtualizado,
    ComunicadoPublicado,
    EnquetePublicada,
}

impl TipoNotificacao {
    /// Nome do evento SSE
    pub fn evento(&self) -> &'static str {
        match self {
            TipoNotificacao::DocumentoEnviado => "documento_enviado",
            TipoNotificacao::DocumentoRemovido => "documento_removido",
            TipoNotificacao::ConciliacaoAtualizada => "conciliacao_atualizada",
            TipoNotificacao::FechamentoAtualizado => "fechamento_atualizado",
            TipoNotificacao::ComunicadoPublicado => "comunicado_publicado",
            TipoNotificacao::EnquetePublicada => "enquete_publicada",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notificacao {
    pub id: Uuid,
    /// `None` = todas as empresas
    pub empresa_id: Option<Uuid>,
    pub tipo: TipoNotificacao,
    pub titulo: String,
    pub dados: Value,
    pub criado_em: DateTime<Utc>,
}

impl Notificacao {
    pub fn new(empresa_id: Option<Uuid>, tipo: TipoNotificacao, titulo: impl Into<String>, dados: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            empresa_id,
            tipo,
            titulo: titulo.into(),
            dados,
            criado_em: Utc::now(),
        }
    }

    /// Admin recebe tudo; cliente recebe globais e da própria empresa
    pub fn visivel_para(&self, empresa_id: Option<Uuid>, is_admin: bool) -> bool {
        is_admin || self.empresa_id.is_none() || self.empresa_id == empresa_id
    }
}

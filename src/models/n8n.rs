//! Payloads trocados com os workflows do n8n

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::Competencia;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipoProcesso {
    Conciliacao,
    Fechamento,
}

/// Callback de status enviado pelo n8n (`POST /webhooks/n8n/status`)
///
/// `status` chega como texto e é interpretado conforme `tipo`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusCallback {
    pub tipo: TipoProcesso,
    pub id: Uuid,
    pub status: String,
    #[serde(default)]
    pub mensagem: Option<String>,
    #[serde(default)]
    pub planilha_caminho: Option<String>,
}

/// Documento enviado ao workflow, com URL assinada para leitura
#[derive(Debug, Clone, Serialize)]
pub struct DocumentoParaN8n {
    pub id: Uuid,
    pub nome: String,
    pub categoria: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DisparoConciliacao {
    pub conciliacao_id: Uuid,
    pub empresa_id: Uuid,
    pub competencia: Competencia,
    pub tentativa: u32,
    pub documentos: Vec<DocumentoParaN8n>,
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DisparoAlinhamento {
    pub conciliacao_id: Uuid,
    pub empresa_id: Uuid,
    pub competencia: Competencia,
    pub tentativa: u32,
    pub progresso_estimado: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct DisparoFechamento {
    pub fechamento_id: Uuid,
    pub empresa_id: Uuid,
    pub competencia: Competencia,
    pub conciliacao_ids: Vec<Uuid>,
    pub bucket: String,
    pub callback_url: Option<String>,
}

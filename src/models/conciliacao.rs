//! Conciliação de documentos de uma competência
//!
//! Ciclo de vida (quem escreve cada transição):
//!
//! ```text
//! pendente ──(backend dispara n8n)──▶ processando
//! processando ──(n8n)──▶ alinhado | erro | aguardando_retry
//! aguardando_retry ──(monitor, tentativas < máx)──▶ processando
//! aguardando_retry ──(monitor, tentativas esgotadas)──▶ erro
//! erro ──(reprocessar manual)──▶ pendente
//! ```
//!
//! Um envio recusado pelo n8n desfaz `processando` fora dessa tabela:
//! volta para a origem ou vai para `erro` se a tentativa era a última.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::utils::Competencia;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusConciliacao {
    Pendente,
    Processando,
    Alinhado,
    Erro,
    AguardandoRetry,
}

impl StatusConciliacao {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusConciliacao::Pendente => "pendente",
            StatusConciliacao::Processando => "processando",
            StatusConciliacao::Alinhado => "alinhado",
            StatusConciliacao::Erro => "erro",
            StatusConciliacao::AguardandoRetry => "aguardando_retry",
        }
    }

    /// Valida a transição `self → para`
    ///
    /// `tentativas` é o número de envios ao n8n já feitos; a volta de
    /// `aguardando_retry` para `processando` só é permitida abaixo do teto.
    pub fn validar_transicao(
        &self,
        para: StatusConciliacao,
        tentativas: u32,
        max_tentativas: u32,
    ) -> Result<(), String> {
        use StatusConciliacao::*;

        let permitida = match (self, para) {
            (Pendente, Processando) => true,
            (Processando, Alinhado | Erro | AguardandoRetry) => true,
            (AguardandoRetry, Processando) => tentativas < max_tentativas,
            (AguardandoRetry, Erro) => true,
            (Erro, Pendente) => true,
            _ => false,
        };

        if permitida {
            Ok(())
        } else if matches!((self, para), (AguardandoRetry, Processando)) {
            Err(format!(
                "limite de {} tentativas atingido; conciliação deve ir para erro",
                max_tentativas
            ))
        } else {
            Err(format!("transição inválida: {} → {}", self, para))
        }
    }
}

impl fmt::Display for StatusConciliacao {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Linha da tabela `conciliacoes`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conciliacao {
    pub id: Uuid,
    pub empresa_id: Uuid,
    pub competencia: Competencia,
    pub status: StatusConciliacao,
    pub documento_ids: Vec<Uuid>,
    pub tentativas: u32,
    /// Início da tentativa atual (base do progresso estimado)
    pub iniciado_em: Option<DateTime<Utc>>,
    pub alinhamento_disparado_em: Option<DateTime<Utc>>,
    pub mensagem: Option<String>,
    pub criado_por: Uuid,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NovaConciliacao {
    pub empresa_id: Uuid,
    pub competencia: Competencia,
    pub status: StatusConciliacao,
    pub documento_ids: Vec<Uuid>,
    pub tentativas: u32,
    pub criado_por: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CriarConciliacaoRequest {
    pub empresa_id: Uuid,
    pub competencia: Competencia,
    pub documento_ids: Vec<Uuid>,
}

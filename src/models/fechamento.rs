use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::utils::Competencia;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFechamento {
    Aberto,
    EmProcessamento,
    Concluido,
    Erro,
}

impl StatusFechamento {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFechamento::Aberto => "aberto",
            StatusFechamento::EmProcessamento => "em_processamento",
            StatusFechamento::Concluido => "concluido",
            StatusFechamento::Erro => "erro",
        }
    }

    /// aberto → em_processamento → concluido | erro; erro → em_processamento
    pub fn validar_transicao(&self, para: StatusFechamento) -> Result<(), String> {
        use StatusFechamento::*;

        match (self, para) {
            (Aberto, EmProcessamento)
            | (EmProcessamento, Concluido)
            | (EmProcessamento, Erro)
            | (Erro, EmProcessamento) => Ok(()),
            _ => Err(format!("transição inválida: {} → {}", self, para)),
        }
    }

    /// Impede abrir outro fechamento para a mesma competência
    pub fn bloqueia_novo_pedido(&self) -> bool {
        matches!(self, StatusFechamento::EmProcessamento | StatusFechamento::Concluido)
    }
}

impl fmt::Display for StatusFechamento {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Linha da tabela `fechamentos`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fechamento {
    pub id: Uuid,
    pub empresa_id: Uuid,
    pub competencia: Competencia,
    pub status: StatusFechamento,
    /// Planilha gerada pelo n8n no bucket de fechamentos
    pub planilha_caminho: Option<String>,
    pub mensagem: Option<String>,
    pub solicitado_por: Uuid,
    pub criado_em: DateTime<Utc>,
    pub concluido_em: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NovoFechamento {
    pub empresa_id: Uuid,
    pub competencia: Competencia,
    pub status: StatusFechamento,
    pub solicitado_por: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CriarFechamentoRequest {
    pub empresa_id: Uuid,
    pub competencia: Competencia,
}

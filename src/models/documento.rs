use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::utils::Competencia;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoriaDocumento {
    ExtratoBancario,
    NotaFiscal,
    Comprovante,
    FolhaPagamento,
    Outros,
}

impl CategoriaDocumento {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoriaDocumento::ExtratoBancario => "extrato_bancario",
            CategoriaDocumento::NotaFiscal => "nota_fiscal",
            CategoriaDocumento::Comprovante => "comprovante",
            CategoriaDocumento::FolhaPagamento => "folha_pagamento",
            CategoriaDocumento::Outros => "outros",
        }
    }
}

impl FromStr for CategoriaDocumento {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.trim().to_string()))
            .map_err(|_| format!("Categoria de documento desconhecida: '{}'", s))
    }
}

/// Linha da tabela `documentos`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Documento {
    pub id: Uuid,
    pub empresa_id: Uuid,
    pub competencia: Competencia,
    pub categoria: CategoriaDocumento,
    pub nome_original: String,
    /// Caminho dentro do bucket de documentos
    pub caminho: String,
    pub content_type: String,
    pub tamanho_bytes: i64,
    pub enviado_por: Uuid,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NovoDocumento {
    pub empresa_id: Uuid,
    pub competencia: Competencia,
    pub categoria: CategoriaDocumento,
    pub nome_original: String,
    pub caminho: String,
    pub content_type: String,
    pub tamanho_bytes: i64,
    pub enviado_por: Uuid,
}

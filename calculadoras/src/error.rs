//! Tipos de erro das calculadoras

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CalculoError {
    /// Entrada monetária negativa
    #[error("Valor negativo em '{campo}': {valor}")]
    ValorNegativo { campo: &'static str, valor: Decimal },

    /// Entrada acima do teto aceito ou resultado intermediário que estoura `Decimal`
    #[error("Valor fora do limite em '{campo}' (máximo {limite})")]
    ValorForaDoLimite { campo: &'static str, limite: Decimal },

    /// Tabela sem faixas ou com faixas fora de ordem
    #[error("Tabela inválida: {0}")]
    TabelaInvalida(String),
}

pub type Result<T> = std::result::Result<T, CalculoError>;

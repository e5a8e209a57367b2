//! Calculadoras tributárias do portal
//!
//! Aritmética fechada sobre tabelas progressivas fixas:
//!
//! - **INSS** do empregado (alíquotas progressivas por faixa, com teto)
//! - **IRPF** mensal (tabela progressiva com parcela a deduzir, desconto
//!   simplificado e o redutor mensal vigente a partir de 2026)
//! - **Pró-labore** (INSS de contribuinte individual + IRPF + CPP patronal)
//!
//! Todos os valores monetários são [`rust_decimal::Decimal`] e os resultados
//! são arredondados em centavos.
//!
//! # Exemplo
//!
//! ```rust
//! use calculadoras::{inss, irpf};
//! use rust_decimal::Decimal;
//!
//! let tabela_inss = inss::TabelaInss::vigente_2025();
//! let salario = Decimal::new(300000, 2);
//! let contribuicao = inss::calcular_inss(salario, &tabela_inss).unwrap().contribuicao;
//!
//! let entrada = irpf::EntradaIrpf::new(salario).com_inss(contribuicao);
//! let resultado = irpf::calcular_irpf(&entrada, &irpf::TabelaIrpf::vigente_2025()).unwrap();
//! assert!(resultado.imposto >= Decimal::ZERO);
//! ```

pub mod error;
pub mod inss;
pub mod irpf;
pub mod pro_labore;

pub use error::{CalculoError, Result};

use rust_decimal::{Decimal, RoundingStrategy};

/// Valor em reais a partir de centavos (`reais(151800)` = 1.518,00)
pub(crate) fn reais(centavos: i64) -> Decimal {
    Decimal::new(centavos, 2)
}

/// Percentual com quatro casas (`percentual(75000)` = 7,5% = 0,075)
pub(crate) fn percentual(decimilesimos: i64) -> Decimal {
    Decimal::new(decimilesimos, 6)
}

/// Arredonda para centavos (meio para longe de zero)
pub fn em_centavos(valor: Decimal) -> Decimal {
    valor.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Alíquota efetiva em pontos percentuais, zero quando a base é zero
pub(crate) fn aliquota_efetiva(valor: Decimal, base: Decimal) -> Decimal {
    if base.is_zero() {
        return Decimal::ZERO;
    }
    em_centavos(valor / base * Decimal::ONE_HUNDRED)
}

/// Maior entrada monetária aceita (R$ 1 bilhão por mês)
pub fn valor_maximo() -> Decimal {
    Decimal::new(1_000_000_000, 0)
}

/// Entrada monetária entre zero e [`valor_maximo`]
pub(crate) fn exigir_valor_valido(campo: &'static str, valor: Decimal) -> Result<()> {
    if valor.is_sign_negative() && !valor.is_zero() {
        return Err(CalculoError::ValorNegativo { campo, valor });
    }
    if valor > valor_maximo() {
        return Err(CalculoError::ValorForaDoLimite { campo, limite: valor_maximo() });
    }
    Ok(())
}

/// Resultado de `checked_*`; `None` vira erro em vez de pânico
pub(crate) fn sem_estouro(campo: &'static str, valor: Option<Decimal>) -> Result<Decimal> {
    valor.ok_or(CalculoError::ValorForaDoLimite { campo, limite: Decimal::MAX })
}

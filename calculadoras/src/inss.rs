//! INSS do empregado
//!
//! Cálculo progressivo: cada faixa tributa apenas a fatia do salário que
//! cai dentro dela. Salários acima do teto contribuem como se fossem o teto.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{aliquota_efetiva, em_centavos, exigir_valor_valido, percentual, reais};
use crate::{CalculoError, Result};

/// Faixa da tabela progressiva (limite superior inclusivo)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaixaInss {
    pub ate: Decimal,
    pub aliquota: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabelaInss {
    pub faixas: Vec<FaixaInss>,
    pub teto: Decimal,
}

impl TabelaInss {
    /// Tabela de contribuição dos segurados empregados (Portaria 2025)
    pub fn vigente_2025() -> Self {
        Self {
            faixas: vec![
                FaixaInss { ate: reais(151800), aliquota: percentual(75000) },
                FaixaInss { ate: reais(279388), aliquota: percentual(90000) },
                FaixaInss { ate: reais(419083), aliquota: percentual(120000) },
                FaixaInss { ate: reais(815741), aliquota: percentual(140000) },
            ],
            teto: reais(815741),
        }
    }

    /// Faixas em ordem crescente e teto coincidente com a última faixa
    pub fn validar(&self) -> Result<()> {
        let ultima = self
            .faixas
            .last()
            .ok_or_else(|| CalculoError::TabelaInvalida("tabela INSS sem faixas".to_string()))?;

        if self.faixas.windows(2).any(|par| par[0].ate >= par[1].ate) {
            return Err(CalculoError::TabelaInvalida(
                "faixas INSS fora de ordem".to_string(),
            ));
        }

        if ultima.ate != self.teto {
            return Err(CalculoError::TabelaInvalida(format!(
                "teto {} diferente do limite da última faixa {}",
                self.teto, ultima.ate
            )));
        }

        Ok(())
    }

    /// Contribuição máxima (salário no teto)
    pub fn contribuicao_maxima(&self) -> Result<Decimal> {
        Ok(calcular_inss(self.teto, self)?.contribuicao)
    }
}

/// Parcela de contribuição de uma faixa
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelaFaixa {
    pub de: Decimal,
    pub ate: Decimal,
    pub aliquota: Decimal,
    pub valor: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultadoInss {
    pub salario: Decimal,
    /// Salário limitado ao teto
    pub base: Decimal,
    pub contribuicao: Decimal,
    /// Em pontos percentuais sobre o salário
    pub aliquota_efetiva: Decimal,
    pub faixas: Vec<ParcelaFaixa>,
}

pub fn calcular_inss(salario: Decimal, tabela: &TabelaInss) -> Result<ResultadoInss> {
    exigir_valor_valido("salario", salario)?;
    tabela.validar()?;

    let base = salario.min(tabela.teto);
    let mut anterior = Decimal::ZERO;
    let mut total = Decimal::ZERO;
    let mut parcelas = Vec::new();

    for faixa in &tabela.faixas {
        if base <= anterior {
            break;
        }

        let limite = base.min(faixa.ate);
        let valor = (limite - anterior) * faixa.aliquota;
        total += valor;

        parcelas.push(ParcelaFaixa {
            de: anterior,
            ate: limite,
            aliquota: faixa.aliquota,
            valor: em_centavos(valor),
        });

        anterior = faixa.ate;
    }

    let contribuicao = em_centavos(total);

    tracing::debug!(
        "INSS calculado: salario={} base={} contribuicao={}",
        salario,
        base,
        contribuicao
    );

    Ok(ResultadoInss {
        salario,
        base,
        contribuicao,
        aliquota_efetiva: aliquota_efetiva(contribuicao, salario),
        faixas: parcelas,
    })
}

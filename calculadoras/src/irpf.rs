//! IRPF mensal (retenção na fonte)
//!
//! Fórmula: `imposto = base × alíquota − parcela a deduzir`, com a base
//! obtida pela modalidade de dedução mais favorável (deduções legais ou
//! desconto simplificado). A partir de janeiro/2026 aplica-se ainda o
//! redutor mensal da Lei 15.270/2025.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{aliquota_efetiva, em_centavos, exigir_valor_valido, percentual, reais, sem_estouro};
use crate::{CalculoError, Result};

/// Faixa da tabela progressiva; `ate = None` marca a última faixa
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaixaIrpf {
    pub ate: Option<Decimal>,
    pub aliquota: Decimal,
    pub deducao: Decimal,
}

/// Redução mensal do imposto (Lei 15.270/2025)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redutor {
    /// Rendimento até o qual a redução zera o imposto
    pub isencao_ate: Decimal,
    pub reducao_maxima: Decimal,
    /// Fim da faixa de transição
    pub transicao_ate: Decimal,
    pub constante: Decimal,
    pub coeficiente: Decimal,
}

impl Redutor {
    pub fn lei_15270() -> Self {
        Self {
            isencao_ate: reais(500000),
            reducao_maxima: reais(31289),
            transicao_ate: reais(735000),
            constante: reais(97862),
            coeficiente: Decimal::new(133145, 6),
        }
    }

    /// Redução aplicável, nunca maior que o próprio imposto
    pub fn reducao(&self, rendimento: Decimal, imposto: Decimal) -> Decimal {
        let reducao = if rendimento <= self.isencao_ate {
            self.reducao_maxima
        } else if rendimento <= self.transicao_ate {
            (self.constante - self.coeficiente * rendimento).max(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };

        reducao.min(imposto)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabelaIrpf {
    pub faixas: Vec<FaixaIrpf>,
    pub deducao_por_dependente: Decimal,
    pub desconto_simplificado: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redutor: Option<Redutor>,
}

impl TabelaIrpf {
    /// Tabela progressiva mensal vigente desde maio/2025
    pub fn vigente_2025() -> Self {
        Self {
            faixas: vec![
                FaixaIrpf { ate: Some(reais(242880)), aliquota: Decimal::ZERO, deducao: Decimal::ZERO },
                FaixaIrpf { ate: Some(reais(282665)), aliquota: percentual(75000), deducao: reais(18216) },
                FaixaIrpf { ate: Some(reais(375105)), aliquota: percentual(150000), deducao: reais(39416) },
                FaixaIrpf { ate: Some(reais(466468)), aliquota: percentual(225000), deducao: reais(67549) },
                FaixaIrpf { ate: None, aliquota: percentual(275000), deducao: reais(90873) },
            ],
            deducao_por_dependente: reais(18959),
            desconto_simplificado: reais(60720),
            redutor: None,
        }
    }

    /// Tabela de 2025 acrescida do redutor mensal
    pub fn vigente_2026() -> Self {
        Self {
            redutor: Some(Redutor::lei_15270()),
            ..Self::vigente_2025()
        }
    }

    pub fn para_competencia(ano: i32, _mes: u32) -> Self {
        if ano >= 2026 {
            Self::vigente_2026()
        } else {
            Self::vigente_2025()
        }
    }

    fn faixa_para(&self, base: Decimal) -> Result<&FaixaIrpf> {
        self.faixas
            .iter()
            .find(|f| f.ate.map_or(true, |ate| base <= ate))
            .ok_or_else(|| {
                CalculoError::TabelaInvalida("tabela IRPF sem faixa aberta final".to_string())
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalidadeDeducao {
    Legal,
    Simplificada,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntradaIrpf {
    pub rendimento_bruto: Decimal,
    #[serde(default)]
    pub inss: Decimal,
    #[serde(default)]
    pub dependentes: u32,
    #[serde(default)]
    pub pensao_alimenticia: Decimal,
    #[serde(default)]
    pub outras_deducoes: Decimal,
}

impl EntradaIrpf {
    pub fn new(rendimento_bruto: Decimal) -> Self {
        Self {
            rendimento_bruto,
            inss: Decimal::ZERO,
            dependentes: 0,
            pensao_alimenticia: Decimal::ZERO,
            outras_deducoes: Decimal::ZERO,
        }
    }

    pub fn com_inss(mut self, inss: Decimal) -> Self {
        self.inss = inss;
        self
    }

    pub fn com_dependentes(mut self, dependentes: u32) -> Self {
        self.dependentes = dependentes;
        self
    }

    fn validar(&self) -> Result<()> {
        exigir_valor_valido("rendimento_bruto", self.rendimento_bruto)?;
        exigir_valor_valido("inss", self.inss)?;
        exigir_valor_valido("pensao_alimenticia", self.pensao_alimenticia)?;
        exigir_valor_valido("outras_deducoes", self.outras_deducoes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultadoIrpf {
    pub rendimento_bruto: Decimal,
    pub modalidade: ModalidadeDeducao,
    pub deducoes: Decimal,
    pub base_calculo: Decimal,
    pub aliquota: Decimal,
    pub parcela_deduzir: Decimal,
    /// Imposto pela tabela, antes do redutor
    pub imposto_tabela: Decimal,
    pub reducao: Decimal,
    pub imposto: Decimal,
    pub aliquota_efetiva: Decimal,
}

pub fn calcular_irpf(entrada: &EntradaIrpf, tabela: &TabelaIrpf) -> Result<ResultadoIrpf> {
    entrada.validar()?;

    let por_dependentes = sem_estouro(
        "dependentes",
        tabela.deducao_por_dependente.checked_mul(Decimal::from(entrada.dependentes)),
    )?;
    let deducoes_legais = [entrada.pensao_alimenticia, entrada.outras_deducoes, por_dependentes]
        .into_iter()
        .try_fold(entrada.inss, |total, parcela| {
            sem_estouro("deducoes", total.checked_add(parcela))
        })?;

    let (modalidade, deducoes) = if tabela.desconto_simplificado > deducoes_legais {
        (ModalidadeDeducao::Simplificada, tabela.desconto_simplificado)
    } else {
        (ModalidadeDeducao::Legal, deducoes_legais)
    };

    let base_calculo =
        sem_estouro("base_calculo", entrada.rendimento_bruto.checked_sub(deducoes))?.max(Decimal::ZERO);
    let faixa = tabela.faixa_para(base_calculo)?;

    let imposto_tabela =
        em_centavos((base_calculo * faixa.aliquota - faixa.deducao).max(Decimal::ZERO));

    let reducao = tabela
        .redutor
        .as_ref()
        .map(|r| em_centavos(r.reducao(entrada.rendimento_bruto, imposto_tabela)))
        .unwrap_or(Decimal::ZERO);

    let imposto = (imposto_tabela - reducao).max(Decimal::ZERO);

    tracing::debug!(
        "IRPF calculado: bruto={} modalidade={:?} base={} imposto={}",
        entrada.rendimento_bruto,
        modalidade,
        base_calculo,
        imposto
    );

    Ok(ResultadoIrpf {
        rendimento_bruto: entrada.rendimento_bruto,
        modalidade,
        deducoes: em_centavos(deducoes),
        base_calculo: em_centavos(base_calculo),
        aliquota: faixa.aliquota,
        parcela_deduzir: faixa.deducao,
        imposto_tabela,
        reducao,
        imposto,
        aliquota_efetiva: aliquota_efetiva(imposto, entrada.rendimento_bruto),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isento_na_primeira_faixa() {
        let entrada = EntradaIrpf::new(reais(300000));
        let resultado = calcular_irpf(&entrada, &TabelaIrpf::vigente_2025()).unwrap();
        // 3.000,00 − 607,20 = 2.392,80 (faixa isenta)
        assert_eq!(resultado.modalidade, ModalidadeDeducao::Simplificada);
        assert_eq!(resultado.base_calculo, reais(239280));
        assert_eq!(resultado.imposto, Decimal::ZERO);
    }

    #[test]
    fn test_desconto_simplificado_quando_mais_vantajoso() {
        let entrada = EntradaIrpf::new(reais(500000)).com_inss(reais(50960));
        let resultado = calcular_irpf(&entrada, &TabelaIrpf::vigente_2025()).unwrap();
        // 4.392,80 × 22,5% − 675,49
        assert_eq!(resultado.modalidade, ModalidadeDeducao::Simplificada);
        assert_eq!(resultado.imposto, reais(31289));
        assert_eq!(resultado.reducao, Decimal::ZERO);
    }

    #[test]
    fn test_deducoes_legais_com_dependentes() {
        let entrada = EntradaIrpf::new(reais(800000))
            .com_inss(reais(95163))
            .com_dependentes(2);
        let resultado = calcular_irpf(&entrada, &TabelaIrpf::vigente_2025()).unwrap();
        // deduções 951,63 + 2 × 189,59 = 1.330,81; base 6.669,19
        assert_eq!(resultado.modalidade, ModalidadeDeducao::Legal);
        assert_eq!(resultado.deducoes, reais(133081));
        assert_eq!(resultado.base_calculo, reais(666919));
        // 6.669,19 × 27,5% − 908,73 = 925,30
        assert_eq!(resultado.imposto, reais(92530));
    }

    #[test]
    fn test_redutor_zera_ate_cinco_mil() {
        let entrada = EntradaIrpf::new(reais(500000)).com_inss(reais(50960));
        let resultado = calcular_irpf(&entrada, &TabelaIrpf::vigente_2026()).unwrap();
        assert_eq!(resultado.imposto_tabela, reais(31289));
        assert_eq!(resultado.reducao, reais(31289));
        assert_eq!(resultado.imposto, Decimal::ZERO);
    }

    #[test]
    fn test_redutor_na_faixa_de_transicao() {
        let entrada = EntradaIrpf::new(reais(600000)).com_inss(reais(64960));
        let resultado = calcular_irpf(&entrada, &TabelaIrpf::vigente_2026()).unwrap();
        // base 5.350,40 → 562,63; redução 978,62 − 0,133145 × 6.000 = 179,75
        assert_eq!(resultado.imposto_tabela, reais(56263));
        assert_eq!(resultado.reducao, reais(17975));
        assert_eq!(resultado.imposto, reais(38288));
    }

    #[test]
    fn test_sem_redutor_acima_da_transicao() {
        let redutor = Redutor::lei_15270();
        assert_eq!(redutor.reducao(reais(800000), reais(100000)), Decimal::ZERO);
        assert_eq!(redutor.reducao(reais(400000), reais(5000)), reais(5000));
    }

    #[test]
    fn test_tabela_por_competencia() {
        assert!(TabelaIrpf::para_competencia(2025, 12).redutor.is_none());
        assert!(TabelaIrpf::para_competencia(2026, 1).redutor.is_some());
    }

    #[test]
    fn test_rendimento_negativo() {
        let entrada = EntradaIrpf::new(reais(-1));
        assert!(matches!(
            calcular_irpf(&entrada, &TabelaIrpf::vigente_2025()),
            Err(CalculoError::ValorNegativo { campo: "rendimento_bruto", .. })
        ));
    }

    #[test]
    fn test_deducoes_acima_do_limite() {
        let mut entrada = EntradaIrpf::new(reais(500000));
        entrada.pensao_alimenticia = Decimal::MAX;
        entrada.outras_deducoes = Decimal::MAX;
        assert!(matches!(
            calcular_irpf(&entrada, &TabelaIrpf::vigente_2025()),
            Err(CalculoError::ValorForaDoLimite { campo: "pensao_alimenticia", .. })
        ));
    }

    #[test]
    fn test_muitos_dependentes_sem_estouro() {
        let entrada = EntradaIrpf::new(reais(500000)).com_dependentes(u32::MAX);
        let resultado = calcular_irpf(&entrada, &TabelaIrpf::vigente_2025()).unwrap();
        assert_eq!(resultado.modalidade, ModalidadeDeducao::Legal);
        assert_eq!(resultado.imposto, Decimal::ZERO);
    }

    #[test]
    fn test_entrada_json_com_padroes() {
        let entrada: EntradaIrpf =
            serde_json::from_str(r#"{"rendimento_bruto": "4500.00", "dependentes": 1}"#).unwrap();
        assert_eq!(entrada.inss, Decimal::ZERO);
        assert_eq!(entrada.dependentes, 1);
    }
}

//! Pró-labore de sócios
//!
//! - INSS do contribuinte individual: 11% limitado ao teto
//! - IRPF mensal sobre o pró-labore, deduzindo esse INSS
//! - CPP patronal de 20% fora do Simples Nacional (ou no Anexo IV)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::inss::TabelaInss;
use crate::irpf::{calcular_irpf, EntradaIrpf, ResultadoIrpf, TabelaIrpf};
use crate::{em_centavos, exigir_valor_valido, percentual, sem_estouro, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeTributario {
    SimplesNacional,
    SimplesAnexoIv,
    LucroPresumido,
    LucroReal,
}

impl RegimeTributario {
    /// Regimes em que a empresa recolhe a contribuição patronal sobre o pró-labore
    pub fn incide_cpp(&self) -> bool {
        !matches!(self, RegimeTributario::SimplesNacional)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntradaProLabore {
    pub valor: Decimal,
    #[serde(default)]
    pub dependentes: u32,
    pub regime: RegimeTributario,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultadoProLabore {
    pub valor: Decimal,
    pub inss: Decimal,
    pub irpf: ResultadoIrpf,
    pub cpp_patronal: Decimal,
    pub valor_liquido: Decimal,
    pub custo_empresa: Decimal,
}

pub fn calcular_pro_labore(
    entrada: &EntradaProLabore,
    tabela_inss: &TabelaInss,
    tabela_irpf: &TabelaIrpf,
) -> Result<ResultadoProLabore> {
    exigir_valor_valido("valor", entrada.valor)?;
    tabela_inss.validar()?;

    let aliquota_individual = percentual(110000);
    let aliquota_cpp = percentual(200000);

    let inss = em_centavos(entrada.valor.min(tabela_inss.teto) * aliquota_individual);

    let irpf = calcular_irpf(
        &EntradaIrpf::new(entrada.valor)
            .com_inss(inss)
            .com_dependentes(entrada.dependentes),
        tabela_irpf,
    )?;

    let cpp_patronal = if entrada.regime.incide_cpp() {
        em_centavos(entrada.valor * aliquota_cpp)
    } else {
        Decimal::ZERO
    };

    let descontos = sem_estouro("descontos", inss.checked_add(irpf.imposto))?;
    let valor_liquido = sem_estouro("valor_liquido", entrada.valor.checked_sub(descontos))?;
    let custo_empresa = sem_estouro("custo_empresa", entrada.valor.checked_add(cpp_patronal))?;

    Ok(ResultadoProLabore {
        valor: entrada.valor,
        inss,
        cpp_patronal,
        valor_liquido: em_centavos(valor_liquido),
        custo_empresa: em_centavos(custo_empresa),
        irpf,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irpf::ModalidadeDeducao;
    use crate::{reais, CalculoError};

    fn entrada(valor: Decimal, regime: RegimeTributario) -> EntradaProLabore {
        EntradaProLabore { valor, dependentes: 0, regime }
    }

    #[test]
    fn test_simples_nacional_sem_cpp() {
        let resultado = calcular_pro_labore(
            &entrada(reais(500000), RegimeTributario::SimplesNacional),
            &TabelaInss::vigente_2025(),
            &TabelaIrpf::vigente_2025(),
        )
        .unwrap();

        assert_eq!(resultado.inss, reais(55000));
        assert_eq!(resultado.irpf.modalidade, ModalidadeDeducao::Simplificada);
        assert_eq!(resultado.irpf.imposto, reais(31289));
        assert_eq!(resultado.cpp_patronal, Decimal::ZERO);
        assert_eq!(resultado.valor_liquido, reais(413711));
        assert_eq!(resultado.custo_empresa, reais(500000));
    }

    #[test]
    fn test_lucro_presumido_com_cpp() {
        let resultado = calcular_pro_labore(
            &entrada(reais(500000), RegimeTributario::LucroPresumido),
            &TabelaInss::vigente_2025(),
            &TabelaIrpf::vigente_2025(),
        )
        .unwrap();

        assert_eq!(resultado.cpp_patronal, reais(100000));
        assert_eq!(resultado.custo_empresa, reais(600000));
    }

    #[test]
    fn test_inss_individual_limitado_ao_teto() {
        let resultado = calcular_pro_labore(
            &entrada(reais(2_000_000), RegimeTributario::LucroReal),
            &TabelaInss::vigente_2025(),
            &TabelaIrpf::vigente_2026(),
        )
        .unwrap();

        // 8.157,41 × 11%
        assert_eq!(resultado.inss, reais(89732));
        assert_eq!(resultado.irpf.reducao, Decimal::ZERO);
    }

    #[test]
    fn test_valor_acima_do_limite() {
        let erro = calcular_pro_labore(
            &entrada(Decimal::MAX, RegimeTributario::LucroReal),
            &TabelaInss::vigente_2025(),
            &TabelaIrpf::vigente_2025(),
        )
        .unwrap_err();
        assert!(matches!(erro, CalculoError::ValorForaDoLimite { campo: "valor", .. }));
    }

    #[test]
    fn test_valores_em_centavos() {
        let resultado = calcular_pro_labore(
            &entrada(Decimal::new(1_234_567, 3), RegimeTributario::LucroPresumido),
            &TabelaInss::vigente_2025(),
            &TabelaIrpf::vigente_2025(),
        )
        .unwrap();
        // 1.234,567 + 246,91 de CPP
        assert_eq!(resultado.custo_empresa, reais(148148));
        assert_eq!(resultado.valor_liquido.scale(), 2);
    }

    #[test]
    fn test_regime_serde() {
        let regime: RegimeTributario = serde_json::from_str(r#""simples_anexo_iv""#).unwrap();
        assert_eq!(regime, RegimeTributario::SimplesAnexoIv);
        assert!(regime.incide_cpp());
        assert!(!RegimeTributario::SimplesNacional.incide_cpp());
    }
}

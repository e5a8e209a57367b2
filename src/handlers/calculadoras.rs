//! Calculadoras públicas (sem sessão)

use axum::response::Json;
use calculadoras::inss::{calcular_inss, ResultadoInss, TabelaInss};
use calculadoras::irpf::{calcular_irpf, EntradaIrpf, ResultadoIrpf, TabelaIrpf};
use calculadoras::pro_labore::{calcular_pro_labore, EntradaProLabore, RegimeTributario, ResultadoProLabore};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::utils::{AppResult, Competencia};

#[derive(Debug, Deserialize)]
pub struct InssRequest {
    pub salario: Decimal,
    #[serde(default)]
    pub competencia: Option<Competencia>,
}

#[derive(Debug, Deserialize)]
pub struct IrpfRequest {
    pub rendimento_bruto: Decimal,
    /// Sem valor informado, o INSS é calculado pela tabela progressiva
    #[serde(default)]
    pub inss: Option<Decimal>,
    #[serde(default)]
    pub dependentes: u32,
    #[serde(default)]
    pub pensao_alimenticia: Decimal,
    #[serde(default)]
    pub outras_deducoes: Decimal,
    #[serde(default)]
    pub competencia: Option<Competencia>,
}

#[derive(Debug, Deserialize)]
pub struct ProLaboreRequest {
    pub valor: Decimal,
    #[serde(default)]
    pub dependentes: u32,
    pub regime: RegimeTributario,
    #[serde(default)]
    pub competencia: Option<Competencia>,
}

/// Só há uma tabela de INSS cadastrada; competências posteriores usam a última
fn tabela_inss(_competencia: Option<Competencia>) -> TabelaInss {
    TabelaInss::vigente_2025()
}

fn tabela_irpf(competencia: Option<Competencia>) -> TabelaIrpf {
    let competencia = competencia.unwrap_or_else(Competencia::atual);
    TabelaIrpf::para_competencia(competencia.ano(), competencia.mes())
}

pub async fn inss(Json(req): Json<InssRequest>) -> AppResult<Json<ResultadoInss>> {
    Ok(Json(calcular_inss(req.salario, &tabela_inss(req.competencia))?))
}

pub async fn irpf(Json(req): Json<IrpfRequest>) -> AppResult<Json<ResultadoIrpf>> {
    let inss = match req.inss {
        Some(valor) => valor,
        None => calcular_inss(req.rendimento_bruto, &tabela_inss(req.competencia))?.contribuicao,
    };

    let entrada = EntradaIrpf {
        rendimento_bruto: req.rendimento_bruto,
        inss,
        dependentes: req.dependentes,
        pensao_alimenticia: req.pensao_alimenticia,
        outras_deducoes: req.outras_deducoes,
    };
    Ok(Json(calcular_irpf(&entrada, &tabela_irpf(req.competencia))?))
}

pub async fn pro_labore(Json(req): Json<ProLaboreRequest>) -> AppResult<Json<ResultadoProLabore>> {
    let entrada = EntradaProLabore {
        valor: req.valor,
        dependentes: req.dependentes,
        regime: req.regime,
    };
    let resultado = calcular_pro_labore(
        &entrada,
        &tabela_inss(req.competencia),
        &tabela_irpf(req.competencia),
    )?;
    Ok(Json(resultado))
}

//! Competência (mês/ano de referência fiscal)
//!
//! Aceita `"MM/AAAA"` (formato exibido no portal) e `"AAAA-MM"` (formato
//! gravado no banco e usado nos caminhos do storage).

use chrono::Datelike;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const ANO_MINIMO: i32 = 2000;
const ANO_MAXIMO: i32 = 2100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Competencia {
    ano: i32,
    mes: u32,
}

impl Competencia {
    pub fn new(ano: i32, mes: u32) -> Result<Self, String> {
        if !(1..=12).contains(&mes) {
            return Err(format!("Mês inválido na competência: {}", mes));
        }
        if !(ANO_MINIMO..=ANO_MAXIMO).contains(&ano) {
            return Err(format!("Ano fora do intervalo aceito: {}", ano));
        }
        Ok(Self { ano, mes })
    }

    /// Competência do mês corrente (UTC)
    pub fn atual() -> Self {
        let hoje = chrono::Utc::now();
        Self {
            ano: hoje.year(),
            mes: hoje.month(),
        }
    }

    pub fn ano(&self) -> i32 {
        self.ano
    }

    pub fn mes(&self) -> u32 {
        self.mes
    }

    /// `None` antes de 01/2000
    pub fn anterior(&self) -> Option<Self> {
        if self.mes == 1 {
            Self::new(self.ano - 1, 12).ok()
        } else {
            Self::new(self.ano, self.mes - 1).ok()
        }
    }

    /// `None` depois de 12/2100
    pub fn proxima(&self) -> Option<Self> {
        if self.mes == 12 {
            Self::new(self.ano + 1, 1).ok()
        } else {
            Self::new(self.ano, self.mes + 1).ok()
        }
    }

    /// Chave `AAAA-MM` (banco e storage)
    pub fn chave(&self) -> String {
        format!("{:04}-{:02}", self.ano, self.mes)
    }
}

impl fmt::Display for Competencia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:04}", self.mes, self.ano)
    }
}

impl FromStr for Competencia {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (ano, mes) = if let Some((mes, ano)) = s.split_once('/') {
            (ano, mes)
        } else if let Some((ano, mes)) = s.split_once('-') {
            (ano, mes)
        } else {
            return Err(format!("Competência em formato desconhecido: '{}'", s));
        };

        // `parse` aceitaria sinal ("+3")
        let so_digitos = |parte: &str| !parte.is_empty() && parte.chars().all(|c| c.is_ascii_digit());
        if !so_digitos(ano) || !so_digitos(mes) {
            return Err(format!("Competência deve ter apenas dígitos: '{}'", s));
        }

        let ano: i32 = ano
            .parse()
            .map_err(|_| format!("Ano inválido na competência: '{}'", s))?;
        let mes: u32 = mes
            .parse()
            .map_err(|_| format!("Mês inválido na competência: '{}'", s))?;

        Competencia::new(ano, mes)
    }
}

impl Serialize for Competencia {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.chave())
    }
}

impl<'de> Deserialize<'de> for Competencia {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let texto = String::deserialize(deserializer)?;
        texto.parse().map_err(serde::de::Error::custom)
    }
}

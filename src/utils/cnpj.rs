//! CNPJ: validação dos dígitos verificadores e formatação

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const PESOS_PRIMEIRO: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const PESOS_SEGUNDO: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// CNPJ válido, armazenado apenas com os 14 dígitos
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cnpj(String);

fn digito_verificador(digitos: &[u32], pesos: &[u32]) -> u32 {
    let soma: u32 = digitos.iter().zip(pesos).map(|(d, p)| d * p).sum();
    match soma % 11 {
        0 | 1 => 0,
        resto => 11 - resto,
    }
}

impl Cnpj {
    pub fn digitos(&self) -> &str {
        &self.0
    }

    /// `00.000.000/0000-00`
    pub fn formatado(&self) -> String {
        let d = &self.0;
        format!("{}.{}.{}/{}-{}", &d[0..2], &d[2..5], &d[5..8], &d[8..12], &d[12..14])
    }
}

impl FromStr for Cnpj {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.chars().any(|c| !(c.is_ascii_digit() || matches!(c, '.' | '/' | '-' | ' '))) {
            return Err(format!("CNPJ contém caracteres inválidos: '{}'", s));
        }

        let digitos: Vec<u32> = s.chars().filter_map(|c| c.to_digit(10)).collect();

        if digitos.len() != 14 {
            return Err(format!("CNPJ deve ter 14 dígitos, recebido {}", digitos.len()));
        }

        if digitos.iter().all(|d| *d == digitos[0]) {
            return Err("CNPJ com todos os dígitos iguais".to_string());
        }

        let primeiro = digito_verificador(&digitos[..12], &PESOS_PRIMEIRO);
        let segundo = digito_verificador(&digitos[..13], &PESOS_SEGUNDO);

        if digitos[12] != primeiro || digitos[13] != segundo {
            return Err("Dígitos verificadores do CNPJ não conferem".to_string());
        }

        Ok(Cnpj(digitos.iter().map(|d| d.to_string()).collect()))
    }
}

impl fmt::Display for Cnpj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatado())
    }
}

impl Serialize for Cnpj {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Cnpj {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let texto = String::deserialize(deserializer)?;
        texto.parse().map_err(serde::de::Error::custom)
    }
}

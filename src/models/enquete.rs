use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub const MIN_OPCOES: usize = 2;
pub const MAX_OPCOES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpcaoEnquete {
    pub id: Uuid,
    pub texto: String,
}

/// Linha da tabela `enquetes` (opções em coluna JSONB)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enquete {
    pub id: Uuid,
    pub pergunta: String,
    pub opcoes: Vec<OpcaoEnquete>,
    pub empresa_id: Option<Uuid>,
    pub encerra_em: Option<DateTime<Utc>>,
    pub permite_alterar_voto: bool,
    pub criado_por: Uuid,
    pub criado_em: DateTime<Utc>,
}

impl Enquete {
    pub fn encerrada(&self, agora: DateTime<Utc>) -> bool {
        self.encerra_em.map_or(false, |encerra| encerra <= agora)
    }

    pub fn tem_opcao(&self, opcao_id: Uuid) -> bool {
        self.opcoes.iter().any(|o| o.id == opcao_id)
    }

    pub fn visivel_para(&self, empresa_id: Option<Uuid>, is_admin: bool) -> bool {
        is_admin || self.empresa_id.is_none() || self.empresa_id == empresa_id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NovaEnqueteRequest {
    pub pergunta: String,
    pub opcoes: Vec<String>,
    #[serde(default)]
    pub encerra_em: Option<DateTime<Utc>>,
    #[serde(default)]
    pub permite_alterar_voto: bool,
    #[serde(default)]
    pub empresa_id: Option<Uuid>,
}

impl NovaEnqueteRequest {
    /// Valida e devolve as opções já com identificadores
    pub fn validar(&self) -> Result<Vec<OpcaoEnquete>, String> {
        if self.pergunta.trim().is_empty() {
            return Err("pergunta não pode ser vazia".to_string());
        }
        if !(MIN_OPCOES..=MAX_OPCOES).contains(&self.opcoes.len()) {
            return Err(format!(
                "enquete precisa de {} a {} opções",
                MIN_OPCOES, MAX_OPCOES
            ));
        }

        let mut vistas = HashSet::new();
        let mut opcoes = Vec::with_capacity(self.opcoes.len());
        for texto in &self.opcoes {
            let texto = texto.trim();
            if texto.is_empty() {
                return Err("opções não podem ser vazias".to_string());
            }
            if !vistas.insert(texto.to_lowercase()) {
                return Err(format!("opção repetida: '{}'", texto));
            }
            opcoes.push(OpcaoEnquete {
                id: Uuid::new_v4(),
                texto: texto.to_string(),
            });
        }
        Ok(opcoes)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NovaEnquete {
    pub pergunta: String,
    pub opcoes: Vec<OpcaoEnquete>,
    pub empresa_id: Option<Uuid>,
    pub encerra_em: Option<DateTime<Utc>>,
    pub permite_alterar_voto: bool,
    pub criado_por: Uuid,
}

/// Linha de `enquete_votos` (único por enquete + usuário)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voto {
    pub enquete_id: Uuid,
    pub usuario_id: Uuid,
    pub opcao_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VotoRequest {
    pub opcao_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultadoOpcao {
    pub opcao_id: Uuid,
    pub texto: String,
    pub votos: u64,
    pub percentual: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultadoEnquete {
    pub enquete_id: Uuid,
    pub pergunta: String,
    pub total_votos: u64,
    pub encerrada: bool,
    pub opcoes: Vec<ResultadoOpcao>,
}

/// Conta votos por opção; votos em opções desconhecidas são ignorados
pub fn apurar(enquete: &Enquete, votos: &[Voto], agora: DateTime<Utc>) -> ResultadoEnquete {
    let mut contagem: HashMap<Uuid, u64> = HashMap::new();
    for voto in votos.iter().filter(|v| enquete.tem_opcao(v.opcao_id)) {
        *contagem.entry(voto.opcao_id).or_default() += 1;
    }
    let total: u64 = contagem.values().sum();

    let opcoes = enquete
        .opcoes
        .iter()
        .map(|opcao| {
            let votos = contagem.get(&opcao.id).copied().unwrap_or(0);
            let percentual = if total == 0 {
                Decimal::ZERO
            } else {
                (Decimal::from(votos) * Decimal::ONE_HUNDRED / Decimal::from(total))
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            };
            ResultadoOpcao {
                opcao_id: opcao.id,
                texto: opcao.texto.clone(),
                votos,
                percentual,
            }
        })
        .collect();

    ResultadoEnquete {
        enquete_id: enquete.id,
        pergunta: enquete.pergunta.clone(),
        total_votos: total,
        encerrada: enquete.encerrada(agora),
        opcoes,
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordem de declaração define a ordenação (`Alta` é a maior)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Prioridade {
    Baixa,
    #[default]
    Normal,
    Alta,
}

/// Linha da tabela `comunicados`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comunicado {
    pub id: Uuid,
    pub titulo: String,
    pub conteudo: String,
    pub prioridade: Prioridade,
    /// `None` = visível para todas as empresas
    pub empresa_id: Option<Uuid>,
    pub expira_em: Option<DateTime<Utc>>,
    pub criado_por: Uuid,
    pub criado_em: DateTime<Utc>,
}

impl Comunicado {
    pub fn expirado(&self, agora: DateTime<Utc>) -> bool {
        self.expira_em.map_or(false, |expira| expira <= agora)
    }

    pub fn visivel_para(&self, empresa_id: Option<Uuid>, is_admin: bool) -> bool {
        is_admin || self.empresa_id.is_none() || self.empresa_id == empresa_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NovoComunicado {
    pub titulo: String,
    pub conteudo: String,
    #[serde(default)]
    pub prioridade: Prioridade,
    #[serde(default)]
    pub empresa_id: Option<Uuid>,
    #[serde(default)]
    pub expira_em: Option<DateTime<Utc>>,
}

impl NovoComunicado {
    pub fn validar(&self, agora: DateTime<Utc>) -> Result<(), String> {
        let tamanho = self.titulo.trim().chars().count();
        if !(3..=200).contains(&tamanho) {
            return Err("titulo deve ter entre 3 e 200 caracteres".to_string());
        }
        if self.conteudo.trim().is_empty() {
            return Err("conteudo não pode ser vazio".to_string());
        }
        if matches!(self.expira_em, Some(expira) if expira <= agora) {
            return Err("expira_em deve estar no futuro".to_string());
        }
        Ok(())
    }
}

/// Registro de leitura em `comunicados_leituras`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeituraComunicado {
    pub comunicado_id: Uuid,
    pub usuario_id: Uuid,
}

/// Ordena por prioridade desc, depois mais recentes primeiro
pub fn ordenar_para_exibicao(comunicados: &mut [Comunicado]) {
    comunicados.sort_by(|a, b| {
        b.prioridade
            .cmp(&a.prioridade)
            .then_with(|| b.criado_em.cmp(&a.criado_em))
    });
}

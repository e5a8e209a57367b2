pub mod alinhamento;
pub mod cnpj;
pub mod comunicados;
pub mod conciliacao;
pub mod documentos;
pub mod enquetes;
pub mod fechamento;
pub mod n8n;
pub mod notificacoes;
pub mod usuarios;

pub use cnpj::CnpjClient;
pub use n8n::N8nClient;
pub use notificacoes::NotificacaoHub;

use crate::utils::AppError;

/// `NotFound` da plataforma vira 404 com o nome do recurso
pub(crate) fn nao_encontrado(recurso: String) -> impl FnOnce(supabase::SupabaseError) -> AppError {
    move |e| {
        if e.is_not_found() {
            AppError::NotFound(recurso)
        } else {
            e.into()
        }
    }
}

/// Estado e sessões para os testes dos serviços contra servidores mock
#[cfg(test)]
pub(crate) mod testes {
    use serde_json::{json, Value};
    use uuid::Uuid;

    use crate::auth::{Papel, Sessao};
    use crate::config::Settings;
    use crate::AppState;

    pub fn estado(supabase_url: &str, n8n_url: &str) -> AppState {
        AppState::new(Settings::para_testes(supabase_url, n8n_url)).expect("estado de teste")
    }

    pub fn sessao_admin() -> Sessao {
        Sessao {
            usuario_id: Uuid::new_v4(),
            email: "admin@wsgestao.com.br".to_string(),
            papel: Papel::Admin,
            empresa_id: None,
        }
    }

    pub fn sessao_cliente(empresa_id: Uuid) -> Sessao {
        Sessao {
            usuario_id: Uuid::new_v4(),
            email: "cliente@empresa.com.br".to_string(),
            papel: Papel::Cliente,
            empresa_id: Some(empresa_id),
        }
    }

    /// Linha de `conciliacoes` como a plataforma devolve
    pub fn conciliacao_json(id: Uuid, empresa_id: Uuid, status: &str, tentativas: u32) -> Value {
        json!({
            "id": id,
            "empresa_id": empresa_id,
            "competencia": "2025-03",
            "status": status,
            "documento_ids": [],
            "tentativas": tentativas,
            "iniciado_em": "2025-04-01T12:00:00Z",
            "alinhamento_disparado_em": null,
            "mensagem": null,
            "criado_por": Uuid::new_v4(),
            "criado_em": "2025-04-01T12:00:00Z",
            "atualizado_em": null
        })
    }
}

pub mod admin;
pub mod calculadoras;
pub mod cnpj;
pub mod comunicados;
pub mod conciliacao;
pub mod documentos;
pub mod enquetes;
pub mod fechamento;
pub mod health;
pub mod n8n_webhook;
pub mod notificacoes;

pub use health::{health_check, ready_check, status_check};
pub use n8n_webhook::receber_status;

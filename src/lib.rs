// Biblioteca do backend WS Gestão Contábil
// Expõe módulos para uso em testes e no binário

pub mod auth;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use supabase::SupabaseClient;

use auth::ValidadorSessao;
use services::{CnpjClient, N8nClient, NotificacaoHub};
use utils::{AppError, AppResult};

// AppState é definido aqui para ser compartilhado
#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub supabase: SupabaseClient,
    pub n8n: N8nClient,
    pub sessoes: ValidadorSessao,
    pub notificacoes: NotificacaoHub,
    pub cnpj: CnpjClient,
}

impl AppState {
    pub fn new(settings: config::Settings) -> AppResult<Self> {
        let supabase = SupabaseClient::new(
            settings.supabase.url.clone(),
            settings.supabase.service_role_key.clone(),
        )
        .map_err(|e| AppError::ConfigError(format!("Failed to create platform client: {}", e)))?;

        Ok(Self {
            supabase,
            n8n: N8nClient::new(&settings.n8n)?,
            sessoes: ValidadorSessao::new(&settings.supabase.jwt_secret)?,
            notificacoes: NotificacaoHub::new(),
            cnpj: CnpjClient::new(&settings.cnpj.base_url)?,
            settings,
        })
    }
}

use tracing::{debug, error, info, warn};

pub fn log_request_received(endpoint: &str, method: &str) {
    info!("Request received: {} {}", method, endpoint);
}

pub fn log_request_processed(endpoint: &str, status: u16, duration_ms: u64) {
    info!("Request processed: {} - Status: {} - Duration: {}ms",
          endpoint, status, duration_ms);
}

pub fn log_n8n_dispatch(webhook: &str, referencia: &str) {
    info!("📤 Webhook n8n '{}' disparado para {}", webhook, referencia);
}

pub fn log_n8n_error(webhook: &str, attempt: u32, error: &str) {
    error!("n8n webhook error: {} - Tentativa: {} - Error: {}", webhook, attempt, error);
}

pub fn log_status_transition(entidade: &str, id: &str, de: &str, para: &str) {
    info!("🔄 {} {}: {} → {}", entidade, id, de, para);
}

pub fn log_supabase_error(operacao: &str, error: &str) {
    error!("Supabase error: {} - Error: {}", operacao, error);
}

pub fn log_config_loaded(env: &str) {
    info!("Configuration loaded successfully for environment: {}", env);
}

pub fn log_server_startup(port: u16) {
    info!("🚀 WS Gestão Contábil backend starting on port {}", port);
}

pub fn log_server_ready(port: u16) {
    info!("✅ Server ready and listening on http://0.0.0.0:{}", port);
}

pub fn log_health_check() {
    debug!("Health check requested");
}

pub fn log_integration_status_check() {
    debug!("Integration status check requested");
}

pub fn log_validation_error(field: &str, message: &str) {
    warn!("Validation error: {} - {}", field, message);
}

pub fn log_access_denied(usuario: &str, recurso: &str) {
    warn!("🚫 Acesso negado: usuário {} → {}", usuario, recurso);
}

pub fn log_info(message: &str) {
    info!("{}", message);
}

pub fn log_error(message: &str) {
    error!("{}", message);
}

pub fn log_warning(message: &str) {
    warn!("{}", message);
}

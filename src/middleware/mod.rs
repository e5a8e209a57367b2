/// Middleware layer para o Axum router
///
/// - Chave de operação para as rotas `/admin/*`

pub mod admin_auth;

pub use admin_auth::require_admin_key;

/// WS Gestão Contábil: backend do portal do escritório
///
/// - API REST multi-empresa sobre Supabase (tabelas, storage e auth)
/// - Conciliação e fechamento executados por workflows n8n
/// - Monitor em background que dispara o alinhamento das conciliações
/// - Notificações em tempo real via SSE

use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use ws_gestao_contabil::{config, routes, services, utils, AppState};

use config::Settings;
use utils::logging::*;

/// Tentativas de conexão com a plataforma antes de subir mesmo assim
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 🔧 Carregar variáveis de ambiente do arquivo .env (se existir)
    let dotenv_carregado = dotenvy::dotenv().is_ok();

    // Inicializar tracing (RUST_LOG sobrescreve o nível padrão)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if dotenv_carregado {
        tracing::info!("✅ Arquivo .env carregado com sucesso");
    } else {
        // Em produção não existe .env - variáveis vêm do ambiente
        tracing::debug!("Arquivo .env não encontrado - usando variáveis de ambiente do sistema");
    }

    // Carregar configurações
    let settings = Settings::new().context("Failed to load settings")?;

    log_config_loaded(&std::env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string()));

    if settings.n8n.callback_secret.is_none() {
        log_warning("⚠️  N8N_CALLBACK_SECRET não configurado - callbacks do n8n aceitos sem assinatura");
    }
    if settings.server.public_url.is_none() {
        log_warning("⚠️  server.public_url não configurada - n8n não receberá URL de callback");
    }

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(settings.server.port);
    let host = settings.server.host.clone();

    let app_state = Arc::new(AppState::new(settings).context("Failed to initialize services")?);

    verificar_plataforma(&app_state).await;

    // Monitor de alinhamento em background
    let monitor = services::alinhamento::iniciar_monitor(app_state.clone());

    let app = routes::router(app_state);

    let listener = TcpListener::bind(format!("{}:{}", host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;

    log_server_startup(port);
    log_server_ready(port);

    // Graceful shutdown com signal handling
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitor.abort();
    log_info("🛑 Server shut down gracefully");
    Ok(())
}

/// Testa a conexão com a plataforma com backoff; sobe o servidor mesmo sem ela
/// (o `/ready` continua reportando 503 até a conexão voltar)
async fn verificar_plataforma(state: &AppState) {
    for attempt in 1..=MAX_RETRIES {
        match state.supabase.test_connection().await {
            Ok(()) => {
                log_info("✅ Conexão com a plataforma OK");
                return;
            }
            Err(e) if attempt < MAX_RETRIES => {
                let backoff_ms = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                tracing::warn!(
                    "⚠️ Tentativa {}/{} de conexão falhou: {}. Retry em {}ms...",
                    attempt, MAX_RETRIES, e, backoff_ms
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff_ms)).await;
            }
            Err(e) => {
                log_error(&format!("❌ Plataforma indisponível após {} tentativas: {}", MAX_RETRIES, e));
            }
        }
    }
}

/// Signal handler para graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log_error(&format!("failed to install Ctrl+C handler: {}", e));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sinal) => {
                sinal.recv().await;
            }
            Err(e) => {
                log_error(&format!("failed to install signal handler: {}", e));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log_info("🛑 Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            log_info("🛑 Received SIGTERM, shutting down gracefully...");
        }
    }
}

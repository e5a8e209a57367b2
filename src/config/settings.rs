use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub supabase: SupabaseSettings,
    pub n8n: N8nSettings,
    pub conciliacao: ConciliacaoSettings,
    pub uploads: UploadSettings,
    pub cnpj: CnpjSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// URL pública do serviço, enviada ao n8n como destino dos callbacks
    #[serde(default)]
    pub public_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SupabaseSettings {
    pub url: String,
    pub service_role_key: String,
    /// Segredo HS256 com que a plataforma assina os JWT de sessão
    pub jwt_secret: String,
    pub bucket_documentos: String,
    pub bucket_fechamentos: String,
    pub signed_url_ttl_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct N8nSettings {
    pub base_url: String,
    pub webhook_conciliacao: String,
    pub webhook_alinhamento: String,
    pub webhook_fechamento: String,
    /// Segredo HMAC dos callbacks de status (sem segredo, não valida)
    pub callback_secret: Option<String>,
    pub timeout_secs: u64,
    pub max_tentativas_envio: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConciliacaoSettings {
    /// Teto de tentativas de alinhamento por conciliação
    pub max_tentativas: u32,
    /// Fração do tempo estimado em que o webhook de alinhamento é disparado
    pub limiar_disparo: f64,
    pub segundos_base: u64,
    pub segundos_por_documento: u64,
    pub intervalo_monitor_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UploadSettings {
    pub max_bytes: usize,
    pub tipos_permitidos: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CnpjSettings {
    pub base_url: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            // Arquivo de configuração base
            .add_source(File::with_name("config/default").required(false))
            // Arquivo específico do ambiente
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // WS_GESTAO__N8N__BASE_URL -> n8n.base_url
            .add_source(Environment::with_prefix("WS_GESTAO").separator("__"));

        // Nomes usados pela plataforma e pelo n8n nos .env existentes
        let overrides = [
            ("SUPABASE_URL", "supabase.url"),
            ("SUPABASE_SERVICE_ROLE_KEY", "supabase.service_role_key"),
            ("SUPABASE_JWT_SECRET", "supabase.jwt_secret"),
            ("N8N_BASE_URL", "n8n.base_url"),
            ("N8N_CALLBACK_SECRET", "n8n.callback_secret"),
        ];
        for (var, chave) in overrides {
            if let Ok(valor) = std::env::var(var) {
                builder = builder.set_override(chave, valor)?;
            }
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validar()?;
        Ok(settings)
    }

    fn validar(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.conciliacao.limiar_disparo) {
            return Err(ConfigError::Message(format!(
                "conciliacao.limiar_disparo fora de [0, 1]: {}",
                self.conciliacao.limiar_disparo
            )));
        }
        if self.conciliacao.max_tentativas == 0 {
            return Err(ConfigError::Message(
                "conciliacao.max_tentativas deve ser ao menos 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Configuração completa apontando para serviços locais/mocks
    #[cfg(test)]
    pub fn para_testes(supabase_url: &str, n8n_url: &str) -> Self {
        Settings {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: Vec::new(),
                public_url: Some("http://api.teste".to_string()),
            },
            supabase: SupabaseSettings {
                url: supabase_url.to_string(),
                service_role_key: "service-key".to_string(),
                jwt_secret: "segredo-de-teste".to_string(),
                bucket_documentos: "documentos".to_string(),
                bucket_fechamentos: "fechamentos".to_string(),
                signed_url_ttl_secs: 3600,
            },
            n8n: N8nSettings {
                base_url: n8n_url.to_string(),
                webhook_conciliacao: "/webhook/conciliacao".to_string(),
                webhook_alinhamento: "/webhook/alinhamento".to_string(),
                webhook_fechamento: "/webhook/fechamento".to_string(),
                callback_secret: Some("callback-secret".to_string()),
                timeout_secs: 5,
                max_tentativas_envio: 1,
            },
            conciliacao: ConciliacaoSettings {
                max_tentativas: 3,
                limiar_disparo: 0.8,
                segundos_base: 60,
                segundos_por_documento: 20,
                intervalo_monitor_secs: 15,
            },
            uploads: UploadSettings {
                max_bytes: 1024,
                tipos_permitidos: vec!["application/pdf".to_string(), "text/csv".to_string()],
            },
            cnpj: CnpjSettings {
                base_url: format!("{}/cnpj", n8n_url),
            },
        }
    }
}

//! Cliente da plataforma gerenciada (banco, autenticação e arquivos)
//!
//! Cobre apenas o que o backend precisa com a chave `service_role`:
//!
//! - **REST** (`/rest/v1`): consultas filtradas, inserção, atualização e remoção
//! - **Auth admin** (`/auth/v1/admin`): criação de usuários, troca de senha e
//!   links de recuperação
//! - **Storage** (`/storage/v1`): upload, URLs assinadas e remoção de objetos
//!
//! # Exemplo
//!
//! ```rust,no_run
//! use supabase::{Consulta, SupabaseClient};
//!
//! # async fn exemplo() -> supabase::Result<()> {
//! let client = SupabaseClient::new("https://projeto.supabase.co", "service-role-key")?;
//!
//! let pendentes: Vec<serde_json::Value> = client
//!     .select(&Consulta::tabela("conciliacoes").eq("status", "pendente"))
//!     .await?;
//!
//! let url = client
//!     .criar_url_assinada("documentos", "empresa/2025-01/extrato.pdf", 3600)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod rest;
pub mod storage;

pub use auth::{LinkRecuperacao, NovoUsuario, UsuarioAuth};
pub use client::SupabaseClient;
pub use error::{Result, SupabaseError};
pub use rest::{Consulta, Ordem};
pub use storage::UrlAssinada;

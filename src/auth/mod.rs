//! # Autenticação de sessões do portal
//!
//! O navegador autentica direto na plataforma e envia o JWT de sessão em
//! `Authorization: Bearer`. Aqui o token é validado localmente (HS256 com o
//! segredo da plataforma) e convertido em [`Sessao`].
//!
//! Como o backend usa a chave `service_role`, as políticas de RLS não se
//! aplicam às suas consultas: o isolamento entre empresas é refeito em
//! [`Sessao::pode_acessar`].
//!
//! ## Estrutura:
//! - `token.rs`: validação do JWT e claims
//! - `sessao.rs`: papel, sessão e extractor do axum

pub mod sessao;
pub mod token;

pub use sessao::{Papel, Sessao};
pub use token::ValidadorSessao;

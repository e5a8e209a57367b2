pub mod arquivos;
pub mod cnpj;
pub mod competencia;
pub mod error;
pub mod logging;

pub use cnpj::Cnpj;
pub use competencia::Competencia;
pub use error::*;

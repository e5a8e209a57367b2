pub mod comunicado;
pub mod conciliacao;
pub mod documento;
pub mod enquete;
pub mod fechamento;
pub mod n8n;
pub mod notificacao;
pub mod usuario;

pub use comunicado::{Comunicado, NovoComunicado, Prioridade};
pub use conciliacao::{Conciliacao, CriarConciliacaoRequest, NovaConciliacao, StatusConciliacao};
pub use documento::{CategoriaDocumento, Documento, NovoDocumento};
pub use enquete::{Enquete, OpcaoEnquete, ResultadoEnquete, Voto};
pub use fechamento::{CriarFechamentoRequest, Fechamento, NovoFechamento, StatusFechamento};
pub use n8n::{StatusCallback, TipoProcesso};
pub use notificacao::{Notificacao, TipoNotificacao};
pub use usuario::{NovoUsuarioRequest, PerfilUsuario};

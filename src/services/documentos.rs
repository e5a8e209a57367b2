use serde_json::json;
use supabase::{Consulta, Ordem, UrlAssinada};
use uuid::Uuid;

use super::nao_encontrado;
use crate::auth::Sessao;
use crate::models::{CategoriaDocumento, Documento, NovoDocumento, Notificacao, TipoNotificacao};
use crate::utils::arquivos::{caminho_documento, sanitizar_nome_arquivo};
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult, Competencia};
use crate::AppState;

pub const TABELA: &str = "documentos";

/// Arquivo recebido do formulário multipart, ainda não persistido
#[derive(Debug, Clone)]
pub struct UploadDocumento {
    pub empresa_id: Uuid,
    pub competencia: Competencia,
    pub categoria: CategoriaDocumento,
    pub nome_arquivo: String,
    pub content_type: String,
    pub conteudo: Vec<u8>,
}

/// Tipo MIME sem parâmetros (`text/csv; charset=utf-8` → `text/csv`)
fn tipo_base(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn validar_upload(state: &AppState, upload: &UploadDocumento) -> AppResult<()> {
    let limites = &state.settings.uploads;

    if upload.conteudo.is_empty() {
        return Err(AppError::ValidationError("arquivo vazio".to_string()));
    }
    if upload.conteudo.len() > limites.max_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "arquivo com {} bytes excede o limite de {}",
            upload.conteudo.len(),
            limites.max_bytes
        )));
    }

    let tipo = tipo_base(&upload.content_type);
    if !limites.tipos_permitidos.iter().any(|t| t.eq_ignore_ascii_case(&tipo)) {
        log_validation_error("content_type", &tipo);
        return Err(AppError::ValidationError(format!("tipo de arquivo não permitido: {}", tipo)));
    }
    Ok(())
}

pub async fn enviar_documento(
    state: &AppState,
    sessao: &Sessao,
    upload: UploadDocumento,
) -> AppResult<Documento> {
    sessao.exigir_acesso(upload.empresa_id)?;
    validar_upload(state, &upload)?;

    let nome = sanitizar_nome_arquivo(&upload.nome_arquivo);
    let caminho = caminho_documento(upload.empresa_id, &upload.competencia, &nome);
    let content_type = tipo_base(&upload.content_type);
    let tamanho_bytes = upload.conteudo.len() as i64;

    state
        .supabase
        .upload(
            &state.settings.supabase.bucket_documentos,
            &caminho,
            upload.conteudo,
            &content_type,
            false,
        )
        .await?;

    let novo = NovoDocumento {
        empresa_id: upload.empresa_id,
        competencia: upload.competencia,
        categoria: upload.categoria,
        nome_original: upload.nome_arquivo,
        caminho: caminho.clone(),
        content_type,
        tamanho_bytes,
        enviado_por: sessao.usuario_id,
    };

    let documento: Documento = match state.supabase.insert(TABELA, &novo).await {
        Ok(documento) => documento,
        Err(e) => {
            // Sem linha o objeto fica órfão no bucket
            log_supabase_error("insert documentos", &e.to_string());
            if let Err(erro_limpeza) = state
                .supabase
                .remover(&state.settings.supabase.bucket_documentos, &[caminho.clone()])
                .await
            {
                tracing::warn!("⚠️ Objeto órfão {} não removido do bucket: {}", caminho, erro_limpeza);
            }
            return Err(e.into());
        }
    };

    log_info(&format!(
        "📄 Documento {} enviado para empresa {} ({})",
        documento.id, documento.empresa_id, documento.competencia
    ));

    state.notificacoes.publicar(Notificacao::new(
        Some(documento.empresa_id),
        TipoNotificacao::DocumentoEnviado,
        format!("Novo documento: {}", nome),
        json!({
            "documento_id": documento.id,
            "competencia": documento.competencia,
            "categoria": documento.categoria,
        }),
    ));

    Ok(documento)
}

pub async fn listar_documentos(
    state: &AppState,
    sessao: &Sessao,
    empresa_id: Option<Uuid>,
    competencia: Option<Competencia>,
) -> AppResult<Vec<Documento>> {
    let mut consulta = Consulta::tabela(TABELA).order("criado_em", Ordem::Desc);

    if let Some(empresa_id) = sessao.empresa_da_consulta(empresa_id)? {
        consulta = consulta.eq("empresa_id", empresa_id);
    }
    if let Some(competencia) = competencia {
        consulta = consulta.eq("competencia", competencia.chave());
    }

    Ok(state.supabase.select(&consulta).await?)
}

/// Busca o documento e aplica o isolamento por empresa
pub async fn buscar_documento(state: &AppState, sessao: &Sessao, id: Uuid) -> AppResult<Documento> {
    let documento: Documento = state
        .supabase
        .select_one(&Consulta::tabela(TABELA).eq("id", id))
        .await
        .map_err(nao_encontrado(format!("documento {}", id)))?;

    sessao.exigir_acesso(documento.empresa_id)?;
    Ok(documento)
}

pub async fn buscar_documentos(state: &AppState, ids: &[Uuid]) -> AppResult<Vec<Documento>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let consulta = Consulta::tabela(TABELA).in_("id", ids.iter());
    Ok(state.supabase.select(&consulta).await?)
}

pub async fn url_download(state: &AppState, sessao: &Sessao, id: Uuid) -> AppResult<UrlAssinada> {
    let documento = buscar_documento(state, sessao, id).await?;
    let url = state
        .supabase
        .criar_url_assinada(
            &state.settings.supabase.bucket_documentos,
            &documento.caminho,
            state.settings.supabase.signed_url_ttl_secs,
        )
        .await?;
    Ok(url)
}

pub async fn remover_documento(state: &AppState, sessao: &Sessao, id: Uuid) -> AppResult<()> {
    sessao.exigir_admin()?;
    let documento = buscar_documento(state, sessao, id).await?;

    // Linha primeiro: sem ela o documento some do portal mesmo se o bucket falhar
    state.supabase.delete(&Consulta::tabela(TABELA).eq("id", id)).await?;
    if let Err(e) = state
        .supabase
        .remover(&state.settings.supabase.bucket_documentos, &[documento.caminho.clone()])
        .await
    {
        tracing::warn!("⚠️ Objeto órfão {} não removido do bucket: {}", documento.caminho, e);
    }

    log_info(&format!("🗑️ Documento {} removido", id));

    state.notificacoes.publicar(Notificacao::new(
        Some(documento.empresa_id),
        TipoNotificacao::DocumentoRemovido,
        format!("Documento removido: {}", documento.nome_original),
        json!({ "documento_id": id }),
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testes::{estado, sessao_admin, sessao_cliente};
    use httpmock::prelude::*;
    use httpmock::Method::DELETE;
    use serde_json::Value;

    fn upload(empresa_id: Uuid, content_type: &str, conteudo: Vec<u8>) -> UploadDocumento {
        UploadDocumento {
            empresa_id,
            competencia: "03/2025".parse().expect("competência"),
            categoria: CategoriaDocumento::ExtratoBancario,
            nome_arquivo: "Extrato Março.pdf".to_string(),
            content_type: content_type.to_string(),
            conteudo,
        }
    }

    fn documento_json(id: Uuid, empresa_id: Uuid) -> Value {
        json!({
            "id": id,
            "empresa_id": empresa_id,
            "competencia": "2025-03",
            "categoria": "extrato_bancario",
            "nome_original": "Extrato Março.pdf",
            "caminho": format!("{}/2025-03/abc-extrato_marco.pdf", empresa_id),
            "content_type": "application/pdf",
            "tamanho_bytes": 3,
            "enviado_por": Uuid::new_v4(),
            "criado_em": "2025-04-01T12:00:00Z"
        })
    }

    #[test]
    fn test_tipo_base() {
        assert_eq!(tipo_base("Text/CSV; charset=utf-8"), "text/csv");
        assert_eq!(tipo_base("application/pdf"), "application/pdf");
    }

    #[test]
    fn test_validar_upload() {
        let state = estado("http://127.0.0.1:1", "http://127.0.0.1:1");
        let empresa = Uuid::new_v4();

        assert!(validar_upload(&state, &upload(empresa, "application/pdf", b"%PDF".to_vec())).is_ok());
        assert!(validar_upload(&state, &upload(empresa, "text/csv; charset=utf-8", b"a;b".to_vec())).is_ok());

        let vazio = validar_upload(&state, &upload(empresa, "application/pdf", Vec::new()));
        assert!(matches!(vazio, Err(AppError::ValidationError(_))));

        // Limite de teste: 1024 bytes
        let grande = validar_upload(&state, &upload(empresa, "application/pdf", vec![0; 1025]));
        assert!(matches!(grande, Err(AppError::PayloadTooLarge(_))));

        let executavel = validar_upload(&state, &upload(empresa, "application/x-msdownload", b"MZ".to_vec()));
        assert!(matches!(executavel, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_enviar_documento_de_outra_empresa() {
        let state = estado("http://127.0.0.1:1", "http://127.0.0.1:1");
        let resultado = enviar_documento(
            &state,
            &sessao_cliente(Uuid::new_v4()),
            upload(Uuid::new_v4(), "application/pdf", b"%PDF".to_vec()),
        )
        .await;

        assert!(matches!(resultado, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_enviar_documento() {
        let supabase = MockServer::start_async().await;
        let (id, empresa) = (Uuid::new_v4(), Uuid::new_v4());

        let objeto = supabase
            .mock_async(|when, then| {
                when.method(POST)
                    .path_contains(format!("/storage/v1/object/documentos/{}/2025-03/", empresa));
                then.status(200).json_body(json!({ "Key": "documentos/x" }));
            })
            .await;
        let linha = supabase
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/documentos")
                    .json_body_partial(r#"{"competencia":"2025-03","content_type":"application/pdf"}"#);
                then.status(201).json_body(json!([documento_json(id, empresa)]));
            })
            .await;

        let state = estado(&supabase.base_url(), "http://127.0.0.1:1");
        let documento = enviar_documento(
            &state,
            &sessao_cliente(empresa),
            upload(empresa, "application/pdf", b"%PDF".to_vec()),
        )
        .await
        .expect("documento");

        assert_eq!(documento.id, id);
        objeto.assert_hits_async(1).await;
        linha.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_falha_na_linha_remove_objeto_enviado() {
        let supabase = MockServer::start_async().await;
        let empresa = Uuid::new_v4();

        supabase
            .mock_async(|when, then| {
                when.method(POST).path_contains("/storage/v1/object/documentos/");
                then.status(200).json_body(json!({ "Key": "documentos/x" }));
            })
            .await;
        supabase
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/documentos");
                then.status(500).body("falha interna");
            })
            .await;
        let limpeza = supabase
            .mock_async(|when, then| {
                when.method(DELETE).path("/storage/v1/object/documentos");
                then.status(200).json_body(json!([]));
            })
            .await;

        let state = estado(&supabase.base_url(), "http://127.0.0.1:1");
        let resultado = enviar_documento(
            &state,
            &sessao_cliente(empresa),
            upload(empresa, "application/pdf", b"%PDF".to_vec()),
        )
        .await;

        assert!(resultado.is_err());
        limpeza.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_remover_documento_apaga_linha_mesmo_com_bucket_fora() {
        let supabase = MockServer::start_async().await;
        let (id, empresa) = (Uuid::new_v4(), Uuid::new_v4());

        supabase
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/documentos");
                then.status(200).json_body(json!([documento_json(id, empresa)]));
            })
            .await;
        let linha = supabase
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/rest/v1/documentos")
                    .query_param("id", format!("eq.{}", id));
                then.status(204);
            })
            .await;
        let objeto = supabase
            .mock_async(|when, then| {
                when.method(DELETE).path("/storage/v1/object/documentos");
                then.status(503);
            })
            .await;

        let state = estado(&supabase.base_url(), "http://127.0.0.1:1");
        remover_documento(&state, &sessao_admin(), id).await.expect("remoção");

        linha.assert_hits_async(1).await;
        objeto.assert_hits_async(1).await;
    }
}

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use std::sync::Arc;
use supabase::UrlAssinada;
use tokio::time::Instant;
use uuid::Uuid;

use crate::auth::Sessao;
use crate::models::{CategoriaDocumento, Documento};
use crate::services::documentos::{self, UploadDocumento};
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult, Competencia};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FiltroDocumentos {
    pub empresa_id: Option<Uuid>,
    pub competencia: Option<Competencia>,
}

fn erro_multipart(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::ValidationError(format!("multipart inválido: {}", e.body_text()))
    }
}

fn campo_obrigatorio<T>(valor: Option<T>, nome: &str) -> AppResult<T> {
    valor.ok_or_else(|| AppError::ValidationError(format!("campo '{}' obrigatório", nome)))
}

/// `POST /api/documentos` (multipart: empresa_id, competencia, categoria, arquivo)
pub async fn enviar(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Documento>)> {
    let start_time = Instant::now();
    log_request_received("/api/documentos", "POST");

    let mut empresa_id = None;
    let mut competencia = None;
    let mut categoria = None;
    let mut arquivo = None;

    while let Some(field) = multipart.next_field().await.map_err(erro_multipart)? {
        let nome = field.name().unwrap_or_default().to_string();
        match nome.as_str() {
            "empresa_id" => {
                let texto = field.text().await.map_err(erro_multipart)?;
                empresa_id = Some(
                    Uuid::parse_str(texto.trim())
                        .map_err(|_| AppError::ValidationError("empresa_id inválido".to_string()))?,
                );
            }
            "competencia" => {
                let texto = field.text().await.map_err(erro_multipart)?;
                competencia = Some(texto.parse::<Competencia>().map_err(AppError::ValidationError)?);
            }
            "categoria" => {
                let texto = field.text().await.map_err(erro_multipart)?;
                categoria = Some(texto.parse::<CategoriaDocumento>().map_err(AppError::ValidationError)?);
            }
            "arquivo" => {
                let nome_arquivo = field.file_name().unwrap_or("arquivo").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let conteudo = field.bytes().await.map_err(erro_multipart)?;
                arquivo = Some((nome_arquivo, content_type, conteudo.to_vec()));
            }
            outro => tracing::debug!("Campo multipart ignorado: {}", outro),
        }
    }

    let (nome_arquivo, content_type, conteudo) = campo_obrigatorio(arquivo, "arquivo")?;
    let upload = UploadDocumento {
        empresa_id: campo_obrigatorio(empresa_id, "empresa_id")?,
        competencia: campo_obrigatorio(competencia, "competencia")?,
        categoria: categoria.unwrap_or(CategoriaDocumento::Outros),
        nome_arquivo,
        content_type,
        conteudo,
    };

    let documento = documentos::enviar_documento(&state, &sessao, upload).await?;

    log_request_processed("/api/documentos", 201, start_time.elapsed().as_millis() as u64);
    Ok((StatusCode::CREATED, Json(documento)))
}

pub async fn listar(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    Query(filtro): Query<FiltroDocumentos>,
) -> AppResult<Json<Vec<Documento>>> {
    let lista =
        documentos::listar_documentos(&state, &sessao, filtro.empresa_id, filtro.competencia).await?;
    Ok(Json(lista))
}

pub async fn download(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UrlAssinada>> {
    Ok(Json(documentos::url_download(&state, &sessao, id).await?))
}

pub async fn remover(
    State(state): State<Arc<AppState>>,
    sessao: Sessao,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    documentos::remover_documento(&state, &sessao, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

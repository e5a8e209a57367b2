//! API REST (PostgREST) sobre as tabelas do portal
//!
//! Filtros seguem a sintaxe `coluna=operador.valor` do PostgREST; o
//! [`Consulta`] monta os pares de query string e o reqwest cuida do encoding.

use crate::client::SupabaseClient;
use crate::error::{Result, SupabaseError};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordem {
    Asc,
    Desc,
}

/// Consulta filtrada a uma tabela
#[derive(Debug, Clone)]
pub struct Consulta {
    tabela: String,
    colunas: Option<String>,
    filtros: Vec<(String, String)>,
    ordem: Vec<String>,
    limite: Option<usize>,
}

impl Consulta {
    pub fn tabela(tabela: impl Into<String>) -> Self {
        Self {
            tabela: tabela.into(),
            colunas: None,
            filtros: Vec::new(),
            ordem: Vec::new(),
            limite: None,
        }
    }

    /// Colunas retornadas (`select=`), padrão `*`
    pub fn select(mut self, colunas: impl Into<String>) -> Self {
        self.colunas = Some(colunas.into());
        self
    }

    fn filtro(mut self, coluna: &str, operador: &str, valor: impl Display) -> Self {
        self.filtros.push((coluna.to_string(), format!("{}.{}", operador, valor)));
        self
    }

    pub fn eq(self, coluna: &str, valor: impl Display) -> Self {
        self.filtro(coluna, "eq", valor)
    }

    pub fn is_null(self, coluna: &str) -> Self {
        self.filtro(coluna, "is", "null")
    }

    pub fn in_<T: Display>(self, coluna: &str, valores: impl IntoIterator<Item = T>) -> Self {
        let lista = valores
            .into_iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.filtro(coluna, "in", format!("({})", lista))
    }

    /// Filtro `or=(...)` bruto, ex.: `empresa_id.is.null,empresa_id.eq.<id>`
    pub fn or(mut self, condicoes: impl Into<String>) -> Self {
        self.filtros.push(("or".to_string(), format!("({})", condicoes.into())));
        self
    }

    pub fn order(mut self, coluna: &str, ordem: Ordem) -> Self {
        let sufixo = match ordem {
            Ordem::Asc => "asc",
            Ordem::Desc => "desc",
        };
        self.ordem.push(format!("{}.{}", coluna, sufixo));
        self
    }

    pub fn limit(mut self, limite: usize) -> Self {
        self.limite = Some(limite);
        self
    }

    fn caminho(&self) -> String {
        format!("/rest/v1/{}", self.tabela)
    }

    /// Pares de query string da leitura (select, filtros, ordem, limite)
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pares = vec![(
            "select".to_string(),
            self.colunas.clone().unwrap_or_else(|| "*".to_string()),
        )];
        pares.extend(self.filtros.iter().cloned());
        if !self.ordem.is_empty() {
            pares.push(("order".to_string(), self.ordem.join(",")));
        }
        if let Some(limite) = self.limite {
            pares.push(("limit".to_string(), limite.to_string()));
        }
        pares
    }

    /// Escritas (PATCH/DELETE) exigem ao menos um filtro
    fn filtros_de_escrita(&self) -> Result<&[(String, String)]> {
        if self.filtros.is_empty() {
            return Err(SupabaseError::ValidationError(format!(
                "escrita em '{}' sem filtro",
                self.tabela
            )));
        }
        Ok(&self.filtros)
    }
}

impl SupabaseClient {
    pub async fn select<T: DeserializeOwned>(&self, consulta: &Consulta) -> Result<Vec<T>> {
        let request = self
            .request(Method::GET, &consulta.caminho())
            .query(&consulta.query_pairs());

        let linhas = self.send(request).await?.json().await?;
        Ok(linhas)
    }

    /// Primeira linha da consulta ou [`SupabaseError::NotFound`]
    pub async fn select_one<T: DeserializeOwned>(&self, consulta: &Consulta) -> Result<T> {
        let consulta = consulta.clone().limit(1);
        self.select::<T>(&consulta)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SupabaseError::NotFound(consulta.tabela.clone()))
    }

    /// Insere uma linha e devolve a representação gravada
    pub async fn insert<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        tabela: &str,
        linha: &T,
    ) -> Result<R> {
        let request = self
            .request(Method::POST, &format!("/rest/v1/{}", tabela))
            .header("Prefer", "return=representation")
            .json(linha);

        let linhas: Vec<R> = self.send(request).await?.json().await?;
        linhas
            .into_iter()
            .next()
            .ok_or_else(|| SupabaseError::NotFound(tabela.to_string()))
    }

    /// Insere ignorando conflito nas colunas `on_conflict` (idempotente)
    pub async fn insert_ignorando_duplicados<T: Serialize + ?Sized>(
        &self,
        tabela: &str,
        linha: &T,
        on_conflict: &str,
    ) -> Result<()> {
        let request = self
            .request(Method::POST, &format!("/rest/v1/{}", tabela))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=ignore-duplicates,return=minimal")
            .json(linha);

        self.send(request).await?;
        Ok(())
    }

    /// Atualiza as linhas filtradas e devolve as linhas alteradas
    pub async fn update<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        consulta: &Consulta,
        alteracoes: &T,
    ) -> Result<Vec<R>> {
        let filtros = consulta.filtros_de_escrita()?;
        let request = self
            .request(Method::PATCH, &consulta.caminho())
            .query(filtros)
            .header("Prefer", "return=representation")
            .json(alteracoes);

        let linhas = self.send(request).await?.json().await?;
        Ok(linhas)
    }

    pub async fn delete(&self, consulta: &Consulta) -> Result<()> {
        let filtros = consulta.filtros_de_escrita()?;
        let request = self
            .request(Method::DELETE, &consulta.caminho())
            .query(filtros);

        self.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use httpmock::Method::PATCH;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Linha {
        id: String,
        status: String,
    }

    #[test]
    fn test_query_pairs() {
        let consulta = Consulta::tabela("conciliacoes")
            .eq("empresa_id", "abc")
            .in_("status", ["pendente", "processando"])
            .order("criado_em", Ordem::Desc)
            .limit(10);

        let pares = consulta.query_pairs();
        assert_eq!(pares[0], ("select".to_string(), "*".to_string()));
        assert!(pares.contains(&("empresa_id".to_string(), "eq.abc".to_string())));
        assert!(pares.contains(&("status".to_string(), "in.(pendente,processando)".to_string())));
        assert!(pares.contains(&("order".to_string(), "criado_em.desc".to_string())));
        assert!(pares.contains(&("limit".to_string(), "10".to_string())));
    }

    #[tokio::test]
    async fn test_select_one_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/documentos")
                    .query_param("id", "eq.42")
                    .query_param("limit", "1");
                then.status(200).json_body(json!([]));
            })
            .await;

        let client = SupabaseClient::new(server.base_url(), "key").unwrap();
        let erro = client
            .select_one::<Linha>(&Consulta::tabela("documentos").eq("id", 42))
            .await
            .unwrap_err();
        assert!(erro.is_not_found());
    }

    #[tokio::test]
    async fn test_insert_retorna_representacao() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/conciliacoes")
                    .header("prefer", "return=representation")
                    .json_body(json!({"status": "pendente"}));
                then.status(201).json_body(json!([{"id": "c1", "status": "pendente"}]));
            })
            .await;

        let client = SupabaseClient::new(server.base_url(), "key").unwrap();
        let linha: Linha = client
            .insert("conciliacoes", &json!({"status": "pendente"}))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(linha, Linha { id: "c1".into(), status: "pendente".into() });
    }

    #[tokio::test]
    async fn test_update_com_filtros() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/rest/v1/conciliacoes")
                    .query_param("id", "eq.c1")
                    .query_param("status", "eq.pendente");
                then.status(200).json_body(json!([{"id": "c1", "status": "processando"}]));
            })
            .await;

        let client = SupabaseClient::new(server.base_url(), "key").unwrap();
        let linhas: Vec<Linha> = client
            .update(
                &Consulta::tabela("conciliacoes").eq("id", "c1").eq("status", "pendente"),
                &json!({"status": "processando"}),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(linhas.len(), 1);
        assert_eq!(linhas[0].status, "processando");
    }

    #[tokio::test]
    async fn test_escrita_sem_filtro_rejeitada() {
        let client = SupabaseClient::new("http://localhost:1", "key").unwrap();
        let erro = client.delete(&Consulta::tabela("documentos")).await.unwrap_err();
        assert!(matches!(erro, SupabaseError::ValidationError(_)));
    }
}

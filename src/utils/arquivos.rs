//! Nomes de arquivo e caminhos no storage

use deunicode::deunicode;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use super::Competencia;

const MAX_NOME_BYTES: usize = 120;

static CARACTERES_PROIBIDOS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("regex estática"));

/// Trunca sem cortar um caractere UTF-8 no meio
pub fn truncate_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

/// Nome seguro para o storage: sem diretórios, acentos ou espaços
///
/// `"Extrato Março/2025 (Itaú).pdf"` → `"2025_Itau_.pdf"` (apenas o último
/// segmento do caminho é mantido).
pub fn sanitizar_nome_arquivo(nome: &str) -> String {
    let base = nome.rsplit(['/', '\\']).next().unwrap_or(nome);
    let ascii = deunicode(base);
    let limpo = CARACTERES_PROIBIDOS.replace_all(&ascii, "_");
    let limpo = limpo.trim_start_matches(['.', '_']);

    if limpo.is_empty() {
        return "arquivo".to_string();
    }

    if limpo.len() <= MAX_NOME_BYTES {
        return limpo.to_string();
    }

    // Preserva a extensão ao truncar
    match limpo.rsplit_once('.') {
        Some((radical, extensao)) if extensao.len() < 10 => {
            let espaco = MAX_NOME_BYTES - extensao.len() - 1;
            format!("{}.{}", truncate_safe(radical, espaco), extensao)
        }
        _ => truncate_safe(limpo, MAX_NOME_BYTES).to_string(),
    }
}

/// `{empresa_id}/{AAAA-MM}/{uuid}-{nome}`
pub fn caminho_documento(empresa_id: Uuid, competencia: &Competencia, nome: &str) -> String {
    format!(
        "{}/{}/{}-{}",
        empresa_id,
        competencia.chave(),
        Uuid::new_v4(),
        sanitizar_nome_arquivo(nome)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_safe() {
        assert_eq!(truncate_safe("Olá, mundo", 3), "Ol");
        assert_eq!(truncate_safe("curto", 10), "curto");
    }

    #[test]
    fn test_sanitizar_acentos_e_espacos() {
        assert_eq!(sanitizar_nome_arquivo("Extrato Março (Itaú).pdf"), "Extrato_Marco_Itau_.pdf");
    }

    #[test]
    fn test_sanitizar_remove_diretorios() {
        assert_eq!(sanitizar_nome_arquivo("../../etc/passwd"), "passwd");
        assert_eq!(sanitizar_nome_arquivo("C:\\docs\\nota.xml"), "nota.xml");
        assert_eq!(sanitizar_nome_arquivo("..."), "arquivo");
    }

    #[test]
    fn test_sanitizar_trunca_preservando_extensao() {
        let longo = format!("{}.xlsx", "a".repeat(300));
        let nome = sanitizar_nome_arquivo(&longo);
        assert_eq!(nome.len(), MAX_NOME_BYTES);
        assert!(nome.ends_with(".xlsx"));
    }

    #[test]
    fn test_caminho_documento() {
        let empresa = Uuid::nil();
        let competencia = Competencia::new(2025, 3).unwrap();
        let caminho = caminho_documento(empresa, &competencia, "nota fiscal.xml");
        assert!(caminho.starts_with("00000000-0000-0000-0000-000000000000/2025-03/"));
        assert!(caminho.ends_with("-nota_fiscal.xml"));
    }
}

//! Busca nas listas já carregadas
//!
//! A busca só é aplicada quando o usuário confirma (submit); digitar não filtra.

use crate::models::linha::Linha;
use crate::models::viagem::Viagem;

pub trait Searchable {
    /// `query` já vem em minúsculas e sem espaços nas pontas
    fn matches_query(&self, query: &str) -> bool;
}

impl Searchable for Linha {
    fn matches_query(&self, query: &str) -> bool {
        self.nome.to_lowercase().contains(query) || self.numero.to_lowercase().contains(query)
    }
}

impl Searchable for Viagem {
    fn matches_query(&self, query: &str) -> bool {
        self.descricao.to_lowercase().contains(query)
    }
}

/// Itens que casam com `query`; consulta vazia devolve tudo na ordem original
pub fn filter<T: Searchable + Clone>(items: &[T], query: &str) -> Vec<T> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return items.to_vec();
    }
    items.iter().filter(|item| item.matches_query(&query)).cloned().collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    query: String,
    submitted: String,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Texto digitado
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Consulta em vigor
    pub fn submitted(&self) -> &str {
        &self.submitted
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn submit(&mut self) {
        self.submitted = self.query.clone();
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.submitted.clear();
    }

    pub fn apply<T: Searchable + Clone>(&self, items: &[T]) -> Vec<T> {
        filter(items, &self.submitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn linha(nome: &str, numero: &str) -> Linha {
        Linha {
            id: Uuid::new_v4(),
            nome: nome.to_string(),
            numero: numero.to_string(),
            empresa_id: Uuid::new_v4(),
            created_at: Utc::now(),
            is_favorito: false,
        }
    }

    #[test]
    fn test_filter_by_nome_or_numero() {
        let linhas = vec![linha("Centro", "10"), linha("Norte", "20")];

        let found = filter(&linhas, "10");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].nome, "Centro");

        assert_eq!(filter(&linhas, "NORTE")[0].numero, "20");
        assert_eq!(filter(&linhas, "   "), linhas);
        assert!(filter(&linhas, "sul").is_empty());
    }

    #[test]
    fn test_query_only_applies_after_submit() {
        let linhas = vec![linha("Centro", "10"), linha("Norte", "20")];
        let mut search = SearchState::new();

        search.set_query("norte");
        assert_eq!(search.apply(&linhas).len(), 2);

        search.submit();
        assert_eq!(search.apply(&linhas).len(), 1);

        search.clear();
        assert_eq!(search.query(), "");
        assert_eq!(search.apply(&linhas), linhas);
    }
}

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::ValidationError;

use crate::utils::validation::validate_trimmed_length;

pub const DESCRICAO_MIN: usize = 3;
pub const DESCRICAO_CURTA: &str = "A descrição do ponto deve ter pelo menos 3 caracteres.";

/// Descrição com pelo menos 3 caracteres depois de remover espaços
pub fn validate_descricao(descricao: &str) -> Result<(), ValidationError> {
    validate_trimmed_length(descricao, DESCRICAO_MIN).map_err(|mut error| {
        error.message = Some(Cow::Borrowed(DESCRICAO_CURTA));
        error
    })
}

/// Ponto do itinerário de uma linha - tabela `pontos_itinerario`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PontoItinerario {
    pub id: Uuid,
    pub descricao: String,
    pub ordem: i32,
    pub linha_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl PontoItinerario {
    pub const TABLE: &'static str = "pontos_itinerario";

    /// Próxima ordem livre: maior ordem + 1, ou 1 para linha sem pontos
    pub fn proxima_ordem(pontos: &[PontoItinerario]) -> i32 {
        pontos.iter().map(|p| p.ordem).max().map_or(1, |max| max + 1)
    }
}

/// Ponto inserido na tabela
#[derive(Debug, Clone, Serialize)]
pub struct NovoPonto {
    pub linha_id: Uuid,
    pub descricao: String,
    pub ordem: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxima_ordem() {
        assert_eq!(PontoItinerario::proxima_ordem(&[]), 1);

        let linha_id = Uuid::new_v4();
        let pontos: Vec<PontoItinerario> = [1, 4, 2]
            .iter()
            .map(|&ordem| PontoItinerario {
                id: Uuid::new_v4(),
                descricao: format!("Ponto {}", ordem),
                ordem,
                linha_id,
                created_at: Utc::now(),
            })
            .collect();
        assert_eq!(PontoItinerario::proxima_ordem(&pontos), 5);
    }

    #[test]
    fn test_validate_descricao() {
        assert!(validate_descricao(" Praça ").is_ok());
        let error = validate_descricao("  ab ").unwrap_err();
        assert_eq!(error.message.as_deref(), Some(DESCRICAO_CURTA));
    }
}

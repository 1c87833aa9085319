//! Modelo de Linha
//!
//! Este módulo contém a struct Linha e suas variantes para as operações CRUD.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::ponto::validate_descricao;

/// Linha de ônibus - mapeia a tabela linhas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Linha {
    pub id: Uuid,
    pub nome: String,
    pub numero: String,
    pub empresa_id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Calculado no cliente a partir dos favoritos; nunca vai para o servidor
    #[serde(default, skip_serializing)]
    pub is_favorito: bool,
}

impl Linha {
    pub const TABLE: &'static str = "linhas";
}

/// Marca `is_favorito` em cada linha conforme a lista de favoritas
pub fn mark_favorites(linhas: &[Linha], favoritas: &[Linha]) -> Vec<Linha> {
    let favorite_ids: HashSet<Uuid> = favoritas.iter().map(|l| l.id).collect();
    linhas
        .iter()
        .map(|linha| Linha {
            is_favorito: favorite_ids.contains(&linha.id),
            ..linha.clone()
        })
        .collect()
}

/// Dados para criar uma linha junto com os seus pontos (na ordem do itinerário)
#[derive(Debug, Clone, Default, Validate)]
pub struct CreateLinhaData {
    #[validate(length(min = 3, message = "O nome da linha deve ter pelo menos 3 caracteres."))]
    pub nome: String,

    #[validate(length(min = 1, message = "O número da linha é obrigatório."))]
    pub numero: String,

    #[validate(
        length(min = 2, message = "Uma linha deve ter pelo menos 2 pontos de parada."),
        custom = "validate_pontos"
    )]
    pub pontos: Vec<String>,
}

/// Todos os pontos precisam de uma descrição válida
fn validate_pontos(pontos: &[String]) -> Result<(), ValidationError> {
    pontos.iter().try_for_each(|descricao| validate_descricao(descricao))
}

impl CreateLinhaData {
    pub fn normalized(&self) -> Self {
        Self {
            nome: self.nome.trim().to_string(),
            numero: self.numero.trim().to_string(),
            pontos: self.pontos.iter().map(|p| p.trim().to_string()).collect(),
        }
    }
}

/// Campos editáveis de uma linha
#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct UpdateLinhaData {
    #[validate(length(min = 3, message = "O nome da linha deve ter pelo menos 3 caracteres."))]
    pub nome: String,

    #[validate(length(min = 1, message = "O número da linha é obrigatório."))]
    pub numero: String,
}

impl UpdateLinhaData {
    pub fn normalized(&self) -> Self {
        Self {
            nome: self.nome.trim().to_string(),
            numero: self.numero.trim().to_string(),
        }
    }
}

/// Linha inserida na tabela `linhas`
#[derive(Debug, Clone, Serialize)]
pub(crate) struct LinhaInsert<'a> {
    pub nome: &'a str,
    pub numero: &'a str,
    pub empresa_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linha(nome: &str) -> Linha {
        Linha {
            id: Uuid::new_v4(),
            nome: nome.to_string(),
            numero: "1".to_string(),
            empresa_id: Uuid::new_v4(),
            created_at: Utc::now(),
            is_favorito: false,
        }
    }

    #[test]
    fn test_mark_favorites() {
        let centro = linha("Centro");
        let norte = linha("Norte");
        let marked = mark_favorites(&[centro.clone(), norte.clone()], &[norte.clone()]);
        assert!(!marked[0].is_favorito);
        assert!(marked[1].is_favorito);
        assert_eq!(marked[1].id, norte.id);
    }

    #[test]
    fn test_is_favorito_is_not_serialized() {
        let mut l = linha("Centro");
        l.is_favorito = true;
        let value = serde_json::to_value(&l).unwrap();
        assert!(value.get("is_favorito").is_none());
    }

    #[test]
    fn test_create_linha_requires_two_stops() {
        let data = CreateLinhaData {
            nome: "Centro".into(),
            numero: "10".into(),
            pontos: vec!["Terminal".into()],
        };
        let errors = data.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("pontos"));
    }

    #[test]
    fn test_create_linha_rejects_blank_stop() {
        let data = CreateLinhaData {
            nome: "Centro".into(),
            numero: "10".into(),
            pontos: vec!["Terminal".into(), "  ".into()],
        };
        let errors = data.normalized().validate().unwrap_err();
        let field_errors = errors.field_errors();
        let pontos = field_errors["pontos"];
        assert_eq!(
            pontos[0].message.as_deref(),
            Some("A descrição do ponto deve ter pelo menos 3 caracteres.")
        );
    }
}

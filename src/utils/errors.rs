//! Sistema de tratamento de erros
//!
//! Este módulo define os tipos de erro do cliente e a conversão
//! para a mensagem que o usuário vê.

use thiserror::Error;

/// Erros principais da aplicação
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Mensagem apresentável ao usuário.
    ///
    /// Erros do backend mantêm a mensagem original (é o que a tela de login
    /// mostra); erros de validação mostram a primeira mensagem de campo.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Backend { message, .. } => message.clone(),
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::Internal(msg) => msg.clone(),
            AppError::Validation(errors) => errors
                .field_errors()
                .values()
                .flat_map(|list| list.iter())
                .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "Dados inválidos.".to_string()),
            AppError::Http(_) => "Falha de conexão com o servidor.".to_string(),
            other => other.to_string(),
        }
    }

    /// Status HTTP devolvido pelo backend, quando houver
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Backend { status, .. } => Some(*status),
            AppError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Resultado tipado para operações que podem falhar
pub type AppResult<T> = Result<T, AppError>;

/// Função helper para erros internos
pub fn internal_error(message: &str) -> AppError {
    AppError::Internal(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::{ValidationError, ValidationErrors};

    #[test]
    fn test_backend_message_is_kept() {
        let err = AppError::Backend {
            status: 400,
            message: "Invalid login credentials".to_string(),
        };
        assert_eq!(err.user_message(), "Invalid login credentials");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_validation_message_uses_field_message() {
        let mut error = ValidationError::new("length");
        error.message = Some("O nome deve ter pelo menos 3 caracteres.".into());
        let mut errors = ValidationErrors::new();
        errors.add("name", error);

        let err = AppError::Validation(errors);
        assert_eq!(err.user_message(), "O nome deve ter pelo menos 3 caracteres.");
        assert_eq!(err.status(), None);
    }
}

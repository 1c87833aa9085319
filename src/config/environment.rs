//! Configuração de variáveis de ambiente
//!
//! Este módulo lê a configuração do cliente a partir do ambiente
//! (ou do arquivo `.env` carregado pelo dotenvy no `main`).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::errors::{AppError, AppResult};

/// Configuração do ambiente
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub http_timeout: Duration,
    pub session_file: Option<PathBuf>,
    pub log_level: String,
}

impl EnvironmentConfig {
    /// Ler a configuração das variáveis de ambiente
    pub fn from_env() -> AppResult<Self> {
        let supabase_url = required("SUPABASE_URL")?;
        let supabase_anon_key = required("SUPABASE_ANON_KEY")?;

        let http_timeout = match env::var("HTTP_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(raw.trim().parse().map_err(|_| {
                AppError::Config(format!("HTTP_TIMEOUT_SECS must be a valid number, got '{}'", raw))
            })?),
            Err(_) => Duration::from_secs(30),
        };

        Ok(Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            http_timeout,
            session_file: env::var("SESSION_FILE").ok().filter(|s| !s.trim().is_empty()).map(PathBuf::from),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Configuração mínima apontando para um backend explícito
    pub fn new(supabase_url: &str, supabase_anon_key: &str) -> Self {
        Self {
            environment: "development".to_string(),
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key: supabase_anon_key.to_string(),
            http_timeout: Duration::from_secs(30),
            session_file: None,
            log_level: "info".to_string(),
        }
    }

    /// Verificar se estamos em modo desenvolvimento
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// URL base da API REST (PostgREST)
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.supabase_url)
    }

    /// URL base da API de autenticação (GoTrue)
    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.supabase_url)
    }

    /// URL base das funções serverless
    pub fn functions_url(&self) -> String {
        format!("{}/functions/v1", self.supabase_url)
    }
}

fn required(name: &str) -> AppResult<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("{} must be set", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_are_built_from_base() {
        let config = EnvironmentConfig::new("https://example.supabase.co/", "anon");
        assert_eq!(config.rest_url(), "https://example.supabase.co/rest/v1");
        assert_eq!(config.auth_url(), "https://example.supabase.co/auth/v1");
        assert_eq!(config.functions_url(), "https://example.supabase.co/functions/v1");
        assert!(config.is_development());
    }
}

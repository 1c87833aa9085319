//! Alertas para o usuário
//!
//! Os serviços não sabem como o alerta é mostrado; recebem um `Notifier`
//! pelo construtor. O console imprime colorido, os testes gravam.

use std::sync::Mutex;

use crate::utils::errors::AppError;

/// Título usado em todos os alertas de falha
pub const ALERT_TITLE: &str = "Erro";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

pub trait Notifier: Send + Sync {
    fn alert(&self, title: &str, message: &str);
}

impl dyn Notifier {
    /// Registra o erro, mostra o alerta estático e devolve o erro original
    pub fn error_alert(&self, message: &str, error: AppError) -> AppError {
        log::error!("❌ {}: {}", message, error);
        self.alert(ALERT_TITLE, message);
        error
    }
}

/// Só escreve no log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn alert(&self, title: &str, message: &str) {
        log::warn!("🔔 {}: {}", title, message);
    }
}

/// Guarda os alertas recebidos
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<Alert> {
        self.alerts.lock().ok().and_then(|a| a.last().cloned())
    }

    pub fn clear(&self) {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.clear();
        }
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, title: &str, message: &str) {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push(Alert {
                title: title.to_string(),
                message: message.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_error_alert_keeps_original_error() {
        let recorder = Arc::new(RecordingNotifier::new());
        let notifier: Arc<dyn Notifier> = recorder.clone();

        let error = notifier.error_alert(
            "Não foi possível atualizar a linha.",
            AppError::Backend {
                status: 500,
                message: "boom".to_string(),
            },
        );

        assert_eq!(error.user_message(), "boom");
        assert_eq!(
            recorder.last(),
            Some(Alert {
                title: "Erro".to_string(),
                message: "Não foi possível atualizar a linha.".to_string(),
            })
        );
        recorder.clear();
        assert!(recorder.alerts().is_empty());
    }
}

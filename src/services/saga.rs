//! Escritas em várias etapas com compensação
//!
//! O backend não oferece transações para o cliente. Cada etapa concluída
//! registra a sua compensação; em caso de falha, as compensações rodam na
//! ordem inversa e cada resultado vai para o log. Falhas de compensação
//! nunca chegam ao usuário.

use std::future::Future;

use futures::future::BoxFuture;
use log::{error, info, warn};

use crate::utils::errors::{AppError, AppResult};

pub struct Saga<'a> {
    name: String,
    compensations: Vec<(String, BoxFuture<'a, AppResult<()>>)>,
}

impl<'a> Saga<'a> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            compensations: Vec::new(),
        }
    }

    /// Registra a compensação da etapa que acabou de dar certo
    pub fn on_failure<F>(&mut self, description: impl Into<String>, compensation: F)
    where
        F: Future<Output = AppResult<()>> + Send + 'a,
    {
        self.compensations.push((description.into(), Box::pin(compensation)));
    }

    pub fn pending(&self) -> usize {
        self.compensations.len()
    }

    /// Executa as compensações da última para a primeira; devolve quantas falharam
    pub async fn rollback(self) -> usize {
        warn!("↩️ Desfazendo '{}' ({} etapas)", self.name, self.compensations.len());
        let mut failures = 0;
        for (description, compensation) in self.compensations.into_iter().rev() {
            match compensation.await {
                Ok(()) => info!("↩️ [{}] compensação ok: {}", self.name, description),
                Err(e) => {
                    failures += 1;
                    error!("❌ [{}] compensação falhou: {}: {}", self.name, description, e);
                }
            }
        }
        failures
    }

    /// Desfaz tudo e devolve `error`
    pub async fn abort<T>(self, error: AppError) -> AppResult<T> {
        self.rollback().await;
        Err(error)
    }

    /// Todas as etapas deram certo; as compensações são descartadas sem rodar
    pub fn commit(self) {
        info!("✅ '{}' concluída", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_rollback_runs_in_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut saga = Saga::new("cadastro");

        for step in ["usuario", "empresa"] {
            let log = log.clone();
            saga.on_failure(format!("desfazer {}", step), async move {
                log.lock().unwrap().push(step);
                Ok(())
            });
        }
        saga.on_failure("falha", async { Err(AppError::Internal("x".into())) });

        assert_eq!(saga.pending(), 3);
        assert_eq!(saga.rollback().await, 1);
        assert_eq!(*log.lock().unwrap(), vec!["empresa", "usuario"]);
    }

    #[tokio::test]
    async fn test_commit_skips_compensations() {
        let ran = Arc::new(Mutex::new(false));
        let mut saga = Saga::new("linha");
        let flag = ran.clone();
        saga.on_failure("excluir linha", async move {
            *flag.lock().unwrap() = true;
            Ok(())
        });
        saga.commit();
        assert!(!*ran.lock().unwrap());
    }
}

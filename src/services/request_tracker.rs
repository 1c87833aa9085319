//! Estado de requisição por operação
//!
//! Cada chamada de serviço abre um slot identificado pela operação e pelos
//! seus parâmetros (`linhas_da_empresa`, `add_linha:Centro:10`...). O slot
//! passa por em andamento → sucesso/falha; `is_loading` é o agregado.
//! Só os últimos `MAX_IDLE_SLOTS` slots encerrados são guardados.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::utils::errors::{AppError, AppResult};

/// Mensagem para envio duplicado de uma escrita que ainda não terminou
pub const OPERATION_IN_PROGRESS: &str = "Operação já em andamento.";

/// Slots encerrados mantidos para consulta; os mais antigos saem primeiro
pub const MAX_IDLE_SLOTS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestState {
    InFlight,
    Succeeded,
    Failed(String),
}

#[derive(Debug, Default)]
struct Slot {
    in_flight: usize,
    last: Option<RequestState>,
    closed_at: u64,
}

#[derive(Debug, Default)]
struct Registry {
    slots: HashMap<String, Slot>,
    closes: u64,
}

impl Registry {
    fn entry(&mut self, key: &str) -> &mut Slot {
        self.slots.entry(key.to_string()).or_default()
    }

    /// Descarta os slots encerrados mais antigos além do limite
    fn evict_idle(&mut self) {
        let mut idle: Vec<(u64, String)> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.in_flight == 0)
            .map(|(key, slot)| (slot.closed_at, key.clone()))
            .collect();
        if idle.len() <= MAX_IDLE_SLOTS {
            return;
        }
        idle.sort();
        let excess = idle.len() - MAX_IDLE_SLOTS;
        for (_, key) in idle.into_iter().take(excess) {
            self.slots.remove(&key);
        }
    }
}

type Slots = Arc<Mutex<Registry>>;

#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    slots: Slots,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abre o slot `key`; chamadas concorrentes com a mesma chave são permitidas
    pub fn begin(&self, key: impl Into<String>) -> RequestGuard {
        let key = key.into();
        if let Ok(mut registry) = self.slots.lock() {
            registry.entry(&key).in_flight += 1;
        }
        RequestGuard {
            key,
            slots: self.slots.clone(),
            finished: false,
        }
    }

    /// Como `begin`, mas rejeita a chamada se a mesma chave já estiver em andamento
    pub fn begin_exclusive(&self, key: impl Into<String>) -> AppResult<RequestGuard> {
        let key = key.into();
        let mut registry = self
            .slots
            .lock()
            .map_err(|_| AppError::Internal("request tracker lock poisoned".to_string()))?;
        let slot = registry.entry(&key);
        if slot.in_flight > 0 {
            log::warn!("⏳ Operação {} já em andamento", key);
            return Err(AppError::Conflict(OPERATION_IN_PROGRESS.to_string()));
        }
        slot.in_flight = 1;
        drop(registry);

        Ok(RequestGuard {
            key,
            slots: self.slots.clone(),
            finished: false,
        })
    }

    /// Executa `operation` dentro do slot `key`
    pub async fn track<T, F>(&self, key: impl Into<String>, operation: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        let guard = self.begin(key);
        let result = operation.await;
        guard.finish(&result);
        result
    }

    pub fn state(&self, key: &str) -> Option<RequestState> {
        let registry = self.slots.lock().ok()?;
        let slot = registry.slots.get(key)?;
        if slot.in_flight > 0 {
            Some(RequestState::InFlight)
        } else {
            slot.last.clone()
        }
    }

    /// Alguma operação em andamento
    pub fn is_loading(&self) -> bool {
        self.slots
            .lock()
            .map(|registry| registry.slots.values().any(|slot| slot.in_flight > 0))
            .unwrap_or(false)
    }

    /// Quantidade de slots guardados (em andamento + encerrados)
    pub fn slot_count(&self) -> usize {
        self.slots.lock().map(|registry| registry.slots.len()).unwrap_or(0)
    }
}

/// Slot aberto; se for descartado sem `finish`, a operação conta como cancelada
#[derive(Debug)]
pub struct RequestGuard {
    key: String,
    slots: Slots,
    finished: bool,
}

impl RequestGuard {
    pub fn finish<T>(mut self, result: &AppResult<T>) {
        let state = match result {
            Ok(_) => RequestState::Succeeded,
            Err(e) => RequestState::Failed(e.user_message()),
        };
        self.close(state);
    }

    fn close(&mut self, state: RequestState) {
        self.finished = true;
        if let Ok(mut registry) = self.slots.lock() {
            registry.closes += 1;
            let closed_at = registry.closes;
            if let Some(slot) = registry.slots.get_mut(&self.key) {
                slot.in_flight = slot.in_flight.saturating_sub(1);
                slot.last = Some(state);
                slot.closed_at = closed_at;
            }
            registry.evict_idle();
        }
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.close(RequestState::Failed("cancelada".to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_lifecycle() {
        let tracker = RequestTracker::new();
        assert!(!tracker.is_loading());

        let guard = tracker.begin("linhas_da_empresa");
        assert!(tracker.is_loading());
        assert_eq!(tracker.state("linhas_da_empresa"), Some(RequestState::InFlight));

        guard.finish(&Ok::<(), AppError>(()));
        assert!(!tracker.is_loading());
        assert_eq!(tracker.state("linhas_da_empresa"), Some(RequestState::Succeeded));
    }

    #[test]
    fn test_exclusive_rejects_duplicate_submission() {
        let tracker = RequestTracker::new();
        let first = tracker.begin_exclusive("add_linha:Centro:10").unwrap();

        let err = tracker.begin_exclusive("add_linha:Centro:10").unwrap_err();
        assert_eq!(err.user_message(), OPERATION_IN_PROGRESS);
        assert!(tracker.begin_exclusive("add_linha:Norte:20").is_ok());

        drop(first);
        assert_eq!(
            tracker.state("add_linha:Centro:10"),
            Some(RequestState::Failed("cancelada".to_string()))
        );
        assert!(tracker.begin_exclusive("add_linha:Centro:10").is_ok());
    }

    #[tokio::test]
    async fn test_track_records_failure() {
        let tracker = RequestTracker::new();
        let result: AppResult<()> = tracker
            .track("pontos:1", async { Err(AppError::Internal("sem rede".to_string())) })
            .await;
        assert!(result.is_err());
        assert_eq!(tracker.state("pontos:1"), Some(RequestState::Failed("sem rede".to_string())));
    }

    #[test]
    fn test_idle_slots_are_bounded() {
        let tracker = RequestTracker::new();
        let running = tracker.begin("linhas_da_empresa");
        for i in 0..1000 {
            tracker.begin(format!("pontos:{}", i)).finish(&Ok::<(), AppError>(()));
        }

        assert_eq!(tracker.slot_count(), MAX_IDLE_SLOTS + 1);
        assert_eq!(tracker.state("pontos:0"), None);
        assert_eq!(tracker.state("pontos:999"), Some(RequestState::Succeeded));
        assert_eq!(tracker.state("linhas_da_empresa"), Some(RequestState::InFlight));

        running.finish(&Ok::<(), AppError>(()));
        assert_eq!(tracker.slot_count(), MAX_IDLE_SLOTS);
        assert_eq!(tracker.state("linhas_da_empresa"), Some(RequestState::Succeeded));
    }
}

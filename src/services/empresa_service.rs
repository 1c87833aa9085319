use std::sync::Arc;

use log::{error, info};
use tokio::sync::RwLock;

use super::request_tracker::RequestTracker;
use crate::clients::{DataGateway, Query};
use crate::models::empresa::Empresa;
use crate::utils::errors::AppResult;

/// Empresas exibidas na tela inicial do passageiro
pub struct EmpresaService {
    gateway: Arc<dyn DataGateway>,
    empresas: RwLock<Vec<Empresa>>,
    requests: RequestTracker,
}

impl EmpresaService {
    pub fn new(gateway: Arc<dyn DataGateway>) -> Self {
        Self {
            gateway,
            empresas: RwLock::new(Vec::new()),
            requests: RequestTracker::new(),
        }
    }

    pub async fn empresas(&self) -> Vec<Empresa> {
        self.empresas.read().await.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.requests.is_loading()
    }

    /// Carrega todas as empresas; falhas só vão para o log
    pub async fn get_empresas(&self) -> AppResult<Vec<Empresa>> {
        let query = Query::table(Empresa::TABLE);
        let result = self
            .requests
            .track("empresas", self.gateway.fetch::<Empresa>(&query))
            .await;

        match result {
            Ok(empresas) => {
                info!("🏢 {} empresas carregadas", empresas.len());
                *self.empresas.write().await = empresas.clone();
                Ok(empresas)
            }
            Err(e) => {
                error!("❌ Erro ao buscar empresas: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{InMemoryGateway, Operation};
    use serde_json::json;

    #[tokio::test]
    async fn test_get_empresas_keeps_previous_state_on_failure() {
        let memory = Arc::new(InMemoryGateway::new());
        memory
            .seed("empresas", vec![json!({"nome": "Timon Tur", "cnpj": "12345678000199"})])
            .await
            .unwrap();
        let service = EmpresaService::new(memory.clone());

        assert_eq!(service.get_empresas().await.unwrap().len(), 1);

        memory.fail_next("empresas", Operation::Select).await;
        assert!(service.get_empresas().await.is_err());
        assert_eq!(service.empresas().await[0].nome, "Timon Tur");
        assert!(!service.is_loading());
    }
}

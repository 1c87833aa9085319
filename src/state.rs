//! Estado compartilhado da aplicação
//!
//! Monta o gateway e os serviços uma única vez e os entrega já ligados
//! entre si; quem usa o cliente (o console, os testes) só recebe o `AppState`.

use std::sync::Arc;

use crate::clients::{DataGateway, SupabaseClient};
use crate::config::environment::EnvironmentConfig;
use crate::services::{AuthService, EmpresaService, LinhaService, Notifier, ViagemService};
use crate::utils::errors::AppResult;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn DataGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub auth: Arc<AuthService>,
    pub empresas: Arc<EmpresaService>,
    pub linhas: Arc<LinhaService>,
    pub viagens: Arc<ViagemService>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn DataGateway>, notifier: Arc<dyn Notifier>) -> Self {
        let auth = Arc::new(AuthService::new(gateway.clone()));
        Self {
            empresas: Arc::new(EmpresaService::new(gateway.clone())),
            linhas: Arc::new(LinhaService::new(gateway.clone(), auth.clone(), notifier.clone())),
            viagens: Arc::new(ViagemService::new(gateway.clone(), notifier.clone())),
            auth,
            gateway,
            notifier,
        }
    }

    /// Estado ligado ao backend hospedado
    pub fn connect(config: EnvironmentConfig, notifier: Arc<dyn Notifier>) -> AppResult<Self> {
        let gateway: Arc<dyn DataGateway> = Arc::new(SupabaseClient::new(config)?);
        Ok(Self::new(gateway, notifier))
    }

    /// Restaura a sessão e começa a ouvir os eventos de autenticação
    pub async fn initialize(&self) -> AppResult<()> {
        self.auth.initialize().await
    }

    /// Alguma operação de algum serviço em andamento
    pub fn is_loading(&self) -> bool {
        self.auth.is_loading() || self.empresas.is_loading() || self.linhas.is_loading() || self.viagens.is_loading()
    }
}

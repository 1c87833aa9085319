//! Serviço de autenticação
//!
//! Mantém usuário, perfil e sessão atuais. `initialize` restaura a sessão
//! salva e assina os eventos de autenticação do gateway; uma tarefa em
//! segundo plano mantém o estado em dia até o serviço ser descartado.

use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};
use serde_json::json;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;
use validator::Validate;

use super::request_tracker::RequestTracker;
use super::saga::Saga;
use crate::clients::{DataGateway, Query, DELETE_USER_FUNCTION};
use crate::models::auth::{
    AuthEvent, AuthUser, CompanySignUpData, PassengerSignUpData, Session, SignUpOutcome, UserProfile, UserRole,
};
use crate::models::empresa::{Empresa, NovaEmpresa};
use crate::utils::errors::{AppError, AppResult};

pub const LOGIN_FAILED: &str = "Login falhou, tente novamente.";
pub const ADMIN_USER_NOT_CREATED: &str = "Não foi possível criar o usuário administrador.";
pub const COMPANY_NOT_CREATED: &str = "Não foi possível criar a empresa: ";
pub const ADMIN_ROLE_NOT_SET: &str = "Não foi possível definir o usuário como admin: ";

/// Cópia do estado de autenticação
#[derive(Debug, Clone, Default)]
pub struct AuthSnapshot {
    pub user: Option<AuthUser>,
    pub profile: Option<UserProfile>,
    pub session: Option<Session>,
    pub is_loading: bool,
    /// Incrementado a cada escrita direta; a tarefa de eventos descarta resultados antigos
    epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Loading,
    Unauthenticated,
    Authenticated(UserRole),
}

impl AuthSnapshot {
    pub fn status(&self) -> AuthStatus {
        if self.is_loading {
            return AuthStatus::Loading;
        }
        match (&self.session, &self.profile) {
            (Some(_), Some(profile)) => AuthStatus::Authenticated(profile.role),
            _ => AuthStatus::Unauthenticated,
        }
    }
}

pub struct AuthService {
    gateway: Arc<dyn DataGateway>,
    state: Arc<RwLock<AuthSnapshot>>,
    requests: RequestTracker,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl AuthService {
    pub fn new(gateway: Arc<dyn DataGateway>) -> Self {
        Self {
            gateway,
            state: Arc::new(RwLock::new(AuthSnapshot {
                is_loading: true,
                ..AuthSnapshot::default()
            })),
            requests: RequestTracker::new(),
            listener: Mutex::new(None),
        }
    }

    /// Restaura a sessão salva, carrega o perfil e passa a ouvir os eventos de autenticação
    pub async fn initialize(&self) -> AppResult<()> {
        // assina antes de ler a sessão para não perder eventos no meio
        let events = self.gateway.subscribe_auth_events();

        let session = match self.gateway.current_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!("⚠️ Não foi possível restaurar a sessão: {}", e);
                None
            }
        };
        let profile = load_profile(self.gateway.as_ref(), session.as_ref()).await;
        {
            let mut state = self.state.write().await;
            write_session(&mut state, session, profile);
            state.is_loading = false;
        }
        info!("🔐 Autenticação inicializada: {:?}", self.status().await);

        let handle = tokio::spawn(listen(self.gateway.clone(), self.state.clone(), events));
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(previous) = listener.replace(handle) {
                previous.abort();
            }
        }
        Ok(())
    }

    pub async fn snapshot(&self) -> AuthSnapshot {
        self.state.read().await.clone()
    }

    pub async fn status(&self) -> AuthStatus {
        self.state.read().await.status()
    }

    pub async fn user(&self) -> Option<AuthUser> {
        self.state.read().await.user.clone()
    }

    pub async fn profile(&self) -> Option<UserProfile> {
        self.state.read().await.profile.clone()
    }

    pub async fn session(&self) -> Option<Session> {
        self.state.read().await.session.clone()
    }

    pub async fn user_id(&self) -> Option<Uuid> {
        self.state.read().await.user.as_ref().map(|u| u.id)
    }

    /// Empresa do perfil logado
    pub async fn empresa_id(&self) -> Option<Uuid> {
        self.state.read().await.profile.as_ref().and_then(|p| p.empresa_id)
    }

    pub fn is_loading(&self) -> bool {
        self.requests.is_loading()
    }

    pub fn requests(&self) -> &RequestTracker {
        &self.requests
    }

    /// Login com e-mail e senha; a mensagem do backend é devolvida como erro
    pub async fn login(&self, email: &str, password: &str) -> AppResult<()> {
        let guard = self.requests.begin("login");
        let result = self.gateway.sign_in_with_password(email, password).await;
        let result = match result {
            Ok(session) if session.access_token.is_empty() => Err(AppError::Unauthorized(LOGIN_FAILED.to_string())),
            other => other,
        };
        guard.finish(&result);

        let session = result?;
        self.apply_session(Some(session)).await;
        info!("✅ Login realizado: {}", email);
        Ok(())
    }

    pub async fn sign_up_as_passenger(&self, data: &PassengerSignUpData) -> AppResult<SignUpOutcome> {
        let data = data.normalized();
        data.validate()?;

        let guard = self.requests.begin_exclusive(format!("sign_up:{}", data.email))?;
        let result = self
            .gateway
            .sign_up(&data.email, &data.password, json!({ "name": data.name }))
            .await;
        guard.finish(&result);

        let outcome = result?;
        if let Some(session) = &outcome.session {
            self.apply_session(Some(session.clone())).await;
        }
        info!("📝 Passageiro cadastrado: {}", data.email);
        Ok(outcome)
    }

    /// Cria o usuário administrador, a empresa e promove o perfil a admin.
    ///
    /// Se uma etapa falhar, as anteriores são desfeitas na ordem inversa.
    pub async fn sign_up_as_company_admin(&self, data: &CompanySignUpData) -> AppResult<SignUpOutcome> {
        let data = data.normalized();
        data.validate()?;

        let guard = self.requests.begin_exclusive(format!("sign_up_company:{}", data.email))?;
        let result = self.run_company_sign_up(&data).await;
        guard.finish(&result);

        let outcome = result?;
        if let Some(session) = &outcome.session {
            self.apply_session(Some(session.clone())).await;
        }
        info!("🏢 Empresa '{}' cadastrada com o admin {}", data.company_name, data.email);
        Ok(outcome)
    }

    async fn run_company_sign_up(&self, data: &CompanySignUpData) -> AppResult<SignUpOutcome> {
        let outcome = self
            .gateway
            .sign_up(&data.email, &data.password, json!({ "name": data.admin_name }))
            .await?;
        let user_id = match &outcome.user {
            Some(user) => user.id,
            None => return Err(AppError::Internal(ADMIN_USER_NOT_CREATED.to_string())),
        };

        let mut saga = Saga::new(format!("cadastro da empresa {}", data.company_name));
        if outcome.session.is_some() {
            let gateway = self.gateway.clone();
            saga.on_failure("encerrar sessão do novo usuário", async move { gateway.sign_out().await });
        }
        let gateway = self.gateway.clone();
        saga.on_failure(format!("excluir usuário {}", user_id), async move {
            gateway.admin_delete_user(user_id).await
        });

        let nova = NovaEmpresa {
            nome: data.company_name.clone(),
            cnpj: data.cnpj.clone(),
        };
        let empresa_id = match self.gateway.insert_one::<_, Empresa>(Empresa::TABLE, &nova).await {
            Ok(empresa) => empresa.id,
            Err(e) => return saga.abort(with_prefix(COMPANY_NOT_CREATED, e)).await,
        };
        let gateway = self.gateway.clone();
        saga.on_failure(format!("excluir empresa {}", empresa_id), async move {
            gateway
                .delete(&Query::table(Empresa::TABLE).eq("id", empresa_id))
                .await
                .map(|_| ())
        });

        let promote = self
            .gateway
            .update(
                &Query::table(UserProfile::TABLE).eq("id", user_id),
                json!({ "role": UserRole::Admin.as_str(), "empresa_id": empresa_id }),
            )
            .await;
        match promote {
            Ok(rows) if !rows.is_empty() => {}
            Ok(_) => {
                let missing = AppError::NotFound(format!("perfil {} não encontrado", user_id));
                return saga.abort(with_prefix(ADMIN_ROLE_NOT_SET, missing)).await;
            }
            Err(e) => return saga.abort(with_prefix(ADMIN_ROLE_NOT_SET, e)).await,
        }

        saga.commit();
        Ok(outcome)
    }

    /// Encerra a sessão; o estado local é limpo mesmo se o backend falhar
    pub async fn logout(&self) -> AppResult<()> {
        let result = self.requests.track("logout", self.gateway.sign_out()).await;
        self.apply_session(None).await;
        if let Err(e) = &result {
            error!("❌ Erro ao sair: {}", e);
        }
        result
    }

    pub async fn resend_confirmation_email(&self, email: &str) -> AppResult<()> {
        self.requests
            .track("resend_confirmation", self.gateway.resend_signup_confirmation(email.trim()))
            .await
    }

    /// Exclui a conta pela função serverless e encerra a sessão
    pub async fn delete_user_account(&self) -> AppResult<()> {
        let guard = self.requests.begin_exclusive("delete_account")?;
        let result = self.gateway.invoke_function(DELETE_USER_FUNCTION, json!({})).await;
        guard.finish(&result);
        result?;

        if let Err(e) = self.gateway.sign_out().await {
            warn!("⚠️ Conta excluída, mas o logout falhou: {}", e);
        }
        self.apply_session(None).await;
        info!("🗑️ Conta excluída");
        Ok(())
    }

    /// Recarrega o perfil do usuário logado
    pub async fn refresh_profile(&self) -> AppResult<Option<UserProfile>> {
        let session = self.session().await;
        let profile = match &session {
            Some(session) => {
                let query = Query::table(UserProfile::TABLE).eq("id", session.user.id);
                self.gateway.fetch_optional::<UserProfile>(&query).await?
            }
            None => None,
        };
        let mut state = self.state.write().await;
        state.profile = profile.clone();
        state.epoch += 1;
        Ok(profile)
    }

    async fn apply_session(&self, session: Option<Session>) {
        let profile = load_profile(self.gateway.as_ref(), session.as_ref()).await;
        let mut state = self.state.write().await;
        write_session(&mut state, session, profile);
        state.is_loading = false;
    }
}

impl Drop for AuthService {
    fn drop(&mut self) {
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
                debug!("🔕 Eventos de autenticação cancelados");
            }
        }
    }
}

fn with_prefix(prefix: &str, error: AppError) -> AppError {
    AppError::Backend {
        status: error.status().unwrap_or(500),
        message: format!("{}{}", prefix, error.user_message()),
    }
}

fn write_session(state: &mut AuthSnapshot, session: Option<Session>, profile: Option<UserProfile>) {
    state.user = session.as_ref().map(|s| s.user.clone());
    state.profile = profile;
    state.session = session;
    state.epoch += 1;
}

/// Perfil do usuário da sessão; falhas viram "sem perfil"
async fn load_profile(gateway: &dyn DataGateway, session: Option<&Session>) -> Option<UserProfile> {
    let session = session?;
    let query = Query::table(UserProfile::TABLE).eq("id", session.user.id);
    match gateway.fetch_optional::<UserProfile>(&query).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!("⚠️ Não foi possível carregar o perfil de {}: {}", session.user.id, e);
            None
        }
    }
}

/// Reage aos eventos do gateway relendo a sessão atual
async fn listen(
    gateway: Arc<dyn DataGateway>,
    state: Arc<RwLock<AuthSnapshot>>,
    mut events: broadcast::Receiver<AuthEvent>,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("🔔 {} eventos de autenticação perdidos", skipped);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        debug!("🔔 Evento de autenticação: {:?}", std::mem::discriminant(&event));

        let epoch = state.read().await.epoch;
        let session = match event {
            AuthEvent::SignedOut => None,
            _ => gateway.current_session().await.unwrap_or_else(|e| {
                warn!("⚠️ Falha ao ler a sessão: {}", e);
                event.session().cloned()
            }),
        };
        let profile = load_profile(gateway.as_ref(), session.as_ref()).await;

        let mut state = state.write().await;
        if state.epoch != epoch {
            continue;
        }
        write_session(&mut state, session, profile);
        state.is_loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InMemoryGateway;

    #[tokio::test]
    async fn test_status_transitions() {
        let gateway: Arc<dyn DataGateway> = Arc::new(InMemoryGateway::new());
        let auth = AuthService::new(gateway);
        assert_eq!(auth.status().await, AuthStatus::Loading);

        auth.initialize().await.unwrap();
        assert_eq!(auth.status().await, AuthStatus::Unauthenticated);

        let data = PassengerSignUpData {
            name: "Ana".into(),
            email: "ana@timon.com".into(),
            password: "12345678".into(),
        };
        auth.sign_up_as_passenger(&data).await.unwrap();
        assert_eq!(auth.status().await, AuthStatus::Authenticated(UserRole::Passageiro));

        auth.logout().await.unwrap();
        assert_eq!(auth.status().await, AuthStatus::Unauthenticated);

        auth.login("ana@timon.com", "12345678").await.unwrap();
        assert_eq!(auth.profile().await.unwrap().name, "Ana");
    }

    #[tokio::test]
    async fn test_login_surfaces_backend_message() {
        let gateway: Arc<dyn DataGateway> = Arc::new(InMemoryGateway::new());
        let auth = AuthService::new(gateway);
        auth.initialize().await.unwrap();
        let err = auth.login("ninguem@timon.com", "x").await.unwrap_err();
        assert_eq!(err.user_message(), "Invalid login credentials");
        assert_eq!(auth.status().await, AuthStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn test_refresh_profile_reads_updated_row() {
        let gateway: Arc<dyn DataGateway> = Arc::new(InMemoryGateway::new());
        let auth = AuthService::new(gateway.clone());
        auth.initialize().await.unwrap();
        assert!(auth.refresh_profile().await.unwrap().is_none());

        let data = PassengerSignUpData {
            name: "Ana".into(),
            email: "ana@timon.com".into(),
            password: "12345678".into(),
        };
        auth.sign_up_as_passenger(&data).await.unwrap();
        let user_id = auth.user_id().await.unwrap();

        gateway
            .update(&Query::table(UserProfile::TABLE).eq("id", user_id), json!({ "name": "Ana Maria" }))
            .await
            .unwrap();
        let profile = auth.refresh_profile().await.unwrap().unwrap();
        assert_eq!(profile.name, "Ana Maria");
        assert_eq!(auth.profile().await.unwrap().name, "Ana Maria");
    }

    #[test]
    fn test_snapshot_requires_session_and_profile() {
        let snapshot = AuthSnapshot::default();
        assert_eq!(snapshot.status(), AuthStatus::Unauthenticated);
    }
}

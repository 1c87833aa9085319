//! Cliente HTTP para o backend hospedado (Supabase)
//!
//! Este módulo fala com as três APIs do backend: PostgREST para as tabelas,
//! GoTrue para autenticação e Edge Functions para a exclusão de conta.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use super::query::Query;
use super::session_store::FileSessionStore;
use super::DataGateway;
use crate::config::environment::EnvironmentConfig;
use crate::models::auth::{AuthEvent, AuthUser, Session, SignUpOutcome};
use crate::utils::errors::{AppError, AppResult};

/// Cliente HTTP do Supabase (REST + Auth + Functions)
pub struct SupabaseClient {
    client: Client,
    config: EnvironmentConfig,
    session: RwLock<Option<Session>>,
    store: Option<FileSessionStore>,
    events: broadcast::Sender<AuthEvent>,
}

/// Corpo de erro do GoTrue / PostgREST (os campos variam por endpoint)
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.msg.or(self.message).or(self.error_description).or(self.error)
    }
}

impl SupabaseClient {
    /// Criar novo cliente com a URL e a chave anônima configuradas
    pub fn new(config: EnvironmentConfig) -> AppResult<Self> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        let store = config.session_file.clone().map(FileSessionStore::new);
        let (events, _) = broadcast::channel(16);

        Ok(Self {
            client,
            config,
            session: RwLock::new(None),
            store,
            events,
        })
    }

    /// Token usado no header Authorization: o da sessão ou a chave anônima
    async fn bearer(&self) -> String {
        match self.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => self.config.supabase_anon_key.clone(),
        }
    }

    async fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.supabase_anon_key)
            .bearer_auth(self.bearer().await)
            .header("Accept", "application/json")
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.config.rest_url(), table)
    }

    /// Converte respostas não-2xx em `AppError::Backend` com a mensagem do servidor
    async fn check(response: Response) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| if body.is_empty() { status.to_string() } else { body.clone() });
        error!("❌ Backend respondeu {}: {}", status, message);
        Err(AppError::Backend {
            status: status.as_u16(),
            message,
        })
    }

    /// Lê um array JSON; corpo vazio vale como lista vazia
    async fn read_rows(response: Response) -> AppResult<Vec<Value>> {
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&text)? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            single => Ok(vec![single]),
        }
    }

    async fn set_session(&self, session: Option<Session>) {
        if let Some(store) = &self.store {
            let result = match &session {
                Some(session) => store.save(session).await,
                None => store.clear().await,
            };
            if let Err(e) = result {
                warn!("⚠️ Não foi possível persistir a sessão: {}", e);
            }
        }
        *self.session.write().await = session;
    }

    fn emit(&self, event: AuthEvent) {
        // sem assinantes o envio falha, o que é normal
        let _ = self.events.send(event);
    }

    async fn token_request(&self, grant_type: &str, body: Value) -> AppResult<Session> {
        let url = format!("{}/token?grant_type={}", self.config.auth_url(), grant_type);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.config.supabase_anon_key)
            .json(&body)
            .send()
            .await?;
        let session: Session = Self::check(response).await?.json().await?;
        Ok(session.with_expiry_filled())
    }
}

#[async_trait]
impl DataGateway for SupabaseClient {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<Session> {
        info!("🔐 Login de {}", email);
        let session = self
            .token_request("password", json!({ "email": email, "password": password }))
            .await?;
        self.set_session(Some(session.clone())).await;
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> AppResult<SignUpOutcome> {
        info!("📝 Cadastro de {}", email);
        let url = format!("{}/signup", self.config.auth_url());
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.config.supabase_anon_key)
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await?;
        let body: Value = Self::check(response).await?.json().await?;

        // com confirmação automática o GoTrue devolve uma sessão; senão, o próprio usuário
        if body.get("access_token").is_some() {
            let session = serde_json::from_value::<Session>(body)?.with_expiry_filled();
            self.set_session(Some(session.clone())).await;
            self.emit(AuthEvent::SignedIn(session.clone()));
            return Ok(SignUpOutcome {
                user: Some(session.user.clone()),
                session: Some(session),
            });
        }

        let user_value = body.get("user").cloned().unwrap_or(body);
        let user = serde_json::from_value::<AuthUser>(user_value).ok();
        Ok(SignUpOutcome { user, session: None })
    }

    async fn sign_out(&self) -> AppResult<()> {
        let had_session = self.session.read().await.is_some();
        let result = if had_session {
            let url = format!("{}/logout", self.config.auth_url());
            let request = self.authorized(self.client.post(&url)).await;
            match request.send().await {
                Ok(response) => Self::check(response).await.map(|_| ()),
                Err(e) => Err(e.into()),
            }
        } else {
            Ok(())
        };

        // a sessão local é descartada mesmo se o logout remoto falhar
        self.set_session(None).await;
        self.emit(AuthEvent::SignedOut);
        info!("👋 Sessão encerrada");
        result
    }

    async fn resend_signup_confirmation(&self, email: &str) -> AppResult<()> {
        let url = format!("{}/resend", self.config.auth_url());
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.config.supabase_anon_key)
            .json(&json!({ "type": "signup", "email": email }))
            .send()
            .await?;
        Self::check(response).await?;
        info!("📧 Confirmação reenviada para {}", email);
        Ok(())
    }

    async fn current_session(&self) -> AppResult<Option<Session>> {
        let mut session = self.session.read().await.clone();

        if session.is_none() {
            if let Some(store) = &self.store {
                session = store.load().await?;
                if session.is_some() {
                    *self.session.write().await = session.clone();
                }
            }
        }

        match session {
            Some(s) if s.is_expired() => {
                debug!("⏰ Sessão expirada, renovando");
                match self.refresh_session().await {
                    Ok(refreshed) => Ok(Some(refreshed)),
                    Err(e) => {
                        warn!("⚠️ Falha ao renovar sessão: {}", e);
                        self.set_session(None).await;
                        self.emit(AuthEvent::SignedOut);
                        Ok(None)
                    }
                }
            }
            other => Ok(other),
        }
    }

    async fn refresh_session(&self) -> AppResult<Session> {
        let refresh_token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or_else(|| AppError::Unauthorized("Nenhuma sessão para renovar.".to_string()))?;

        let session = self
            .token_request("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?;
        self.set_session(Some(session.clone())).await;
        self.emit(AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    async fn admin_delete_user(&self, user_id: Uuid) -> AppResult<()> {
        let url = format!("{}/admin/users/{}", self.config.auth_url(), user_id);
        let request = self.authorized(self.client.delete(&url)).await;
        Self::check(request.send().await?).await?;
        info!("🗑️ Usuário {} removido", user_id);
        Ok(())
    }

    fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn select(&self, query: &Query) -> AppResult<Vec<Value>> {
        let url = format!("{}?{}", self.table_url(&query.table), query.to_query_string());
        debug!("🌐 GET {}", url);
        let request = self.authorized(self.client.get(&url)).await;
        let response = Self::check(request.send().await?).await?;
        Self::read_rows(response).await
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> AppResult<Vec<Value>> {
        let url = format!("{}?select=*", self.table_url(table));
        debug!("🌐 POST {} ({} linhas)", url, rows.len());
        let request = self
            .authorized(self.client.post(&url))
            .await
            .header("Prefer", "return=representation")
            .json(&rows);
        let response = Self::check(request.send().await?).await?;
        Self::read_rows(response).await
    }

    async fn update(&self, query: &Query, patch: Value) -> AppResult<Vec<Value>> {
        let url = format!("{}?{}", self.table_url(&query.table), query.to_query_string());
        debug!("🌐 PATCH {}", url);
        let request = self
            .authorized(self.client.patch(&url))
            .await
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = Self::check(request.send().await?).await?;
        Self::read_rows(response).await
    }

    async fn upsert(&self, table: &str, rows: Vec<Value>, on_conflict: &[&str]) -> AppResult<Vec<Value>> {
        let url = format!(
            "{}?on_conflict={}&select=*",
            self.table_url(table),
            urlencoding::encode(&on_conflict.join(","))
        );
        debug!("🌐 POST (upsert) {} ({} linhas)", url, rows.len());
        let request = self
            .authorized(self.client.post(&url))
            .await
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&rows);
        let response = Self::check(request.send().await?).await?;
        Self::read_rows(response).await
    }

    async fn delete(&self, query: &Query) -> AppResult<usize> {
        let url = format!("{}?{}", self.table_url(&query.table), query.to_query_string());
        debug!("🌐 DELETE {}", url);
        let request = self
            .authorized(self.client.delete(&url))
            .await
            .header("Prefer", "return=representation");
        let response = Self::check(request.send().await?).await?;
        Ok(Self::read_rows(response).await?.len())
    }

    async fn invoke_function(&self, name: &str, body: Value) -> AppResult<Value> {
        let url = format!("{}/{}", self.config.functions_url(), name);
        info!("⚡ Invocando função {}", name);
        let request = self.authorized(self.client.post(&url)).await.json(&body);
        let response = Self::check(request.send().await?).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_prefers_msg() {
        let body: ErrorBody = serde_json::from_str(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Invalid login credentials"));

        let body: ErrorBody = serde_json::from_str(r#"{"code":"23505","message":"duplicate key value"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("duplicate key value"));
    }

    #[tokio::test]
    async fn test_client_starts_without_session() {
        let client = SupabaseClient::new(EnvironmentConfig::new("https://example.supabase.co", "anon")).unwrap();
        assert_eq!(client.bearer().await, "anon");
        assert_eq!(client.table_url("linhas"), "https://example.supabase.co/rest/v1/linhas");
        assert!(client.current_session().await.unwrap().is_none());
    }
}

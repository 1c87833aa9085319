//! Gateway em memória
//!
//! Cumpre o contrato de `DataGateway` sem rede: tabelas como linhas JSON,
//! ids e `created_at` gerados, chaves únicas, um emulador simples do
//! serviço de autenticação e a função `delete-user`. Falhas podem ser
//! injetadas por (alvo, operação) para exercitar as compensações.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use log::{debug, info, warn};
use serde_json::{json, Map, Value};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use super::query::Query;
use super::{DataGateway, DELETE_USER_FUNCTION};
use crate::models::auth::{AuthEvent, AuthUser, Session, SignUpOutcome, UserProfile};
use crate::utils::errors::{AppError, AppResult};

/// Alvo usado na injeção de falhas das operações de autenticação
pub const AUTH_TARGET: &str = "auth";

/// Tabelas com coluna `created_at` preenchida pelo servidor
const TIMESTAMPED_TABLES: [&str; 3] = ["linhas", "pontos_itinerario", "viagens"];

/// Restrições de unicidade das tabelas
const UNIQUE_KEYS: [(&str, &[&str]); 2] = [
    ("horarios_ponto", &["viagem_id", "ponto_itinerario_id"]),
    ("favoritos", &["user_id", "linha_id"]),
];

const SESSION_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Upsert,
    Delete,
    SignUp,
    SignIn,
    Function,
}

#[derive(Debug, Clone)]
struct AuthRecord {
    user: AuthUser,
    password: String,
    confirmed: bool,
}

#[derive(Debug)]
struct MemoryState {
    tables: HashMap<String, Vec<Value>>,
    users: HashMap<String, AuthRecord>,
    session: Option<Session>,
    failures: Vec<(String, Operation)>,
    clock: DateTime<Utc>,
}

impl MemoryState {
    /// Relógio monotônico: cada linha criada recebe um instante maior que o anterior
    fn tick(&mut self) -> String {
        let now = Utc::now();
        self.clock = if now > self.clock { now } else { self.clock + Duration::milliseconds(1) };
        self.clock.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn take_failure(&mut self, target: &str, operation: Operation) -> AppResult<()> {
        match self.failures.iter().position(|(t, op)| t == target && *op == operation) {
            Some(index) => {
                self.failures.remove(index);
                warn!("💥 Falha injetada em {:?} {}", operation, target);
                Err(AppError::Backend {
                    status: 500,
                    message: format!("injected failure on {:?} {}", operation, target),
                })
            }
            None => Ok(()),
        }
    }

    fn table(&mut self, name: &str) -> &mut Vec<Value> {
        self.tables.entry(name.to_string()).or_default()
    }

    /// Completa `id` e `created_at` como o servidor faria
    fn complete_row(&mut self, table: &str, row: Value) -> AppResult<Value> {
        let mut object = match row {
            Value::Object(object) => object,
            other => {
                return Err(AppError::Backend {
                    status: 400,
                    message: format!("expected a JSON object, got {}", other),
                })
            }
        };
        if !object.contains_key("id") {
            object.insert("id".to_string(), json!(Uuid::new_v4()));
        }
        if TIMESTAMPED_TABLES.contains(&table) && !object.contains_key("created_at") {
            object.insert("created_at".to_string(), json!(self.tick()));
        }
        Ok(Value::Object(object))
    }

    fn new_session(&self, user: &AuthUser) -> Session {
        Session {
            access_token: format!("mem-access-{}", Uuid::new_v4()),
            refresh_token: format!("mem-refresh-{}", Uuid::new_v4()),
            expires_in: Some(SESSION_TTL_SECS),
            expires_at: Some(Utc::now().timestamp() + SESSION_TTL_SECS),
            user: user.clone(),
        }
    }

    /// Remove o usuário de autenticação e o seu perfil
    fn remove_auth_user(&mut self, user_id: Uuid) -> bool {
        let email = self
            .users
            .iter()
            .find(|(_, record)| record.user.id == user_id)
            .map(|(email, _)| email.clone());
        match email {
            Some(email) => {
                self.users.remove(&email);
                let id = user_id.to_string();
                self.table(UserProfile::TABLE)
                    .retain(|row| row.get("id").and_then(Value::as_str) != Some(id.as_str()));
                true
            }
            None => false,
        }
    }
}

fn unique_key(table: &str) -> Option<&'static [&'static str]> {
    UNIQUE_KEYS.iter().find(|(t, _)| *t == table).map(|(_, columns)| *columns)
}

fn same_key(a: &Value, b: &Value, columns: &[&str]) -> bool {
    columns.iter().all(|c| a.get(*c).is_some() && a.get(*c) == b.get(*c))
}

fn conflict_error(table: &str, columns: &[&str]) -> AppError {
    AppError::Backend {
        status: 409,
        message: format!(
            "duplicate key value violates unique constraint \"{}_{}_key\"",
            table,
            columns.join("_")
        ),
    }
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Value::Object(target), Value::Object(patch)) = (target, patch) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Backend completo em memória
#[derive(Debug)]
pub struct InMemoryGateway {
    state: RwLock<MemoryState>,
    auto_confirm: bool,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGateway {
    /// Gateway vazio; cadastros entram já confirmados
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: RwLock::new(MemoryState {
                tables: HashMap::new(),
                users: HashMap::new(),
                session: None,
                failures: Vec::new(),
                clock: Utc::now(),
            }),
            auto_confirm: true,
            events,
        }
    }

    /// Com `false`, o cadastro não abre sessão e o login exige `confirm_email`
    pub fn with_auto_confirm(mut self, auto_confirm: bool) -> Self {
        self.auto_confirm = auto_confirm;
        self
    }

    /// A próxima `operation` sobre `target` (tabela, `auth` ou nome da função) falha
    pub async fn fail_next(&self, target: &str, operation: Operation) {
        self.state.write().await.failures.push((target.to_string(), operation));
    }

    /// Cópia das linhas de uma tabela
    pub async fn rows(&self, table: &str) -> Vec<Value> {
        self.state.read().await.tables.get(table).cloned().unwrap_or_default()
    }

    /// Insere linhas diretamente, sem falhas injetadas nem checagem de unicidade
    pub async fn seed(&self, table: &str, rows: Vec<Value>) -> AppResult<Vec<Value>> {
        let mut state = self.state.write().await;
        let mut completed = Vec::with_capacity(rows.len());
        for row in rows {
            completed.push(state.complete_row(table, row)?);
        }
        state.table(table).extend(completed.iter().cloned());
        Ok(completed)
    }

    pub async fn has_auth_user(&self, email: &str) -> bool {
        self.state.read().await.users.contains_key(email)
    }

    pub async fn confirm_email(&self, email: &str) -> bool {
        match self.state.write().await.users.get_mut(email) {
            Some(record) => {
                record.confirmed = true;
                true
            }
            None => false,
        }
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl DataGateway for InMemoryGateway {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<Session> {
        let session = {
            let mut state = self.state.write().await;
            state.take_failure(AUTH_TARGET, Operation::SignIn)?;

            let record = state
                .users
                .get(email)
                .filter(|record| record.password == password)
                .cloned()
                .ok_or_else(|| AppError::Backend {
                    status: 400,
                    message: "Invalid login credentials".to_string(),
                })?;
            if !record.confirmed {
                return Err(AppError::Backend {
                    status: 400,
                    message: "Email not confirmed".to_string(),
                });
            }

            let session = state.new_session(&record.user);
            state.session = Some(session.clone());
            session
        };
        debug!("🔐 [memória] login de {}", email);
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> AppResult<SignUpOutcome> {
        let outcome = {
            let mut state = self.state.write().await;
            state.take_failure(AUTH_TARGET, Operation::SignUp)?;

            if state.users.contains_key(email) {
                return Err(AppError::Backend {
                    status: 422,
                    message: "User already registered".to_string(),
                });
            }

            let user = AuthUser {
                id: Uuid::new_v4(),
                email: Some(email.to_string()),
                user_metadata: metadata.clone(),
            };
            state.users.insert(
                email.to_string(),
                AuthRecord {
                    user: user.clone(),
                    password: password.to_string(),
                    confirmed: self.auto_confirm,
                },
            );

            // trigger do backend: todo usuário novo ganha um perfil de passageiro
            let name = metadata.get("name").and_then(Value::as_str).unwrap_or_default();
            state.table(UserProfile::TABLE).push(json!({
                "id": user.id,
                "name": name,
                "role": "passageiro",
                "empresa_id": null,
            }));

            let session = if self.auto_confirm {
                let session = state.new_session(&user);
                state.session = Some(session.clone());
                Some(session)
            } else {
                None
            };
            SignUpOutcome {
                user: Some(user),
                session,
            }
        };

        if let Some(session) = &outcome.session {
            self.emit(AuthEvent::SignedIn(session.clone()));
        }
        debug!("📝 [memória] cadastro de {}", email);
        Ok(outcome)
    }

    async fn sign_out(&self) -> AppResult<()> {
        self.state.write().await.session = None;
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    async fn resend_signup_confirmation(&self, email: &str) -> AppResult<()> {
        // o serviço real responde sucesso mesmo para e-mails desconhecidos
        debug!("📧 [memória] reenvio de confirmação para {}", email);
        Ok(())
    }

    async fn current_session(&self) -> AppResult<Option<Session>> {
        Ok(self.state.read().await.session.clone())
    }

    async fn refresh_session(&self) -> AppResult<Session> {
        let session = {
            let mut state = self.state.write().await;
            let user = state
                .session
                .as_ref()
                .map(|s| s.user.clone())
                .ok_or_else(|| AppError::Unauthorized("Nenhuma sessão para renovar.".to_string()))?;
            let session = state.new_session(&user);
            state.session = Some(session.clone());
            session
        };
        self.emit(AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    async fn admin_delete_user(&self, user_id: Uuid) -> AppResult<()> {
        if self.state.write().await.remove_auth_user(user_id) {
            info!("🗑️ [memória] usuário {} removido", user_id);
            Ok(())
        } else {
            Err(AppError::Backend {
                status: 404,
                message: "User not found".to_string(),
            })
        }
    }

    fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn select(&self, query: &Query) -> AppResult<Vec<Value>> {
        let mut state = self.state.write().await;
        state.take_failure(&query.table, Operation::Select)?;

        let mut rows: Vec<Value> = state
            .tables
            .get(&query.table)
            .map(|rows| rows.iter().filter(|row| query.matches(row)).cloned().collect())
            .unwrap_or_default();
        query.sort(&mut rows);
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows.iter().map(|row| query.project(row)).collect())
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> AppResult<Vec<Value>> {
        let mut state = self.state.write().await;
        state.take_failure(table, Operation::Insert)?;

        let mut completed = Vec::with_capacity(rows.len());
        for row in rows {
            completed.push(state.complete_row(table, row)?);
        }

        // o lote inteiro é rejeitado se alguma linha violar a chave única
        if let Some(columns) = unique_key(table) {
            let existing = state.table(table);
            for (index, row) in completed.iter().enumerate() {
                let clashes_existing = existing.iter().any(|other| same_key(row, other, columns));
                let clashes_batch = completed[..index].iter().any(|other| same_key(row, other, columns));
                if clashes_existing || clashes_batch {
                    return Err(conflict_error(table, columns));
                }
            }
        }

        state.table(table).extend(completed.iter().cloned());
        Ok(completed)
    }

    async fn update(&self, query: &Query, patch: Value) -> AppResult<Vec<Value>> {
        let mut state = self.state.write().await;
        state.take_failure(&query.table, Operation::Update)?;

        let mut updated = Vec::new();
        for row in state.table(&query.table).iter_mut().filter(|row| query.matches(row)) {
            merge(row, &patch);
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn upsert(&self, table: &str, rows: Vec<Value>, on_conflict: &[&str]) -> AppResult<Vec<Value>> {
        let mut state = self.state.write().await;
        state.take_failure(table, Operation::Upsert)?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let position = state.table(table).iter().position(|other| same_key(&row, other, on_conflict));
            match position {
                Some(index) => {
                    let existing = &mut state.table(table)[index];
                    merge(existing, &row);
                    result.push(existing.clone());
                }
                None => {
                    let completed = state.complete_row(table, row)?;
                    state.table(table).push(completed.clone());
                    result.push(completed);
                }
            }
        }
        Ok(result)
    }

    async fn delete(&self, query: &Query) -> AppResult<usize> {
        let mut state = self.state.write().await;
        state.take_failure(&query.table, Operation::Delete)?;

        let rows = state.table(&query.table);
        let before = rows.len();
        rows.retain(|row| !query.matches(row));
        Ok(before - rows.len())
    }

    async fn invoke_function(&self, name: &str, _body: Value) -> AppResult<Value> {
        let mut state = self.state.write().await;
        state.take_failure(name, Operation::Function)?;

        if name != DELETE_USER_FUNCTION {
            return Err(AppError::Backend {
                status: 404,
                message: format!("Function '{}' not found", name),
            });
        }

        let user_id = state
            .session
            .as_ref()
            .map(|s| s.user.id)
            .ok_or_else(|| AppError::Backend {
                status: 401,
                message: "Missing authorization header".to_string(),
            })?;
        if !state.remove_auth_user(user_id) {
            return Err(AppError::Backend {
                status: 404,
                message: "User not found".to_string(),
            });
        }
        info!("🗑️ [memória] conta {} excluída", user_id);
        let mut body = Map::new();
        body.insert("message".to_string(), json!("User deleted successfully"));
        Ok(Value::Object(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::Direction;

    #[tokio::test]
    async fn test_insert_generates_ids_and_increasing_timestamps() {
        let gateway = InMemoryGateway::new();
        let rows = gateway
            .insert("linhas", vec![json!({"nome": "A"}), json!({"nome": "B"})])
            .await
            .unwrap();
        assert!(rows[0]["id"].is_string());
        assert!(rows[0]["created_at"].as_str().unwrap() < rows[1]["created_at"].as_str().unwrap());

        let newest = gateway
            .select(&Query::table("linhas").order("created_at", Direction::Desc).limit(1))
            .await
            .unwrap();
        assert_eq!(newest[0]["nome"], "B");
    }

    #[tokio::test]
    async fn test_unique_key_and_upsert() {
        let gateway = InMemoryGateway::new();
        let favorito = json!({"user_id": "u", "linha_id": "l"});
        gateway.insert("favoritos", vec![favorito.clone()]).await.unwrap();
        let err = gateway.insert("favoritos", vec![favorito]).await.unwrap_err();
        assert_eq!(err.status(), Some(409));

        let key = ["viagem_id", "ponto_itinerario_id"];
        let first = json!({"viagem_id": "v", "ponto_itinerario_id": "p", "horario_previsto": "08:00:00"});
        let second = json!({"viagem_id": "v", "ponto_itinerario_id": "p", "horario_previsto": "09:15:00"});
        gateway.upsert("horarios_ponto", vec![first], &key).await.unwrap();
        gateway.upsert("horarios_ponto", vec![second], &key).await.unwrap();
        let rows = gateway.rows("horarios_ponto").await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["horario_previsto"], "09:15:00");
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let gateway = InMemoryGateway::new();
        gateway.fail_next("linhas", Operation::Select).await;
        assert!(gateway.select(&Query::table("linhas")).await.is_err());
        assert!(gateway.select(&Query::table("linhas")).await.is_ok());
    }

    #[tokio::test]
    async fn test_sign_up_creates_profile_and_requires_confirmation() {
        let gateway = InMemoryGateway::new().with_auto_confirm(false);
        let outcome = gateway
            .sign_up("ana@timon.com", "12345678", json!({"name": "Ana"}))
            .await
            .unwrap();
        assert!(outcome.session.is_none());
        let user_id = outcome.user.unwrap().id;

        let profiles = gateway.rows("users").await;
        assert_eq!(profiles[0]["role"], "passageiro");
        assert_eq!(profiles[0]["name"], "Ana");

        let err = gateway.sign_in_with_password("ana@timon.com", "12345678").await.unwrap_err();
        assert_eq!(err.user_message(), "Email not confirmed");
        assert!(gateway.confirm_email("ana@timon.com").await);
        gateway.sign_in_with_password("ana@timon.com", "12345678").await.unwrap();

        gateway.invoke_function(DELETE_USER_FUNCTION, Value::Null).await.unwrap();
        assert!(!gateway.has_auth_user("ana@timon.com").await);
        assert!(gateway.rows("users").await.is_empty());
        assert_eq!(gateway.admin_delete_user(user_id).await.unwrap_err().status(), Some(404));
    }
}

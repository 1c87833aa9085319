//! Clients - acesso ao backend hospedado
//!
//! `DataGateway` é o contrato único usado pelos serviços: autenticação,
//! operações por tabela e a função serverless de exclusão de conta.
//! `SupabaseClient` fala HTTPS com o backend real; `InMemoryGateway`
//! cumpre o mesmo contrato em memória.

pub mod memory;
pub mod query;
pub mod session_store;
pub mod supabase_client;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::auth::{AuthEvent, Session, SignUpOutcome};
use crate::utils::errors::{internal_error, AppResult};

pub use memory::{InMemoryGateway, Operation};
pub use query::{Direction, Query};
pub use session_store::FileSessionStore;
pub use supabase_client::SupabaseClient;

/// Nome da função serverless que apaga a conta do usuário logado
pub const DELETE_USER_FUNCTION: &str = "delete-user";

#[async_trait]
pub trait DataGateway: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<Session>;

    /// `metadata` vai para `user_metadata` (o trigger do backend lê `name` dali)
    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> AppResult<SignUpOutcome>;

    async fn sign_out(&self) -> AppResult<()>;

    async fn resend_signup_confirmation(&self, email: &str) -> AppResult<()>;

    /// Sessão atual, restaurada e renovada quando necessário
    async fn current_session(&self) -> AppResult<Option<Session>>;

    async fn refresh_session(&self) -> AppResult<Session>;

    async fn admin_delete_user(&self, user_id: Uuid) -> AppResult<()>;

    fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent>;

    async fn select(&self, query: &Query) -> AppResult<Vec<Value>>;

    /// Devolve as linhas inseridas
    async fn insert(&self, table: &str, rows: Vec<Value>) -> AppResult<Vec<Value>>;

    /// Aplica `patch` às linhas filtradas por `query` e devolve as linhas alteradas
    async fn update(&self, query: &Query, patch: Value) -> AppResult<Vec<Value>>;

    async fn upsert(&self, table: &str, rows: Vec<Value>, on_conflict: &[&str]) -> AppResult<Vec<Value>>;

    /// Devolve quantas linhas foram removidas
    async fn delete(&self, query: &Query) -> AppResult<usize>;

    async fn invoke_function(&self, name: &str, body: Value) -> AppResult<Value>;
}

impl<'g> dyn DataGateway + 'g {
    /// Select tipado
    pub async fn fetch<T: DeserializeOwned>(&self, query: &Query) -> AppResult<Vec<T>> {
        let rows = self.select(query).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(Into::into))
            .collect()
    }

    /// Select de no máximo uma linha
    pub async fn fetch_optional<T: DeserializeOwned>(&self, query: &Query) -> AppResult<Option<T>> {
        let query = query.clone().limit(1);
        Ok(self.fetch::<T>(&query).await?.into_iter().next())
    }

    /// Insert de uma linha devolvendo o registro criado
    pub async fn insert_one<T: Serialize, R: DeserializeOwned>(&self, table: &str, row: &T) -> AppResult<R> {
        let inserted = self.insert(table, vec![serde_json::to_value(row)?]).await?;
        let first = inserted
            .into_iter()
            .next()
            .ok_or_else(|| internal_error(&format!("insert into '{}' returned no rows", table)))?;
        Ok(serde_json::from_value(first)?)
    }

    /// Insert de várias linhas
    pub async fn insert_many<T: Serialize>(&self, table: &str, rows: &[T]) -> AppResult<Vec<Value>> {
        let values = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.insert(table, values).await
    }

    /// Upsert de várias linhas
    pub async fn upsert_many<T: Serialize>(&self, table: &str, rows: &[T], on_conflict: &[&str]) -> AppResult<Vec<Value>> {
        let values = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.upsert(table, values, on_conflict).await
    }
}

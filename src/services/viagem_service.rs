//! Serviço de viagens
//!
//! Viagens da linha selecionada e os seus horários iniciais.

use std::borrow::Cow;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::RwLock;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::notifier::Notifier;
use super::request_tracker::RequestTracker;
use super::saga::Saga;
use crate::clients::{DataGateway, Direction, Query};
use crate::models::horario::{HorarioPonto, HorarioUpsert};
use crate::models::viagem::{normalize_dias, DiaSemana, NovaViagem, Viagem, ViagemWrite};
use crate::utils::errors::{AppError, AppResult};
use crate::utils::validation::validate_trimmed_length;

const LOAD_TRIPS_FAILED: &str = "Não foi possível carregar as viagens desta linha.";
const ADD_TRIP_FAILED: &str = "Não foi possível salvar a nova viagem e seus horários.";
const UPDATE_TRIP_FAILED: &str = "Não foi possível atualizar a viagem.";
const DELETE_TRIP_FAILED: &str = "Não foi possível deletar a viagem.";
const DESCRICAO_MIN: usize = 3;
const DESCRICAO_MESSAGE: &str = "A descrição da viagem deve ter pelo menos 3 caracteres.";

pub struct ViagemService {
    gateway: Arc<dyn DataGateway>,
    notifier: Arc<dyn Notifier>,
    viagens: RwLock<Vec<Viagem>>,
    requests: RequestTracker,
}

impl ViagemService {
    pub fn new(gateway: Arc<dyn DataGateway>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            gateway,
            notifier,
            viagens: RwLock::new(Vec::new()),
            requests: RequestTracker::new(),
        }
    }

    pub async fn viagens(&self) -> Vec<Viagem> {
        self.viagens.read().await.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.requests.is_loading()
    }

    pub fn requests(&self) -> &RequestTracker {
        &self.requests
    }

    fn fail(&self, message: &str, error: AppError) -> AppError {
        self.notifier.error_alert(message, error)
    }

    /// Viagens da linha, na ordem de criação
    pub async fn get_viagens_da_linha(&self, linha_id: Uuid) -> AppResult<Vec<Viagem>> {
        let query = Query::table(Viagem::TABLE)
            .eq("linha_id", linha_id)
            .order("created_at", Direction::Asc);
        let viagens = self
            .requests
            .track(format!("viagens:{}", linha_id), self.gateway.fetch::<Viagem>(&query))
            .await
            .map_err(|e| self.fail(LOAD_TRIPS_FAILED, e))?;

        *self.viagens.write().await = viagens.clone();
        Ok(viagens)
    }

    /// Cria a viagem e grava os horários; se os horários falharem a viagem é excluída
    pub async fn add_viagem_with_horarios(&self, linha_id: Uuid, nova: &NovaViagem) -> AppResult<Viagem> {
        let nova = NovaViagem {
            descricao: nova.descricao.trim().to_string(),
            dias_semana: normalize_dias(&nova.dias_semana),
            horarios: nova.horarios.clone(),
        };
        nova.validate()?;

        let guard = self
            .requests
            .begin_exclusive(format!("add_viagem:{}:{}", linha_id, nova.descricao))?;
        let result = self.create_viagem(linha_id, &nova).await;
        guard.finish(&result);

        let viagem = result.map_err(|e| self.fail(ADD_TRIP_FAILED, e))?;
        info!("🚍 Viagem '{}' criada com {} horários", viagem.descricao, nova.horarios.len());

        if let Err(e) = self.get_viagens_da_linha(linha_id).await {
            warn!("⚠️ Viagem criada, mas a lista não foi recarregada: {}", e);
        }
        Ok(viagem)
    }

    async fn create_viagem(&self, linha_id: Uuid, nova: &NovaViagem) -> AppResult<Viagem> {
        let write = ViagemWrite {
            linha_id: Some(linha_id),
            descricao: &nova.descricao,
            dias_semana: nova.dias_semana.clone(),
        };
        let viagem: Viagem = self.gateway.insert_one(Viagem::TABLE, &write).await?;
        if nova.horarios.is_empty() {
            return Ok(viagem);
        }

        let mut saga = Saga::new(format!("nova viagem {}", viagem.descricao));
        let gateway = self.gateway.clone();
        let viagem_id = viagem.id;
        saga.on_failure(format!("excluir viagem {}", viagem_id), async move {
            gateway
                .delete(&Query::table(Viagem::TABLE).eq("id", viagem_id))
                .await
                .map(|_| ())
        });

        let horarios: Vec<HorarioUpsert> = nova.horarios.iter().map(|h| h.for_viagem(viagem_id)).collect();
        if let Err(e) = self.gateway.insert_many(HorarioPonto::TABLE, &horarios).await {
            return saga.abort(e).await;
        }

        saga.commit();
        Ok(viagem)
    }

    /// Atualiza descrição e dias; o registro local recebe os mesmos valores
    pub async fn update_viagem(&self, viagem_id: Uuid, descricao: &str, dias_semana: &[DiaSemana]) -> AppResult<()> {
        let descricao = descricao.trim();
        if let Err(mut error) = validate_trimmed_length(descricao, DESCRICAO_MIN) {
            error.message = Some(Cow::Borrowed(DESCRICAO_MESSAGE));
            let mut errors = ValidationErrors::new();
            errors.add("descricao", error);
            return Err(errors.into());
        }
        let dias_semana = normalize_dias(dias_semana);

        let write = ViagemWrite {
            linha_id: None,
            descricao,
            dias_semana: dias_semana.clone(),
        };
        let patch = serde_json::to_value(&write)?;
        let query = Query::table(Viagem::TABLE).eq("id", viagem_id);
        self.requests
            .track(format!("update_viagem:{}", viagem_id), self.gateway.update(&query, patch))
            .await
            .map_err(|e| self.fail(UPDATE_TRIP_FAILED, e))?;

        let mut viagens = self.viagens.write().await;
        if let Some(viagem) = viagens.iter_mut().find(|v| v.id == viagem_id) {
            viagem.descricao = descricao.to_string();
            viagem.dias_semana = Some(dias_semana);
        }
        info!("✏️ Viagem {} atualizada", viagem_id);
        Ok(())
    }

    /// Exclui os horários e depois a viagem
    pub async fn delete_viagem(&self, viagem_id: Uuid) -> AppResult<()> {
        let guard = self.requests.begin_exclusive(format!("delete_viagem:{}", viagem_id))?;
        let result = async {
            self.gateway
                .delete(&Query::table(HorarioPonto::TABLE).eq("viagem_id", viagem_id))
                .await?;
            self.gateway
                .delete(&Query::table(Viagem::TABLE).eq("id", viagem_id))
                .await
        }
        .await;
        guard.finish(&result);
        result.map_err(|e| self.fail(DELETE_TRIP_FAILED, e))?;

        self.viagens.write().await.retain(|v| v.id != viagem_id);
        info!("🗑️ Viagem {} excluída", viagem_id);
        Ok(())
    }
}

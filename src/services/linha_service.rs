//! Serviço de linhas
//!
//! Linhas da empresa logada, pontos do itinerário, horários das viagens
//! e favoritos do passageiro. Toda falha remota mostra um alerta fixo e
//! devolve o erro original ao chamador.

use std::sync::Arc;

use log::{info, warn};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::auth_service::AuthService;
use super::notifier::Notifier;
use super::request_tracker::RequestTracker;
use super::saga::Saga;
use crate::clients::{DataGateway, Direction, Query};
use crate::models::favorito::Favorito;
use crate::models::horario::{HorarioPonto, HorarioUpsert};
use crate::models::linha::{mark_favorites, CreateLinhaData, Linha, LinhaInsert, UpdateLinhaData};
use crate::models::ponto::{validate_descricao, NovoPonto, PontoItinerario};
use crate::models::viagem::Viagem;
use crate::utils::errors::{AppError, AppResult};

const LOAD_COMPANY_LINES_FAILED: &str = "Não foi possível carregar as linhas da sua empresa.";
const LOAD_LINES_OF_COMPANY_FAILED: &str = "Não foi possível carregar as linhas desta empresa.";
const LOAD_ALL_LINES_FAILED: &str = "Não foi possível carregar todas as linhas.";
const LOAD_FAVORITES_FAILED: &str = "Não foi possível carregar suas linhas favoritas.";
const ADD_FAVORITE_FAILED: &str = "Não foi possível adicionar o favorito.";
const REMOVE_FAVORITE_FAILED: &str = "Não foi possível remover o favorito.";
const ADD_LINE_FAILED: &str = "Não foi possível adicionar a nova linha e seus pontos.";
const UPDATE_LINE_FAILED: &str = "Não foi possível atualizar a linha.";
const DELETE_LINE_FAILED: &str = "Não foi possível deletar a linha e seus dados associados.";
const LOAD_STOPS_FAILED: &str = "Não foi possível carregar os pontos da linha.";
const ADD_STOP_FAILED: &str = "Não foi possível adicionar o ponto.";
const REMOVE_STOP_FAILED: &str = "Não foi possível remover o ponto.";
const LOAD_TIMES_FAILED: &str = "Não foi possível carregar os horários.";
const SAVE_TIMES_FAILED: &str = "Não foi possível salvar os horários.";

#[derive(Debug, Default)]
struct LinhaState {
    linhas: Vec<Linha>,
    favorite_linhas: Vec<Linha>,
    pontos: Vec<PontoItinerario>,
    horarios: Vec<HorarioPonto>,
}

pub struct LinhaService {
    gateway: Arc<dyn DataGateway>,
    auth: Arc<AuthService>,
    notifier: Arc<dyn Notifier>,
    state: RwLock<LinhaState>,
    requests: RequestTracker,
}

impl LinhaService {
    pub fn new(gateway: Arc<dyn DataGateway>, auth: Arc<AuthService>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            gateway,
            auth,
            notifier,
            state: RwLock::new(LinhaState::default()),
            requests: RequestTracker::new(),
        }
    }

    pub async fn linhas(&self) -> Vec<Linha> {
        self.state.read().await.linhas.clone()
    }

    pub async fn favorite_linhas(&self) -> Vec<Linha> {
        self.state.read().await.favorite_linhas.clone()
    }

    pub async fn pontos(&self) -> Vec<PontoItinerario> {
        self.state.read().await.pontos.clone()
    }

    pub async fn horarios(&self) -> Vec<HorarioPonto> {
        self.state.read().await.horarios.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.requests.is_loading()
    }

    pub fn requests(&self) -> &RequestTracker {
        &self.requests
    }

    /// Marca `is_favorito` conforme os favoritos carregados
    pub async fn with_favorites(&self, linhas: &[Linha]) -> Vec<Linha> {
        mark_favorites(linhas, &self.state.read().await.favorite_linhas)
    }

    /// Ordem do próximo ponto da linha selecionada
    pub async fn proxima_ordem(&self) -> i32 {
        PontoItinerario::proxima_ordem(&self.state.read().await.pontos)
    }

    fn fail(&self, message: &str, error: AppError) -> AppError {
        self.notifier.error_alert(message, error)
    }

    /// Linhas da empresa do perfil logado, mais novas primeiro
    pub async fn get_linhas_da_empresa(&self) -> AppResult<Vec<Linha>> {
        let Some(empresa_id) = self.auth.empresa_id().await else {
            self.state.write().await.linhas.clear();
            return Ok(Vec::new());
        };

        let query = Query::table(Linha::TABLE)
            .eq("empresa_id", empresa_id)
            .order("created_at", Direction::Desc);
        let result = self
            .requests
            .track("linhas_da_empresa", self.gateway.fetch::<Linha>(&query))
            .await;

        match result {
            Ok(linhas) => {
                self.state.write().await.linhas = linhas.clone();
                Ok(linhas)
            }
            Err(e) => Err(self.fail(LOAD_COMPANY_LINES_FAILED, e)),
        }
    }

    pub async fn get_linhas_by_empresa_id(&self, empresa_id: Uuid) -> AppResult<Vec<Linha>> {
        let query = Query::table(Linha::TABLE)
            .eq("empresa_id", empresa_id)
            .order("nome", Direction::Asc);
        self.requests
            .track(format!("linhas_por_empresa:{}", empresa_id), self.gateway.fetch::<Linha>(&query))
            .await
            .map_err(|e| self.fail(LOAD_LINES_OF_COMPANY_FAILED, e))
    }

    pub async fn get_all_linhas(&self) -> AppResult<Vec<Linha>> {
        let query = Query::table(Linha::TABLE).order("nome", Direction::Asc);
        self.requests
            .track("todas_as_linhas", self.gateway.fetch::<Linha>(&query))
            .await
            .map_err(|e| self.fail(LOAD_ALL_LINES_FAILED, e))
    }

    /// Cria a linha e os seus pontos (ordem 1..N na ordem informada).
    ///
    /// Se os pontos não puderem ser gravados, a linha recém-criada é excluída.
    pub async fn add_linha(&self, data: &CreateLinhaData) -> AppResult<Linha> {
        let data = data.normalized();
        data.validate()?;
        let empresa_id = self
            .auth
            .empresa_id()
            .await
            .ok_or_else(|| AppError::Forbidden("Usuário sem empresa vinculada.".to_string()))?;

        let guard = self
            .requests
            .begin_exclusive(format!("add_linha:{}:{}", data.nome, data.numero))?;
        let result = self.create_linha_with_pontos(empresa_id, &data).await;
        guard.finish(&result);

        let linha = result.map_err(|e| self.fail(ADD_LINE_FAILED, e))?;
        info!("🚌 Linha {} - {} criada com {} pontos", linha.numero, linha.nome, data.pontos.len());

        // a lista própria é recarregada; uma falha aqui já gera o seu alerta
        if let Err(e) = self.get_linhas_da_empresa().await {
            warn!("⚠️ Linha criada, mas a lista não foi recarregada: {}", e);
        }
        Ok(linha)
    }

    async fn create_linha_with_pontos(&self, empresa_id: Uuid, data: &CreateLinhaData) -> AppResult<Linha> {
        let insert = LinhaInsert {
            nome: &data.nome,
            numero: &data.numero,
            empresa_id,
        };
        let linha: Linha = self.gateway.insert_one(Linha::TABLE, &insert).await?;

        let mut saga = Saga::new(format!("nova linha {}", linha.numero));
        let gateway = self.gateway.clone();
        let linha_id = linha.id;
        saga.on_failure(format!("excluir linha {}", linha_id), async move {
            gateway
                .delete(&Query::table(Linha::TABLE).eq("id", linha_id))
                .await
                .map(|_| ())
        });

        let pontos: Vec<NovoPonto> = data
            .pontos
            .iter()
            .enumerate()
            .map(|(index, descricao)| NovoPonto {
                linha_id,
                descricao: descricao.clone(),
                ordem: index as i32 + 1,
            })
            .collect();
        if let Err(e) = self.gateway.insert_many(PontoItinerario::TABLE, &pontos).await {
            return saga.abort(e).await;
        }

        saga.commit();
        Ok(linha)
    }

    pub async fn update_linha(&self, linha_id: Uuid, data: &UpdateLinhaData) -> AppResult<()> {
        let data = data.normalized();
        data.validate()?;

        let query = Query::table(Linha::TABLE).eq("id", linha_id);
        let patch = serde_json::to_value(&data)?;
        self.requests
            .track(format!("update_linha:{}", linha_id), self.gateway.update(&query, patch))
            .await
            .map_err(|e| self.fail(UPDATE_LINE_FAILED, e))?;

        info!("✏️ Linha {} atualizada", linha_id);
        if let Err(e) = self.get_linhas_da_empresa().await {
            warn!("⚠️ Linha atualizada, mas a lista não foi recarregada: {}", e);
        }
        Ok(())
    }

    /// Exclui horários, viagens, pontos e a linha, nessa ordem; para na primeira falha
    pub async fn delete_linha(&self, linha_id: Uuid) -> AppResult<()> {
        let guard = self.requests.begin_exclusive(format!("delete_linha:{}", linha_id))?;
        let result = self.delete_linha_cascade(linha_id).await;
        guard.finish(&result);
        result.map_err(|e| self.fail(DELETE_LINE_FAILED, e))?;

        let mut state = self.state.write().await;
        state.linhas.retain(|l| l.id != linha_id);
        state.favorite_linhas.retain(|l| l.id != linha_id);
        info!("🗑️ Linha {} excluída", linha_id);
        Ok(())
    }

    async fn delete_linha_cascade(&self, linha_id: Uuid) -> AppResult<()> {
        let viagens = self
            .gateway
            .select(&Query::table(Viagem::TABLE).select("id").eq("linha_id", linha_id))
            .await?;
        let viagem_ids: Vec<String> = viagens
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_str).map(str::to_string))
            .collect();

        if !viagem_ids.is_empty() {
            self.gateway
                .delete(&Query::table(HorarioPonto::TABLE).in_("viagem_id", &viagem_ids))
                .await?;
            self.gateway
                .delete(&Query::table(Viagem::TABLE).in_("id", &viagem_ids))
                .await?;
        }
        self.gateway
            .delete(&Query::table(PontoItinerario::TABLE).eq("linha_id", linha_id))
            .await?;
        self.gateway
            .delete(&Query::table(Linha::TABLE).eq("id", linha_id))
            .await?;
        Ok(())
    }

    /// Pontos da linha em ordem; a lista anterior é descartada antes da busca
    pub async fn get_pontos_da_linha(&self, linha_id: Uuid) -> AppResult<Vec<PontoItinerario>> {
        self.state.write().await.pontos.clear();

        let query = Query::table(PontoItinerario::TABLE)
            .eq("linha_id", linha_id)
            .order("ordem", Direction::Asc);
        let pontos = self
            .requests
            .track(format!("pontos:{}", linha_id), self.gateway.fetch::<PontoItinerario>(&query))
            .await
            .map_err(|e| self.fail(LOAD_STOPS_FAILED, e))?;

        self.state.write().await.pontos = pontos.clone();
        Ok(pontos)
    }

    pub async fn add_ponto(&self, linha_id: Uuid, descricao: &str, ordem: i32) -> AppResult<PontoItinerario> {
        if let Err(error) = validate_descricao(descricao) {
            let mut errors = ValidationErrors::new();
            errors.add("descricao", error);
            return Err(errors.into());
        }
        let novo = NovoPonto {
            linha_id,
            descricao: descricao.trim().to_string(),
            ordem,
        };
        let ponto: PontoItinerario = self
            .requests
            .track(
                format!("add_ponto:{}", linha_id),
                self.gateway.insert_one(PontoItinerario::TABLE, &novo),
            )
            .await
            .map_err(|e| self.fail(ADD_STOP_FAILED, e))?;

        let mut state = self.state.write().await;
        state.pontos.push(ponto.clone());
        state.pontos.sort_by_key(|p| p.ordem);
        Ok(ponto)
    }

    /// Remove o ponto e os seus horários e renumera os restantes (1..N)
    pub async fn delete_ponto(&self, ponto_id: Uuid) -> AppResult<()> {
        let guard = self.requests.begin_exclusive(format!("delete_ponto:{}", ponto_id))?;
        let result = self.delete_and_renumber(ponto_id).await;
        guard.finish(&result);

        let pontos = result.map_err(|e| self.fail(REMOVE_STOP_FAILED, e))?;
        self.state.write().await.pontos = pontos;
        info!("🗑️ Ponto {} removido", ponto_id);
        Ok(())
    }

    async fn delete_and_renumber(&self, ponto_id: Uuid) -> AppResult<Vec<PontoItinerario>> {
        let known = self
            .state
            .read()
            .await
            .pontos
            .iter()
            .find(|p| p.id == ponto_id)
            .map(|p| p.linha_id);
        let linha_id = match known {
            Some(linha_id) => Some(linha_id),
            None => self
                .gateway
                .fetch_optional::<PontoItinerario>(&Query::table(PontoItinerario::TABLE).eq("id", ponto_id))
                .await?
                .map(|p| p.linha_id),
        };

        self.gateway
            .delete(&Query::table(HorarioPonto::TABLE).eq("ponto_itinerario_id", ponto_id))
            .await?;
        self.gateway
            .delete(&Query::table(PontoItinerario::TABLE).eq("id", ponto_id))
            .await?;

        let Some(linha_id) = linha_id else {
            return Ok(Vec::new());
        };
        let query = Query::table(PontoItinerario::TABLE)
            .eq("linha_id", linha_id)
            .order("ordem", Direction::Asc);
        let mut restantes = self.gateway.fetch::<PontoItinerario>(&query).await?;

        for (index, ponto) in restantes.iter_mut().enumerate() {
            let ordem = index as i32 + 1;
            if ponto.ordem != ordem {
                self.gateway
                    .update(
                        &Query::table(PontoItinerario::TABLE).eq("id", ponto.id),
                        serde_json::json!({ "ordem": ordem }),
                    )
                    .await?;
                ponto.ordem = ordem;
            }
        }
        Ok(restantes)
    }

    pub async fn get_horarios_da_viagem(&self, viagem_id: Uuid) -> AppResult<Vec<HorarioPonto>> {
        let query = Query::table(HorarioPonto::TABLE).eq("viagem_id", viagem_id);
        let horarios = self
            .requests
            .track(format!("horarios:{}", viagem_id), self.gateway.fetch::<HorarioPonto>(&query))
            .await
            .map_err(|e| self.fail(LOAD_TIMES_FAILED, e))?;

        self.state.write().await.horarios = horarios.clone();
        Ok(horarios)
    }

    pub async fn upsert_horario(&self, horario: HorarioUpsert) -> AppResult<()> {
        self.upsert_all_horarios(&[horario]).await
    }

    /// Grava os horários (chave viagem + ponto) e recarrega os da viagem
    pub async fn upsert_all_horarios(&self, horarios: &[HorarioUpsert]) -> AppResult<()> {
        let Some(first) = horarios.first() else {
            return Ok(());
        };
        let viagem_id = first.viagem_id;

        self.requests
            .track(
                format!("salvar_horarios:{}", viagem_id),
                self.gateway
                    .upsert_many(HorarioPonto::TABLE, horarios, &HorarioPonto::CONFLICT_COLUMNS),
            )
            .await
            .map_err(|e| self.fail(SAVE_TIMES_FAILED, e))?;

        info!("🕒 {} horários salvos para a viagem {}", horarios.len(), viagem_id);
        self.get_horarios_da_viagem(viagem_id).await?;
        Ok(())
    }

    /// Linhas favoritas do usuário logado; sem usuário não faz nada
    pub async fn get_favorite_linhas(&self) -> AppResult<Vec<Linha>> {
        let Some(user_id) = self.auth.user_id().await else {
            return Ok(self.favorite_linhas().await);
        };

        let result = self
            .requests
            .track(format!("favoritos:{}", user_id), self.fetch_favorites(user_id))
            .await;
        match result {
            Ok(linhas) => {
                self.state.write().await.favorite_linhas = linhas.clone();
                Ok(linhas)
            }
            Err(e) => Err(self.fail(LOAD_FAVORITES_FAILED, e)),
        }
    }

    async fn fetch_favorites(&self, user_id: Uuid) -> AppResult<Vec<Linha>> {
        let favoritos = self
            .gateway
            .fetch::<Favorito>(&Query::table(Favorito::TABLE).eq("user_id", user_id))
            .await?;
        if favoritos.is_empty() {
            return Ok(Vec::new());
        }

        let ids = favoritos.iter().map(|f| f.linha_id);
        let query = Query::table(Linha::TABLE).in_("id", ids).order("nome", Direction::Asc);
        let linhas = self.gateway.fetch::<Linha>(&query).await?;
        Ok(linhas
            .into_iter()
            .map(|linha| Linha {
                is_favorito: true,
                ..linha
            })
            .collect())
    }

    /// Adiciona ou remove o favorito e recarrega a lista
    pub async fn toggle_favorito(&self, linha_id: Uuid, is_currently_favorito: bool) -> AppResult<()> {
        let Some(user_id) = self.auth.user_id().await else {
            return Ok(());
        };

        let key = format!("favorito:{}", linha_id);
        let guard = self.requests.begin_exclusive(key)?;
        let result = if is_currently_favorito {
            let query = Query::table(Favorito::TABLE)
                .eq("user_id", user_id)
                .eq("linha_id", linha_id);
            self.gateway.delete(&query).await.map(|_| ())
        } else {
            let favorito = Favorito { user_id, linha_id };
            self.gateway.insert_many(Favorito::TABLE, &[favorito]).await.map(|_| ())
        };
        guard.finish(&result);

        let message = if is_currently_favorito {
            REMOVE_FAVORITE_FAILED
        } else {
            ADD_FAVORITE_FAILED
        };
        result.map_err(|e| self.fail(message, e))?;

        info!(
            "⭐ Favorito {} {}",
            linha_id,
            if is_currently_favorito { "removido" } else { "adicionado" }
        );
        self.get_favorite_linhas().await?;
        Ok(())
    }
}

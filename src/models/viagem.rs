//! Modelo de Viagem
//!
//! Variante de horário de uma linha, com os dias da semana em que opera.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::horario::HorarioParaSalvar;

/// Dia da semana como gravado em `viagens.dias_semana`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiaSemana {
    Seg,
    Ter,
    Qua,
    Qui,
    Sex,
    Sab,
    Dom,
}

impl DiaSemana {
    pub const TODOS: [DiaSemana; 7] = [
        DiaSemana::Seg,
        DiaSemana::Ter,
        DiaSemana::Qua,
        DiaSemana::Qui,
        DiaSemana::Sex,
        DiaSemana::Sab,
        DiaSemana::Dom,
    ];

    pub const UTEIS: [DiaSemana; 5] = [
        DiaSemana::Seg,
        DiaSemana::Ter,
        DiaSemana::Qua,
        DiaSemana::Qui,
        DiaSemana::Sex,
    ];

    pub fn codigo(&self) -> &'static str {
        match self {
            DiaSemana::Seg => "seg",
            DiaSemana::Ter => "ter",
            DiaSemana::Qua => "qua",
            DiaSemana::Qui => "qui",
            DiaSemana::Sex => "sex",
            DiaSemana::Sab => "sab",
            DiaSemana::Dom => "dom",
        }
    }

    pub fn from_codigo(codigo: &str) -> Option<Self> {
        Self::TODOS.iter().copied().find(|d| d.codigo() == codigo.trim().to_lowercase())
    }

    pub fn nome_longo(&self) -> &'static str {
        match self {
            DiaSemana::Seg => "Segunda",
            DiaSemana::Ter => "Terça",
            DiaSemana::Qua => "Quarta",
            DiaSemana::Qui => "Quinta",
            DiaSemana::Sex => "Sexta",
            DiaSemana::Sab => "Sábado",
            DiaSemana::Dom => "Domingo",
        }
    }

    pub fn nome_curto(&self) -> &'static str {
        match self {
            DiaSemana::Seg => "Seg",
            DiaSemana::Ter => "Ter",
            DiaSemana::Qua => "Qua",
            DiaSemana::Qui => "Qui",
            DiaSemana::Sex => "Sex",
            DiaSemana::Sab => "Sáb",
            DiaSemana::Dom => "Dom",
        }
    }
}

/// Viagem - mapeia a tabela viagens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viagem {
    pub id: Uuid,
    pub descricao: String,
    pub linha_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_dias")]
    pub dias_semana: Option<Vec<DiaSemana>>,
}

/// Códigos desconhecidos são descartados para não derrubar a lista inteira
fn deserialize_dias<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<DiaSemana>>, D::Error> {
    let codigos: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(codigos.map(|codigos| {
        codigos
            .iter()
            .filter_map(|codigo| {
                let dia = DiaSemana::from_codigo(codigo);
                if dia.is_none() {
                    warn!("⚠️ Dia da semana desconhecido ignorado: '{}'", codigo);
                }
                dia
            })
            .collect()
    }))
}

impl Viagem {
    pub const TABLE: &'static str = "viagens";
}

/// Nova viagem com todos os horários dos pontos
#[derive(Debug, Clone, Default, Validate)]
pub struct NovaViagem {
    #[validate(length(min = 3, message = "A descrição da viagem deve ter pelo menos 3 caracteres."))]
    pub descricao: String,
    pub dias_semana: Vec<DiaSemana>,
    pub horarios: Vec<HorarioParaSalvar>,
}

/// Campos gravados em `viagens` na criação e na edição
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ViagemWrite<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linha_id: Option<Uuid>,
    pub descricao: &'a str,
    pub dias_semana: Vec<DiaSemana>,
}

/// Dias ordenados de segunda a domingo, sem repetição
pub fn normalize_dias(dias: &[DiaSemana]) -> Vec<DiaSemana> {
    let mut dias = dias.to_vec();
    dias.sort();
    dias.dedup();
    dias
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dias_serialize_as_codes() {
        let value = serde_json::to_value(vec![DiaSemana::Seg, DiaSemana::Sab]).unwrap();
        assert_eq!(value, json!(["seg", "sab"]));
        assert_eq!(DiaSemana::from_codigo(" QUA "), Some(DiaSemana::Qua));
        assert_eq!(DiaSemana::from_codigo("xyz"), None);
    }

    #[test]
    fn test_normalize_dias() {
        let dias = normalize_dias(&[DiaSemana::Dom, DiaSemana::Seg, DiaSemana::Dom]);
        assert_eq!(dias, vec![DiaSemana::Seg, DiaSemana::Dom]);
    }

    #[test]
    fn test_viagem_without_dias() {
        let row = json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "descricao": "Manhã",
            "linha_id": "550e8400-e29b-41d4-a716-446655440001",
            "created_at": "2025-07-16T19:41:32.123456+00:00",
            "dias_semana": null
        });
        let viagem: Viagem = serde_json::from_value(row).unwrap();
        assert!(viagem.dias_semana.is_none());
    }

    #[test]
    fn test_unknown_dia_is_skipped() {
        let row = json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "descricao": "Feriado",
            "linha_id": "550e8400-e29b-41d4-a716-446655440001",
            "created_at": "2025-07-16T19:41:32.123456+00:00",
            "dias_semana": ["feriado", "dom"]
        });
        let viagem: Viagem = serde_json::from_value(row).unwrap();
        assert_eq!(viagem.dias_semana, Some(vec![DiaSemana::Dom]));
    }
}

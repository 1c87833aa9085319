//! Modelo de Horário
//!
//! Horário previsto de uma viagem em um ponto. O backend guarda `time`
//! (HH:mm:ss); a interface mostra só HH:mm e grava de volta como HH:mm:00.

use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::utils::validation::validate_time_of_day;

/// Texto mostrado para ponto sem horário
pub const HORARIO_VAZIO: &str = "--:--";

/// Horário do dia, sempre com segundos zerados na escrita
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HorarioPrevisto(NaiveTime);

impl HorarioPrevisto {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Converte o que o usuário digitou (HH:mm)
    pub fn parse_input(value: &str) -> Option<Self> {
        validate_time_of_day(value).ok().map(Self)
    }

    /// Formato de tela: HH:mm
    pub fn display(&self) -> String {
        self.0.format("%H:%M").to_string()
    }

    /// Formato de escrita: HH:mm:00
    pub fn wire(&self) -> String {
        format!("{:02}:{:02}:00", self.0.hour(), self.0.minute())
    }

    fn parse_wire(value: &str) -> Option<Self> {
        // o servidor pode devolver HH:mm:ss, HH:mm:ss.ffffff ou só HH:mm
        let prefix = value.get(0..5)?;
        let time = NaiveTime::parse_from_str(prefix, "%H:%M").ok()?;
        Some(Self(time))
    }
}

impl fmt::Display for HorarioPrevisto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl Serialize for HorarioPrevisto {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.wire())
    }
}

impl<'de> Deserialize<'de> for HorarioPrevisto {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        HorarioPrevisto::parse_wire(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid time of day '{}'", raw)))
    }
}

/// Horário de uma viagem em um ponto - tabela `horarios_ponto`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorarioPonto {
    pub id: Uuid,
    pub viagem_id: Uuid,
    pub ponto_itinerario_id: Uuid,
    pub horario_previsto: HorarioPrevisto,
}

impl HorarioPonto {
    pub const TABLE: &'static str = "horarios_ponto";
    /// Chave única usada no upsert
    pub const CONFLICT_COLUMNS: [&'static str; 2] = ["viagem_id", "ponto_itinerario_id"];
}

/// Horário gravado por upsert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorarioUpsert {
    pub viagem_id: Uuid,
    pub ponto_itinerario_id: Uuid,
    pub horario_previsto: HorarioPrevisto,
}

/// Horário informado na criação de uma viagem (a viagem ainda não tem id)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorarioParaSalvar {
    pub ponto_itinerario_id: Uuid,
    pub horario_previsto: HorarioPrevisto,
}

impl HorarioParaSalvar {
    pub fn for_viagem(&self, viagem_id: Uuid) -> HorarioUpsert {
        HorarioUpsert {
            viagem_id,
            ponto_itinerario_id: self.ponto_itinerario_id,
            horario_previsto: self.horario_previsto,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_and_display_formats() {
        let horario = HorarioPrevisto::parse_input("8:30").unwrap();
        assert_eq!(horario.display(), "08:30");
        assert_eq!(horario.wire(), "08:30:00");
        assert_eq!(serde_json::to_value(horario).unwrap(), json!("08:30:00"));
    }

    #[test]
    fn test_deserialize_truncates_seconds() {
        let horario: HorarioPrevisto = serde_json::from_value(json!("17:45:59")).unwrap();
        assert_eq!(horario.display(), "17:45");

        let horario: HorarioPrevisto = serde_json::from_value(json!("06:05")).unwrap();
        assert_eq!(horario.wire(), "06:05:00");

        assert!(serde_json::from_value::<HorarioPrevisto>(json!("25:00:00")).is_err());
    }
}

//! Utilidades de validação
//!
//! Funções helper usadas pelos formulários e pelos modelos,
//! no mesmo formato de `ValidationError` do crate validator.

use chrono::NaiveTime;
use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    /// Horário no formato HH:mm (a hora aceita um dígito, como em 8:30)
    pub static ref HORARIO_REGEX: Regex =
        Regex::new(r"^(?:2[0-3]|[01]?[0-9]):[0-5][0-9]$").unwrap();
}

/// Validar comprimento mínimo depois de remover espaços das pontas
pub fn validate_trimmed_length(value: &str, min: usize) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len < min {
        let mut error = ValidationError::new("length");
        error.add_param("min".into(), &min);
        error.add_param("actual".into(), &len);
        return Err(error);
    }
    Ok(())
}

/// Validar e converter um horário digitado (HH:mm)
pub fn validate_time_of_day(value: &str) -> Result<NaiveTime, ValidationError> {
    let value = value.trim();
    if !HORARIO_REGEX.is_match(value) {
        let mut error = ValidationError::new("time");
        error.add_param("value".into(), &value.to_string());
        error.add_param("format".into(), &"HH:mm".to_string());
        return Err(error);
    }
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| {
        let mut error = ValidationError::new("time");
        error.add_param("value".into(), &value.to_string());
        error
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_trimmed_length() {
        assert!(validate_trimmed_length("  abc ", 3).is_ok());
        assert!(validate_trimmed_length("  ab  ", 3).is_err());
    }

    #[test]
    fn test_validate_time_of_day() {
        assert_eq!(
            validate_time_of_day("08:30").unwrap(),
            NaiveTime::from_hms_opt(8, 30, 0).unwrap()
        );
        assert_eq!(
            validate_time_of_day("8:05").unwrap(),
            NaiveTime::from_hms_opt(8, 5, 0).unwrap()
        );
        assert!(validate_time_of_day("24:00").is_err());
        assert!(validate_time_of_day("12:60").is_err());
        assert!(validate_time_of_day("12h30").is_err());
        assert!(validate_time_of_day("").is_err());
    }
}

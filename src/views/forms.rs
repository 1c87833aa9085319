//! Validação dos formulários
//!
//! Converte `ValidationErrors` do validator no mapa campo → mensagem que as
//! telas exibem embaixo de cada campo, e concentra as checagens simples
//! (descrição de ponto, de viagem, horário digitado).

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::models::auth::LoginRequest;
use crate::models::horario::{HorarioPonto, HorarioPrevisto, HorarioUpsert};
use crate::utils::validation::validate_trimmed_length;

pub const PONTO_DESCRICAO_CURTA: &str = crate::models::ponto::DESCRICAO_CURTA;
pub const VIAGEM_DESCRICAO_CURTA: &str = "A descrição da viagem deve ter pelo menos 3 caracteres.";
pub const HORARIO_INVALIDO: &str = "Insira um horário válido no formato HH:mm (ex: 08:30).";
pub const DADOS_INVALIDOS: &str = "Dados inválidos.";

pub type FieldErrors = BTreeMap<String, String>;

/// Primeira mensagem de cada campo
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, list)| {
            let message = list
                .iter()
                .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| DADOS_INVALIDOS.to_string());
            (field.to_string(), message)
        })
        .collect()
}

pub fn validate_form<T: Validate>(form: &T) -> Result<(), FieldErrors> {
    form.validate().map_err(|e| field_errors(&e))
}

pub fn check_login(request: &LoginRequest) -> Result<(), &'static str> {
    request.check_filled()
}

/// Descrição do ponto sem espaços nas pontas
pub fn check_ponto_descricao(descricao: &str) -> Result<String, &'static str> {
    validate_trimmed_length(descricao, 3)
        .map(|_| descricao.trim().to_string())
        .map_err(|_| PONTO_DESCRICAO_CURTA)
}

pub fn check_viagem_descricao(descricao: &str) -> Result<String, &'static str> {
    validate_trimmed_length(descricao, 3)
        .map(|_| descricao.trim().to_string())
        .map_err(|_| VIAGEM_DESCRICAO_CURTA)
}

pub fn parse_horario(input: &str) -> Result<HorarioPrevisto, &'static str> {
    HorarioPrevisto::parse_input(input).ok_or(HORARIO_INVALIDO)
}

/// Campos de horário por ponto da tela de edição de horários
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HorariosForm {
    inputs: HashMap<Uuid, String>,
}

impl HorariosForm {
    /// Preenche cada campo com o HH:mm já gravado
    pub fn from_horarios(horarios: &[HorarioPonto]) -> Self {
        let inputs = horarios
            .iter()
            .map(|h| (h.ponto_itinerario_id, h.horario_previsto.display()))
            .collect();
        Self { inputs }
    }

    pub fn input(&self, ponto_id: Uuid) -> &str {
        self.inputs.get(&ponto_id).map(String::as_str).unwrap_or("")
    }

    pub fn set_input(&mut self, ponto_id: Uuid, value: impl Into<String>) {
        self.inputs.insert(ponto_id, value.into());
    }

    /// Horário pronto para gravar, ou a mensagem de formato inválido
    pub fn to_upsert(&self, viagem_id: Uuid, ponto_id: Uuid) -> Result<HorarioUpsert, &'static str> {
        let horario_previsto = parse_horario(self.input(ponto_id))?;
        Ok(HorarioUpsert {
            viagem_id,
            ponto_itinerario_id: ponto_id,
            horario_previsto,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::{CompanySignUpData, PassengerSignUpData};
    use crate::models::linha::UpdateLinhaData;

    #[test]
    fn test_field_errors_for_passenger_sign_up() {
        let form = PassengerSignUpData {
            name: "Al".into(),
            email: "nao-e-email".into(),
            password: "123".into(),
        };
        let errors = validate_form(&form).unwrap_err();
        assert_eq!(errors["name"], "O nome deve ter pelo menos 3 caracteres.");
        assert_eq!(errors["email"], "Por favor, insira um e-mail válido");
        assert_eq!(errors["password"], "A senha deve ter pelo menos 8 caracteres");
    }

    #[test]
    fn test_company_form_messages() {
        let form = CompanySignUpData {
            company_name: "Timon Tur".into(),
            cnpj: "123".into(),
            admin_name: "Maria".into(),
            email: "maria@timon.com".into(),
            password: "12345678".into(),
        };
        let errors = validate_form(&form).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["cnpj"], "O CNPJ deve ter no mínimo 14 caracteres.");
    }

    #[test]
    fn test_line_form_and_descriptions() {
        let form = UpdateLinhaData {
            nome: "Centro".into(),
            numero: String::new(),
        };
        assert_eq!(validate_form(&form).unwrap_err()["numero"], "O número da linha é obrigatório.");

        assert_eq!(check_ponto_descricao("  Praça  "), Ok("Praça".to_string()));
        assert_eq!(check_ponto_descricao(" ab "), Err(PONTO_DESCRICAO_CURTA));
        assert_eq!(check_viagem_descricao("ab"), Err(VIAGEM_DESCRICAO_CURTA));
    }

    #[test]
    fn test_horarios_form() {
        let viagem_id = Uuid::new_v4();
        let ponto_id = Uuid::new_v4();
        let mut form = HorariosForm::default();
        assert_eq!(form.to_upsert(viagem_id, ponto_id), Err(HORARIO_INVALIDO));

        form.set_input(ponto_id, "24:00");
        assert_eq!(form.to_upsert(viagem_id, ponto_id), Err(HORARIO_INVALIDO));

        form.set_input(ponto_id, "7:05");
        let upsert = form.to_upsert(viagem_id, ponto_id).unwrap();
        assert_eq!(upsert.horario_previsto.wire(), "07:05:00");
    }
}

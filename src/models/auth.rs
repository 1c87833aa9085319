use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

/// Papéis do sistema (coluna `users.role`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Passageiro,
    Motorista,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Passageiro => "passageiro",
            UserRole::Motorista => "motorista",
            UserRole::Admin => "admin",
        }
    }
}

/// Perfil do usuário - tabela `users`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    pub role: UserRole,
    pub empresa_id: Option<Uuid>,
}

impl UserProfile {
    pub const TABLE: &'static str = "users";
}

/// Usuário do serviço de autenticação
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

/// Sessão autenticada
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl Session {
    /// Margem para renovar o token antes de expirar de fato
    const EXPIRY_MARGIN_SECS: i64 = 10;

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => chrono::Utc::now().timestamp() >= expires_at - Self::EXPIRY_MARGIN_SECS,
            None => false,
        }
    }

    /// Completa `expires_at` a partir de `expires_in` quando o servidor não enviar
    pub fn with_expiry_filled(mut self) -> Self {
        if self.expires_at.is_none() {
            if let Some(expires_in) = self.expires_in {
                self.expires_at = Some(chrono::Utc::now().timestamp() + expires_in);
            }
        }
        self
    }
}

/// Resultado do cadastro: a sessão só vem quando o backend confirma o e-mail automaticamente
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: Option<AuthUser>,
    pub session: Option<Session>,
}

/// Eventos de mudança de sessão
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    InitialSession(Option<Session>),
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
}

impl AuthEvent {
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthEvent::InitialSession(session) => session.as_ref(),
            AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session) => Some(session),
            AuthEvent::SignedOut => None,
        }
    }
}

/// Credenciais de login
#[derive(Debug, Clone, Default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    /// Os dois campos são obrigatórios, sem outra regra de formato
    pub fn check_filled(&self) -> Result<(), &'static str> {
        if self.email.is_empty() || self.password.is_empty() {
            return Err("Por favor, preencha todos os campos.");
        }
        Ok(())
    }
}

/// Cadastro de passageiro
#[derive(Debug, Clone, Default, Validate)]
pub struct PassengerSignUpData {
    #[validate(length(min = 3, message = "O nome deve ter pelo menos 3 caracteres."))]
    pub name: String,

    #[validate(email(message = "Por favor, insira um e-mail válido"))]
    pub email: String,

    #[validate(length(min = 8, message = "A senha deve ter pelo menos 8 caracteres"))]
    pub password: String,
}

impl PassengerSignUpData {
    /// Remove espaços das pontas dos campos de texto (a senha fica intacta)
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

/// Cadastro de empresa com o seu administrador
#[derive(Debug, Clone, Default, Validate)]
pub struct CompanySignUpData {
    #[validate(length(min = 3, message = "O nome da empresa é obrigatório."))]
    pub company_name: String,

    #[validate(length(min = 14, message = "O CNPJ deve ter no mínimo 14 caracteres."))]
    pub cnpj: String,

    #[validate(length(min = 3, message = "O seu nome é obrigatório."))]
    pub admin_name: String,

    #[validate(email(message = "E-mail inválido."))]
    pub email: String,

    #[validate(length(min = 8, message = "A senha deve ter pelo menos 8 caracteres."))]
    pub password: String,
}

impl CompanySignUpData {
    pub fn normalized(&self) -> Self {
        Self {
            company_name: self.company_name.trim().to_string(),
            cnpj: self.cnpj.trim().to_string(),
            admin_name: self.admin_name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_roundtrip_from_backend_row() {
        let row = json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "name": "Ana",
            "role": "admin",
            "empresa_id": null
        });
        let profile: UserProfile = serde_json::from_value(row).unwrap();
        assert_eq!(profile.role, UserRole::Admin);
        assert!(profile.empresa_id.is_none());
    }

    #[test]
    fn test_session_expiry() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: None,
            user_metadata: Value::Null,
        };
        let mut session = Session {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_in: Some(3600),
            expires_at: None,
            user,
        };
        assert!(!session.is_expired());
        session = session.with_expiry_filled();
        assert!(session.expires_at.is_some());
        assert!(!session.is_expired());
        session.expires_at = Some(chrono::Utc::now().timestamp() - 1);
        assert!(session.is_expired());
    }

    #[test]
    fn test_company_sign_up_trims_before_validating() {
        let data = CompanySignUpData {
            company_name: "  AB  ".into(),
            cnpj: "12345678000199".into(),
            admin_name: "Maria".into(),
            email: " maria@timon.com ".into(),
            password: "12345678".into(),
        };
        let errors = data.normalized().validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("company_name"));
        assert!(!fields.contains_key("email"));
    }

    #[test]
    fn test_login_requires_both_fields() {
        let request = LoginRequest {
            email: "a@b.com".into(),
            password: String::new(),
        };
        assert_eq!(request.check_filled(), Err("Por favor, preencha todos os campos."));
    }
}

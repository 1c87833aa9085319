//! Services module
//!
//! Lógica de negócio do cliente. Cada serviço recebe o gateway (e, quando
//! precisa, o serviço de autenticação e o notificador) pelo construtor,
//! guarda o seu estado atrás de um `RwLock` e registra o estado de cada
//! requisição no seu `RequestTracker`.

pub mod auth_service;
pub mod empresa_service;
pub mod linha_service;
pub mod notifier;
pub mod request_tracker;
pub mod saga;
pub mod viagem_service;

pub use auth_service::{AuthService, AuthSnapshot, AuthStatus};
pub use empresa_service::EmpresaService;
pub use linha_service::LinhaService;
pub use notifier::{Alert, LogNotifier, Notifier, RecordingNotifier, ALERT_TITLE};
pub use request_tracker::{RequestState, RequestTracker, OPERATION_IN_PROGRESS};
pub use saga::Saga;
pub use viagem_service::ViagemService;

//! Timon Buz - núcleo do cliente de transporte público
//!
//! Gateway para o backend hospedado, serviços de domínio (autenticação,
//! empresas, linhas, viagens) e a lógica das telas.

pub mod clients;
pub mod config;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;
pub mod views;

pub use state::AppState;
pub use utils::errors::{AppError, AppResult};

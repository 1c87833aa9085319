//! Utilidades do sistema
//!
//! Este módulo contém utilidades para tratamento de erros e validação.

pub mod errors;
pub mod validation;

pub use errors::{AppError, AppResult};

//! Configuração do projeto
//!
//! Este módulo contém a configuração do backend hospedado e do ambiente.

pub mod environment;

pub use environment::*;

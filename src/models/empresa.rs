//! Modelo de Empresa
//!
//! Empresa de ônibus (tenant dona das linhas). Mapeia a tabela `empresas`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Empresa - mapeia exatamente a tabela empresas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Empresa {
    pub id: Uuid,
    pub nome: String,
    pub cnpj: String,
}

impl Empresa {
    pub const TABLE: &'static str = "empresas";
}

/// Linha inserida no cadastro da empresa
#[derive(Debug, Clone, Serialize)]
pub struct NovaEmpresa {
    pub nome: String,
    pub cnpj: String,
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Linha salva por um passageiro - tabela `favoritos`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorito {
    pub user_id: Uuid,
    pub linha_id: Uuid,
}

impl Favorito {
    pub const TABLE: &'static str = "favoritos";
}

//! Modelos do sistema
//!
//! Este módulo contém os modelos de dados que mapeiam as tabelas
//! do backend hospedado.

pub mod auth;
pub mod empresa;
pub mod favorito;
pub mod horario;
pub mod linha;
pub mod ponto;
pub mod viagem;

pub use auth::{AuthEvent, AuthUser, CompanySignUpData, LoginRequest, PassengerSignUpData, Session, SignUpOutcome, UserProfile, UserRole};
pub use empresa::{Empresa, NovaEmpresa};
pub use favorito::Favorito;
pub use horario::{HorarioParaSalvar, HorarioPonto, HorarioPrevisto, HorarioUpsert};
pub use linha::{CreateLinhaData, Linha, UpdateLinhaData};
pub use ponto::{NovoPonto, PontoItinerario};
pub use viagem::{DiaSemana, NovaViagem, Viagem};

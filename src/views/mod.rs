//! Lógica das telas que não depende de desenho: busca, formulários,
//! editor de pontos, detalhe da viagem, navegação, menu e cores.

pub mod forms;
pub mod linha_editor;
pub mod menu;
pub mod navigation;
pub mod search;
pub mod theme;
pub mod trip_detail;

pub use forms::{field_errors, validate_form, FieldErrors, HorariosForm};
pub use linha_editor::{ensure_viagem_possivel, NovaLinhaEditor, PontoLocal};
pub use menu::{Confirmation, MenuOption};
pub use navigation::{RouteTree, Screen};
pub use search::{filter, SearchState, Searchable};
pub use trip_detail::{formatar_dias_semana, rota_completa, FormatoDias, ParadaDaRota};

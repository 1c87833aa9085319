//! Árvores de navegação
//!
//! Qual conjunto de telas está disponível depende só do estado de
//! autenticação e do papel do perfil.

use crate::models::auth::UserRole;
use crate::services::auth_service::AuthStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Loading,
    // públicas
    Login,
    SignUpChoice,
    SignUpPassenger,
    SignUpCompany,
    VerifyEmail,
    // passageiro
    Home,
    Linhas,
    Favoritos,
    Perfil,
    LinhasPorEmpresa,
    ViagensDaLinha,
    DetalheViagem,
    // empresa
    Painel,
    ManageLinha,
    LinhaDetail,
    ManageViagens,
    ManageHorarios,
    About,
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Screen::Loading => "Loading",
            Screen::Login => "Login",
            Screen::SignUpChoice => "SignUpChoice",
            Screen::SignUpPassenger => "SignUpPassenger",
            Screen::SignUpCompany => "SignUpCompany",
            Screen::VerifyEmail => "VerifyEmail",
            Screen::Home => "Home",
            Screen::Linhas => "Linhas",
            Screen::Favoritos => "Favoritos",
            Screen::Perfil => "Perfil",
            Screen::LinhasPorEmpresa => "LinhasPorEmpresa",
            Screen::ViagensDaLinha => "ViagensDaLinha",
            Screen::DetalheViagem => "DetalheViagem",
            Screen::Painel => "Painel",
            Screen::ManageLinha => "ManageLinha",
            Screen::LinhaDetail => "LinhaDetail",
            Screen::ManageViagens => "ManageViagens",
            Screen::ManageHorarios => "ManageHorarios",
            Screen::About => "About",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTree {
    Loading,
    Public,
    Passenger,
    Company,
}

impl RouteTree {
    pub fn for_status(status: AuthStatus) -> Self {
        match status {
            AuthStatus::Loading => RouteTree::Loading,
            AuthStatus::Unauthenticated => RouteTree::Public,
            AuthStatus::Authenticated(UserRole::Admin) => RouteTree::Company,
            AuthStatus::Authenticated(_) => RouteTree::Passenger,
        }
    }

    /// Abas da barra inferior
    pub fn tabs(&self) -> &'static [Screen] {
        match self {
            RouteTree::Passenger => &[Screen::Home, Screen::Linhas, Screen::Favoritos, Screen::Perfil],
            RouteTree::Company => &[Screen::Painel],
            RouteTree::Loading | RouteTree::Public => &[],
        }
    }

    /// Telas empilhadas sobre as abas (ou a pilha inteira, nas árvores sem abas)
    pub fn stack(&self) -> &'static [Screen] {
        match self {
            RouteTree::Loading => &[Screen::Loading],
            RouteTree::Public => &[
                Screen::Login,
                Screen::SignUpChoice,
                Screen::SignUpPassenger,
                Screen::SignUpCompany,
                Screen::VerifyEmail,
            ],
            RouteTree::Passenger => &[
                Screen::LinhasPorEmpresa,
                Screen::ViagensDaLinha,
                Screen::DetalheViagem,
                Screen::About,
            ],
            RouteTree::Company => &[
                Screen::ManageLinha,
                Screen::LinhaDetail,
                Screen::ManageViagens,
                Screen::ManageHorarios,
                Screen::About,
            ],
        }
    }

    pub fn initial_screen(&self) -> Screen {
        self.tabs().first().or_else(|| self.stack().first()).copied().unwrap_or(Screen::Loading)
    }

    pub fn contains(&self, screen: Screen) -> bool {
        self.tabs().contains(&screen) || self.stack().contains(&screen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_by_status() {
        assert_eq!(RouteTree::for_status(AuthStatus::Loading), RouteTree::Loading);
        assert_eq!(RouteTree::for_status(AuthStatus::Unauthenticated), RouteTree::Public);
        assert_eq!(
            RouteTree::for_status(AuthStatus::Authenticated(UserRole::Admin)),
            RouteTree::Company
        );
        assert_eq!(
            RouteTree::for_status(AuthStatus::Authenticated(UserRole::Motorista)),
            RouteTree::Passenger
        );
    }

    #[test]
    fn test_tree_screens() {
        assert_eq!(RouteTree::Public.initial_screen(), Screen::Login);
        assert_eq!(RouteTree::Passenger.initial_screen(), Screen::Home);
        assert_eq!(RouteTree::Company.initial_screen(), Screen::Painel);
        assert!(RouteTree::Company.contains(Screen::ManageHorarios));
        assert!(!RouteTree::Passenger.contains(Screen::ManageLinha));
        assert_eq!(RouteTree::Passenger.tabs().len(), 4);
    }
}

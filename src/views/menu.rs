//! Menu do usuário (tela de perfil)

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    Sobre,
    ExcluirConta,
    SairDaConta,
}

/// Pergunta feita antes de executar a opção
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub title: &'static str,
    pub message: &'static str,
    pub cancel: &'static str,
    pub confirm: &'static str,
}

impl MenuOption {
    pub const ALL: [MenuOption; 3] = [MenuOption::Sobre, MenuOption::ExcluirConta, MenuOption::SairDaConta];

    pub fn label(&self) -> &'static str {
        match self {
            MenuOption::Sobre => "Sobre",
            MenuOption::ExcluirConta => "Excluir conta",
            MenuOption::SairDaConta => "Sair da Conta",
        }
    }

    pub fn is_destructive(&self) -> bool {
        !matches!(self, MenuOption::Sobre)
    }

    pub fn confirmation(&self) -> Option<Confirmation> {
        match self {
            MenuOption::Sobre => None,
            MenuOption::ExcluirConta => Some(Confirmation {
                title: "Excluir Conta",
                message: "Esta ação é permanente. Deseja mesmo excluir sua conta?",
                cancel: "Cancelar",
                confirm: "Excluir",
            }),
            MenuOption::SairDaConta => Some(Confirmation {
                title: "Confirmar Saída",
                message: "Você tem certeza de que deseja sair?",
                cancel: "Cancelar",
                confirm: "Sair",
            }),
        }
    }
}

/// Confirmação para excluir uma viagem da linha
pub fn confirmar_exclusao_viagem(descricao: &str) -> (String, String) {
    (
        "Confirmar Exclusão".to_string(),
        format!("Tem certeza que deseja excluir a viagem \"{}\" e todos os seus horários?", descricao),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logout_requires_confirmation() {
        let confirmation = MenuOption::SairDaConta.confirmation().unwrap();
        assert_eq!(confirmation.title, "Confirmar Saída");
        assert!(MenuOption::Sobre.confirmation().is_none());
        assert!(!MenuOption::Sobre.is_destructive());
    }
}

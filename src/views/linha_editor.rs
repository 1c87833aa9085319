//! Editor de pontos da tela "nova linha"
//!
//! Os pontos ficam só no cliente até a linha ser salva; a ordem é sempre 1..N.

use crate::models::linha::CreateLinhaData;
use crate::models::ponto::PontoItinerario;

use super::forms::check_ponto_descricao;

pub const MINIMO_PONTOS: usize = 2;
pub const PONTOS_INSUFICIENTES: &str = "Uma linha deve ter pelo menos 2 pontos de parada.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PontoLocal {
    pub descricao: String,
    pub ordem: i32,
}

#[derive(Debug, Clone, Default)]
pub struct NovaLinhaEditor {
    pub nome: String,
    pub numero: String,
    pontos: Vec<PontoLocal>,
}

impl NovaLinhaEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pontos(&self) -> &[PontoLocal] {
        &self.pontos
    }

    /// Acrescenta o ponto no fim do itinerário
    pub fn add_ponto(&mut self, descricao: &str) -> Result<&PontoLocal, &'static str> {
        let descricao = check_ponto_descricao(descricao)?;
        let ordem = self.pontos.len() as i32 + 1;
        self.pontos.push(PontoLocal { descricao, ordem });
        Ok(&self.pontos[self.pontos.len() - 1])
    }

    /// Remove o ponto na posição `index` e renumera os demais
    pub fn remove_ponto(&mut self, index: usize) -> Option<PontoLocal> {
        if index >= self.pontos.len() {
            return None;
        }
        let removed = self.pontos.remove(index);
        for (i, ponto) in self.pontos.iter_mut().enumerate() {
            ponto.ordem = i as i32 + 1;
        }
        Some(removed)
    }

    pub fn has_minimo_pontos(&self) -> bool {
        self.pontos.len() >= MINIMO_PONTOS
    }

    /// Dados prontos para `LinhaService::add_linha`
    pub fn into_create_data(self) -> Result<CreateLinhaData, &'static str> {
        if !self.has_minimo_pontos() {
            return Err(PONTOS_INSUFICIENTES);
        }
        Ok(CreateLinhaData {
            nome: self.nome,
            numero: self.numero,
            pontos: self.pontos.into_iter().map(|p| p.descricao).collect(),
        })
    }
}

/// Viagens só podem ser criadas para linhas com pelo menos dois pontos
pub fn ensure_viagem_possivel(pontos: &[PontoItinerario]) -> Result<(), &'static str> {
    if pontos.len() < MINIMO_PONTOS {
        return Err(PONTOS_INSUFICIENTES);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_remove_renumbers() {
        let mut editor = NovaLinhaEditor::new();
        editor.add_ponto("Terminal").unwrap();
        editor.add_ponto("Praça").unwrap();
        editor.add_ponto("Hospital").unwrap();
        assert_eq!(editor.add_ponto("ab"), Err(super::super::forms::PONTO_DESCRICAO_CURTA));

        let removed = editor.remove_ponto(0).unwrap();
        assert_eq!(removed.descricao, "Terminal");
        let ordens: Vec<i32> = editor.pontos().iter().map(|p| p.ordem).collect();
        assert_eq!(ordens, vec![1, 2]);
        assert!(editor.remove_ponto(5).is_none());
    }

    #[test]
    fn test_two_stop_gate() {
        let mut editor = NovaLinhaEditor::new();
        editor.nome = "Centro".into();
        editor.numero = "10".into();
        editor.add_ponto("Terminal").unwrap();
        assert_eq!(editor.clone().into_create_data().unwrap_err(), PONTOS_INSUFICIENTES);

        editor.add_ponto("Praça").unwrap();
        let data = editor.into_create_data().unwrap();
        assert_eq!(data.pontos, vec!["Terminal".to_string(), "Praça".to_string()]);
        assert_eq!(ensure_viagem_possivel(&[]), Err(PONTOS_INSUFICIENTES));
    }
}

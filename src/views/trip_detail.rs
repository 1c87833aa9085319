//! Detalhe da viagem
//!
//! Junta os pontos da linha com os horários da viagem e resume os dias
//! de funcionamento.

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::horario::{HorarioPonto, HORARIO_VAZIO};
use crate::models::ponto::PontoItinerario;
use crate::models::viagem::DiaSemana;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParadaDaRota {
    pub ponto_id: Uuid,
    pub ordem: i32,
    pub descricao: String,
    /// HH:mm ou `--:--`
    pub horario: String,
}

/// Pontos em ordem com o horário da viagem em cada um
pub fn rota_completa(pontos: &[PontoItinerario], horarios: &[HorarioPonto]) -> Vec<ParadaDaRota> {
    let por_ponto: HashMap<Uuid, &HorarioPonto> = horarios.iter().map(|h| (h.ponto_itinerario_id, h)).collect();

    let mut pontos: Vec<&PontoItinerario> = pontos.iter().collect();
    pontos.sort_by_key(|p| p.ordem);
    pontos
        .into_iter()
        .map(|ponto| ParadaDaRota {
            ponto_id: ponto.id,
            ordem: ponto.ordem,
            descricao: ponto.descricao.clone(),
            horario: por_ponto
                .get(&ponto.id)
                .map(|h| h.horario_previsto.display())
                .unwrap_or_else(|| HORARIO_VAZIO.to_string()),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatoDias {
    Longo,
    Curto,
}

/// Resumo dos dias de funcionamento
pub fn formatar_dias_semana(dias: Option<&[DiaSemana]>, formato: FormatoDias) -> String {
    let dias = match dias {
        Some(dias) if !dias.is_empty() => dias,
        _ => return "Dias não informados".to_string(),
    };

    if dias.len() == DiaSemana::TODOS.len() {
        return "Todos os dias".to_string();
    }
    if dias.len() == DiaSemana::UTEIS.len() && DiaSemana::UTEIS.iter().all(|d| dias.contains(d)) {
        return "Segunda a Sexta".to_string();
    }
    if dias.len() == 2 && dias.contains(&DiaSemana::Sab) && dias.contains(&DiaSemana::Dom) {
        return "Fim de Semana".to_string();
    }

    dias.iter()
        .map(|d| match formato {
            FormatoDias::Longo => d.nome_longo(),
            FormatoDias::Curto => d.nome_curto(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::horario::HorarioPrevisto;
    use chrono::Utc;

    fn ponto(linha_id: Uuid, descricao: &str, ordem: i32) -> PontoItinerario {
        PontoItinerario {
            id: Uuid::new_v4(),
            descricao: descricao.to_string(),
            ordem,
            linha_id,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_rota_completa_fills_missing_times() {
        let linha_id = Uuid::new_v4();
        let pontos = vec![ponto(linha_id, "Praça", 2), ponto(linha_id, "Terminal", 1)];
        let horarios = vec![HorarioPonto {
            id: Uuid::new_v4(),
            viagem_id: Uuid::new_v4(),
            ponto_itinerario_id: pontos[1].id,
            horario_previsto: HorarioPrevisto::new(6, 30).unwrap(),
        }];

        let rota = rota_completa(&pontos, &horarios);
        assert_eq!(rota[0].descricao, "Terminal");
        assert_eq!(rota[0].horario, "06:30");
        assert_eq!(rota[1].horario, "--:--");
    }

    #[test]
    fn test_formatar_dias() {
        use DiaSemana::*;
        assert_eq!(formatar_dias_semana(None, FormatoDias::Longo), "Dias não informados");
        assert_eq!(formatar_dias_semana(Some(&[]), FormatoDias::Longo), "Dias não informados");
        assert_eq!(formatar_dias_semana(Some(&DiaSemana::TODOS), FormatoDias::Curto), "Todos os dias");
        assert_eq!(formatar_dias_semana(Some(&[Sex, Seg, Ter, Qua, Qui]), FormatoDias::Longo), "Segunda a Sexta");
        assert_eq!(formatar_dias_semana(Some(&[Dom, Sab]), FormatoDias::Longo), "Fim de Semana");
        assert_eq!(formatar_dias_semana(Some(&[Seg, Sab]), FormatoDias::Longo), "Segunda, Sábado");
        assert_eq!(formatar_dias_semana(Some(&[Ter, Sab]), FormatoDias::Curto), "Ter, Sáb");
    }
}

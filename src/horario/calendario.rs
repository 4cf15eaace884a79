//! Merge of the organization calendar with an employee's own days, and the
//! per-day classification calendar screens render.
use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};

use super::balance::minutos_entre;
use crate::fecha::{parse_hora, Mes};
use crate::model::{DiaCalendario, DiaGeneral, EstadoDia, Fichaje, TipoFichaje};

/// Build the effective calendar from scratch.
///
/// Organization days seed the map with their status only. Employee days then
/// replace every field, except that a missing employee status keeps the
/// organization one. Any day left with a status has its shift cleared.
pub fn reconciliar(
    general: &[DiaGeneral],
    empleado: &[DiaCalendario],
) -> BTreeMap<NaiveDate, DiaCalendario> {
    let mut mapa: BTreeMap<NaiveDate, DiaCalendario> = general
        .iter()
        .map(|g| {
            let mut dia = DiaCalendario::vacio(g.fecha);
            dia.estado = g.estado_efectivo();
            (g.fecha, dia)
        })
        .collect();

    for propio in empleado {
        let estado_org = mapa.get(&propio.fecha).and_then(|d| d.estado);
        let mut dia = propio.clone();
        dia.estado = propio.estado.or(estado_org);
        mapa.insert(propio.fecha, dia);
    }

    for dia in mapa.values_mut() {
        if dia.estado.is_some() {
            limpiar_turno(dia);
        }
    }

    mapa
}

fn limpiar_turno(dia: &mut DiaCalendario) {
    dia.turno = None;
    dia.hora_entrada_manana = None;
    dia.hora_salida_manana = None;
    dia.hora_entrada_tarde = None;
    dia.hora_salida_tarde = None;
}

pub fn es_fin_de_semana(fecha: NaiveDate) -> bool {
    matches!(fecha.weekday(), Weekday::Sat | Weekday::Sun)
}

/// How a calendar cell is shown. Status wins over everything else, but a
/// day off that falls on a weekend is just a weekend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaseDia {
    Vacaciones,
    Baja,
    Festivo,
    DiaLibre,
    FinDeSemana,
    Trabajado,
    Normal,
}

pub fn clasificar_dia(fecha: NaiveDate, dia: Option<&DiaCalendario>) -> ClaseDia {
    match dia.and_then(|d| d.estado) {
        Some(EstadoDia::Vacaciones) => return ClaseDia::Vacaciones,
        Some(EstadoDia::Baja) => return ClaseDia::Baja,
        Some(EstadoDia::Festivo) => return ClaseDia::Festivo,
        Some(EstadoDia::DiaLibre) if !es_fin_de_semana(fecha) => return ClaseDia::DiaLibre,
        _ => {}
    }
    if es_fin_de_semana(fecha) {
        return ClaseDia::FinDeSemana;
    }
    if dia.is_some_and(|d| d.minutos_trabajados > 0) {
        return ClaseDia::Trabajado;
    }
    ClaseDia::Normal
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TotalesMes {
    pub dias_trabajados: u32,
    pub minutos: i64,
}

pub fn totales_mes(mes: Mes, calendario: &BTreeMap<NaiveDate, DiaCalendario>) -> TotalesMes {
    calendario
        .values()
        .filter(|d| mes.contiene(d.fecha) && d.minutos_trabajados > 0)
        .fold(TotalesMes::default(), |acc, d| TotalesMes {
            dias_trabajados: acc.dias_trabajados + 1,
            minutos: acc.minutos + d.minutos_trabajados,
        })
}

/// An entry with the exit that immediately follows it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bloque {
    pub entrada: String,
    pub salida: Option<String>,
}

pub fn agrupar_fichajes(fichajes: &[Fichaje]) -> Vec<Bloque> {
    fichajes
        .iter()
        .enumerate()
        .filter(|(_, f)| f.tipo == TipoFichaje::Entrada)
        .map(|(i, f)| Bloque {
            entrada: f.hora.clone(),
            salida: fichajes
                .get(i + 1)
                .filter(|s| s.tipo == TipoFichaje::Salida)
                .map(|s| s.hora.clone()),
        })
        .collect()
}

/// Worked minutes from closed blocks. Open blocks and unparsable times
/// contribute nothing.
pub fn minutos_de_fichajes(fichajes: &[Fichaje]) -> i64 {
    agrupar_fichajes(fichajes)
        .iter()
        .filter_map(|b| {
            let entrada = parse_hora(&b.entrada)?;
            let salida = parse_hora(b.salida.as_deref()?)?;
            Some(minutos_entre(entrada, salida))
        })
        .sum()
}

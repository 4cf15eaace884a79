//! Daily work targets and signed balances, all in whole minutes.
use chrono::NaiveTime;

use crate::model::{ConfigEmpleado, DiaCalendario, Turno};

pub const MINUTOS_TURNO_MANANA: i64 = 240;
pub const MINUTOS_TURNO_TARDE: i64 = 240;
pub const MINUTOS_TURNO_PARTIDO: i64 = 480;
pub const DIAS_LABORABLES_SEMANA: f64 = 5.0;

/// Minutes between two wall-clock times. Negative spans count as zero.
pub fn minutos_entre(desde: NaiveTime, hasta: NaiveTime) -> i64 {
    (hasta - desde).num_minutes().max(0)
}

/// Expected minutes of work for `dia`.
///
/// Explicit shift times take precedence over the shift label, and the label
/// over the even split of the contracted week.
pub fn objetivo_dia(dia: &DiaCalendario, contrato: &ConfigEmpleado) -> i64 {
    let manana = dia.horario_manana().map(|(e, s)| minutos_entre(e, s));
    let tarde = dia.horario_tarde().map(|(e, s)| minutos_entre(e, s));

    match (manana, tarde) {
        (Some(m), Some(t)) => return m + t,
        (Some(m), None) => return m,
        (None, Some(t)) => return t,
        (None, None) => {}
    }

    match dia.turno {
        Some(Turno::Manana) => MINUTOS_TURNO_MANANA,
        Some(Turno::Tarde) => MINUTOS_TURNO_TARDE,
        Some(Turno::MananaTarde) => MINUTOS_TURNO_PARTIDO,
        None => objetivo_semanal_repartido(contrato),
    }
}

fn objetivo_semanal_repartido(contrato: &ConfigEmpleado) -> i64 {
    (contrato.horas_contratadas_semana * 60.0 / DIAS_LABORABLES_SEMANA).floor() as i64
}

/// Worked minus expected minutes, or `None` when the day has no shift or
/// nothing was worked.
pub fn balance_dia(dia: &DiaCalendario, contrato: &ConfigEmpleado) -> Option<i64> {
    if dia.turno.is_none() || dia.minutos_trabajados == 0 {
        return None;
    }
    Some(dia.minutos_trabajados - objetivo_dia(dia, contrato))
}

/// `OK` at zero, otherwise `+1h 30m` / `-0h 45m`.
pub fn formatear_balance(minutos: i64) -> String {
    if minutos == 0 {
        return "OK".to_string();
    }
    let signo = if minutos > 0 { '+' } else { '-' };
    let abs = minutos.unsigned_abs();
    format!("{signo}{}h {}m", abs / 60, abs % 60)
}

pub fn formatear_minutos(minutos: i64) -> String {
    let signo = if minutos < 0 { "-" } else { "" };
    let abs = minutos.unsigned_abs();
    format!("{signo}{} h {} min", abs / 60, abs % 60)
}

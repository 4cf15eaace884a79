//! Month history grouped by ISO week.
use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::fecha::formatear_fecha_es;
use crate::model::DiaCalendario;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumenSemana {
    pub lunes: NaiveDate,
    pub dias: Vec<DiaCalendario>,
    pub minutos: i64,
    /// Worked minus contracted minutes for the week.
    pub diferencia: i64,
}

impl ResumenSemana {
    pub fn etiqueta(&self) -> String {
        format!("Semana del {}", formatear_fecha_es(self.lunes))
    }
}

pub fn lunes_de(fecha: NaiveDate) -> NaiveDate {
    fecha - Duration::days(fecha.weekday().num_days_from_monday() as i64)
}

/// Weeks with any worked time, oldest first. Days keep their input order.
pub fn resumen_semanal(dias: &[DiaCalendario], horas_contratadas_semana: f64) -> Vec<ResumenSemana> {
    let contrato = (horas_contratadas_semana * 60.0).floor() as i64;
    let mut semanas: BTreeMap<NaiveDate, Vec<DiaCalendario>> = BTreeMap::new();
    for dia in dias {
        semanas.entry(lunes_de(dia.fecha)).or_default().push(dia.clone());
    }

    semanas
        .into_iter()
        .filter_map(|(lunes, dias)| {
            let minutos: i64 = dias.iter().map(|d| d.minutos_trabajados).sum();
            (minutos > 0).then(|| ResumenSemana {
                lunes,
                dias,
                minutos,
                diferencia: minutos - contrato,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dia(d: u32, minutos: i64) -> DiaCalendario {
        let mut dia = DiaCalendario::vacio(NaiveDate::from_ymd_opt(2025, 3, d).unwrap());
        dia.minutos_trabajados = minutos;
        dia
    }

    #[test]
    fn groups_by_monday_and_drops_idle_weeks() {
        // 2025-03-02 is a Sunday, 03-03 a Monday
        let dias = vec![dia(2, 0), dia(3, 480), dia(4, 500), dia(10, 0)];
        let semanas = resumen_semanal(&dias, 40.0);
        assert_eq!(semanas.len(), 1);
        let s = &semanas[0];
        assert_eq!(s.lunes, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        assert_eq!(s.minutos, 980);
        assert_eq!(s.diferencia, 980 - 2400);
        assert_eq!(s.etiqueta(), "Semana del 03/03/2025");
    }

    #[test]
    fn sunday_belongs_to_previous_monday() {
        let domingo = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(lunes_de(domingo), NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
    }
}

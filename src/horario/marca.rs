//! Admin schedule marks for `POST /crm/horario/dia` and manual clock
//! events for `POST /crm/fichajes`.
use chrono::NaiveDate;
use serde::Serialize;

use crate::fecha::serde_fecha;
use crate::model::{EstadoDia, Fichaje, TipoFichaje, Turno};

/// Entry and exit of one half of a shift, `HH:MM`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Tramo {
    pub entrada: String,
    pub salida: String,
}

impl Tramo {
    pub fn new(entrada: impl Into<String>, salida: impl Into<String>) -> Self {
        Self {
            entrada: entrada.into(),
            salida: salida.into(),
        }
    }
}

/// One day mark. Exactly one of `estado` and `turno` is set; hours only
/// accompany the halves the shift covers. A `None` employee targets the
/// organization calendar.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MarcaDia {
    #[serde(with = "serde_fecha")]
    pub fecha: NaiveDate,
    pub empleado_id: Option<String>,
    pub estado: Option<EstadoDia>,
    pub turno: Option<Turno>,
    pub horas_manana: Option<Tramo>,
    pub horas_tarde: Option<Tramo>,
}

impl MarcaDia {
    pub fn estado(fecha: NaiveDate, empleado_id: Option<String>, estado: EstadoDia) -> Self {
        Self {
            fecha,
            empleado_id,
            estado: Some(estado),
            turno: None,
            horas_manana: None,
            horas_tarde: None,
        }
    }

    pub fn turno(
        fecha: NaiveDate,
        empleado_id: Option<String>,
        turno: Turno,
        manana: Tramo,
        tarde: Tramo,
    ) -> Self {
        Self {
            fecha,
            empleado_id,
            estado: None,
            turno: Some(turno),
            horas_manana: turno.incluye_manana().then_some(manana),
            horas_tarde: turno.incluye_tarde().then_some(tarde),
        }
    }
}

/// Body of `DELETE /crm/horario/dia`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BorrarMarca {
    #[serde(with = "serde_fecha")]
    pub fecha: NaiveDate,
    pub empleado_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FichajesManuales {
    pub empleado_id: String,
    #[serde(with = "serde_fecha")]
    pub fecha: NaiveDate,
    pub fichajes: Vec<Fichaje>,
}

impl FichajesManuales {
    /// Blank times are skipped; the rest become ENTRADA/SALIDA in order.
    pub fn new(empleado_id: String, fecha: NaiveDate, manana: &Tramo, tarde: &Tramo) -> Self {
        let fichajes = [manana, tarde]
            .into_iter()
            .flat_map(|t| {
                [
                    (TipoFichaje::Entrada, t.entrada.trim()),
                    (TipoFichaje::Salida, t.salida.trim()),
                ]
            })
            .filter(|(_, hora)| !hora.is_empty())
            .map(|(tipo, hora)| Fichaje {
                id: None,
                tipo,
                hora: hora.to_string(),
            })
            .collect();
        Self {
            empleado_id,
            fecha,
            fichajes,
        }
    }
}

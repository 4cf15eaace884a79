//! Checks that block a submission before it reaches the backend.
use chrono::NaiveDate;
use thiserror::Error;

use crate::fecha::normalize_date;
use crate::model::{FechaAnulacion, SolicitudAnulacion, Venta};

pub const LONGITUD_MINIMA_DOCUMENTO: usize = 9;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("El NIF / NIE / CIF no es válido")]
    DocumentoFiscal,
    #[error("Fecha de efecto no válida: {0}")]
    FechaEfecto(String),
    #[error("El motivo es obligatorio.")]
    MotivoObligatorio,
    #[error("Debes seleccionar la fecha.")]
    FechaObligatoria,
    #[error("La venta no está anulada")]
    NoAnulada,
}

/// A fiscal id is optional, but a non-blank one needs at least nine
/// characters.
pub fn validar_documento_fiscal(documento: Option<&str>) -> Result<(), ValidationError> {
    match documento.map(str::trim) {
        Some(doc) if !doc.is_empty() && doc.chars().count() < LONGITUD_MINIMA_DOCUMENTO => {
            Err(ValidationError::DocumentoFiscal)
        }
        _ => Ok(()),
    }
}

pub fn validar_venta(venta: &Venta) -> Result<(), ValidationError> {
    validar_documento_fiscal(venta.documento_fiscal.as_deref())?;
    let fecha = venta.fecha_efecto.trim();
    if !fecha.is_empty() && normalize_date(fecha).is_none() {
        return Err(ValidationError::FechaEfecto(fecha.to_string()));
    }
    Ok(())
}

/// Build the annulment request body. The date is only sent (and required)
/// for an explicit-date annulment.
pub fn preparar_anulacion(
    fecha_tipo: FechaAnulacion,
    fecha: Option<NaiveDate>,
    motivo: &str,
    derivado_verti: bool,
) -> Result<SolicitudAnulacion, ValidationError> {
    let motivo = motivo.trim();
    if motivo.is_empty() {
        return Err(ValidationError::MotivoObligatorio);
    }
    let fecha_anulacion = match fecha_tipo {
        FechaAnulacion::Fecha => Some(fecha.ok_or(ValidationError::FechaObligatoria)?),
        FechaAnulacion::Vencimiento => None,
    };
    Ok(SolicitudAnulacion {
        fecha_tipo,
        fecha_anulacion,
        motivo: motivo.to_string(),
        derivado_verti,
    })
}

pub fn validar_rehabilitacion(venta: &Venta) -> Result<(), ValidationError> {
    if venta.esta_anulada() {
        Ok(())
    } else {
        Err(ValidationError::NoAnulada)
    }
}

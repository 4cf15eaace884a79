//! Field diff shown to an admin reviewing a request.
use serde_json::{Map, Value};

use crate::fecha::normalize_date;
use crate::model::{Solicitud, TipoSolicitud, Venta};

/// Fields an edit request may touch, in display order.
pub const CAMPOS_REVISION: [&str; 10] = [
    "fechaEfecto",
    "aseguradora",
    "ramo",
    "numeroPoliza",
    "tomador",
    "documentoFiscal",
    "primaNeta",
    "formaPago",
    "actividad",
    "observaciones",
];

/// Comparable form of a field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalizado {
    Texto(String),
    Numero(f64),
}

/// Dates compare by day, the premium numerically, everything else as
/// trimmed lower-case text. Missing and null read as empty text.
pub fn normalizar_valor(campo: &str, valor: Option<&Value>) -> Normalizado {
    let texto = match valor {
        None | Some(Value::Null) => return Normalizado::Texto(String::new()),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(otro) => otro.to_string(),
    };

    match campo {
        "fechaEfecto" => Normalizado::Texto(normalize_date(&texto).unwrap_or(texto)),
        "primaNeta" => match valor.and_then(Value::as_f64) {
            Some(n) => Normalizado::Numero(n),
            None => texto
                .replace(',', ".")
                .parse()
                .map(Normalizado::Numero)
                .unwrap_or(Normalizado::Texto(texto)),
        },
        _ => Normalizado::Texto(texto.to_lowercase()),
    }
}

fn texto_visible(valor: Option<&Value>) -> String {
    match valor {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(otro) => otro.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CambioCampo {
    pub campo: &'static str,
    pub antes: String,
    pub despues: String,
}

/// What a request would do to a sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revision {
    Cambios(Vec<CambioCampo>),
    Eliminacion,
    Anulacion { motivo: Option<String> },
    Rehabilitacion,
}

/// Changed fields between `original` and `original` overlaid with `payload`.
pub fn diff_venta(original: &Venta, payload: &Map<String, Value>) -> Vec<CambioCampo> {
    let actual = match serde_json::to_value(original) {
        Ok(Value::Object(campos)) => campos,
        _ => Map::new(),
    };

    CAMPOS_REVISION
        .iter()
        .filter_map(|&campo| {
            let antes = actual.get(campo);
            let despues = payload.get(campo).or(antes);
            (normalizar_valor(campo, antes) != normalizar_valor(campo, despues)).then(|| {
                CambioCampo {
                    campo,
                    antes: texto_visible(antes),
                    despues: texto_visible(despues),
                }
            })
        })
        .collect()
}

pub fn revision_de(solicitud: &Solicitud, original: &Venta) -> Revision {
    match solicitud.tipo {
        TipoSolicitud::EditarVenta => {
            let vacio = Map::new();
            Revision::Cambios(diff_venta(original, solicitud.payload.as_ref().unwrap_or(&vacio)))
        }
        TipoSolicitud::EliminarVenta => Revision::Eliminacion,
        TipoSolicitud::AnularVenta => Revision::Anulacion {
            motivo: solicitud
                .payload
                .as_ref()
                .and_then(|p| p.get("motivo"))
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        TipoSolicitud::RehabilitarVenta => Revision::Rehabilitacion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn venta() -> Venta {
        serde_json::from_value(json!({
            "_id": "v1",
            "numeroPoliza": "P-1",
            "tomador": "Juan Pérez",
            "primaNeta": 500,
            "fechaEfecto": "2025-03-15T00:00:00.000Z",
            "formaPago": "Anual"
        }))
        .unwrap()
    }

    #[test]
    fn only_real_changes_are_reported() {
        let payload = json!({
            "fechaEfecto": "15/03/2025",
            "tomador": "  juan pérez ",
            "primaNeta": "500.00",
            "formaPago": "Mensual"
        });
        let cambios = diff_venta(&venta(), payload.as_object().unwrap());
        assert_eq!(
            cambios,
            vec![CambioCampo {
                campo: "formaPago",
                antes: "Anual".into(),
                despues: "Mensual".into(),
            }]
        );
    }

    #[test]
    fn premium_change_is_numeric() {
        let payload = json!({ "primaNeta": 600 });
        let cambios = diff_venta(&venta(), payload.as_object().unwrap());
        assert_eq!(cambios.len(), 1);
        assert_eq!(cambios[0].campo, "primaNeta");
        assert_eq!(cambios[0].despues, "600");
    }

    #[test]
    fn cleared_optional_field_is_a_change() {
        let payload = json!({ "formaPago": null });
        let cambios = diff_venta(&venta(), payload.as_object().unwrap());
        assert_eq!(cambios[0].antes, "Anual");
        assert_eq!(cambios[0].despues, "");
    }

    #[test]
    fn missing_and_null_are_equal() {
        assert_eq!(
            normalizar_valor("observaciones", None),
            normalizar_valor("observaciones", Some(&Value::Null))
        );
    }
}

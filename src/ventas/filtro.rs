//! Ledger filters and the month production figures shown above the table.
use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Autor, Venta};

use super::LibroVentas;

/// `None` on a field means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FiltroLibro {
    pub aseguradora: Option<String>,
    pub ramo: Option<String>,
    /// Creator name, as populated on the record.
    pub usuario: Option<String>,
}

impl FiltroLibro {
    pub fn admite(&self, venta: &Venta) -> bool {
        let coincide = |filtro: &Option<String>, valor: Option<&str>| match filtro {
            Some(f) => valor == Some(f.as_str()),
            None => true,
        };
        coincide(&self.aseguradora, Some(&venta.aseguradora))
            && coincide(&self.ramo, Some(&venta.ramo))
            && coincide(&self.usuario, venta.created_by.as_ref().and_then(Autor::nombre))
    }
}

/// Sum of net premiums, overall and per line of business.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Produccion {
    pub total: f64,
    pub por_ramo: BTreeMap<String, f64>,
}

impl Produccion {
    pub fn de<'a>(ventas: impl IntoIterator<Item = &'a Venta>) -> Self {
        ventas.into_iter().fold(Self::default(), |mut acc, v| {
            acc.total += v.prima_neta;
            *acc.por_ramo.entry(v.ramo.clone()).or_default() += v.prima_neta;
            acc
        })
    }
}

/// Distinct values the filters can take for the loaded ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpcionesFiltro {
    pub aseguradoras: BTreeSet<String>,
    pub ramos: BTreeSet<String>,
    pub usuarios: BTreeSet<String>,
}

impl LibroVentas {
    pub fn filtrar(&self, filtro: &FiltroLibro) -> Vec<&Venta> {
        self.ventas().iter().filter(|v| filtro.admite(v)).collect()
    }

    /// Production over the sales `filtro` lets through.
    pub fn produccion(&self, filtro: &FiltroLibro) -> Produccion {
        Produccion::de(self.filtrar(filtro))
    }

    pub fn opciones_filtro(&self) -> OpcionesFiltro {
        let mut opciones = OpcionesFiltro::default();
        for v in self.ventas() {
            opciones.aseguradoras.insert(v.aseguradora.clone());
            opciones.ramos.insert(v.ramo.clone());
            if let Some(nombre) = v.created_by.as_ref().and_then(Autor::nombre) {
                opciones.usuarios.insert(nombre.to_string());
            }
        }
        opciones
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn libro() -> LibroVentas {
        let ventas: Vec<Venta> = [
            json!({ "_id": "v1", "aseguradora": "Mapfre", "ramo": "Auto", "primaNeta": 300.0, "createdBy": { "nombre": "Ana" } }),
            json!({ "_id": "v2", "aseguradora": "Allianz", "ramo": "Hogar", "primaNeta": 150.5, "createdBy": { "nombre": "Luis" } }),
            json!({ "_id": "v3", "aseguradora": "Mapfre", "ramo": "Hogar", "primaNeta": 49.5, "createdBy": "u9" }),
        ]
        .into_iter()
        .map(|v: Value| serde_json::from_value(v).unwrap())
        .collect();
        let mut libro = LibroVentas::new(true);
        libro.reemplazar(ventas);
        libro
    }

    #[test]
    fn no_filter_totals_everything_by_line() {
        let p = libro().produccion(&FiltroLibro::default());
        assert_eq!(p.total, 500.0);
        assert_eq!(p.por_ramo["Auto"], 300.0);
        assert_eq!(p.por_ramo["Hogar"], 200.0);
    }

    #[test]
    fn filters_combine() {
        let libro = libro();
        let filtro = FiltroLibro {
            aseguradora: Some("Mapfre".into()),
            ramo: Some("Hogar".into()),
            usuario: None,
        };
        let ids: Vec<_> = libro.filtrar(&filtro).iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["v3"]);
        assert_eq!(libro.produccion(&filtro).total, 49.5);
    }

    #[test]
    fn user_filter_skips_unpopulated_creators() {
        let libro = libro();
        let filtro = FiltroLibro {
            usuario: Some("Ana".into()),
            ..FiltroLibro::default()
        };
        assert_eq!(libro.filtrar(&filtro).len(), 1);
        let opciones = libro.opciones_filtro();
        assert_eq!(opciones.usuarios.len(), 2);
        assert_eq!(opciones.aseguradoras.len(), 2);
    }
}

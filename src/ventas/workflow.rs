//! Local sales ledger and the pending-approval state each sale moves through.
//!
//! An employee's write either applies straight away or turns into a request
//! that an admin resolves later. Every transition here is keyed by sale id;
//! an id that is not in the ledger is a no-op.
use serde_json::{Map, Value};
use tracing::warn;

use crate::model::{EstadoRevision, EstadoVenta, Solicitud, TipoSolicitud, Venta};

/// Result of a sale mutation once the HTTP layer has classified it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    PendingApproval,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibroVentas {
    ventas: Vec<Venta>,
    revision_count: u32,
    es_admin: bool,
}

impl LibroVentas {
    pub fn new(es_admin: bool) -> Self {
        Self {
            ventas: Vec::new(),
            revision_count: 0,
            es_admin,
        }
    }

    pub fn es_admin(&self) -> bool {
        self.es_admin
    }

    pub fn ventas(&self) -> &[Venta] {
        &self.ventas
    }

    pub fn venta(&self, id: &str) -> Option<&Venta> {
        self.ventas.iter().find(|v| v.id == id)
    }

    /// Resolved reviews the employee has not acknowledged yet.
    pub fn revision_count(&self) -> u32 {
        self.revision_count
    }

    /// Replace the whole ledger after a fetch. The unread count only moves
    /// with live resolutions and acknowledgements, never on reload.
    pub fn reemplazar(&mut self, ventas: Vec<Venta>) {
        self.ventas = ventas;
    }

    fn con_venta(&mut self, id: &str, f: impl FnOnce(&mut Venta)) -> bool {
        match self.ventas.iter_mut().find(|v| v.id == id) {
            Some(v) => {
                f(v);
                true
            }
            None => false,
        }
    }

    pub fn insertar(&mut self, venta: Venta) -> bool {
        if self.venta(&venta.id).is_some() {
            return false;
        }
        self.ventas.insert(0, venta);
        true
    }

    pub fn fusionar(&mut self, id: &str, patch: &Map<String, Value>) -> bool {
        self.con_venta(id, |v| {
            if let Err(e) = v.fusionar(patch) {
                warn!(venta_id = %v.id, error = %e, "ignoring malformed sale patch");
            }
        })
    }

    pub fn eliminar(&mut self, id: &str) -> bool {
        let antes = self.ventas.len();
        self.ventas.retain(|v| v.id != id);
        self.ventas.len() != antes
    }

    pub fn marcar_anulada(&mut self, id: &str) -> bool {
        self.con_venta(id, |v| {
            v.estado = Some(EstadoVenta::Anulada);
            v.estado_revision = None;
        })
    }

    pub fn marcar_rehabilitada(&mut self, id: &str) -> bool {
        self.con_venta(id, |v| {
            v.estado = None;
            v.estado_revision = None;
        })
    }

    /// A write came back as `PendingApproval`.
    pub fn marcar_pendiente(&mut self, id: &str) -> bool {
        self.con_venta(id, |v| v.estado_revision = Some(EstadoRevision::Pendiente))
    }

    /// Set the outcome of a review. Employees count resolved outcomes as
    /// unread.
    pub fn resolver_revision(&mut self, id: &str, estado: EstadoRevision) -> bool {
        let encontrada = self.con_venta(id, |v| v.estado_revision = Some(estado));
        if !self.es_admin && estado.es_resuelta() {
            self.revision_count += 1;
        }
        encontrada
    }

    /// The employee acknowledged a resolved review.
    pub fn limpiar_revision(&mut self, id: &str) -> bool {
        let encontrada = self.con_venta(id, |v| v.estado_revision = None);
        if encontrada {
            self.revision_count = self.revision_count.saturating_sub(1);
        }
        encontrada
    }

    /// Patch the ledger after an admin approved `solicitud`.
    pub fn aplicar_aprobacion(&mut self, solicitud: &Solicitud) -> bool {
        let id = solicitud.venta.id.as_str();
        match solicitud.tipo {
            TipoSolicitud::EditarVenta => {
                let patch = solicitud.payload.clone().unwrap_or_default();
                self.con_venta(id, |v| {
                    if let Err(e) = v.fusionar(&patch) {
                        warn!(
                            venta_id = %v.id,
                            error = %e,
                            payload = %serde_json::Value::Object(patch.clone()),
                            "approved edit does not fit the sale"
                        );
                    }
                    v.estado_revision = None;
                })
            }
            TipoSolicitud::EliminarVenta => self.eliminar(id),
            TipoSolicitud::AnularVenta => self.marcar_anulada(id),
            TipoSolicitud::RehabilitarVenta => self.marcar_rehabilitada(id),
        }
    }

    pub fn aplicar_rechazo(&mut self, solicitud: &Solicitud) -> bool {
        self.con_venta(&solicitud.venta.id, |v| v.estado_revision = None)
    }
}

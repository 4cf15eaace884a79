//! Typed socket events and the reducer that folds them into the local
//! ledger without re-fetching.
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::model::{EstadoRevision, Venta};
use crate::ventas::LibroVentas;

#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Conectado,
    ErrorConexion(String),
    Desconectado(String),
    VentaCreada(Venta),
    /// Partial record; always carries `_id`.
    VentaActualizada(Map<String, Value>),
    VentaEliminada { venta_id: String },
    VentaAnulada { venta_id: String },
    VentaRehabilitada { venta_id: String },
    SolicitudCreada { venta_id: String },
    SolicitudResuelta {
        venta_id: Option<String>,
        estado: Option<EstadoRevision>,
    },
    ForceLogout,
    Prueba(Value),
    Desconocido { nombre: String, payload: Value },
}

fn campo_str(payload: &Value, campo: &str) -> Option<String> {
    payload
        .get(campo)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn con_venta_id(nombre: &str, payload: Value, f: fn(String) -> SocketEvent) -> SocketEvent {
    match campo_str(&payload, "ventaId") {
        Some(id) => f(id),
        None => SocketEvent::Desconocido {
            nombre: nombre.to_string(),
            payload,
        },
    }
}

impl SocketEvent {
    /// Decode an event frame. Payloads missing their key fields decode as
    /// `Desconocido` so the reducer never sees a half-formed event.
    pub fn from_frame(nombre: &str, payload: Value) -> Self {
        let desconocido = |payload: Value| SocketEvent::Desconocido {
            nombre: nombre.to_string(),
            payload,
        };

        match nombre {
            "connect" => SocketEvent::Conectado,
            "connect_error" => SocketEvent::ErrorConexion(
                campo_str(&payload, "message").unwrap_or_else(|| payload.to_string()),
            ),
            "disconnect" => SocketEvent::Desconectado(
                payload.as_str().map(str::to_string).unwrap_or_default(),
            ),
            "VENTA_CREADA" => match serde_json::from_value::<Venta>(payload.clone()) {
                Ok(venta) => SocketEvent::VentaCreada(venta),
                Err(e) => {
                    warn!(error = %e, "undecodable VENTA_CREADA payload");
                    desconocido(payload)
                }
            },
            "VENTA_ACTUALIZADA" => match payload {
                Value::Object(campos)
                    if campos
                        .get("_id")
                        .and_then(Value::as_str)
                        .is_some_and(|id| !id.is_empty()) =>
                {
                    SocketEvent::VentaActualizada(campos)
                }
                otro => desconocido(otro),
            },
            "VENTA_ELIMINADA" => con_venta_id(nombre, payload, |venta_id| {
                SocketEvent::VentaEliminada { venta_id }
            }),
            "VENTA_ANULADA" => con_venta_id(nombre, payload, |venta_id| {
                SocketEvent::VentaAnulada { venta_id }
            }),
            "VENTA_REHABILITADA" => con_venta_id(nombre, payload, |venta_id| {
                SocketEvent::VentaRehabilitada { venta_id }
            }),
            "SOLICITUD_CREADA" => con_venta_id(nombre, payload, |venta_id| {
                SocketEvent::SolicitudCreada { venta_id }
            }),
            "SOLICITUD_RESUELTA" => SocketEvent::SolicitudResuelta {
                venta_id: campo_str(&payload, "ventaId"),
                estado: payload
                    .get("estado")
                    .cloned()
                    .and_then(|e| serde_json::from_value(e).ok()),
            },
            "FORCE_LOGOUT" => SocketEvent::ForceLogout,
            "test_event" => SocketEvent::Prueba(payload),
            _ => desconocido(payload),
        }
    }
}

/// Side effects the reducer asks its owner to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Efecto {
    /// Admin request list is stale; the only re-fetch the reducer asks for.
    RecargarSolicitudes,
    /// Drop the saved draft for one sale, or every draft.
    BorrarBorrador(Option<String>),
    /// Persist the closed-shift flag and move to the clock-in screen.
    CerrarJornada,
}

impl LibroVentas {
    /// Fold one event into the ledger.
    pub fn aplicar(&mut self, evento: &SocketEvent) -> Vec<Efecto> {
        let mut efectos = Vec::new();
        match evento {
            SocketEvent::VentaCreada(venta) => {
                self.insertar(venta.clone());
            }
            SocketEvent::VentaActualizada(campos) => {
                if let Some(id) = campos.get("_id").and_then(Value::as_str) {
                    self.fusionar(id, campos);
                }
            }
            SocketEvent::VentaEliminada { venta_id } => {
                self.eliminar(venta_id);
            }
            SocketEvent::VentaAnulada { venta_id } => {
                self.marcar_anulada(venta_id);
            }
            SocketEvent::VentaRehabilitada { venta_id } => {
                self.marcar_rehabilitada(venta_id);
            }
            SocketEvent::SolicitudCreada { venta_id } => {
                self.marcar_pendiente(venta_id);
                if self.es_admin() {
                    efectos.push(Efecto::RecargarSolicitudes);
                }
            }
            SocketEvent::SolicitudResuelta { venta_id, estado } => {
                if let (Some(id), Some(estado)) = (venta_id, estado) {
                    self.resolver_revision(id, *estado);
                    if self.es_admin() {
                        efectos.push(Efecto::RecargarSolicitudes);
                    }
                }
                efectos.push(Efecto::BorrarBorrador(venta_id.clone()));
            }
            SocketEvent::ForceLogout => efectos.push(Efecto::CerrarJornada),
            SocketEvent::Conectado
            | SocketEvent::ErrorConexion(_)
            | SocketEvent::Desconectado(_)
            | SocketEvent::Prueba(_)
            | SocketEvent::Desconocido { .. } => {
                debug!(?evento, "event does not touch the ledger");
            }
        }
        efectos
    }
}

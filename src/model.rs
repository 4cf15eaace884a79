//! Wire and domain types shared by the REST client, the socket reducer and
//! the time-tracking calculators. Field names follow the backend's JSON.
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::fecha::{self, serde_fecha, serde_hora_opt};

pub const HORAS_CONTRATADAS_POR_DEFECTO: f64 = 40.0;
pub const MAX_DIAS_VACACIONES_POR_DEFECTO: u32 = 30;

// --- Session ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Empleado,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Empleado => "empleado",
        }
    }

    pub fn parse_role(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "empleado" => Some(Role::Empleado),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub role: Role,
    #[serde(alias = "name", default)]
    pub nombre: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

// --- Sales ledger ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstadoVenta {
    Anulada,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EstadoRevision {
    Pendiente,
    Aceptada,
    Rechazada,
}

impl EstadoRevision {
    /// Resolved states are the ones that notify the employee.
    pub fn es_resuelta(&self) -> bool {
        matches!(self, EstadoRevision::Aceptada | EstadoRevision::Rechazada)
    }
}

/// Who created a sale. Populated records carry a name, raw ones just an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Autor {
    Usuario {
        #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        nombre: String,
    },
    Id(String),
}

impl Autor {
    pub fn nombre(&self) -> Option<&str> {
        match self {
            Autor::Usuario { nombre, .. } => Some(nombre),
            Autor::Id(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Venta {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, alias = "poliza")]
    pub numero_poliza: String,
    #[serde(default)]
    pub tomador: String,
    #[serde(default)]
    pub aseguradora: String,
    #[serde(default)]
    pub ramo: String,
    #[serde(default, alias = "prima", deserialize_with = "importe")]
    pub prima_neta: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forma_pago: Option<String>,
    #[serde(default)]
    pub fecha_efecto: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documento_fiscal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actividad: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observaciones: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Autor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estado: Option<EstadoVenta>,
    #[serde(default)]
    pub estado_revision: Option<EstadoRevision>,
}

impl Venta {
    pub fn fecha(&self) -> Option<NaiveDate> {
        fecha::parse_fecha(&self.fecha_efecto)
    }

    pub fn esta_anulada(&self) -> bool {
        self.estado == Some(EstadoVenta::Anulada)
    }

    /// Overlay `patch` onto this record the way a JSON spread would: every
    /// key present in the patch replaces the current value, `null` clears.
    /// On a patch that would leave the record malformed nothing changes.
    pub fn fusionar(&mut self, patch: &Map<String, Value>) -> Result<(), serde_json::Error> {
        let mut actual = serde_json::to_value(&*self)?;
        if let Value::Object(campos) = &mut actual {
            for (k, v) in patch {
                campos.insert(k.clone(), v.clone());
            }
        }
        *self = serde_json::from_value(actual)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibroVentasResponse {
    #[serde(default)]
    pub ventas: Vec<Venta>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FechaAnulacion {
    Vencimiento,
    Fecha,
}

/// Body of `POST /ventas/:id/anular`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SolicitudAnulacion {
    pub fecha_tipo: FechaAnulacion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fecha_anulacion: Option<NaiveDate>,
    pub motivo: String,
    #[serde(default)]
    pub derivado_verti: bool,
}

// --- Review requests ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TipoSolicitud {
    EditarVenta,
    EliminarVenta,
    AnularVenta,
    RehabilitarVenta,
}

impl TipoSolicitud {
    pub fn etiqueta(&self) -> &'static str {
        match self {
            TipoSolicitud::EditarVenta => "Editar venta",
            TipoSolicitud::EliminarVenta => "Eliminar venta",
            TipoSolicitud::AnularVenta => "Anular venta",
            TipoSolicitud::RehabilitarVenta => "Rehabilitar venta",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstadoSolicitud {
    #[default]
    Pendiente,
    Aprobada,
    Rechazada,
}

impl EstadoSolicitud {
    pub fn es_terminal(&self) -> bool {
        !matches!(self, EstadoSolicitud::Pendiente)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VentaRef {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub tomador: Option<String>,
    #[serde(default)]
    pub numero_poliza: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Persona {
    pub nombre: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Solicitud {
    #[serde(rename = "_id")]
    pub id: String,
    pub tipo: TipoSolicitud,
    #[serde(default)]
    pub estado: EstadoSolicitud,
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
    pub venta: VentaRef,
    #[serde(default)]
    pub solicitado_por: Option<Persona>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// --- Time tracking ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstadoDia {
    Vacaciones,
    DiaLibre,
    Baja,
    Festivo,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Turno {
    Manana,
    Tarde,
    MananaTarde,
}

impl Turno {
    pub fn incluye_manana(&self) -> bool {
        matches!(self, Turno::Manana | Turno::MananaTarde)
    }

    pub fn incluye_tarde(&self) -> bool {
        matches!(self, Turno::Tarde | Turno::MananaTarde)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TipoFichaje {
    Entrada,
    Salida,
}

/// A single clock-in or clock-out. `hora` is `HH:MM`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fichaje {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub tipo: TipoFichaje,
    pub hora: String,
}

/// One day of a calendar: either the employee record sent by the backend or
/// the result of merging it with the organization calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiaCalendario {
    #[serde(with = "serde_fecha")]
    pub fecha: NaiveDate,
    #[serde(default)]
    pub estado: Option<EstadoDia>,
    #[serde(default)]
    pub turno: Option<Turno>,
    #[serde(default, with = "serde_hora_opt")]
    pub hora_entrada_manana: Option<NaiveTime>,
    #[serde(default, with = "serde_hora_opt")]
    pub hora_salida_manana: Option<NaiveTime>,
    #[serde(default, with = "serde_hora_opt")]
    pub hora_entrada_tarde: Option<NaiveTime>,
    #[serde(default, with = "serde_hora_opt")]
    pub hora_salida_tarde: Option<NaiveTime>,
    #[serde(default, deserialize_with = "nulo_como_vacio")]
    pub fichajes: Vec<Fichaje>,
    #[serde(default, deserialize_with = "minutos_enteros")]
    pub minutos_trabajados: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dia_semana: Option<String>,
}

impl DiaCalendario {
    pub fn vacio(fecha: NaiveDate) -> Self {
        Self {
            fecha,
            estado: None,
            turno: None,
            hora_entrada_manana: None,
            hora_salida_manana: None,
            hora_entrada_tarde: None,
            hora_salida_tarde: None,
            fichajes: Vec::new(),
            minutos_trabajados: 0,
            dia_semana: None,
        }
    }

    pub fn horario_manana(&self) -> Option<(NaiveTime, NaiveTime)> {
        self.hora_entrada_manana.zip(self.hora_salida_manana)
    }

    pub fn horario_tarde(&self) -> Option<(NaiveTime, NaiveTime)> {
        self.hora_entrada_tarde.zip(self.hora_salida_tarde)
    }
}

/// Organization-wide calendar entry. Older records use `tipo` for the status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiaGeneral {
    #[serde(with = "serde_fecha")]
    pub fecha: NaiveDate,
    #[serde(default)]
    pub estado: Option<EstadoDia>,
    #[serde(default)]
    pub tipo: Option<EstadoDia>,
}

impl DiaGeneral {
    pub fn estado_efectivo(&self) -> Option<EstadoDia> {
        self.estado.or(self.tipo)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarioGeneral {
    #[serde(default)]
    pub dias: Vec<DiaGeneral>,
}

/// `GET /horario/historial` for the signed-in employee.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorialResponse {
    #[serde(default)]
    pub mes: Option<crate::fecha::Mes>,
    #[serde(default)]
    pub total_horas: Option<String>,
    #[serde(default)]
    pub dias_trabajados: Option<u32>,
    #[serde(default)]
    pub horas_contratadas_semana: Option<f64>,
    #[serde(default)]
    pub dias: Vec<DiaCalendario>,
}

/// `GET /crm/horario` for one employee (admin grid).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespuestaHorario {
    #[serde(default)]
    pub dias: Vec<DiaCalendario>,
    #[serde(default)]
    pub horas_trabajadas: f64,
    #[serde(default, deserialize_with = "minutos_enteros")]
    pub balance_minutos: i64,
    #[serde(default)]
    pub horas_contratadas_semana: Option<f64>,
    #[serde(default)]
    pub max_dias_vacaciones: Option<u32>,
}

impl RespuestaHorario {
    /// Contract figures, taking missing ones from `defecto`.
    pub fn config(&self, defecto: ConfigEmpleado) -> ConfigEmpleado {
        ConfigEmpleado {
            horas_contratadas_semana: self
                .horas_contratadas_semana
                .unwrap_or(defecto.horas_contratadas_semana),
            max_dias_vacaciones: self
                .max_dias_vacaciones
                .unwrap_or(defecto.max_dias_vacaciones),
        }
    }
}

/// Contract figures used to derive daily targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEmpleado {
    pub horas_contratadas_semana: f64,
    pub max_dias_vacaciones: u32,
}

impl Default for ConfigEmpleado {
    fn default() -> Self {
        Self {
            horas_contratadas_semana: HORAS_CONTRATADAS_POR_DEFECTO,
            max_dias_vacaciones: MAX_DIAS_VACACIONES_POR_DEFECTO,
        }
    }
}

/// `GET /users/:id`. Contract fields may be missing or null.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsuarioDetalle {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub horas_contratadas_semana: Option<f64>,
    #[serde(default)]
    pub max_dias_vacaciones: Option<u32>,
}

impl UsuarioDetalle {
    pub fn config(&self, defecto: ConfigEmpleado) -> ConfigEmpleado {
        ConfigEmpleado {
            horas_contratadas_semana: self
                .horas_contratadas_semana
                .unwrap_or(defecto.horas_contratadas_semana),
            max_dias_vacaciones: self
                .max_dias_vacaciones
                .unwrap_or(defecto.max_dias_vacaciones),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Empleado {
    #[serde(rename = "_id")]
    pub id: String,
    pub nombre: String,
    #[serde(default)]
    pub apellidos: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsuarioAsignable {
    #[serde(rename = "_id")]
    pub id: String,
    pub nombre: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub numma: Option<String>,
}

/// Body of `POST /users`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NuevoUsuario {
    pub nombre: String,
    pub apellidos: String,
    pub nif: String,
    pub numma: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstadoJornada {
    Dentro,
    #[default]
    Fuera,
}

/// `GET /horario/hoy`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegistroHoy {
    #[serde(default)]
    pub estado: EstadoJornada,
    #[serde(default, deserialize_with = "minutos_enteros")]
    pub minutos_trabajados: i64,
    #[serde(default)]
    pub nombre: String,
}

fn nulo_como_vacio<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

/// Amounts typed into a form arrive as text, sometimes with a decimal comma.
fn importe<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Importe {
        Numero(f64),
        Texto(String),
    }

    match Option::<Importe>::deserialize(d)? {
        None => Ok(0.0),
        Some(Importe::Numero(n)) => Ok(n),
        Some(Importe::Texto(t)) => {
            let t = t.trim().replace(',', ".");
            if t.is_empty() {
                return Ok(0.0);
            }
            t.parse()
                .map_err(|_| serde::de::Error::custom(format!("invalid amount: {t}")))
        }
    }
}

/// Minutes may come back fractional from aggregation queries; floor them.
fn minutos_enteros<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?
        .map(|m| m.floor() as i64)
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn venta_accepts_legacy_aliases() {
        let v: Venta = serde_json::from_value(json!({
            "_id": "v1",
            "poliza": "P-1",
            "prima": 120.5,
            "fechaEfecto": "2025-03-15T00:00:00.000Z",
            "createdBy": { "nombre": "Ana" }
        }))
        .unwrap();
        assert_eq!(v.numero_poliza, "P-1");
        assert_eq!(v.prima_neta, 120.5);
        assert_eq!(v.fecha(), NaiveDate::from_ymd_opt(2025, 3, 15));
        assert_eq!(v.created_by.as_ref().and_then(Autor::nombre), Some("Ana"));
        assert!(v.estado.is_none());
    }

    #[test]
    fn fusionar_overlays_and_clears() {
        let mut v: Venta = serde_json::from_value(json!({
            "_id": "v1", "primaNeta": 500.0, "estado": "ANULADA", "estadoRevision": "pendiente"
        }))
        .unwrap();
        let patch = json!({ "primaNeta": 600.0, "estado": null, "estadoRevision": null });
        v.fusionar(patch.as_object().unwrap()).unwrap();
        assert_eq!(v.prima_neta, 600.0);
        assert_eq!(v.estado, None);
        assert_eq!(v.estado_revision, None);
    }

    #[test]
    fn fusionar_rejects_malformed_patch_without_changes() {
        let mut v: Venta =
            serde_json::from_value(json!({ "_id": "v1", "primaNeta": 500.0 })).unwrap();
        let before = v.clone();
        let patch = json!({ "primaNeta": "mucho" });
        assert!(v.fusionar(patch.as_object().unwrap()).is_err());
        assert_eq!(v, before);
    }

    #[test]
    fn premium_accepts_form_text() {
        let mut v: Venta =
            serde_json::from_value(json!({ "_id": "v1", "primaNeta": null })).unwrap();
        assert_eq!(v.prima_neta, 0.0);
        v.fusionar(json!({ "primaNeta": " 600,5" }).as_object().unwrap())
            .unwrap();
        assert_eq!(v.prima_neta, 600.5);
        v.fusionar(json!({ "primaNeta": "" }).as_object().unwrap())
            .unwrap();
        assert_eq!(v.prima_neta, 0.0);
    }

    #[test]
    fn dia_calendario_tolerates_nulls_and_fractions() {
        let d: DiaCalendario = serde_json::from_value(json!({
            "fecha": "2025-01-02",
            "estado": null,
            "turno": "MANANA_TARDE",
            "horaEntradaManana": "09:00",
            "horaSalidaManana": "",
            "fichajes": null,
            "minutosTrabajados": 479.9
        }))
        .unwrap();
        assert_eq!(d.turno, Some(Turno::MananaTarde));
        assert_eq!(d.hora_entrada_manana, NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(d.hora_salida_manana, None);
        assert!(d.fichajes.is_empty());
        assert_eq!(d.minutos_trabajados, 479);
    }

    #[test]
    fn dia_general_falls_back_to_tipo() {
        let d: DiaGeneral =
            serde_json::from_value(json!({ "fecha": "2025-01-06", "tipo": "FESTIVO" })).unwrap();
        assert_eq!(d.estado_efectivo(), Some(EstadoDia::Festivo));
    }

    #[test]
    fn user_accepts_mongo_id_and_name() {
        let u: User =
            serde_json::from_value(json!({ "_id": "u1", "role": "empleado", "name": "Luis" }))
                .unwrap();
        assert_eq!(u.id, "u1");
        assert_eq!(u.nombre, "Luis");
        assert!(!u.is_admin());
    }
}

//! REST collaborator. [`CrmApi`] is the seam the session controller talks
//! to; [`HttpCrmApi`] is the reqwest implementation.
//!
//! A 403 (or 202) on a sale mutation means the backend turned the write into
//! a review request. That is classified here as
//! [`WriteOutcome::PendingApproval`] and never reaches callers as an error.
use std::fmt;
use std::sync::RwLock;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::fecha::Mes;
use crate::horario::marca::{BorrarMarca, FichajesManuales, MarcaDia};
use crate::model::{
    CalendarioGeneral, ConfigEmpleado, Empleado, HistorialResponse, LibroVentasResponse,
    LoginResponse, NuevoUsuario, RegistroHoy, RespuestaHorario, Solicitud, SolicitudAnulacion,
    UsuarioAsignable, UsuarioDetalle, Venta,
};
use crate::ventas::WriteOutcome;

pub const DEFAULT_API_URL: &str = "http://localhost:3001/api/";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("session expired or token rejected")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("backend error {status}: {message}")]
    Status { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Map a non-success status and its body to an error. The backend sends
    /// `{ "message": ... }` on failures; anything else is passed through raw.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| body.trim().to_string());
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            other => ApiError::Status {
                status: other.as_u16(),
                message,
            },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Classify the response to a sale mutation.
pub fn classify_write(status: StatusCode, body: &str) -> Result<WriteOutcome, ApiError> {
    match status {
        StatusCode::FORBIDDEN | StatusCode::ACCEPTED => Ok(WriteOutcome::PendingApproval),
        s if s.is_success() => Ok(WriteOutcome::Applied),
        s => Err(ApiError::from_status(s, body)),
    }
}

#[async_trait]
pub trait CrmApi: Send + Sync {
    fn set_token(&self, token: Option<String>);

    // --- auth ---
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError>;
    async fn logout(&self) -> Result<(), ApiError>;

    // --- employee time tracking ---
    async fn registro_hoy(&self) -> Result<RegistroHoy, ApiError>;
    async fn fichar(&self) -> Result<(), ApiError>;
    async fn historial(&self, mes: Mes) -> Result<HistorialResponse, ApiError>;
    async fn calendario_general(&self, mes: Mes) -> Result<CalendarioGeneral, ApiError>;

    // --- sales ledger ---
    async fn libro_ventas(&self, mes: Mes) -> Result<Vec<Venta>, ApiError>;
    async fn buscar_ventas(&self, consulta: &str) -> Result<Vec<Venta>, ApiError>;
    async fn venta(&self, id: &str) -> Result<Venta, ApiError>;
    async fn crear_venta(&self, venta: &Map<String, Value>) -> Result<WriteOutcome, ApiError>;
    async fn editar_venta(
        &self,
        id: &str,
        cambios: &Map<String, Value>,
    ) -> Result<WriteOutcome, ApiError>;
    async fn eliminar_venta(&self, id: &str) -> Result<WriteOutcome, ApiError>;
    async fn anular_venta(
        &self,
        id: &str,
        solicitud: &SolicitudAnulacion,
    ) -> Result<WriteOutcome, ApiError>;
    async fn rehabilitar_venta(&self, id: &str) -> Result<WriteOutcome, ApiError>;
    async fn marcar_revision_leida(&self, id: &str) -> Result<(), ApiError>;
    async fn solicitud_pendiente(&self, venta_id: &str) -> Result<Option<Solicitud>, ApiError>;

    // --- review ---
    async fn solicitudes(&self) -> Result<Vec<Solicitud>, ApiError>;
    async fn aprobar_solicitud(&self, id: &str) -> Result<(), ApiError>;
    async fn rechazar_solicitud(&self, id: &str) -> Result<(), ApiError>;

    // --- users ---
    async fn usuarios_asignables(&self) -> Result<Vec<UsuarioAsignable>, ApiError>;
    async fn crear_usuario(&self, usuario: &NuevoUsuario) -> Result<(), ApiError>;
    async fn usuario(&self, id: &str) -> Result<UsuarioDetalle, ApiError>;
    async fn guardar_config(&self, id: &str, config: &ConfigEmpleado) -> Result<(), ApiError>;

    // --- admin schedule grid ---
    async fn empleados(&self) -> Result<Vec<Empleado>, ApiError>;
    async fn horario_empleado(&self, mes: Mes, empleado_id: &str)
        -> Result<RespuestaHorario, ApiError>;
    async fn calendario_organizacion(&self, mes: Mes) -> Result<CalendarioGeneral, ApiError>;
    async fn marcar_dia(&self, marca: &MarcaDia) -> Result<(), ApiError>;
    async fn borrar_marca(&self, marca: &BorrarMarca) -> Result<(), ApiError>;
    async fn registrar_fichajes(&self, fichajes: &FichajesManuales) -> Result<(), ApiError>;
}

pub struct HttpCrmApi {
    http: Client,
    base_url: Url,
    token: RwLock<Option<String>>,
}

impl fmt::Debug for HttpCrmApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCrmApi")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpCrmApi {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        // Url::join drops the last segment unless the base ends with '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url =
            Url::parse(&normalized).with_context(|| format!("invalid api url: {base_url}"))?;
        let http = Client::builder()
            .user_agent(concat!("crm-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url,
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Network(format!("invalid endpoint {path}: {e}")))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let mut builder = self.http.request(method, self.endpoint(path)?);
        if let Some(token) = self.token() {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    /// Build without sending; lets tests inspect URL and headers.
    pub fn build_request(&self, method: Method, path: &str) -> Result<reqwest::Request, ApiError> {
        Ok(self.request(method, path)?.build()?)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<(StatusCode, String), ApiError> {
        let request = builder.build()?;
        let method = request.method().clone();
        let url = request.url().clone();
        let res = self.http.execute(request).await?;
        let status = res.status();
        let body = res.text().await?;
        debug!(%method, url = %url.path(), status = status.as_u16(), "api call");
        Ok((status, body))
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let (status, body) = self.send(builder).await?;
        if !status.is_success() {
            let err = ApiError::from_status(status, &body);
            warn!(status = status.as_u16(), error = %err, "api call failed");
            return Err(err);
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send_unit(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        let (status, body) = self.send(builder).await?;
        if !status.is_success() {
            let err = ApiError::from_status(status, &body);
            warn!(status = status.as_u16(), error = %err, "api call failed");
            return Err(err);
        }
        Ok(())
    }

    async fn send_write(&self, builder: RequestBuilder) -> Result<WriteOutcome, ApiError> {
        let (status, body) = self.send(builder).await?;
        let outcome = classify_write(status, &body);
        if let Ok(WriteOutcome::PendingApproval) = outcome {
            debug!(status = status.as_u16(), "write queued for approval");
        }
        outcome
    }

    fn json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<RequestBuilder, ApiError> {
        Ok(self.request(method, path)?.json(body))
    }
}

#[async_trait]
impl CrmApi for HttpCrmApi {
    fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }

    #[instrument(skip_all)]
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = json!({ "email": email, "password": password });
        self.send_json(self.json(Method::POST, "auth/login", &body)?)
            .await
    }

    #[instrument(skip_all)]
    async fn logout(&self) -> Result<(), ApiError> {
        self.send_unit(self.request(Method::POST, "auth/logout")?).await
    }

    #[instrument(skip_all)]
    async fn registro_hoy(&self) -> Result<RegistroHoy, ApiError> {
        self.send_json(self.request(Method::GET, "horario/hoy")?).await
    }

    #[instrument(skip_all)]
    async fn fichar(&self) -> Result<(), ApiError> {
        self.send_unit(self.request(Method::POST, "horario/fichar")?).await
    }

    #[instrument(skip_all, fields(mes = %mes))]
    async fn historial(&self, mes: Mes) -> Result<HistorialResponse, ApiError> {
        let rb = self
            .request(Method::GET, "horario/historial")?
            .query(&[("mes", mes.to_string())]);
        self.send_json(rb).await
    }

    #[instrument(skip_all, fields(mes = %mes))]
    async fn calendario_general(&self, mes: Mes) -> Result<CalendarioGeneral, ApiError> {
        let rb = self
            .request(Method::GET, "horario/calendario-general")?
            .query(&[("mes", mes.to_string())]);
        self.send_json(rb).await
    }

    #[instrument(skip_all, fields(mes = %mes))]
    async fn libro_ventas(&self, mes: Mes) -> Result<Vec<Venta>, ApiError> {
        let rb = self.request(Method::GET, "ventas/libro")?.query(&[
            ("month", mes.month().to_string()),
            ("year", mes.year().to_string()),
        ]);
        let libro: LibroVentasResponse = self.send_json(rb).await?;
        Ok(libro.ventas)
    }

    #[instrument(skip_all)]
    async fn buscar_ventas(&self, consulta: &str) -> Result<Vec<Venta>, ApiError> {
        let rb = self
            .request(Method::GET, "ventas/buscar")?
            .query(&[("q", consulta)]);
        self.send_json(rb).await
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn venta(&self, id: &str) -> Result<Venta, ApiError> {
        self.send_json(self.request(Method::GET, &format!("ventas/{id}"))?)
            .await
    }

    #[instrument(skip_all)]
    async fn crear_venta(&self, venta: &Map<String, Value>) -> Result<WriteOutcome, ApiError> {
        self.send_write(self.json(Method::POST, "ventas", venta)?).await
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn editar_venta(
        &self,
        id: &str,
        cambios: &Map<String, Value>,
    ) -> Result<WriteOutcome, ApiError> {
        self.send_write(self.json(Method::PUT, &format!("ventas/{id}"), cambios)?)
            .await
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn eliminar_venta(&self, id: &str) -> Result<WriteOutcome, ApiError> {
        self.send_write(self.request(Method::DELETE, &format!("ventas/{id}"))?)
            .await
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn anular_venta(
        &self,
        id: &str,
        solicitud: &SolicitudAnulacion,
    ) -> Result<WriteOutcome, ApiError> {
        self.send_write(self.json(Method::POST, &format!("ventas/{id}/anular"), solicitud)?)
            .await
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn rehabilitar_venta(&self, id: &str) -> Result<WriteOutcome, ApiError> {
        let body = json!({ "estado": null });
        self.send_write(self.json(Method::PUT, &format!("ventas/{id}"), &body)?)
            .await
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn marcar_revision_leida(&self, id: &str) -> Result<(), ApiError> {
        self.send_unit(self.request(Method::PATCH, &format!("ventas/{id}/marcar-revision-leida"))?)
            .await
    }

    #[instrument(skip_all, fields(venta_id = %venta_id))]
    async fn solicitud_pendiente(&self, venta_id: &str) -> Result<Option<Solicitud>, ApiError> {
        let rb = self.request(Method::GET, &format!("ventas/{venta_id}/solicitud-pendiente"))?;
        match self.send_json(rb).await {
            Err(ApiError::NotFound(_)) => Ok(None),
            other => other,
        }
    }

    #[instrument(skip_all)]
    async fn solicitudes(&self) -> Result<Vec<Solicitud>, ApiError> {
        self.send_json(self.request(Method::GET, "solicitudes")?).await
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn aprobar_solicitud(&self, id: &str) -> Result<(), ApiError> {
        self.send_unit(self.request(Method::POST, &format!("solicitudes/{id}/aprobar"))?)
            .await
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn rechazar_solicitud(&self, id: &str) -> Result<(), ApiError> {
        self.send_unit(self.request(Method::POST, &format!("solicitudes/{id}/rechazar"))?)
            .await
    }

    #[instrument(skip_all)]
    async fn usuarios_asignables(&self) -> Result<Vec<UsuarioAsignable>, ApiError> {
        self.send_json(self.request(Method::GET, "users/asignables")?)
            .await
    }

    #[instrument(skip_all)]
    async fn crear_usuario(&self, usuario: &NuevoUsuario) -> Result<(), ApiError> {
        self.send_unit(self.json(Method::POST, "users", usuario)?).await
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn usuario(&self, id: &str) -> Result<UsuarioDetalle, ApiError> {
        self.send_json(self.request(Method::GET, &format!("users/{id}"))?)
            .await
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn guardar_config(&self, id: &str, config: &ConfigEmpleado) -> Result<(), ApiError> {
        self.send_unit(self.json(Method::PUT, &format!("users/{id}/config"), config)?)
            .await
    }

    #[instrument(skip_all)]
    async fn empleados(&self) -> Result<Vec<Empleado>, ApiError> {
        self.send_json(self.request(Method::GET, "crm/horario/empleados")?)
            .await
    }

    #[instrument(skip_all, fields(mes = %mes, empleado_id = %empleado_id))]
    async fn horario_empleado(
        &self,
        mes: Mes,
        empleado_id: &str,
    ) -> Result<RespuestaHorario, ApiError> {
        let rb = self.request(Method::GET, "crm/horario")?.query(&[
            ("mes", mes.to_string()),
            ("empleadoId", empleado_id.to_string()),
        ]);
        self.send_json(rb).await
    }

    #[instrument(skip_all, fields(mes = %mes))]
    async fn calendario_organizacion(&self, mes: Mes) -> Result<CalendarioGeneral, ApiError> {
        let rb = self
            .request(Method::GET, "crm/horario/calendario-general")?
            .query(&[("mes", mes.to_string())]);
        self.send_json(rb).await
    }

    #[instrument(skip_all, fields(fecha = %marca.fecha))]
    async fn marcar_dia(&self, marca: &MarcaDia) -> Result<(), ApiError> {
        self.send_unit(self.json(Method::POST, "crm/horario/dia", marca)?)
            .await
    }

    #[instrument(skip_all, fields(fecha = %marca.fecha))]
    async fn borrar_marca(&self, marca: &BorrarMarca) -> Result<(), ApiError> {
        self.send_unit(self.json(Method::DELETE, "crm/horario/dia", marca)?)
            .await
    }

    #[instrument(skip_all, fields(fecha = %fichajes.fecha))]
    async fn registrar_fichajes(&self, fichajes: &FichajesManuales) -> Result<(), ApiError> {
        self.send_unit(self.json(Method::POST, "crm/fichajes", fichajes)?)
            .await
    }
}

//! The signed-in session: the only owner of local state.
//!
//! Every backend call goes through here so that a rejected token is handled
//! in one place, writes are reconciled into the ledger the same way whether
//! they applied or turned into a review request, and at most one socket
//! subscription exists at a time.
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiError, CrmApi};
use crate::config::Horario;
use crate::events::{Efecto, SocketEvent};
use crate::fecha::Mes;
use crate::guard::{resolver_acceso, Acceso, ContextoAcceso, Ruta};
use crate::horario::calendario::totales_mes;
use crate::horario::marca::{BorrarMarca, FichajesManuales, MarcaDia};
use crate::horario::reloj::AccionInicio;
use crate::horario::{reconciliar, resumen_semanal, saludo, Aviso, ResumenSemana, SesionFichaje, TotalesMes};
use crate::model::{
    ConfigEmpleado, DiaCalendario, Empleado, EstadoJornada, EstadoRevision, FechaAnulacion,
    NuevoUsuario, Solicitud, TipoSolicitud, User, UsuarioAsignable, Venta,
};
use crate::socket::{self, SocketConfig, Suscripcion};
use crate::store::{self, Pool};
use crate::ventas::validacion::{
    preparar_anulacion, validar_documento_fiscal, validar_rehabilitacion, validar_venta,
};
use crate::ventas::{revision_de, LibroVentas, Revision, ValidationError, WriteOutcome};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Validacion(#[from] ValidationError),
    #[error("changes do not fit the sale: {0}")]
    CambiosInvalidos(#[source] serde_json::Error),
    #[error("local store: {0}")]
    Store(#[from] anyhow::Error),
    #[error("not signed in")]
    SinSesion,
    #[error("admin only")]
    SoloAdmin,
    #[error("unknown sale: {0}")]
    VentaDesconocida(String),
    #[error("unknown request: {0}")]
    SolicitudDesconocida(String),
    #[error("socket: {0}")]
    Socket(String),
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;

/// Employee calendar month after merging with the organization calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarioMes {
    pub mes: Mes,
    pub dias: BTreeMap<NaiveDate, DiaCalendario>,
    pub totales: TotalesMes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistorialMes {
    pub mes: Mes,
    pub totales: TotalesMes,
    pub horas_contratadas_semana: f64,
    pub semanas: Vec<ResumenSemana>,
}

/// One employee's month in the admin grid.
#[derive(Debug, Clone, PartialEq)]
pub struct HorarioEmpleado {
    pub empleado_id: String,
    pub mes: Mes,
    pub dias: BTreeMap<NaiveDate, DiaCalendario>,
    pub config: ConfigEmpleado,
    pub horas_trabajadas: f64,
    pub balance_minutos: i64,
}

pub struct SessionController {
    api: Arc<dyn CrmApi>,
    pool: Pool,
    horario: Horario,
    token: Option<String>,
    user: Option<User>,
    libro: LibroVentas,
    solicitudes: Vec<Solicitud>,
    fichaje: Option<SesionFichaje>,
    pantalla: Ruta,
    movil: bool,
    suscripcion: Option<Suscripcion>,
}

impl SessionController {
    pub fn new(api: Arc<dyn CrmApi>, pool: Pool, horario: Horario) -> Self {
        Self {
            api,
            pool,
            horario,
            token: None,
            user: None,
            libro: LibroVentas::default(),
            solicitudes: Vec::new(),
            fichaje: None,
            pantalla: Ruta::Login,
            movil: false,
            suscripcion: None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn libro(&self) -> &LibroVentas {
        &self.libro
    }

    pub fn solicitudes(&self) -> &[Solicitud] {
        &self.solicitudes
    }

    pub fn fichaje(&self) -> Option<&SesionFichaje> {
        self.fichaje.as_ref()
    }

    pub fn pantalla(&self) -> Ruta {
        self.pantalla
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn set_movil(&mut self, movil: bool) {
        self.movil = movil;
    }

    fn require_user(&self) -> Result<&User> {
        self.user.as_ref().ok_or(SessionError::SinSesion)
    }

    fn require_admin(&self) -> Result<()> {
        if self.require_user()?.is_admin() {
            Ok(())
        } else {
            Err(SessionError::SoloAdmin)
        }
    }

    fn pantalla_inicial(user: &User) -> Ruta {
        if user.is_admin() {
            Ruta::LibroVentas
        } else {
            Ruta::ControlHorario
        }
    }

    fn abrir(&mut self, token: String, user: User) {
        self.api.set_token(Some(token.clone()));
        self.libro = LibroVentas::new(user.is_admin());
        self.pantalla = Self::pantalla_inicial(&user);
        self.token = Some(token);
        self.user = Some(user);
    }

    fn olvidar(&mut self) {
        self.api.set_token(None);
        self.token = None;
        self.user = None;
        self.libro = LibroVentas::default();
        self.solicitudes.clear();
        self.fichaje = None;
        self.suscripcion = None;
        self.pantalla = Ruta::Login;
    }

    /// Pass an API result through, tearing the session down on a 401.
    async fn llamar<T>(&mut self, res: Result<T, ApiError>) -> Result<T> {
        match res {
            Err(ApiError::Unauthorized) => {
                warn!("token rejected, clearing local session");
                self.olvidar();
                if let Err(err) = store::limpiar_todo(&self.pool).await {
                    warn!(error = %err, "could not wipe local store");
                }
                Err(ApiError::Unauthorized.into())
            }
            other => Ok(other?),
        }
    }

    // --- session lifecycle ---

    #[instrument(skip_all)]
    pub async fn login(&mut self, email: &str, password: &str) -> Result<&User> {
        let api = Arc::clone(&self.api);
        let res = self.llamar(api.login(email, password).await).await?;
        store::guardar_sesion(&self.pool, &res.token, &res.user).await?;
        store::set_jornada_cerrada(&self.pool, false).await?;
        info!(user_id = %res.user.id, role = res.user.role.as_str(), "signed in");
        self.abrir(res.token, res.user);
        self.require_user()
    }

    /// Pick up a session saved by an earlier run.
    #[instrument(skip_all)]
    pub async fn restaurar(&mut self) -> Result<bool> {
        match store::cargar_sesion(&self.pool).await? {
            Some(guardada) => {
                debug!(user_id = %guardada.user.id, "session restored");
                self.abrir(guardada.token, guardada.user);
                Ok(true)
            }
            None => {
                self.olvidar();
                Ok(false)
            }
        }
    }

    #[instrument(skip_all)]
    pub async fn logout(&mut self) -> Result<()> {
        if self.token.is_some() {
            if let Err(err) = self.api.logout().await {
                warn!(error = %err, "logout call failed, clearing locally anyway");
            }
        }
        store::limpiar_todo(&self.pool).await?;
        self.olvidar();
        Ok(())
    }

    // --- clock-in screen ---

    /// Reload `/horario/hoy` and rebuild the live ticker from it.
    #[instrument(skip_all)]
    pub async fn cargar_hoy(&mut self, ahora: DateTime<Utc>) -> Result<&SesionFichaje> {
        self.require_user()?;
        let api = Arc::clone(&self.api);
        let registro = self.llamar(api.registro_hoy().await).await?;
        let guardado = store::hora_inicio_jornada(&self.pool).await?;
        let (sesion, accion) = SesionFichaje::desde_servidor(registro, guardado, ahora);
        match accion {
            AccionInicio::Guardar(inicio) => store::guardar_hora_inicio(&self.pool, inicio).await?,
            AccionInicio::Borrar => store::borrar_hora_inicio(&self.pool).await?,
            AccionInicio::Conservar => {}
        }
        Ok(&*self.fichaje.insert(sesion))
    }

    /// Toggle the clock. The server decides the new state; the greeting is
    /// picked from the state before the toggle.
    #[instrument(skip_all)]
    pub async fn fichar(&mut self, ahora: DateTime<Local>) -> Result<Aviso> {
        let ahora_utc = ahora.with_timezone(&Utc);
        let previo = match self.fichaje.as_ref().map(|f| f.registro.estado) {
            Some(estado) => estado,
            None => self.cargar_hoy(ahora_utc).await?.registro.estado,
        };

        let api = Arc::clone(&self.api);
        self.llamar(api.fichar().await).await?;
        let registro = self.cargar_hoy(ahora_utc).await?.registro.clone();
        let dentro = registro.estado == EstadoJornada::Dentro;
        let nombre = if registro.nombre.is_empty() {
            self.require_user()?.nombre.clone()
        } else {
            registro.nombre
        };
        if dentro {
            store::set_jornada_cerrada(&self.pool, false).await?;
        }

        let texto = saludo(previo, ahora.time(), &nombre, self.horario.hora_cambio_saludo);
        info!(previo = ?previo, dentro, "clock toggled");
        let segundos = self.horario.aviso_segundos.min(86_400) as i64;
        Ok(Aviso::new(texto, ahora_utc, Duration::seconds(segundos)))
    }

    // --- calendar and history ---

    #[instrument(skip_all, fields(mes = %mes))]
    pub async fn cargar_calendario(&mut self, mes: Mes) -> Result<CalendarioMes> {
        self.require_user()?;
        let api = Arc::clone(&self.api);
        let general = self.llamar(api.calendario_general(mes).await).await?;
        let propio = self.llamar(api.historial(mes).await).await?;
        let dias = reconciliar(&general.dias, &propio.dias);
        let totales = totales_mes(mes, &dias);
        Ok(CalendarioMes { mes, dias, totales })
    }

    #[instrument(skip_all, fields(mes = %mes))]
    pub async fn cargar_historial(&mut self, mes: Mes) -> Result<HistorialMes> {
        self.require_user()?;
        let api = Arc::clone(&self.api);
        let resp = self.llamar(api.historial(mes).await).await?;
        let horas = resp
            .horas_contratadas_semana
            .unwrap_or(self.horario.horas_contratadas_semana);
        let totales = resp
            .dias
            .iter()
            .filter(|d| d.minutos_trabajados > 0)
            .fold(TotalesMes::default(), |acc, d| TotalesMes {
                dias_trabajados: acc.dias_trabajados + 1,
                minutos: acc.minutos + d.minutos_trabajados,
            });
        Ok(HistorialMes {
            mes,
            totales,
            horas_contratadas_semana: horas,
            semanas: resumen_semanal(&resp.dias, horas),
        })
    }

    // --- sales ledger ---

    #[instrument(skip_all, fields(mes = %mes))]
    pub async fn cargar_libro(&mut self, mes: Mes) -> Result<&LibroVentas> {
        self.require_user()?;
        let api = Arc::clone(&self.api);
        let ventas = self.llamar(api.libro_ventas(mes).await).await?;
        debug!(count = ventas.len(), "ledger loaded");
        self.libro.reemplazar(ventas);
        Ok(&self.libro)
    }

    #[instrument(skip_all)]
    pub async fn buscar_ventas(&mut self, consulta: &str) -> Result<Vec<Venta>> {
        self.require_user()?;
        let api = Arc::clone(&self.api);
        self.llamar(api.buscar_ventas(consulta).await).await
    }

    fn venta_local(&self, id: &str) -> Result<&Venta> {
        self.libro
            .venta(id)
            .ok_or_else(|| SessionError::VentaDesconocida(id.to_string()))
    }

    /// Reconcile a write outcome: applied writes run `aplicar`, queued ones
    /// mark the sale pending.
    fn reconciliar_escritura(
        &mut self,
        id: &str,
        outcome: WriteOutcome,
        aplicar: impl FnOnce(&mut LibroVentas),
    ) -> WriteOutcome {
        match outcome {
            WriteOutcome::Applied => aplicar(&mut self.libro),
            WriteOutcome::PendingApproval => {
                debug!(venta_id = %id, "write queued for review");
                self.libro.marcar_pendiente(id);
            }
        }
        outcome
    }

    #[instrument(skip_all)]
    pub async fn crear_venta(&mut self, datos: &Map<String, Value>) -> Result<WriteOutcome> {
        self.require_user()?;
        validar_documento_fiscal(datos.get("documentoFiscal").and_then(Value::as_str))?;
        if let Some(fecha) = datos.get("fechaEfecto").and_then(Value::as_str) {
            if !fecha.trim().is_empty() && crate::fecha::normalize_date(fecha).is_none() {
                return Err(ValidationError::FechaEfecto(fecha.to_string()).into());
            }
        }
        let api = Arc::clone(&self.api);
        // The new record arrives through VENTA_CREADA.
        self.llamar(api.crear_venta(datos).await).await
    }

    #[instrument(skip_all, fields(venta_id = %id))]
    pub async fn editar_venta(
        &mut self,
        id: &str,
        cambios: &Map<String, Value>,
    ) -> Result<WriteOutcome> {
        self.require_user()?;
        let mut candidata = self.venta_local(id)?.clone();
        candidata
            .fusionar(cambios)
            .map_err(SessionError::CambiosInvalidos)?;
        validar_venta(&candidata)?;

        let api = Arc::clone(&self.api);
        let outcome = self.llamar(api.editar_venta(id, cambios).await).await?;
        if outcome == WriteOutcome::PendingApproval {
            store::guardar_borrador(&self.pool, id, cambios).await?;
        }
        Ok(self.reconciliar_escritura(id, outcome, |libro| {
            libro.fusionar(id, cambios);
        }))
    }

    #[instrument(skip_all, fields(venta_id = %id))]
    pub async fn eliminar_venta(&mut self, id: &str) -> Result<WriteOutcome> {
        self.require_user()?;
        self.venta_local(id)?;
        let api = Arc::clone(&self.api);
        let outcome = self.llamar(api.eliminar_venta(id).await).await?;
        Ok(self.reconciliar_escritura(id, outcome, |libro| {
            libro.eliminar(id);
        }))
    }

    #[instrument(skip_all, fields(venta_id = %id))]
    pub async fn anular_venta(
        &mut self,
        id: &str,
        fecha_tipo: FechaAnulacion,
        fecha: Option<NaiveDate>,
        motivo: &str,
        derivado_verti: bool,
    ) -> Result<WriteOutcome> {
        self.require_user()?;
        self.venta_local(id)?;
        let solicitud = preparar_anulacion(fecha_tipo, fecha, motivo, derivado_verti)?;
        let api = Arc::clone(&self.api);
        let outcome = self.llamar(api.anular_venta(id, &solicitud).await).await?;
        Ok(self.reconciliar_escritura(id, outcome, |libro| {
            libro.marcar_anulada(id);
        }))
    }

    #[instrument(skip_all, fields(venta_id = %id))]
    pub async fn rehabilitar_venta(&mut self, id: &str) -> Result<WriteOutcome> {
        self.require_user()?;
        validar_rehabilitacion(self.venta_local(id)?)?;
        let api = Arc::clone(&self.api);
        let outcome = self.llamar(api.rehabilitar_venta(id).await).await?;
        Ok(self.reconciliar_escritura(id, outcome, |libro| {
            libro.marcar_rehabilitada(id);
        }))
    }

    /// The sale as the edit form should show it: a pending request's payload
    /// (or, failing that, the local draft) overlaid on the ledger copy.
    #[instrument(skip_all, fields(venta_id = %id))]
    pub async fn abrir_edicion(&mut self, id: &str) -> Result<Venta> {
        self.require_user()?;
        let mut venta = self.venta_local(id)?.clone();
        if venta.estado_revision != Some(EstadoRevision::Pendiente) {
            return Ok(venta);
        }

        let api = Arc::clone(&self.api);
        let pendiente = match api.solicitud_pendiente(id).await {
            Ok(pendiente) => pendiente,
            Err(ApiError::Unauthorized) => self.llamar(Err(ApiError::Unauthorized)).await?,
            Err(err) => {
                warn!(error = %err, "pending request unavailable, showing stored copy");
                None
            }
        };
        let payload = match pendiente.and_then(|s| s.payload) {
            Some(p) => Some(p),
            None => store::cargar_borrador(&self.pool, id)
                .await?
                .map(|b| b.payload),
        };
        if let Some(payload) = payload {
            if let Err(e) = venta.fusionar(&payload) {
                warn!(error = %e, "pending payload does not fit the sale, showing ledger copy");
            }
        }
        Ok(venta)
    }

    /// Acknowledge a resolved review.
    #[instrument(skip_all, fields(venta_id = %id))]
    pub async fn marcar_revision_leida(&mut self, id: &str) -> Result<()> {
        self.require_user()?;
        let api = Arc::clone(&self.api);
        self.llamar(api.marcar_revision_leida(id).await).await?;
        self.libro.limpiar_revision(id);
        Ok(())
    }

    // --- admin review ---

    /// Open requests, oldest first.
    #[instrument(skip_all)]
    pub async fn cargar_solicitudes(&mut self) -> Result<&[Solicitud]> {
        self.require_admin()?;
        let api = Arc::clone(&self.api);
        let mut solicitudes = self.llamar(api.solicitudes().await).await?;
        solicitudes.retain(|s| !s.estado.es_terminal());
        solicitudes.sort_by_key(|s| s.created_at);
        self.solicitudes = solicitudes;
        Ok(&self.solicitudes)
    }

    fn solicitud(&self, id: &str) -> Result<&Solicitud> {
        self.solicitudes
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| SessionError::SolicitudDesconocida(id.to_string()))
    }

    #[instrument(skip_all, fields(solicitud_id = %id))]
    pub async fn abrir_solicitud(&mut self, id: &str) -> Result<Revision> {
        self.require_admin()?;
        let venta_id = self.solicitud(id)?.venta.id.clone();
        let api = Arc::clone(&self.api);
        let venta = self.llamar(api.venta(&venta_id).await).await?;
        Ok(revision_de(self.solicitud(id)?, &venta))
    }

    #[instrument(skip_all, fields(solicitud_id = %id))]
    pub async fn aprobar(&mut self, id: &str) -> Result<()> {
        self.require_admin()?;
        let solicitud = self.solicitud(id)?.clone();
        let api = Arc::clone(&self.api);
        self.llamar(api.aprobar_solicitud(id).await).await?;
        let borrada = match solicitud.tipo {
            TipoSolicitud::EliminarVenta => {
                self.llamar(api.eliminar_venta(&solicitud.venta.id).await)
                    .await?
            }
            _ => WriteOutcome::Applied,
        };
        match borrada {
            WriteOutcome::Applied => {
                self.libro.aplicar_aprobacion(&solicitud);
            }
            WriteOutcome::PendingApproval => {
                warn!(venta_id = %solicitud.venta.id, "delete was not applied, keeping the sale");
            }
        }
        self.solicitudes.retain(|s| s.id != id);
        info!(tipo = solicitud.tipo.etiqueta(), venta_id = %solicitud.venta.id, "request approved");
        Ok(())
    }

    #[instrument(skip_all, fields(solicitud_id = %id))]
    pub async fn rechazar(&mut self, id: &str) -> Result<()> {
        self.require_admin()?;
        let solicitud = self.solicitud(id)?.clone();
        let api = Arc::clone(&self.api);
        self.llamar(api.rechazar_solicitud(id).await).await?;
        self.libro.aplicar_rechazo(&solicitud);
        self.solicitudes.retain(|s| s.id != id);
        info!(tipo = solicitud.tipo.etiqueta(), venta_id = %solicitud.venta.id, "request rejected");
        Ok(())
    }

    // --- live events ---

    /// Fold a socket event into local state and run the effects it asks for.
    #[instrument(skip_all)]
    pub async fn aplicar_evento(&mut self, evento: &SocketEvent) -> Result<()> {
        match evento {
            SocketEvent::Conectado => debug!("socket connected"),
            SocketEvent::ErrorConexion(msg) => warn!(%msg, "socket connect error"),
            SocketEvent::Desconectado(motivo) => debug!(%motivo, "socket disconnected"),
            _ => {}
        }

        for efecto in self.libro.aplicar(evento) {
            match efecto {
                Efecto::RecargarSolicitudes => {
                    self.cargar_solicitudes().await?;
                }
                Efecto::BorrarBorrador(Some(id)) => {
                    store::borrar_borrador(&self.pool, &id).await?;
                }
                Efecto::BorrarBorrador(None) => {
                    let n = store::borrar_borradores(&self.pool).await?;
                    debug!(count = n, "drafts cleared");
                }
                Efecto::CerrarJornada => {
                    store::set_jornada_cerrada(&self.pool, true).await?;
                    self.pantalla = Ruta::ControlHorario;
                    info!("shift closed remotely");
                }
            }
        }
        Ok(())
    }

    /// Start the socket subscription, replacing any previous one.
    pub fn conectar(&mut self, socket_base: &str, max_backoff: StdDuration) -> Result<()> {
        let user = self.require_user()?;
        let token = self.token.clone().ok_or(SessionError::SinSesion)?;
        let cfg = SocketConfig {
            url: socket::socket_url(socket_base).map_err(|e| SessionError::Socket(e.to_string()))?,
            user_id: user.id.clone(),
            token,
            max_backoff,
        };
        self.suscripcion = Some(socket::suscribir(cfg));
        Ok(())
    }

    pub fn desconectar(&mut self) {
        self.suscripcion = None;
    }

    /// Wait for the next socket event and apply it. `None` once there is no
    /// subscription or it ended.
    pub async fn siguiente_evento(&mut self) -> Result<Option<SocketEvent>> {
        let Some(sub) = self.suscripcion.as_mut() else {
            return Ok(None);
        };
        let Some(evento) = sub.recv().await else {
            self.suscripcion = None;
            return Ok(None);
        };
        self.aplicar_evento(&evento).await?;
        Ok(Some(evento))
    }

    // --- navigation ---

    /// Try to move to `ruta`; a refused move lands on the redirect target.
    /// An employee heading to a CRM screen gets today's clock state
    /// refreshed first.
    pub async fn navegar(&mut self, ruta: Ruta) -> Result<Acceso> {
        let empleado = self.user.as_ref().is_some_and(|u| !u.is_admin());
        if empleado && ruta.es_crm() {
            self.cargar_hoy(Utc::now()).await?;
        }
        let ctx = ContextoAcceso {
            movil: self.movil,
            jornada_cerrada: store::jornada_cerrada(&self.pool).await?,
            dentro: self
                .fichaje
                .as_ref()
                .is_some_and(|f| f.registro.estado == EstadoJornada::Dentro),
        };
        let acceso = resolver_acceso(self.user.as_ref(), ruta, ctx);
        self.pantalla = match acceso {
            Acceso::Permitido => ruta,
            Acceso::Redirigir(destino) => destino,
        };
        Ok(acceso)
    }

    // --- admin schedule grid and users ---

    #[instrument(skip_all)]
    pub async fn empleados(&mut self) -> Result<Vec<Empleado>> {
        self.require_admin()?;
        let api = Arc::clone(&self.api);
        self.llamar(api.empleados().await).await
    }

    #[instrument(skip_all, fields(mes = %mes, empleado_id = %empleado_id))]
    pub async fn cargar_horario_empleado(
        &mut self,
        mes: Mes,
        empleado_id: &str,
    ) -> Result<HorarioEmpleado> {
        self.require_admin()?;
        let api = Arc::clone(&self.api);
        let general = self.llamar(api.calendario_organizacion(mes).await).await?;
        let resp = self
            .llamar(api.horario_empleado(mes, empleado_id).await)
            .await?;
        Ok(HorarioEmpleado {
            empleado_id: empleado_id.to_string(),
            mes,
            dias: reconciliar(&general.dias, &resp.dias),
            config: resp.config(self.horario.config_empleado()),
            horas_trabajadas: resp.horas_trabajadas,
            balance_minutos: resp.balance_minutos,
        })
    }

    #[instrument(skip_all, fields(fecha = %marca.fecha))]
    pub async fn marcar_dia(&mut self, marca: &MarcaDia) -> Result<()> {
        self.require_admin()?;
        let api = Arc::clone(&self.api);
        self.llamar(api.marcar_dia(marca).await).await
    }

    #[instrument(skip_all, fields(fecha = %marca.fecha))]
    pub async fn borrar_marca(&mut self, marca: &BorrarMarca) -> Result<()> {
        self.require_admin()?;
        let api = Arc::clone(&self.api);
        self.llamar(api.borrar_marca(marca).await).await
    }

    #[instrument(skip_all, fields(fecha = %fichajes.fecha))]
    pub async fn registrar_fichajes(&mut self, fichajes: &FichajesManuales) -> Result<()> {
        self.require_admin()?;
        if fichajes.fichajes.is_empty() {
            debug!("no clock events to record");
            return Ok(());
        }
        let api = Arc::clone(&self.api);
        self.llamar(api.registrar_fichajes(fichajes).await).await
    }

    #[instrument(skip_all, fields(empleado_id = %empleado_id))]
    pub async fn config_empleado(&mut self, empleado_id: &str) -> Result<ConfigEmpleado> {
        self.require_admin()?;
        let api = Arc::clone(&self.api);
        let detalle = self.llamar(api.usuario(empleado_id).await).await?;
        Ok(detalle.config(self.horario.config_empleado()))
    }

    #[instrument(skip_all, fields(empleado_id = %empleado_id))]
    pub async fn guardar_config(
        &mut self,
        empleado_id: &str,
        config: &ConfigEmpleado,
    ) -> Result<()> {
        self.require_admin()?;
        let api = Arc::clone(&self.api);
        self.llamar(api.guardar_config(empleado_id, config).await)
            .await
    }

    #[instrument(skip_all)]
    pub async fn usuarios_asignables(&mut self) -> Result<Vec<UsuarioAsignable>> {
        self.require_admin()?;
        let api = Arc::clone(&self.api);
        self.llamar(api.usuarios_asignables().await).await
    }

    #[instrument(skip_all)]
    pub async fn crear_usuario(&mut self, usuario: &NuevoUsuario) -> Result<()> {
        self.require_admin()?;
        validar_documento_fiscal(Some(&usuario.nif))?;
        let api = Arc::clone(&self.api);
        self.llamar(api.crear_usuario(usuario).await).await
    }
}

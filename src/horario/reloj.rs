//! Clock-in screen state: the server-authoritative status plus a local
//! ticker that keeps the worked-minutes figure moving between reloads.
use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};

use crate::model::{EstadoJornada, RegistroHoy};

pub const HORA_CAMBIO_SALUDO: u32 = 14;

/// What to do with the persisted shift start after a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccionInicio {
    Guardar(DateTime<Utc>),
    Borrar,
    Conservar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SesionFichaje {
    pub registro: RegistroHoy,
    pub inicio: Option<DateTime<Utc>>,
}

impl SesionFichaje {
    /// Rebuild the ticker from a fresh `/horario/hoy` response.
    ///
    /// While DENTRO a start timestamp must exist: the stored one is reused,
    /// otherwise `ahora` becomes the start. FUERA always drops it.
    pub fn desde_servidor(
        registro: RegistroHoy,
        guardado: Option<DateTime<Utc>>,
        ahora: DateTime<Utc>,
    ) -> (Self, AccionInicio) {
        let (inicio, accion) = match (registro.estado, guardado) {
            (EstadoJornada::Dentro, Some(inicio)) => (Some(inicio), AccionInicio::Conservar),
            (EstadoJornada::Dentro, None) => (Some(ahora), AccionInicio::Guardar(ahora)),
            (EstadoJornada::Fuera, Some(_)) => (None, AccionInicio::Borrar),
            (EstadoJornada::Fuera, None) => (None, AccionInicio::Conservar),
        };
        (Self { registro, inicio }, accion)
    }

    pub fn esta_dentro(&self) -> bool {
        self.registro.estado == EstadoJornada::Dentro
    }

    /// Server minutes plus whole minutes elapsed since the local start.
    pub fn minutos_en_vivo(&self, ahora: DateTime<Utc>) -> i64 {
        let extra = match (self.esta_dentro(), self.inicio) {
            (true, Some(inicio)) => (ahora - inicio).num_minutes().max(0),
            _ => 0,
        };
        self.registro.minutos_trabajados + extra
    }
}

/// Message shown after a toggle, chosen from the state *before* it.
pub fn saludo(previo: EstadoJornada, hora: NaiveTime, nombre: &str, hora_cambio: u32) -> String {
    match previo {
        EstadoJornada::Fuera if hora.hour() < hora_cambio => format!("Buenos días, {nombre}"),
        EstadoJornada::Fuera => format!("Buenas tardes, {nombre}"),
        EstadoJornada::Dentro => format!("Hasta pronto, {nombre}"),
    }
}

/// A transient notice with an expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aviso {
    pub texto: String,
    pub expira: DateTime<Utc>,
}

impl Aviso {
    pub fn new(texto: String, desde: DateTime<Utc>, duracion: Duration) -> Self {
        Self {
            texto,
            expira: desde + duracion,
        }
    }

    pub fn vigente(&self, ahora: DateTime<Utc>) -> bool {
        ahora < self.expira
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 17, h, m, 0).unwrap()
    }

    fn registro(estado: EstadoJornada, minutos: i64) -> RegistroHoy {
        RegistroHoy {
            estado,
            minutos_trabajados: minutos,
            nombre: "Ana".into(),
        }
    }

    #[test]
    fn entering_without_stored_start_creates_one() {
        let (s, accion) = SesionFichaje::desde_servidor(
            registro(EstadoJornada::Dentro, 60),
            None,
            t(9, 0),
        );
        assert_eq!(accion, AccionInicio::Guardar(t(9, 0)));
        assert_eq!(s.minutos_en_vivo(t(9, 30)), 90);
    }

    #[test]
    fn stored_start_is_reused_and_seconds_are_floored() {
        let (s, accion) = SesionFichaje::desde_servidor(
            registro(EstadoJornada::Dentro, 0),
            Some(t(8, 0)),
            t(9, 0),
        );
        assert_eq!(accion, AccionInicio::Conservar);
        assert_eq!(s.minutos_en_vivo(t(8, 10) + Duration::seconds(59)), 10);
    }

    #[test]
    fn leaving_clears_start_and_freezes_minutes() {
        let (s, accion) = SesionFichaje::desde_servidor(
            registro(EstadoJornada::Fuera, 240),
            Some(t(8, 0)),
            t(12, 0),
        );
        assert_eq!(accion, AccionInicio::Borrar);
        assert_eq!(s.inicio, None);
        assert_eq!(s.minutos_en_vivo(t(18, 0)), 240);
    }

    #[test]
    fn greeting_follows_previous_state_and_hour() {
        let manana = NaiveTime::from_hms_opt(13, 59, 0).unwrap();
        let tarde = NaiveTime::from_hms_opt(14, 0, 0).unwrap();
        assert_eq!(
            saludo(EstadoJornada::Fuera, manana, "Ana", HORA_CAMBIO_SALUDO),
            "Buenos días, Ana"
        );
        assert_eq!(
            saludo(EstadoJornada::Fuera, tarde, "Ana", HORA_CAMBIO_SALUDO),
            "Buenas tardes, Ana"
        );
        assert_eq!(
            saludo(EstadoJornada::Dentro, manana, "Ana", HORA_CAMBIO_SALUDO),
            "Hasta pronto, Ana"
        );
    }

    #[test]
    fn notice_expires() {
        let aviso = Aviso::new("hola".into(), t(9, 0), Duration::seconds(10));
        assert!(aviso.vigente(t(9, 0) + Duration::seconds(9)));
        assert!(!aviso.vigente(t(9, 0) + Duration::seconds(10)));
    }
}

//! Date and month helpers shared by the wire model, the calendar views and
//! the review diff.
//!
//! The backend is inconsistent about date formats: calendar endpoints send
//! `YYYY-MM-DD`, sale records carry full ISO timestamps and older forms post
//! `DD/MM/YYYY`. Everything is normalized to `YYYY-MM-DD` on the way in.
use chrono::{Datelike, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

static ISO_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid ISO day regex"));

/// Normalize any accepted date representation to `YYYY-MM-DD`.
///
/// Accepts `YYYY-MM-DD` (returned as-is), `DD/MM/YYYY` and ISO timestamps
/// (`YYYY-MM-DDTHH:MM:SS...`). Returns `None` for anything else, including
/// impossible calendar dates.
pub fn normalize_date(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if ISO_DAY.is_match(value) {
        return NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .map(|_| value.to_string());
    }

    if value.contains('/') {
        let mut parts = value.split('/');
        let (Some(dd), Some(mm), Some(yyyy), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };
        let day: u32 = dd.trim().parse().ok()?;
        let month: u32 = mm.trim().parse().ok()?;
        let year: i32 = yyyy.trim().parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string());
    }

    if let Some((day, _)) = value.split_once('T') {
        if ISO_DAY.is_match(day) {
            return normalize_date(day);
        }
    }

    None
}

/// Parse any accepted date representation into a calendar date.
pub fn parse_fecha(value: &str) -> Option<NaiveDate> {
    normalize_date(value).and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
}

/// Parse a wall-clock time written as `HH:MM` or `HH:MM:SS`.
pub fn parse_hora(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// `DD/MM/YYYY`, the format every screen shows dates in.
pub fn formatear_fecha_es(fecha: NaiveDate) -> String {
    fecha.format("%d/%m/%Y").to_string()
}

/// Serde adapter for dates that may arrive in any accepted representation.
pub mod serde_fecha {
    use super::*;

    pub fn serialize<S: Serializer>(fecha: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&fecha.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        parse_fecha(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date: {raw}")))
    }
}

/// Serde adapter for optional `HH:MM` times. Empty strings read as `None`.
pub mod serde_hora_opt {
    use super::*;

    pub fn serialize<S: Serializer>(hora: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match hora {
            Some(h) => s.serialize_some(&h.format("%H:%M").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => parse_hora(text)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid time: {text}"))),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid month (expected YYYY-MM): {0}")]
pub struct MesError(pub String);

/// A calendar month, written `YYYY-MM` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mes {
    primero: NaiveDate,
}

impl Mes {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|primero| Self { primero })
    }

    pub fn de_fecha(fecha: NaiveDate) -> Self {
        Self {
            primero: fecha - chrono::Duration::days(i64::from(fecha.day0())),
        }
    }

    pub fn year(&self) -> i32 {
        self.primero.year()
    }

    pub fn month(&self) -> u32 {
        self.primero.month()
    }

    /// Shift by `delta` months, crossing year boundaries. Stays put at the
    /// edge of the representable range.
    pub fn sumar(self, delta: i32) -> Self {
        let total = self.year() * 12 + (self.month() as i32 - 1) + delta;
        Mes::new(total.div_euclid(12), total.rem_euclid(12) as u32 + 1).unwrap_or(self)
    }

    pub fn primer_dia(self) -> NaiveDate {
        self.primero
    }

    pub fn num_dias(self) -> u32 {
        let next = self.sumar(1).primer_dia();
        (next - self.primer_dia()).num_days() as u32
    }

    pub fn dias(self) -> impl Iterator<Item = NaiveDate> {
        let first = self.primer_dia();
        first.iter_days().take(self.num_dias() as usize)
    }

    pub fn contiene(self, fecha: NaiveDate) -> bool {
        fecha.year() == self.year() && fecha.month() == self.month()
    }

    /// True when this month starts after the month containing `hoy`.
    pub fn es_futuro(self, hoy: NaiveDate) -> bool {
        self > Self::de_fecha(hoy)
    }

    /// Grid offset of the first day with Monday as column 0.
    pub fn desfase_lunes(self) -> u32 {
        self.primer_dia().weekday().num_days_from_monday()
    }
}

impl fmt::Display for Mes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for Mes {
    type Err = MesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s.trim().split_once('-').ok_or_else(|| MesError(s.to_string()))?;
        let year: i32 = y.parse().map_err(|_| MesError(s.to_string()))?;
        let month: u32 = m.parse().map_err(|_| MesError(s.to_string()))?;
        Mes::new(year, month).ok_or_else(|| MesError(s.to_string()))
    }
}

impl Serialize for Mes {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Mes {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

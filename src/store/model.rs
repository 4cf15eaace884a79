//! Typed rows returned by the store repositories.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::model::User;

/// Token and user restored on start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SesionGuardada {
    pub token: String,
    pub user: User,
}

/// A proposed sale edit kept until its review resolves.
#[derive(Debug, Clone, PartialEq)]
pub struct Borrador {
    pub venta_id: String,
    pub payload: Map<String, Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

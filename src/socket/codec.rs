//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! A WebSocket text frame is one Engine.IO packet: a single type digit
//! followed by its payload. Engine.IO `message` packets (`4`) carry a
//! Socket.IO packet whose own type digit comes next, e.g. `42["EVENT",{}]`.
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("empty frame")]
    Empty,
    #[error("unknown engine.io packet type: {0}")]
    EngineType(char),
    #[error("unknown socket.io packet type: {0}")]
    SocketType(char),
    #[error("event packet without a name")]
    EventSinNombre,
    #[error("malformed json in frame: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event { nombre: String, datos: Value },
    ConnectError(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Upgrade,
    Noop,
}

impl Packet {
    pub fn decode(frame: &str) -> Result<Self, CodecError> {
        let mut chars = frame.chars();
        let tipo = chars.next().ok_or(CodecError::Empty)?;
        let resto = chars.as_str();
        match tipo {
            '0' => Ok(Packet::Open(serde_json::from_str(resto)?)),
            '1' => Ok(Packet::Close),
            '2' => Ok(Packet::Ping),
            '3' => Ok(Packet::Pong),
            '4' => Ok(Packet::Message(decode_socket(resto)?)),
            '5' => Ok(Packet::Upgrade),
            '6' => Ok(Packet::Noop),
            otro => Err(CodecError::EngineType(otro)),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Packet::Open(_) => "0".to_string(),
            Packet::Close => "1".to_string(),
            Packet::Ping => "2".to_string(),
            Packet::Pong => "3".to_string(),
            Packet::Message(p) => format!("4{}", encode_socket(p)),
            Packet::Upgrade => "5".to_string(),
            Packet::Noop => "6".to_string(),
        }
    }
}

/// Strip an optional `/namespace,` prefix and ack id, leaving the JSON body.
fn quitar_prefijo(resto: &str) -> &str {
    let sin_ns = match resto.strip_prefix('/') {
        Some(ns) => ns.split_once(',').map(|(_, r)| r).unwrap_or(""),
        None => resto,
    };
    sin_ns.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn decode_socket(resto: &str) -> Result<SocketPacket, CodecError> {
    let mut chars = resto.chars();
    let tipo = chars.next().ok_or(CodecError::Empty)?;
    let cuerpo = quitar_prefijo(chars.as_str());
    match tipo {
        '0' if cuerpo.is_empty() => Ok(SocketPacket::Connect(None)),
        '0' => Ok(SocketPacket::Connect(Some(serde_json::from_str(cuerpo)?))),
        '1' => Ok(SocketPacket::Disconnect),
        '2' => {
            let mut args: Vec<Value> = serde_json::from_str(cuerpo)?;
            if args.is_empty() {
                return Err(CodecError::EventSinNombre);
            }
            let nombre = match args.remove(0) {
                Value::String(s) => s,
                _ => return Err(CodecError::EventSinNombre),
            };
            let datos = if args.is_empty() {
                Value::Null
            } else {
                args.remove(0)
            };
            Ok(SocketPacket::Event { nombre, datos })
        }
        '4' if cuerpo.is_empty() => Ok(SocketPacket::ConnectError(Value::Null)),
        '4' => Ok(SocketPacket::ConnectError(serde_json::from_str(cuerpo)?)),
        otro => Err(CodecError::SocketType(otro)),
    }
}

fn encode_socket(packet: &SocketPacket) -> String {
    match packet {
        SocketPacket::Connect(None) => "0".to_string(),
        SocketPacket::Connect(Some(auth)) => format!("0{auth}"),
        SocketPacket::Disconnect => "1".to_string(),
        SocketPacket::Event { nombre, datos } => {
            format!("2{}", Value::Array(vec![Value::String(nombre.clone()), datos.clone()]))
        }
        SocketPacket::ConnectError(v) => format!("4{v}"),
    }
}

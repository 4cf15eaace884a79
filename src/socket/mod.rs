pub mod client;
pub mod codec;

pub use client::{socket_url, suscribir, SocketConfig, Suscripcion};
pub use codec::{CodecError, Packet, SocketPacket};

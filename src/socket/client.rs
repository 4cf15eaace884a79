//! Socket.IO subscription over a plain WebSocket.
//!
//! One background task per subscription: it connects, authenticates with
//! `{userId, token}`, answers Engine.IO pings and forwards typed events over
//! an mpsc channel. Dropping the [`Suscripcion`] closes the channel and the
//! task exits at its next wake-up.
use anyhow::{anyhow, Context, Result};
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, instrument, warn};

use super::codec::{Packet, SocketPacket};
use crate::events::SocketEvent;

const INITIAL_RECONNECT_DELAY_SECS: u64 = 1;
const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct SocketConfig {
    pub url: Url,
    pub user_id: String,
    pub token: String,
    pub max_backoff: Duration,
}

/// `http(s)://host` becomes `ws(s)://host/socket.io/?EIO=4&transport=websocket`.
pub fn socket_url(base: &str) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("invalid socket url: {base}"))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        otro => return Err(anyhow!("unsupported socket scheme: {otro}")),
    };
    url.set_scheme(scheme)
        .map_err(|_| anyhow!("cannot switch {base} to {scheme}"))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

/// Live subscription. Receives events until dropped.
pub struct Suscripcion {
    rx: mpsc::Receiver<SocketEvent>,
    handle: JoinHandle<()>,
}

impl Suscripcion {
    pub async fn recv(&mut self) -> Option<SocketEvent> {
        self.rx.recv().await
    }

}

impl Drop for Suscripcion {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn suscribir(cfg: SocketConfig) -> Suscripcion {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let handle = tokio::spawn(run(cfg, tx));
    Suscripcion { rx, handle }
}

enum FinSesion {
    /// The server or the network ended the session; reconnect.
    Cerrada,
    /// Nobody is listening any more.
    Cancelada,
}

async fn run(cfg: SocketConfig, tx: mpsc::Sender<SocketEvent>) {
    info!(url = %cfg.url, "socket worker started");
    let mut reconnect_delay = Duration::from_secs(INITIAL_RECONNECT_DELAY_SECS);

    loop {
        match sesion(&cfg, &tx).await {
            Ok(FinSesion::Cancelada) => break,
            Ok(FinSesion::Cerrada) => {
                reconnect_delay = Duration::from_secs(INITIAL_RECONNECT_DELAY_SECS);
            }
            Err(err) => {
                warn!(?err, delay_secs = reconnect_delay.as_secs(), "socket session failed");
            }
        }

        tokio::select! {
            _ = tx.closed() => break,
            _ = tokio::time::sleep(reconnect_delay) => {},
        }
        reconnect_delay = (reconnect_delay * 2).min(cfg.max_backoff);
    }

    info!("socket worker stopped");
}

#[instrument(skip_all, fields(url = %cfg.url))]
async fn sesion(cfg: &SocketConfig, tx: &mpsc::Sender<SocketEvent>) -> Result<FinSesion> {
    let (ws, _response) = tokio_tungstenite::connect_async(cfg.url.as_str())
        .await
        .context("websocket connect failed")?;
    let (mut sink, mut stream) = ws.split();

    // Until the handshake says otherwise, allow the protocol defaults.
    let mut silencio_max = Duration::from_millis(45_000);
    let mut ultimo = Instant::now();

    loop {
        tokio::select! {
            _ = tx.closed() => {
                let _ = sink.send(Message::Text(Packet::Message(SocketPacket::Disconnect).encode())).await;
                let _ = sink.close().await;
                return Ok(FinSesion::Cancelada);
            }

            _ = tokio::time::sleep_until(ultimo + silencio_max) => {
                warn!("no ping from server, reconnecting");
                return Ok(FinSesion::Cerrada);
            }

            msg = stream.next() => {
                ultimo = Instant::now();
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                        continue;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("websocket closed by server");
                        return Ok(FinSesion::Cerrada);
                    }
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(_)) => continue,
                };

                let packet = match Packet::decode(&text) {
                    Ok(p) => p,
                    Err(err) => {
                        warn!(?err, frame = %text, "dropping undecodable frame");
                        continue;
                    }
                };

                let evento = match packet {
                    Packet::Open(hs) => {
                        silencio_max = Duration::from_millis(hs.ping_interval + hs.ping_timeout);
                        debug!(sid = %hs.sid, "engine.io handshake");
                        let auth = json!({ "userId": cfg.user_id, "token": cfg.token });
                        sink.send(Message::Text(Packet::Message(SocketPacket::Connect(Some(auth))).encode()))
                            .await?;
                        continue;
                    }
                    Packet::Ping => {
                        sink.send(Message::Text(Packet::Pong.encode())).await?;
                        continue;
                    }
                    Packet::Close => return Ok(FinSesion::Cerrada),
                    Packet::Pong | Packet::Upgrade | Packet::Noop => continue,
                    Packet::Message(SocketPacket::Connect(_)) => SocketEvent::Conectado,
                    Packet::Message(SocketPacket::ConnectError(datos)) => {
                        SocketEvent::from_frame("connect_error", datos)
                    }
                    Packet::Message(SocketPacket::Disconnect) => {
                        SocketEvent::Desconectado("io server disconnect".into())
                    }
                    Packet::Message(SocketPacket::Event { nombre, datos }) => {
                        SocketEvent::from_frame(&nombre, datos)
                    }
                };

                let fin = matches!(
                    evento,
                    SocketEvent::ErrorConexion(_) | SocketEvent::Desconectado(_)
                );
                if tx.send(evento).await.is_err() {
                    return Ok(FinSesion::Cancelada);
                }
                if fin {
                    return Ok(FinSesion::Cerrada);
                }
            }
        }
    }
}

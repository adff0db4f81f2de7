//! WebSocket Peer Link
//!
//! The host listens on the port its room code maps to and only upgrades
//! requests for its own peer identifier. The guest dials that address.
//! Once linked, both sides run the same reader/writer task pair and see the
//! peer as a channel of [`LinkEvent`]s.

use std::io;
use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async, connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::PeerConfig;
use crate::core::rng::DeterministicRng;
use crate::network::protocol::PeerMessage;
use crate::network::room::RoomCode;

/// Outbound frames buffered before sends are dropped.
const OUTBOUND_CAPACITY: usize = 64;

/// Peer link errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind or accept.
    #[error("Failed to bind: {0}")]
    Bind(#[from] io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Guest could not reach the room.
    #[error("Could not reach room {code}: {reason}")]
    Connect {
        /// Room dialled.
        code: String,
        /// Underlying failure.
        reason: String,
    },

    /// Every room code tried was taken.
    #[error("No free room code after {0} attempts")]
    RoomCodesExhausted(u32),

    /// Message could not be serialized.
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    /// Link already closed.
    #[error("Peer link closed")]
    LinkClosed,
}

/// What the link reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// Decoded message from the peer.
    Message(PeerMessage),
    /// Link ended.
    Closed(String),
}

// =============================================================================
// HOST
// =============================================================================

/// A bound room waiting for its guest.
#[derive(Debug)]
pub struct HostRoom {
    code: RoomCode,
    path: String,
    listener: TcpListener,
}

impl HostRoom {
    /// Bind a listener for a fresh room code, drawing a new code whenever
    /// the port is already taken.
    pub async fn open(config: &PeerConfig, rng: &mut DeterministicRng) -> Result<Self, TransportError> {
        for attempt in 1..=config.max_code_attempts {
            let code = RoomCode::random(rng);
            let port = match code.port(config.base_port) {
                Some(port) => port,
                None => {
                    debug!("Room code {} overflows base port {}", code, config.base_port);
                    continue;
                }
            };

            match TcpListener::bind((config.bind.as_str(), port)).await {
                Ok(listener) => {
                    info!("Room {} listening on {}:{}", code, config.bind, port);
                    return Ok(Self {
                        code,
                        path: code.path(&config.id_prefix),
                        listener,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                    debug!("Room code {} taken (attempt {})", code, attempt);
                }
                Err(e) => return Err(TransportError::Bind(e)),
            }
        }

        Err(TransportError::RoomCodesExhausted(config.max_code_attempts))
    }

    /// Room code guests should dial.
    pub fn code(&self) -> RoomCode {
        self.code
    }

    /// Bound address.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait for a guest that asks for this room. Requests for any other
    /// path are refused with 404 and the wait continues.
    pub async fn accept(&self) -> Result<WebSocketStream<TcpStream>, TransportError> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            let expected = self.path.clone();

            let check = move |req: &Request, response: Response| -> Result<Response, ErrorResponse> {
                if req.uri().path() == expected {
                    Ok(response)
                } else {
                    let mut rejection = ErrorResponse::new(Some("unknown room".to_string()));
                    *rejection.status_mut() = StatusCode::NOT_FOUND;
                    Err(rejection)
                }
            };

            match accept_hdr_async(stream, check).await {
                Ok(ws) => {
                    info!("Guest connected from {}", addr);
                    return Ok(ws);
                }
                Err(e) => warn!("Refused connection from {}: {}", addr, e),
            }
        }
    }
}

// =============================================================================
// GUEST
// =============================================================================

/// Dial the host of `code`.
pub async fn dial(
    config: &PeerConfig,
    code: RoomCode,
) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>, TransportError> {
    let port = code.port(config.base_port).ok_or_else(|| TransportError::Connect {
        code: code.to_string(),
        reason: format!("port out of range for base {}", config.base_port),
    })?;
    let url = format!("ws://{}:{}{}", config.host, port, code.path(&config.id_prefix));
    debug!("Dialling {}", url);

    match connect_async(url.as_str()).await {
        Ok((ws, _)) => {
            info!("Connected to room {}", code);
            Ok(ws)
        }
        Err(e) => Err(TransportError::Connect {
            code: code.to_string(),
            reason: e.to_string(),
        }),
    }
}

// =============================================================================
// LINK
// =============================================================================

/// An open link. Dropping it closes the connection.
#[derive(Debug)]
pub struct PeerLink {
    outbound: mpsc::Sender<Message>,
    reader: JoinHandle<()>,
}

impl PeerLink {
    /// Split the socket into a writer task fed by [`PeerLink::send`] and a
    /// reader task that forwards decoded messages to `events`.
    pub fn spawn<S>(ws: WebSocketStream<S>, events: mpsc::Sender<LinkEvent>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut ws_sender, mut ws_receiver) = ws.split();
        let (outbound, mut outbound_rx) = mpsc::channel::<Message>(OUTBOUND_CAPACITY);

        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                if ws_sender.send(msg).await.is_err() {
                    break;
                }
            }
            let _ = ws_sender.close().await;
        });

        let reader = tokio::spawn(async move {
            let reason = loop {
                match ws_receiver.next().await {
                    Some(Ok(Message::Text(text))) => match PeerMessage::from_json(&text) {
                        Ok(msg) => {
                            if events.send(LinkEvent::Message(msg)).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => debug!("Dropping malformed peer frame: {}", e),
                    },
                    Some(Ok(Message::Close(_))) | None => break "closed by peer".to_string(),
                    Some(Err(e)) => break e.to_string(),
                    Some(Ok(_)) => {}
                }
            };
            info!("Peer link closed: {}", reason);
            let _ = events.send(LinkEvent::Closed(reason)).await;
        });

        Self { outbound, reader }
    }

    /// Queue a message. Fire-and-forget: a full buffer drops the message.
    pub fn send(&self, msg: &PeerMessage) -> Result<(), TransportError> {
        let text = msg.to_json()?;
        match self.outbound.try_send(Message::Text(text)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!("Peer link backlogged, dropping {}", msg.kind());
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(TransportError::LinkClosed),
        }
    }
}

impl Drop for PeerLink {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

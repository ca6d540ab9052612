// Event channel transport
//
// `Connector` opens a `Session`; a `Session` yields server events until it
// ends. The driver only sees these two traits, so tests can script them.
// `WsConnector` is the real implementation over tokio-tungstenite.

use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::protocol::{self, Packet};
use super::tls;
use crate::error::Error;
use crate::token::SessionToken;
use crate::transport::TlsMode;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ── Seams ────────────────────────────────────────────────────────────

/// What a live session reports.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Event { name: String, payload: Value },
    /// The server ended the session.
    ServerDisconnect,
    /// The transport failed.
    Lost(String),
}

/// Opens sessions against the event server.
pub trait Connector: Send + Sync + 'static {
    type Session: Session;

    /// Open a session and complete the handshake. Not time-bounded; the
    /// caller applies the connect timeout.
    fn connect(&self) -> impl Future<Output = Result<Self::Session, Error>> + Send;
}

/// One established session.
pub trait Session: Send + 'static {
    /// Next server event. Never resolves to anything after
    /// `ServerDisconnect` or `Lost`.
    fn next_event(&mut self) -> impl Future<Output = SessionEvent> + Send;

    /// Close from the client side.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

// ── WebSocket connector ──────────────────────────────────────────────

/// Socket.IO endpoint for a server origin, e.g.
/// `http://localhost:5000` → `ws://localhost:5000/socket.io/?EIO=4&transport=websocket`.
pub fn socket_url(origin: &Url) -> Result<Url, Error> {
    let scheme = match origin.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(Error::WebSocketConnect(format!(
                "unsupported scheme for the event channel: {other}"
            )));
        }
    };
    let host = origin
        .host_str()
        .ok_or_else(|| Error::WebSocketConnect(format!("{origin} has no host")))?;

    let mut url = Url::parse(&format!("{scheme}://{host}"))?;
    url.set_port(origin.port())
        .map_err(|()| Error::WebSocketConnect(format!("cannot carry the port of {origin}")))?;
    url.set_path(protocol::SOCKET_PATH);
    url.set_query(Some(protocol::HANDSHAKE_QUERY));
    Ok(url)
}

/// Connects to a Socket.IO server over WebSocket (`ws` or `wss`).
#[derive(Clone)]
pub struct WsConnector {
    url: Url,
    /// `None` uses tokio-tungstenite's default TLS setup.
    tls: Option<tokio_tungstenite::Connector>,
    auth: SessionToken,
}

impl std::fmt::Debug for WsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConnector")
            .field("url", &self.url.as_str())
            .field("custom_tls", &self.tls.is_some())
            .finish_non_exhaustive()
    }
}

impl WsConnector {
    /// `origin` is the server origin; the socket path is derived from it.
    /// `auth` is read again on every connect.
    pub fn new(origin: &Url, tls: &TlsMode, auth: SessionToken) -> Result<Self, Error> {
        Ok(Self {
            url: socket_url(origin)?,
            tls: tls::client_config(tls)?.map(tokio_tungstenite::Connector::Rustls),
            auth,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Whether a TLS config other than the default is in use.
    pub fn has_custom_tls(&self) -> bool {
        self.tls.is_some()
    }

    async fn handshake(&self, stream: &mut WsStream) -> Result<(), Error> {
        let mut opened = false;
        loop {
            match read_packet(stream).await? {
                Packet::Open(_) if !opened => {
                    opened = true;
                    let token = self.auth.load_full();
                    let frame = protocol::connect_frame(
                        token.as_deref().map(ExposeSecret::expose_secret),
                    );
                    send_text(stream, frame).await?;
                }
                Packet::Connect(_) if opened => return Ok(()),
                Packet::ConnectError(data) => {
                    return Err(Error::WebSocketConnect(protocol::connect_error_message(
                        &data,
                    )));
                }
                Packet::Ping => send_text(stream, protocol::PONG.to_owned()).await?,
                Packet::Disconnect | Packet::EngineClose => {
                    return Err(Error::WebSocketConnect(
                        "server closed the session during the handshake".into(),
                    ));
                }
                other => tracing::trace!(?other, "ignoring packet during handshake"),
            }
        }
    }
}

impl Connector for WsConnector {
    type Session = WsSession;

    async fn connect(&self) -> Result<WsSession, Error> {
        tracing::debug!(url = %self.url, "opening event channel");

        let uri: tungstenite::http::Uri = self.url.as_str().parse().map_err(
            |e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()),
        )?;
        let (mut stream, _response) = tokio_tungstenite::connect_async_tls_with_config(
            ClientRequestBuilder::new(uri),
            None,
            false,
            self.tls.clone(),
        )
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        self.handshake(&mut stream).await?;
        tracing::debug!("event channel handshake complete");
        Ok(WsSession { stream })
    }
}

async fn send_text(stream: &mut WsStream, frame: String) -> Result<(), Error> {
    stream
        .send(Message::text(frame))
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))
}

/// Next decodable packet. Undecodable frames are skipped.
async fn read_packet(stream: &mut WsStream) -> Result<Packet, Error> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => match protocol::decode(&text) {
                Ok(packet) => return Ok(packet),
                Err(e) => tracing::debug!(error = %e, "skipping undecodable frame"),
            },
            Some(Ok(Message::Close(_))) | None => {
                return Err(Error::WebSocketConnect("connection closed".into()));
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
        }
    }
}

// ── WebSocket session ────────────────────────────────────────────────

pub struct WsSession {
    stream: WsStream,
}

impl Session for WsSession {
    async fn next_event(&mut self) -> SessionEvent {
        loop {
            let packet = match self.stream.next().await {
                Some(Ok(Message::Text(text))) => protocol::decode(&text),
                Some(Ok(Message::Close(frame))) => {
                    if let Some(cf) = frame {
                        tracing::info!(code = %cf.code, reason = %cf.reason, "close frame received");
                    }
                    return SessionEvent::ServerDisconnect;
                }
                // tungstenite answers transport-level pings itself
                Some(Ok(_)) => continue,
                Some(Err(e)) => return SessionEvent::Lost(e.to_string()),
                None => return SessionEvent::Lost("stream ended".into()),
            };

            match packet {
                Ok(Packet::Event { name, payload }) => return SessionEvent::Event { name, payload },
                Ok(Packet::Ping) => {
                    if let Err(e) = send_text(&mut self.stream, protocol::PONG.to_owned()).await {
                        return SessionEvent::Lost(e.to_string());
                    }
                }
                Ok(Packet::Disconnect | Packet::EngineClose) => {
                    return SessionEvent::ServerDisconnect;
                }
                Ok(other) => tracing::trace!(?other, "ignoring packet"),
                Err(e) => tracing::debug!(error = %e, "skipping undecodable frame"),
            }
        }
    }

    async fn close(&mut self) {
        // Best effort: the peer may already be gone.
        let _ = send_text(&mut self.stream, protocol::DISCONNECT.to_owned()).await;
        let _ = self.stream.close(None).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn socket_url_from_http_origin() {
        assert_eq!(
            socket_url(&url("http://localhost:5000")).unwrap().as_str(),
            "ws://localhost:5000/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn socket_url_drops_path_and_keeps_tls() {
        assert_eq!(
            socket_url(&url("https://pos.example.com/api")).unwrap().as_str(),
            "wss://pos.example.com/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn connector_follows_tls_mode() {
        let origin = url("https://pos.example.com");
        let default = WsConnector::new(&origin, &TlsMode::System, SessionToken::default());
        assert!(!default.unwrap().has_custom_tls());

        let insecure =
            WsConnector::new(&origin, &TlsMode::DangerAcceptInvalid, SessionToken::default());
        let insecure = insecure.unwrap();
        assert!(insecure.has_custom_tls());
        assert_eq!(insecure.url().scheme(), "wss");
    }

    #[test]
    fn unreadable_ca_fails_construction() {
        let mode = TlsMode::CustomCa("/nonexistent/poslink-ca.pem".into());
        let err = WsConnector::new(&url("https://pos.local"), &mode, SessionToken::default());
        assert!(matches!(err, Err(Error::Tls(_))));
    }

    #[test]
    fn socket_url_rejects_other_schemes() {
        assert!(matches!(
            socket_url(&url("ftp://example.com")),
            Err(Error::WebSocketConnect(_))
        ));
    }
}

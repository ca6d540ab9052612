// Engine.IO v4 / Socket.IO v5 text framing
//
// Only the subset a websocket-only client on the default namespace needs:
//
//   0{..}            engine open
//   1                engine close
//   2 / 3            ping / pong
//   40[{..}]         socket connect (client) / connect ack (server)
//   41               socket disconnect
//   42["name",data]  event, optionally `42/ns,17[...]`
//   44{..}           connect error

use serde_json::{Value, json};

use crate::error::Error;

/// Query appended to the socket path for a websocket-only session.
pub const HANDSHAKE_QUERY: &str = "EIO=4&transport=websocket";
pub const SOCKET_PATH: &str = "/socket.io/";

pub const PONG: &str = "3";
pub const DISCONNECT: &str = "41";

/// A decoded text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Value),
    EngineClose,
    Ping,
    Pong,
    Connect(Value),
    Disconnect,
    Event { name: String, payload: Value },
    ConnectError(Value),
    /// Upgrade, noop, acks and binary packets. Not used by this client.
    Ignored,
}

/// Client connect frame, carrying the session token as auth when present.
pub fn connect_frame(token: Option<&str>) -> String {
    match token {
        Some(token) => format!("40{}", json!({ "token": token })),
        None => "40".to_owned(),
    }
}

/// Decode one text frame.
pub fn decode(frame: &str) -> Result<Packet, Error> {
    let mut chars = frame.chars();
    let engine = chars
        .next()
        .ok_or_else(|| Error::Protocol("empty frame".into()))?;
    let rest = chars.as_str();

    match engine {
        '0' => Ok(Packet::Open(parse_data(rest)?)),
        '1' => Ok(Packet::EngineClose),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_socket(rest),
        '5' | '6' => Ok(Packet::Ignored),
        other => Err(Error::Protocol(format!("unknown engine packet type {other:?}"))),
    }
}

fn decode_socket(body: &str) -> Result<Packet, Error> {
    let mut chars = body.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::Protocol("empty socket packet".into()))?;
    let data = strip_header(chars.as_str());

    match kind {
        '0' => Ok(Packet::Connect(parse_data(data)?)),
        '1' => Ok(Packet::Disconnect),
        '2' => decode_event(data),
        '4' => Ok(Packet::ConnectError(parse_data(data)?)),
        '3' | '5' | '6' => Ok(Packet::Ignored),
        other => Err(Error::Protocol(format!("unknown socket packet type {other:?}"))),
    }
}

/// Skip the optional `/namespace,` prefix and ack id.
fn strip_header(data: &str) -> &str {
    let data = if data.starts_with('/') {
        data.find(',').map_or("", |i| &data[i + 1..])
    } else {
        data
    };
    data.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn decode_event(data: &str) -> Result<Packet, Error> {
    let args: Vec<Value> = serde_json::from_str(data)
        .map_err(|e| Error::Protocol(format!("malformed event arguments: {e}")))?;
    let mut args = args.into_iter();

    let name = match args.next() {
        Some(Value::String(name)) => name,
        _ => return Err(Error::Protocol("event without a name".into())),
    };
    Ok(Packet::Event {
        name,
        payload: args.next().unwrap_or(Value::Null),
    })
}

fn parse_data(data: &str) -> Result<Value, Error> {
    if data.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(data).map_err(|e| Error::Protocol(format!("malformed packet data: {e}")))
}

/// Human-readable reason from a connect-error payload.
pub fn connect_error_message(data: &Value) -> String {
    data.get("message")
        .and_then(Value::as_str)
        .map_or_else(|| data.to_string(), str::to_owned)
}

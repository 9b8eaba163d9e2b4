//! Server link over WebSocket
//!
//! One connection to `ws://<host><path>`, opened at startup. The handshake
//! and the liveness probe are blocking; after that the socket is switched to
//! non-blocking and drained from the event loop with [`NetLink::poll`].
//! Message contents are not interpreted. A closed link stays closed.

use std::io::ErrorKind;
use std::net::TcpStream;

use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::config::NetworkConfig;

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("websocket handshake with {url} failed: {source}")]
    Handshake {
        url: String,
        #[source]
        source: tungstenite::Error,
    },

    #[error("failed to send probe to {url}: {source}")]
    Probe {
        url: String,
        #[source]
        source: tungstenite::Error,
    },

    #[error("failed to configure socket: {0}")]
    Socket(#[from] std::io::Error),
}

/// Something that arrived on the link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetEvent {
    Text(String),
    Binary(Vec<u8>),
    Closed,
}

/// `ws://` URL for a `host[:port]` and path
pub fn handshake_url(host: &str, path: &str) -> String {
    let host = host.trim_end_matches('/');
    if path.starts_with('/') {
        format!("ws://{}{}", host, path)
    } else {
        format!("ws://{}/{}", host, path)
    }
}

pub struct NetLink {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
    url: String,
    closed: bool,
}

impl NetLink {
    /// Connect, send `probe` as a text message, then go non-blocking
    pub fn connect(host: &str, path: &str, probe: &str) -> Result<Self, NetError> {
        let url = handshake_url(host, path);
        let (mut socket, response) =
            tungstenite::connect(url.as_str()).map_err(|source| NetError::Handshake {
                url: url.clone(),
                source,
            })?;
        tracing::info!("connected to {} ({})", url, response.status());

        socket
            .send(Message::text(probe))
            .map_err(|source| NetError::Probe {
                url: url.clone(),
                source,
            })?;

        match socket.get_mut() {
            MaybeTlsStream::Plain(stream) => stream.set_nonblocking(true)?,
            _ => tracing::debug!("non-plain stream left blocking"),
        }

        Ok(Self {
            socket,
            url,
            closed: false,
        })
    }

    /// Connect as configured. Returns `None` when no host is set or the
    /// connection fails; failures are logged and the session stays offline.
    pub fn open(config: &NetworkConfig) -> Option<Self> {
        let host = config.host.as_deref()?;
        match Self::connect(host, &config.path, &config.probe) {
            Ok(link) => Some(link),
            Err(e) => {
                tracing::warn!("{}; continuing offline", e);
                None
            }
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drain everything that has arrived without blocking
    pub fn poll(&mut self) -> Vec<NetEvent> {
        let mut events = Vec::new();
        if self.closed {
            // let a queued close reply go out
            let _ = self.socket.flush();
            return events;
        }

        loop {
            match self.socket.read() {
                Ok(Message::Text(text)) => {
                    tracing::info!("[net] {}", text.as_str());
                    events.push(NetEvent::Text(text.as_str().to_owned()));
                }
                Ok(Message::Binary(bytes)) => {
                    tracing::info!("[net] {} byte binary message", bytes.len());
                    events.push(NetEvent::Binary(bytes.to_vec()));
                }
                Ok(Message::Close(frame)) => {
                    tracing::info!("connection to {} closed by server: {:?}", self.url, frame);
                    self.mark_closed(&mut events);
                    // keep reading so the close reply is flushed
                }
                Ok(_) => {}
                Err(tungstenite::Error::Io(e)) if e.kind() == ErrorKind::WouldBlock => break,
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    self.mark_closed(&mut events);
                    break;
                }
                Err(e) => {
                    tracing::warn!("connection to {} failed: {}", self.url, e);
                    self.mark_closed(&mut events);
                    break;
                }
            }
        }
        events
    }

    fn mark_closed(&mut self, events: &mut Vec<NetEvent>) {
        if !self.closed {
            self.closed = true;
            events.push(NetEvent::Closed);
        }
    }
}

//! Parsing of advertised node endpoints.

use std::{fmt, str::FromStr};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum EndpointError {
    #[error("endpoint must start with WS2P")]
    NotWs2p,
    #[error("endpoint is missing its {0}")]
    Missing(&'static str),
    #[error("invalid port {0:?}")]
    InvalidPort(String),
    #[error("unexpected trailing data {0:?}")]
    Trailing(String),
}

/// A `WS2P <uuid> <host> <port> [path]` endpoint, as nodes advertise them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub uuid: String,
    pub host: String,
    pub port: u16,
    pub path: Option<String>,
}

impl Endpoint {
    /// The WebSocket URL of the endpoint. Port 443 is assumed to be behind TLS.
    pub fn url(&self) -> String {
        let scheme = if self.port == 443 { "wss" } else { "ws" };
        let path = self.path.as_deref().unwrap_or("").trim_start_matches('/');
        format!("{scheme}://{}:{}/{path}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();

        if parts.next() != Some("WS2P") {
            return Err(EndpointError::NotWs2p);
        }

        let uuid = parts.next().ok_or(EndpointError::Missing("uuid"))?;
        let host = parts.next().ok_or(EndpointError::Missing("host"))?;
        let port = parts.next().ok_or(EndpointError::Missing("port"))?;
        let port = port
            .parse()
            .map_err(|_| EndpointError::InvalidPort(port.to_owned()))?;
        let path = parts.next().map(str::to_owned);

        if let Some(rest) = parts.next() {
            return Err(EndpointError::Trailing(rest.to_owned()));
        }

        Ok(Self {
            uuid: uuid.to_owned(),
            host: host.to_owned(),
            port,
            path,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WS2P {} {} {}", self.uuid, self.host, self.port)?;
        if let Some(path) = &self.path {
            write!(f, " {path}")?;
        }
        Ok(())
    }
}

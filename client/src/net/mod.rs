//! WebSocket transport to a node.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info};
use ws2p::{Error, Transport};

pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

/// Open a WebSocket connection to `url`.
pub async fn websocket_connect(url: &str) -> anyhow::Result<WebSocketTransport> {
    let (stream, response) = connect_async(url).await?;
    info!(url, status = %response.status(), "connected to node");

    Ok(WebSocketTransport { stream })
}

impl WebSocketTransport {
    pub async fn done(mut self) -> anyhow::Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

fn map_error(e: WsError) -> Error {
    match e {
        WsError::ConnectionClosed | WsError::AlreadyClosed => Error::TransportClosed,
        e => Error::Transport(e.to_string()),
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, frame: String) -> ws2p::Result<()> {
        self.stream.send(Message::Text(frame)).await.map_err(map_error)
    }

    async fn receive(&mut self) -> ws2p::Result<String> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Close(_))) | None => return Err(Error::TransportClosed),
                // pings are answered by tungstenite itself
                Some(Ok(msg)) => debug!(len = msg.len(), "skipping non-text frame"),
                Some(Err(e)) => return Err(map_error(e)),
            }
        }
    }
}

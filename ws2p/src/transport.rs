//! Transport layer for exchanging text frames with a peer.

use async_trait::async_trait;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::error::{Error, Result};

/// A bidirectional channel of text frames. Framing, keep-alive and reconnection are up to the
/// implementation.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, frame: String) -> Result<()>;

    /// Wait for the next text frame. Returns [`Error::TransportClosed`] once the peer is gone.
    async fn receive(&mut self) -> Result<String>;
}

/// One end of an in-process connection, see [`channel_pair`].
#[derive(Debug)]
pub struct ChannelTransport {
    sender: UnboundedSender<String>,
    receiver: UnboundedReceiver<String>,
}

/// Two transports connected to each other.
pub fn channel_pair() -> (ChannelTransport, ChannelTransport) {
    let (a_send, b_recv) = unbounded_channel();
    let (b_send, a_recv) = unbounded_channel();

    (
        ChannelTransport {
            sender: a_send,
            receiver: a_recv,
        },
        ChannelTransport {
            sender: b_send,
            receiver: b_recv,
        },
    )
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&mut self, frame: String) -> Result<()> {
        self.sender.send(frame).map_err(|_| Error::TransportClosed)
    }

    async fn receive(&mut self) -> Result<String> {
        self.receiver.recv().await.ok_or(Error::TransportClosed)
    }
}

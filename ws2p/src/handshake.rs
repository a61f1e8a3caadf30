//! The CONNECT / ACK / OK authentication state machine.
//!
//! The engine does no I/O. [`HandshakeEngine::start`] returns the CONNECT frame to send, then
//! every inbound frame is fed to [`HandshakeEngine::on_frame`], which answers with the next frame
//! to send, tells the caller to keep waiting, or reports that the peer is authenticated.
//!
//! Each side ACKs the challenge of the peer's CONNECT and confirms its own challenge with an OK, so
//! an inbound ACK must carry the local challenge and an inbound OK the peer's.
//!
//! ```text
//! Init --send CONNECT--> ConnectSent --recv CONNECT, send ACK--> ConnectReceived
//!      --recv ACK, send OK--> AckExchanged --recv OK--> Established
//! ```
//!
//! Any verification or schema failure moves the engine to `Failed`, where it stays.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    constants::DEFAULT_UNRECOGNIZED_FRAME_LIMIT,
    document::{self, AuthDocument, DocumentKind, SignedDocument},
    error::{Error, Result},
    keys::{Signer, Verifier},
    schemas,
    types::{Challenge, Randomness},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Init,
    ConnectSent,
    ConnectReceived,
    AckExchanged,
    Established,
    Failed,
}

impl HandshakeState {
    /// The document the engine waits for in this state.
    fn awaited(self) -> Option<DocumentKind> {
        match self {
            HandshakeState::ConnectSent => Some(DocumentKind::Connect),
            HandshakeState::ConnectReceived => Some(DocumentKind::Ack),
            HandshakeState::AckExchanged => Some(DocumentKind::Ok),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// The network both peers must be on.
    pub currency: String,
    /// Consecutive unrecognized frames tolerated while waiting for the peer's CONNECT before giving
    /// up with [`Error::HandshakeTimeout`]. `None` tolerates any number.
    pub unrecognized_frame_limit: Option<u32>,
}

impl HandshakeConfig {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            unrecognized_frame_limit: Some(DEFAULT_UNRECOGNIZED_FRAME_LIMIT),
        }
    }
}

/// What to do after an inbound frame has been processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Send this frame, then wait for the next one.
    Reply(String),
    /// The frame was not a handshake message, keep waiting.
    Ignored,
    Established,
}

pub struct HandshakeEngine {
    config: HandshakeConfig,
    signer: Arc<dyn Signer>,
    verifier: Arc<dyn Verifier>,
    state: HandshakeState,
    local_connect: Option<SignedDocument>,
    peer_connect: Option<AuthDocument>,
    unrecognized: u32,
}

impl HandshakeEngine {
    pub fn new(
        config: HandshakeConfig,
        signer: Arc<dyn Signer>,
        verifier: Arc<dyn Verifier>,
    ) -> Self {
        Self {
            config,
            signer,
            verifier,
            state: HandshakeState::Init,
            local_connect: None,
            peer_connect: None,
            unrecognized: 0,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn is_established(&self) -> bool {
        self.state == HandshakeState::Established
    }

    pub fn local_challenge(&self) -> Option<&Challenge> {
        self.local_connect.as_ref().map(|c| c.document.challenge())
    }

    /// The peer's verified CONNECT, once received.
    pub fn peer(&self) -> Option<&AuthDocument> {
        self.peer_connect.as_ref()
    }

    /// Build the local CONNECT document and return the frame to send.
    pub fn start(&mut self, rng: &mut dyn Randomness) -> Result<String> {
        if self.state != HandshakeState::Init {
            return Err(Error::InvalidState("handshake already started"));
        }

        let connect = document::build_connect(&self.config.currency, self.signer.as_ref(), rng)?;
        let frame = connect.json.clone();
        debug!(challenge = %connect.document.challenge(), "sending CONNECT");

        self.local_connect = Some(connect);
        self.state = HandshakeState::ConnectSent;
        Ok(frame)
    }

    /// Process one inbound frame. At most one state transition happens per frame.
    pub fn on_frame(&mut self, raw: &str) -> Result<Step> {
        let Some(awaited) = self.state.awaited() else {
            return Err(Error::InvalidState("handshake is not in progress"));
        };

        let Some(kind) = classify(raw) else {
            return self.unrecognized_frame();
        };
        self.unrecognized = 0;

        if kind != awaited {
            return self.fail(Error::UnexpectedDocument {
                expected: awaited,
                received: kind,
            });
        }

        match self.accept(kind, raw) {
            Ok(step) => Ok(step),
            Err(e) => self.fail(e),
        }
    }

    fn accept(&mut self, kind: DocumentKind, raw: &str) -> Result<Step> {
        let currency = self.config.currency.as_str();

        match kind {
            DocumentKind::Connect => {
                let verifier = self.verifier.as_ref();
                let peer = document::parse_and_verify(kind, raw, currency, None, verifier)?;
                debug!(
                    peer = peer.pubkey(),
                    challenge = %peer.challenge(),
                    "received CONNECT, sending ACK"
                );

                let ack = document::build_ack(currency, peer.challenge(), self.signer.as_ref());
                self.peer_connect = Some(peer);
                self.state = HandshakeState::ConnectReceived;
                Ok(Step::Reply(ack.json))
            }
            DocumentKind::Ack => {
                self.verify_from_peer(kind, raw)?;
                debug!("received ACK, sending OK");

                let Some(local) = self.local_connect.as_ref() else {
                    return Err(Error::InvalidState("local CONNECT not sent"));
                };
                let own = local.document.challenge();
                let ok = document::build_ok(currency, own, self.signer.as_ref());
                self.state = HandshakeState::AckExchanged;
                Ok(Step::Reply(ok.json))
            }
            DocumentKind::Ok => {
                let peer = self.verify_from_peer(kind, raw)?;
                debug!(peer = peer.pubkey(), "received OK, peer authenticated");

                self.state = HandshakeState::Established;
                Ok(Step::Established)
            }
        }
    }

    /// Verify an ACK or OK signed by the key of the peer's CONNECT. An ACK must be over our
    /// challenge, an OK over the peer's own. Returns the peer's CONNECT.
    fn verify_from_peer(&self, kind: DocumentKind, raw: &str) -> Result<&AuthDocument> {
        let (Some(local), Some(peer)) = (&self.local_connect, &self.peer_connect) else {
            return Err(Error::InvalidState("peer CONNECT not received"));
        };

        let expected = match kind {
            DocumentKind::Ok => peer.challenge(),
            _ => local.document.challenge(),
        };
        let document = document::parse_and_verify(
            kind,
            raw,
            &self.config.currency,
            Some(expected),
            self.verifier.as_ref(),
        )?;

        if document.pubkey() != peer.pubkey() {
            return Err(Error::PublicKeyMismatch {
                expected: peer.pubkey().to_owned(),
                received: document.pubkey().to_owned(),
            });
        }

        Ok(peer)
    }

    fn unrecognized_frame(&mut self) -> Result<Step> {
        if self.state != HandshakeState::ConnectSent {
            debug!(state = ?self.state, "ignoring non-handshake frame");
            return Ok(Step::Ignored);
        }

        self.unrecognized += 1;
        match self.config.unrecognized_frame_limit {
            Some(limit) if self.unrecognized >= limit => self.fail(Error::HandshakeTimeout),
            _ => {
                debug!(
                    count = self.unrecognized,
                    "ignoring non-handshake frame while waiting for CONNECT"
                );
                Ok(Step::Ignored)
            }
        }
    }

    fn fail(&mut self, error: Error) -> Result<Step> {
        warn!(state = ?self.state, %error, "handshake failed");
        self.state = HandshakeState::Failed;
        Err(error)
    }
}

/// Find the first document kind, in CONNECT, ACK, OK order, whose schema the frame satisfies.
pub fn classify(raw: &str) -> Option<DocumentKind> {
    let value: Value = serde_json::from_str(raw).ok()?;
    DocumentKind::ALL
        .into_iter()
        .find(|kind| schemas::document(*kind).check(&value).is_ok())
}

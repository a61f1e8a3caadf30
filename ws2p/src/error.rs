use std::sync::Arc;

use crate::{document::DocumentKind, schema::SchemaError};

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while authenticating a peer or exchanging queries with it.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// The frame is not parseable JSON.
    #[error("malformed input: {0}")]
    MalformedInput(#[source] Arc<serde_json::Error>),

    /// The frame parses but violates the schema it was checked against.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(#[from] SchemaError),

    #[error("invalid {0} signature")]
    SignatureInvalid(DocumentKind),

    #[error("challenge mismatch: expected {expected}, received {received}")]
    ChallengeMismatch { expected: String, received: String },

    #[error("invalid request id {0:?}")]
    InvalidCorrelationId(String),

    /// The answer matches neither the expected success schema nor the error schema.
    #[error("unrecognized response: {0}")]
    UnrecognizedResponse(SchemaError),

    #[error("no valid handshake message received in time")]
    HandshakeTimeout,

    #[error("transport closed")]
    TransportClosed,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("currency mismatch: expected {expected}, received {received}")]
    CurrencyMismatch { expected: String, received: String },

    /// An ACK or OK was signed by a different key than the one announced in the peer's CONNECT.
    #[error("public key mismatch: expected {expected}, received {received}")]
    PublicKeyMismatch { expected: String, received: String },

    #[error("unexpected {received} message, expected {expected}")]
    UnexpectedDocument {
        expected: DocumentKind,
        received: DocumentKind,
    },

    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("invalid key: {0}")]
    Key(String),

    #[error("randomness unavailable: {0}")]
    Randomness(#[from] getrandom::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::MalformedInput(Arc::new(e))
    }
}

impl From<ed25519_dalek::SignatureError> for Error {
    fn from(e: ed25519_dalek::SignatureError) -> Self {
        Error::Key(e.to_string())
    }
}

impl Error {
    /// Whether the error ends the session, as opposed to failing a single query.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::TransportClosed
                | Error::Transport(_)
                | Error::HandshakeTimeout
                | Error::SignatureInvalid(_)
                | Error::ChallengeMismatch { .. }
                | Error::CurrencyMismatch { .. }
                | Error::PublicKeyMismatch { .. }
                | Error::UnexpectedDocument { .. }
        )
    }
}

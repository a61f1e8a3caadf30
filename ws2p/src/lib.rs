//! WS2P peer authentication and queries.
//!
//! Two peers prove ownership of their public keys with signed CONNECT, ACK and OK documents, then
//! exchange correlated queries whose answers are validated against strict schemas before being
//! decoded. [`SessionClient`] ties both phases together over any [`Transport`].

#![deny(unused_must_use, deprecated)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod constants;
pub mod document;
pub mod error;
pub mod handshake;
pub mod keys;
pub mod request;
pub mod response;
pub mod schema;
pub mod schemas;
pub mod session;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use handshake::{HandshakeConfig, HandshakeEngine, HandshakeState, Step};
pub use keys::{Ed25519Verifier, KeyManager, Signer, Verifier};
pub use request::Request;
pub use response::{Response, ResponseBody, ResponseKind};
pub use session::{SessionClient, SessionState};
pub use transport::Transport;
pub use types::{Challenge, Id, OsRandomness, Randomness, RequestId};

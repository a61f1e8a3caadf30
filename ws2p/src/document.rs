//! The three authentication documents exchanged during the handshake.
//!
//! A document is only ever built with its signature attached: [`build_connect`], [`build_ack`]
//! and [`build_ok`] sign the canonical payload before the value exists, and [`parse_and_verify`]
//! only returns documents whose signature checked out.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    constants::PAYLOAD_PREFIX,
    error::{Error, Result},
    keys::{Signer, Verifier},
    schema, schemas,
    types::{Challenge, Randomness},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentKind {
    Connect,
    Ack,
    Ok,
}

impl DocumentKind {
    /// Classification order for inbound frames.
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::Connect,
        DocumentKind::Ack,
        DocumentKind::Ok,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            DocumentKind::Connect => "CONNECT",
            DocumentKind::Ack => "ACK",
            DocumentKind::Ok => "OK",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A signed CONNECT, ACK or OK document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDocument {
    kind: DocumentKind,
    currency: String,
    pubkey: String,
    challenge: Challenge,
    signature: String,
}

/// A freshly signed local document together with its wire form.
#[derive(Debug, Clone)]
pub struct SignedDocument {
    pub document: AuthDocument,
    pub json: String,
}

#[derive(Serialize, Deserialize)]
struct WireDocument {
    auth: DocumentKind,
    currency: String,
    #[serde(rename = "pub")]
    pubkey: String,
    challenge: Challenge,
    sig: String,
}

/// The bytes that get signed: `WS2P:<KIND>:<currency>:<pubkey>:<challenge>\n`.
pub fn canonical_payload(
    kind: DocumentKind,
    currency: &str,
    pubkey: &str,
    challenge: &str,
) -> Vec<u8> {
    format!("{PAYLOAD_PREFIX}:{kind}:{currency}:{pubkey}:{challenge}\n").into_bytes()
}

impl AuthDocument {
    fn signed(
        kind: DocumentKind,
        currency: &str,
        challenge: Challenge,
        signer: &dyn Signer,
    ) -> Self {
        let pubkey = signer.public_key();
        let signature = signer.sign(&canonical_payload(kind, currency, &pubkey, &challenge));

        Self {
            kind,
            currency: currency.to_owned(),
            pubkey,
            challenge,
            signature,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn pubkey(&self) -> &str {
        &self.pubkey
    }

    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn canonical_payload(&self) -> Vec<u8> {
        canonical_payload(self.kind, &self.currency, &self.pubkey, &self.challenge)
    }

    pub fn to_json(&self) -> String {
        let wire = WireDocument {
            auth: self.kind,
            currency: self.currency.clone(),
            pubkey: self.pubkey.clone(),
            challenge: self.challenge.clone(),
            sig: self.signature.clone(),
        };

        // a struct of strings always serializes
        serde_json::to_string(&wire).unwrap_or_default()
    }

    fn into_signed(self) -> SignedDocument {
        let json = self.to_json();
        SignedDocument {
            document: self,
            json,
        }
    }
}

/// Build a CONNECT document over a freshly drawn challenge.
pub fn build_connect(
    currency: &str,
    signer: &dyn Signer,
    rng: &mut dyn Randomness,
) -> Result<SignedDocument> {
    let challenge = Challenge::generate(rng)?;
    Ok(AuthDocument::signed(DocumentKind::Connect, currency, challenge, signer).into_signed())
}

/// Build an ACK acknowledging the challenge of the peer's CONNECT.
pub fn build_ack(
    currency: &str,
    peer_challenge: &Challenge,
    signer: &dyn Signer,
) -> SignedDocument {
    AuthDocument::signed(DocumentKind::Ack, currency, peer_challenge.clone(), signer).into_signed()
}

/// Build an OK confirming the challenge of the local CONNECT, once the peer has acknowledged it.
pub fn build_ok(currency: &str, own_challenge: &Challenge, signer: &dyn Signer) -> SignedDocument {
    AuthDocument::signed(DocumentKind::Ok, currency, own_challenge.clone(), signer).into_signed()
}

/// Validate `raw` as a document of `kind`, check its currency and challenge, then verify its
/// signature.
pub fn parse_and_verify(
    kind: DocumentKind,
    raw: &str,
    currency: &str,
    expected_challenge: Option<&Challenge>,
    verifier: &dyn Verifier,
) -> Result<AuthDocument> {
    let value = schema::validate(raw, &schemas::document(kind))?;
    let wire: WireDocument = serde_json::from_value(value)?;

    if wire.currency != currency {
        return Err(Error::CurrencyMismatch {
            expected: currency.to_owned(),
            received: wire.currency,
        });
    }

    if let Some(expected) = expected_challenge {
        if *expected != wire.challenge {
            return Err(Error::ChallengeMismatch {
                expected: expected.to_string(),
                received: wire.challenge.to_string(),
            });
        }
    }

    let document = AuthDocument {
        kind,
        currency: wire.currency,
        pubkey: wire.pubkey,
        challenge: wire.challenge,
        signature: wire.sig,
    };

    if !verifier.verify(&document.canonical_payload(), &document.signature, &document.pubkey) {
        return Err(Error::SignatureInvalid(kind));
    }

    Ok(document)
}

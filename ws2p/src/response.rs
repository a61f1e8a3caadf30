//! Incoming answers and their typed bodies.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::{
    error::{Error, Result},
    schema::{self, Schema, SchemaError},
    schemas,
    types::RequestId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Block,
    Blocks,
    Requirements,
}

impl ResponseKind {
    fn schema(self) -> Schema {
        match self {
            ResponseKind::Block => schemas::block_response(),
            ResponseKind::Blocks => schemas::blocks_response(),
            ResponseKind::Requirements => schemas::requirements_response(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub version: u32,
    pub nonce: u64,
    pub number: u64,
    pub pow_min: u32,
    pub time: u64,
    pub median_time: u64,
    pub members_count: u64,
    pub monetary_mass: u64,
    pub unitbase: u32,
    pub issuers_count: u32,
    pub issuers_frame: u32,
    pub issuers_frame_var: i32,
    pub currency: String,
    pub issuer: String,
    pub signature: String,
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_issuer: Option<String>,
    #[serde(rename = "inner_hash")]
    pub inner_hash: String,
    pub dividend: Option<u64>,
    pub identities: Vec<String>,
    pub joiners: Vec<String>,
    pub actives: Vec<String>,
    pub leavers: Vec<String>,
    pub revoked: Vec<String>,
    pub excluded: Vec<String>,
    pub certifications: Vec<String>,
    pub transactions: Vec<Map<String, Value>>,
    /// Fields this crate does not interpret.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Requirements {
    pub identities: Vec<IdentityRequirements>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRequirements {
    pub certifications: Vec<Certification>,
    pub expired: bool,
    pub is_sentry: bool,
    pub membership_expires_in: Number,
    pub membership_pending_expires_in: Number,
    pub meta: IdentityMeta,
    pub outdistanced: bool,
    pub pending_certs: Vec<PendingCert>,
    pub pending_memberships: Vec<PendingMembership>,
    pub pubkey: String,
    #[serde(rename = "revocation_sig")]
    pub revocation_sig: Option<String>,
    pub revoked: bool,
    pub sig: String,
    pub uid: String,
    pub was_member: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    pub from: String,
    pub to: String,
    pub expires_in: Number,
    pub timestamp: Number,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IdentityMeta {
    pub timestamp: String,
}

/// A certification waiting in the sandbox. Its `expired`, `linked`, `written` and `written_*`
/// fields are pinned by the schema and kept verbatim in `other`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PendingCert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockstamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<Number>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// A membership document waiting in the sandbox.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PendingMembership {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership: Option<Membership>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockstamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "expires_on")]
    pub expires_on: Option<Number>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Block(Box<Block>),
    Blocks(Vec<Block>),
    Requirements(Requirements),
}

/// An answer to a query: either the requested data or the peer's error message.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success {
        res_id: RequestId,
        body: ResponseBody,
    },
    Error { res_id: RequestId, message: String },
}

impl Response {
    pub fn res_id(&self) -> &RequestId {
        match self {
            Response::Success { res_id, .. } | Response::Error { res_id, .. } => res_id,
        }
    }
}

/// Outcome of checking a parsed answer against the success schema, then the error schema.
#[derive(Debug)]
pub enum Classified {
    Success(Value),
    Error(Value),
    /// Matches neither; carries the violation reported by the success schema.
    Unrecognized(SchemaError),
}

/// Classify a parsed answer. A value satisfying both schemas counts as a success.
pub fn classify(value: &Value, expected: ResponseKind) -> Classified {
    match expected.schema().check(value) {
        Ok(()) => Classified::Success(value.clone()),
        Err(success_err) => match schemas::error_response().check(value) {
            Ok(()) => Classified::Error(value.clone()),
            Err(_) => Classified::Unrecognized(success_err),
        },
    }
}

#[derive(Deserialize)]
struct SuccessEnvelope<T> {
    #[serde(rename = "resId")]
    res_id: RequestId,
    body: T,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(rename = "resId")]
    res_id: RequestId,
    err: String,
}

/// Parse one answer frame.
pub fn parse_response(raw: &str, expected: ResponseKind) -> Result<Response> {
    let value: Value = serde_json::from_str(raw)?;
    response_from_value(value, expected)
}

pub(crate) fn response_from_value(value: Value, expected: ResponseKind) -> Result<Response> {
    match classify(&value, expected) {
        Classified::Success(value) => {
            let (res_id, body) = match expected {
                ResponseKind::Block => {
                    let (id, block) = decode::<Block>(value)?;
                    (id, ResponseBody::Block(Box::new(block)))
                }
                ResponseKind::Blocks => {
                    let (id, blocks) = decode(value)?;
                    (id, ResponseBody::Blocks(blocks))
                }
                ResponseKind::Requirements => {
                    let (id, requirements) = decode(value)?;
                    (id, ResponseBody::Requirements(requirements))
                }
            };
            Ok(Response::Success { res_id, body })
        }
        Classified::Error(value) => {
            let envelope: ErrorEnvelope = serde_json::from_value(value)?;
            Ok(Response::Error {
                res_id: envelope.res_id,
                message: envelope.err,
            })
        }
        Classified::Unrecognized(err) => Err(Error::UnrecognizedResponse(err)),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<(RequestId, T)> {
    let envelope: SuccessEnvelope<T> = serde_json::from_value(value).map_err(|e| {
        Error::SchemaMismatch(SchemaError {
            path: "$.body".to_owned(),
            message: e.to_string(),
        })
    })?;
    Ok((envelope.res_id, envelope.body))
}

/// Validate `raw` against the success schema of `expected`, without decoding it.
pub fn validate_success(raw: &str, expected: ResponseKind) -> Result<Value> {
    schema::validate(raw, &expected.schema())
}

//! Outgoing queries.

use serde::Serialize;

use crate::{
    error::Result,
    response::ResponseKind,
    types::{Randomness, RequestId},
};

/// A query a peer can answer, serialized as `{"name": ..., "params": {...}}`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "name", content = "params", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    /// The current head block.
    Current {},
    BlockByNumber {
        number: u64,
    },
    /// `count` consecutive blocks starting at `from_number`.
    BlocksChunk {
        #[serde(rename = "fromNumber")]
        from_number: u64,
        count: u64,
    },
    /// Identity requirements of pending identities having at least `min_cert` certifications.
    WotRequirementsOfPending {
        #[serde(rename = "minCert")]
        min_cert: u64,
    },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Current {} => "CURRENT",
            Request::BlockByNumber { .. } => "BLOCK_BY_NUMBER",
            Request::BlocksChunk { .. } => "BLOCKS_CHUNK",
            Request::WotRequirementsOfPending { .. } => "WOT_REQUIREMENTS_OF_PENDING",
        }
    }

    /// The kind of body a successful answer carries.
    pub fn expected_kind(&self) -> ResponseKind {
        match self {
            Request::Current {} | Request::BlockByNumber { .. } => ResponseKind::Block,
            Request::BlocksChunk { .. } => ResponseKind::Blocks,
            Request::WotRequirementsOfPending { .. } => ResponseKind::Requirements,
        }
    }
}

#[derive(Serialize)]
struct RequestEnvelope<'a> {
    #[serde(rename = "reqId")]
    req_id: &'a RequestId,
    body: &'a Request,
}

/// Serialize `request` under a request id, drawing a fresh one unless the caller supplies it.
pub fn build_request(
    request: &Request,
    request_id: Option<&str>,
    rng: &mut dyn Randomness,
) -> Result<(RequestId, String)> {
    let req_id = match request_id {
        Some(id) => RequestId::parse(id)?,
        None => RequestId::generate(rng)?,
    };

    let envelope = RequestEnvelope {
        req_id: &req_id,
        body: request,
    };
    let json = serde_json::to_string(&envelope)?;

    Ok((req_id, json))
}

pub fn get_current(
    request_id: Option<&str>,
    rng: &mut dyn Randomness,
) -> Result<(RequestId, String)> {
    build_request(&Request::Current {}, request_id, rng)
}

pub fn get_block(
    number: u64,
    request_id: Option<&str>,
    rng: &mut dyn Randomness,
) -> Result<(RequestId, String)> {
    build_request(&Request::BlockByNumber { number }, request_id, rng)
}

pub fn get_blocks(
    from_number: u64,
    count: u64,
    request_id: Option<&str>,
    rng: &mut dyn Randomness,
) -> Result<(RequestId, String)> {
    build_request(&Request::BlocksChunk { from_number, count }, request_id, rng)
}

pub fn get_requirements_pending(
    min_cert: u64,
    request_id: Option<&str>,
    rng: &mut dyn Randomness,
) -> Result<(RequestId, String)> {
    build_request(&Request::WotRequirementsOfPending { min_cert }, request_id, rng)
}

#[cfg(test)]
mod tests {
    use rand_chacha::{rand_core::SeedableRng, ChaCha20Rng};
    use serde_json::{json, Value};

    use super::*;
    use crate::{error::Error, types::Id};

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(11)
    }

    #[test]
    fn block_by_number_envelope() {
        let (id, json) = get_block(360_000, None, &mut rng()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert!(Id::is_valid(value["reqId"].as_str().unwrap()));
        assert_eq!(value["reqId"], id.as_str());
        assert_eq!(value["body"]["name"], "BLOCK_BY_NUMBER");
        assert_eq!(value["body"]["params"]["number"], 360_000);
    }

    #[test]
    fn params_of_every_command() {
        let cases = [
            (Request::Current {}, json!({"name": "CURRENT", "params": {}})),
            (
                Request::BlocksChunk {
                    from_number: 360_000,
                    count: 2,
                },
                json!({"name": "BLOCKS_CHUNK", "params": {"fromNumber": 360_000, "count": 2}}),
            ),
            (
                Request::WotRequirementsOfPending { min_cert: 3 },
                json!({"name": "WOT_REQUIREMENTS_OF_PENDING", "params": {"minCert": 3}}),
            ),
        ];

        for (request, body) in cases {
            let (_, json) = build_request(&request, Some("ab12CD34"), &mut rng()).unwrap();
            let value: Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value, json!({"reqId": "ab12CD34", "body": body}));
            assert_eq!(value["body"]["name"], request.name());
        }
    }

    #[test]
    fn caller_supplied_id_is_checked() {
        let err = get_current(Some("abc"), &mut rng()).unwrap_err();
        assert!(matches!(err, Error::InvalidCorrelationId(id) if id == "abc"));

        let (id, _) = get_requirements_pending(3, Some("Zz00Yy11"), &mut rng()).unwrap();
        assert_eq!(id.as_str(), "Zz00Yy11");
    }

    #[test]
    fn generated_ids_differ_between_requests() {
        let mut rng = rng();
        let (a, _) = get_blocks(1, 2, None, &mut rng).unwrap();
        let (b, _) = get_blocks(1, 2, None, &mut rng).unwrap();
        assert_ne!(a, b);
    }
}

//! Named schemas for every frame exchanged with a peer.

use serde_json::{json, Value};

use crate::{
    document::DocumentKind,
    schema::{optional, required, Schema},
    types::Id,
};

fn id() -> Schema {
    Schema::Pattern("^[0-9a-zA-Z]{8}$", Id::is_valid)
}

fn uint32() -> Schema {
    Schema::integer_of::<u32>()
}

fn uint64() -> Schema {
    Schema::integer_of::<u64>()
}

fn strings() -> Schema {
    Schema::array(Schema::String)
}

/// Schema of a CONNECT, ACK or OK message; the `auth` field tells the kinds apart.
pub fn document(kind: DocumentKind) -> Schema {
    Schema::object([
        required("auth", Schema::Const(Value::from(kind.tag()))),
        required("currency", Schema::String),
        required("pub", Schema::String),
        required("challenge", id()),
        required("sig", Schema::String),
    ])
}

pub fn error_response() -> Schema {
    Schema::object([required("resId", id()), required("err", Schema::String)])
}

pub fn block() -> Schema {
    Schema::object([
        required("version", uint32()),
        required("nonce", uint64()),
        required("number", uint64()),
        required("powMin", uint32()),
        required("time", uint64()),
        required("medianTime", uint64()),
        required("membersCount", uint64()),
        required("monetaryMass", uint64()),
        required("unitbase", uint32()),
        required("issuersCount", uint32()),
        required("issuersFrame", uint32()),
        required("issuersFrameVar", Schema::integer_of::<i32>()),
        required("currency", Schema::String),
        required("issuer", Schema::String),
        required("signature", Schema::String),
        required("hash", Schema::String),
        optional("parameters", Schema::String),
        optional("previousHash", Schema::String),
        optional("previousIssuer", Schema::String),
        required("inner_hash", Schema::String),
        required("dividend", Schema::nullable(uint64())),
        required("identities", strings()),
        required("joiners", strings()),
        required("actives", strings()),
        required("leavers", strings()),
        required("revoked", strings()),
        required("excluded", strings()),
        required("certifications", strings()),
        required("transactions", Schema::array(Schema::object([]))),
    ])
}

pub fn blocks() -> Schema {
    Schema::array(block())
}

fn certification() -> Schema {
    Schema::object([
        required("from", Schema::String),
        required("to", Schema::String),
        required("expiresIn", Schema::Number),
        required("timestamp", Schema::Number),
    ])
}

fn null_const(inner: Schema) -> Schema {
    Schema::typed_const(Schema::nullable(inner), Value::Null)
}

fn pending_cert() -> Schema {
    Schema::object([
        optional("block", Schema::Number),
        optional("block_hash", Schema::String),
        optional("block_number", Schema::Number),
        optional("blockstamp", Schema::String),
        optional("expired", Schema::typed_const(Schema::Number, json!(0))),
        optional("expires_on", Schema::Number),
        optional("from", Schema::String),
        optional("linked", Schema::typed_const(Schema::Boolean, json!(false))),
        optional("sig", Schema::String),
        optional("target", Schema::String),
        optional("to", Schema::String),
        optional("written", Schema::typed_const(Schema::Boolean, json!(false))),
        optional("written_block", null_const(Schema::String)),
        optional("written_hash", null_const(Schema::String)),
    ])
}

fn pending_membership() -> Schema {
    Schema::object([
        optional("block", Schema::String),
        optional("blockHash", Schema::String),
        optional("blockNumber", Schema::Number),
        optional("blockstamp", Schema::String),
        optional("certts", Schema::String),
        optional("expired", null_const(Schema::Number)),
        optional("expires_on", Schema::Number),
        optional("fpr", Schema::String),
        optional("idtyHash", Schema::String),
        optional("issuer", Schema::String),
        optional("membership", Schema::Enum(&["IN", "OUT"])),
        optional("number", Schema::Number),
        optional("sig", Schema::String),
        optional("signature", Schema::String),
        optional("type", Schema::String),
        optional("userid", Schema::String),
        optional("linked", Schema::typed_const(Schema::Boolean, json!(false))),
        optional("written_number", null_const(Schema::Number)),
    ])
}

fn identity_requirements() -> Schema {
    Schema::object([
        required("certifications", Schema::array(certification())),
        required("expired", Schema::Boolean),
        required("isSentry", Schema::Boolean),
        required("membershipExpiresIn", Schema::Number),
        required("membershipPendingExpiresIn", Schema::Number),
        required("meta", Schema::object([required("timestamp", Schema::String)])),
        required("outdistanced", Schema::Boolean),
        required("pendingCerts", Schema::array(pending_cert())),
        required("pendingMemberships", Schema::array(pending_membership())),
        required("pubkey", Schema::String),
        // nodes have shipped both spellings in documentation, only the one they emit is accepted
        required("revocation_sig", Schema::nullable(Schema::String)),
        required("revoked", Schema::Boolean),
        required("sig", Schema::String),
        required("uid", Schema::String),
        required("wasMember", Schema::Boolean),
    ])
}

pub fn requirements() -> Schema {
    Schema::object([required(
        "identities",
        Schema::array(identity_requirements()),
    )])
}

fn success_response(body: Schema) -> Schema {
    Schema::object([required("resId", id()), required("body", body)])
}

pub fn block_response() -> Schema {
    success_response(block())
}

pub fn blocks_response() -> Schema {
    success_response(blocks())
}

pub fn requirements_response() -> Schema {
    success_response(requirements())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{json, Value};

    const SIGNATURE: &str = concat!(
        "5Rnf3h9C+sy9lm+8eFtsEU0dm6N2/Au3ipSQJHFV0Rt2ay2UDiVCRg2IzLz8dJ8z3XcS",
        "CQ2EbJS4AjWT3B6HAg=="
    );
    const BLOCKSTAMP: &str = concat!(
        "81-0000017E38E7C0EFDC5F3ABB9C8B3E8F0C36E79D3E0E5A7F7F3C1C0A8A1D93C1",
    );
    const IDENTITY_SIG: &str = concat!(
        "42yQm4hGTJYWkPg39hQAUgP6S6EQ4vTfXdJuxKEHL1ih6YHiDL2hcwrFgBHjXLRgxRh",
        "j2VNVqqc6b4JayKqTE14r"
    );

    pub fn block(number: u64) -> Value {
        json!({
            "version": 10,
            "nonce": 10_300_000_020_546u64,
            "number": number,
            "powMin": 89,
            "time": 1_591_600_338,
            "medianTime": 1_591_597_024,
            "membersCount": 2_580,
            "monetaryMass": 4_312_785_634u64,
            "unitbase": 0,
            "issuersCount": 35,
            "issuersFrame": 171,
            "issuersFrameVar": -5,
            "currency": "g1-test",
            "issuer": "D3krfq6J9AmfpKnS3gQVYoy7NzGCc61vokteTS8LJ4YH",
            "signature": SIGNATURE,
            "hash": "0000050C06B58D8DBE1FB61F5D43BE3AF4A5B4B4CB1B3C6A1A5EBC43E3F0F5E5",
            "parameters": "",
            "previousHash": "00000BA8C9E5AC6D5E8FE5ED9D7A4D3DF9D7F6D7C0AA0F6D3C7E3A8D0E6A0B0A",
            "previousIssuer": "FVUFRrk1K5TQGsY7PRLwqHgdHRoHrwb1hcucp4C2N5tD",
            "inner_hash": "D4C2C1D87C8BDBBE05D3D0B7E1A7F1E1AE0C8D09D91C52E6A5A0DCF7A9C3B9F1",
            "dividend": null,
            "identities": [],
            "joiners": [],
            "actives": [],
            "leavers": [],
            "revoked": [],
            "excluded": [],
            "certifications": [],
            "transactions": [],
        })
    }

    pub fn requirements() -> Value {
        json!({
            "identities": [{
                "certifications": [{
                    "from": "2ny7YAdmzReQxAayyJZsyVYwYhVyax2thKcGknmQy5nQ",
                    "to": "5B8iMAzq1dNmFe3ZxFTBQkqhq4fsztg1gZvxHXCk1XYH",
                    "expiresIn": 45_134_681,
                    "timestamp": 1_591_600_000
                }],
                "expired": false,
                "isSentry": true,
                "membershipExpiresIn": 2_597_591,
                "membershipPendingExpiresIn": 0,
                "meta": {"timestamp": BLOCKSTAMP},
                "outdistanced": false,
                "pendingCerts": [{
                    "from": "2ny7YAdmzReQxAayyJZsyVYwYhVyax2thKcGknmQy5nQ",
                    "to": "5B8iMAzq1dNmFe3ZxFTBQkqhq4fsztg1gZvxHXCk1XYH",
                    "block_number": 360_000,
                    "expired": 0,
                    "linked": false,
                    "written": false,
                    "written_block": null,
                    "written_hash": null
                }],
                "pendingMemberships": [{
                    "membership": "IN",
                    "issuer": "5B8iMAzq1dNmFe3ZxFTBQkqhq4fsztg1gZvxHXCk1XYH",
                    "number": 360_000,
                    "expired": null,
                    "linked": false,
                    "written_number": null
                }],
                "pubkey": "5B8iMAzq1dNmFe3ZxFTBQkqhq4fsztg1gZvxHXCk1XYH",
                "revocation_sig": null,
                "revoked": false,
                "sig": IDENTITY_SIG,
                "uid": "toto",
                "wasMember": true
            }]
        })
    }
}

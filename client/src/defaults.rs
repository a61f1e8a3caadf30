//! Contains the default values for the configuration.

/// The node to connect to, in the `WS2P <uuid> <host> <port> [path]` endpoint format.
pub const ENDPOINT: &str = "WS2P 2f731dcd 127.0.0.1 20900";

/// The network the node is expected to be on.
pub const CURRENCY: &str = "g1-test";

/// Maximum amount of seconds to wait for the handshake to complete.
pub const HANDSHAKE_TIMEOUT: u64 = 30;

/// Maximum amount of seconds to wait for the answer to a single query.
pub const RESPONSE_TIMEOUT: u64 = 30;

/// Block queried by number in the demo run.
pub const DEMO_BLOCK_NUMBER: u64 = 360_000;

/// Number of blocks fetched by the chunk query in the demo run.
pub const DEMO_CHUNK_SIZE: u64 = 2;

/// Minimum certification count of pending identities queried in the demo run.
pub const DEMO_MIN_CERT: u64 = 3;

//! Protocol constants shared by the handshake and the request/response layer.

/// Length of a challenge or a request id.
pub const ID_LENGTH: usize = 8;

/// Characters a challenge or a request id is drawn from.
pub const ID_ALPHABET: &[u8; 62] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Prefix of every canonical handshake payload.
pub const PAYLOAD_PREFIX: &str = "WS2P";

/// Number of consecutive unrecognized frames tolerated while waiting for the peer's CONNECT.
pub const DEFAULT_UNRECOGNIZED_FRAME_LIMIT: u32 = 2;

/// Scrypt cost parameters used by Duniter wallets to derive a key from credentials (N = 4096).
pub const SCRYPT_LOG_N: u8 = 12;
pub const SCRYPT_R: u32 = 16;
pub const SCRYPT_P: u32 = 1;

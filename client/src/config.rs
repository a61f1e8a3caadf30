//! Runtime configuration, read from the environment and an optional `.env` file.

use std::{fmt, time::Duration};

use anyhow::{anyhow, bail, Context};
use ws2p::keys::RootSecret;

use crate::{defaults, endpoint::Endpoint};

#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: Endpoint,
    pub currency: String,
    /// Wallet credentials the signing key is derived from.
    pub credentials: Option<Credentials>,
    /// Seed of the signing key, used when no credentials are set. A fresh one is generated when
    /// both are absent.
    pub secret: Option<RootSecret>,
    pub handshake_timeout: Duration,
    pub response_timeout: Duration,
}

/// Salt and password of a Duniter wallet.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub salt: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("salt", &self.salt)
            .field("password", &"<hidden>")
            .finish()
    }
}

impl Config {
    /// Load the configuration from environment variables, falling back to the compiled defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let endpoint = lookup("WS2P_ENDPOINT").unwrap_or_else(|| defaults::ENDPOINT.to_string());
        let endpoint = endpoint
            .parse()
            .with_context(|| format!("WS2P_ENDPOINT {endpoint:?} is invalid"))?;

        let credentials = match (lookup("WS2P_SALT"), lookup("WS2P_PASSWORD")) {
            (Some(salt), Some(password)) => Some(Credentials { salt, password }),
            (None, None) => None,
            _ => bail!("WS2P_SALT and WS2P_PASSWORD must be set together"),
        };

        let secret = match lookup("WS2P_SECRET") {
            Some(secret) => Some(parse_secret(&secret).context("WS2P_SECRET is invalid")?),
            None => None,
        };

        if credentials.is_some() && secret.is_some() {
            bail!("WS2P_SECRET cannot be combined with WS2P_SALT and WS2P_PASSWORD");
        }

        let currency = lookup("WS2P_CURRENCY").unwrap_or_else(|| defaults::CURRENCY.to_string());
        let handshake_timeout =
            seconds(&lookup, "WS2P_HANDSHAKE_TIMEOUT", defaults::HANDSHAKE_TIMEOUT)?;
        let response_timeout =
            seconds(&lookup, "WS2P_RESPONSE_TIMEOUT", defaults::RESPONSE_TIMEOUT)?;

        Ok(Self {
            endpoint,
            currency,
            credentials,
            secret,
            handshake_timeout,
            response_timeout,
        })
    }
}

fn parse_secret(secret: &str) -> anyhow::Result<RootSecret> {
    hex::decode(secret.trim())?
        .try_into()
        .map_err(|bytes: Vec<u8>| anyhow!("expected 32 bytes, got {}", bytes.len()))
}

fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> anyhow::Result<Duration> {
    let secs = match lookup(key) {
        Some(value) => value
            .parse()
            .with_context(|| format!("{key} must be a number of seconds"))?,
        None => default,
    };
    Ok(Duration::from_secs(secs))
}

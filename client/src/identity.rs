use tracing::{info, warn};
use ws2p::{KeyManager, Signer};

use crate::config::Config;

/// Initialize the key manager from the configured credentials or secret, or generate a fresh one.
pub fn load_keys(config: &Config) -> anyhow::Result<KeyManager> {
    let keys = if let Some(credentials) = &config.credentials {
        KeyManager::from_credentials(&credentials.salt, &credentials.password)?
    } else if let Some(secret) = config.secret {
        KeyManager::from_secret(secret)?
    } else {
        let keys = KeyManager::generate()?;
        warn!(
            secret = hex::encode(keys.get_root_secret()),
            "no identity configured, set WS2P_SECRET to this secret to keep using the generated key"
        );
        keys
    };

    info!(pubkey = keys.public_key(), "identity loaded");
    Ok(keys)
}

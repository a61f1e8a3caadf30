//! Signing and verification capabilities used by the handshake, with an Ed25519 implementation.
//!
//! Keys and signatures use the encodings Duniter nodes expect: public keys in base58, signatures
//! in base64.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{Keypair, PublicKey, SecretKey, Signature, Signer as _};
use getrandom::getrandom;

use crate::{
    constants::{SCRYPT_LOG_N, SCRYPT_P, SCRYPT_R},
    error::{Error, Result},
};

/// The 32 byte Ed25519 seed a keypair is built from.
pub type RootSecret = [u8; 32];

/// Something holding a private key.
pub trait Signer: Send + Sync {
    /// The public key, in the encoding peers expect in the `pub` field.
    fn public_key(&self) -> String;

    /// Sign `payload`, returning the encoded signature.
    fn sign(&self, payload: &[u8]) -> String;
}

pub trait Verifier: Send + Sync {
    /// Check that `signature` was made over `payload` by the holder of `public_key`.
    /// Undecodable keys or signatures simply fail verification.
    fn verify(&self, payload: &[u8], signature: &str, public_key: &str) -> bool;
}

/// Ed25519 keypair built from a 32 byte root secret.
pub struct KeyManager {
    root_secret: RootSecret,
    keypair: Keypair,
}

impl KeyManager {
    pub fn generate() -> Result<Self> {
        let mut root_secret: RootSecret = Default::default();
        getrandom(&mut root_secret)?;

        Self::from_secret(root_secret)
    }

    pub fn from_secret(root_secret: RootSecret) -> Result<Self> {
        let secret = SecretKey::from_bytes(&root_secret)?;
        let keypair = Keypair {
            public: (&secret).into(),
            secret,
        };

        Ok(Self {
            root_secret,
            keypair,
        })
    }

    /// Derive the root secret from a salt and password with scrypt, the way Duniter wallets do, so
    /// the same credentials give the same public key as in any other Duniter client.
    pub fn from_credentials(salt: &str, password: &str) -> Result<Self> {
        let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, 32)
            .map_err(|e| Error::Key(e.to_string()))?;

        let mut root_secret: RootSecret = Default::default();
        scrypt::scrypt(password.as_bytes(), salt.as_bytes(), &params, &mut root_secret)
            .map_err(|e| Error::Key(e.to_string()))?;

        Self::from_secret(root_secret)
    }

    pub fn get_root_secret(&self) -> RootSecret {
        self.root_secret
    }

    pub fn get_pubkey(&self) -> [u8; 32] {
        self.keypair.public.to_bytes()
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyManager({})", self.public_key())
    }
}

impl Signer for KeyManager {
    fn public_key(&self) -> String {
        bs58::encode(self.get_pubkey()).into_string()
    }

    fn sign(&self, payload: &[u8]) -> String {
        BASE64.encode(self.keypair.sign(payload).to_bytes())
    }
}

/// Verifies base58 keys and base64 Ed25519 signatures.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Verifier;

impl Verifier for Ed25519Verifier {
    fn verify(&self, payload: &[u8], signature: &str, public_key: &str) -> bool {
        let (Ok(public_key), Ok(signature)) =
            (bs58::decode(public_key).into_vec(), BASE64.decode(signature))
        else {
            return false;
        };
        let (Ok(public_key), Ok(signature)) = (
            PublicKey::from_bytes(&public_key),
            Signature::try_from(signature.as_slice()),
        ) else {
            return false;
        };

        // use the stricter method, which rejects weak keys and malleable signatures
        public_key.verify_strict(payload, &signature).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn keys_are_reproducible() {
        let a = KeyManager::from_secret([3; 32]).unwrap();
        let b = KeyManager::from_secret([3; 32]).unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert_ne!(
            a.public_key(),
            KeyManager::from_secret([4; 32]).unwrap().public_key()
        );
        assert_eq!(a.get_root_secret(), [3; 32]);
    }

    #[test]
    fn encodings() {
        let keys = KeyManager::from_secret([5; 32]).unwrap();

        let pubkey = bs58::decode(keys.public_key()).into_vec().unwrap();
        assert_eq!(pubkey, keys.get_pubkey());

        let sig = BASE64.decode(keys.sign(b"payload")).unwrap();
        assert_eq!(sig.len(), 64);
    }

    #[test]
    fn credentials_derive_the_same_key() {
        let a = KeyManager::from_credentials("toto", "toto").unwrap();
        let b = KeyManager::from_credentials("toto", "toto").unwrap();
        let c = KeyManager::from_credentials("toto", "titi").unwrap();

        assert_eq!(a.public_key(), b.public_key());
        assert_ne!(a.public_key(), c.public_key());

        // the derived secret alone restores the identity
        let restored = KeyManager::from_secret(a.get_root_secret()).unwrap();
        assert_eq!(restored.public_key(), a.public_key());
    }

    #[test]
    fn rejects_undecodable_input() {
        let keys = KeyManager::from_secret([1; 32]).unwrap();
        let sig = keys.sign(b"payload");
        assert!(Ed25519Verifier.verify(b"payload", &sig, &keys.public_key()));
        assert!(!Ed25519Verifier.verify(b"payload", "not base64!", &keys.public_key()));
        assert!(!Ed25519Verifier.verify(b"payload", &sig, "abcd"));
        assert!(!Ed25519Verifier.verify(b"payload", &sig, "0OIl"));
        assert!(!Ed25519Verifier.verify(b"payload", &sig[..64], &keys.public_key()));
    }

    #[test]
    fn rejects_other_signer() {
        let keys = KeyManager::from_secret([1; 32]).unwrap();
        let other = KeyManager::from_secret([2; 32]).unwrap();
        let sig = other.sign(b"payload");
        assert!(!Ed25519Verifier.verify(b"payload", &sig, &keys.public_key()));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn signature_round_trip_and_tampering(
            seed in any::<[u8; 32]>(),
            payload in proptest::collection::vec(any::<u8>(), 1..128),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let keys = KeyManager::from_secret(seed).unwrap();
            let pubkey = keys.public_key();
            let sig = keys.sign(&payload);
            prop_assert!(Ed25519Verifier.verify(&payload, &sig, &pubkey));

            let mut tampered = payload.clone();
            let i = index.index(tampered.len());
            tampered[i] ^= flip;
            prop_assert!(!Ed25519Verifier.verify(&tampered, &sig, &pubkey));

            let mut sig_bytes = BASE64.decode(&sig).unwrap();
            let i = index.index(sig_bytes.len());
            sig_bytes[i] ^= flip;
            prop_assert!(!Ed25519Verifier.verify(&payload, &BASE64.encode(sig_bytes), &pubkey));
        }
    }
}

use std::{fmt, ops::Deref};

use getrandom::getrandom;
use rand_chacha::{rand_core::RngCore, ChaCha20Rng};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    constants::{ID_ALPHABET, ID_LENGTH},
    error::{Error, Result},
};

/// Source of random bytes for challenges and request ids.
pub trait Randomness: Send {
    fn fill(&mut self, dest: &mut [u8]) -> Result<()>;
}

/// Randomness from the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandomness;

impl Randomness for OsRandomness {
    fn fill(&mut self, dest: &mut [u8]) -> Result<()> {
        getrandom(dest)?;
        Ok(())
    }
}

// seeded generators give reproducible ids in tests
impl Randomness for ChaCha20Rng {
    fn fill(&mut self, dest: &mut [u8]) -> Result<()> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// An 8 character `[0-9A-Za-z]` string, used as a handshake challenge or as a request id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Id(String);

pub type Challenge = Id;
pub type RequestId = Id;

impl Id {
    /// Draw a fresh id.
    pub fn generate(rng: &mut dyn Randomness) -> Result<Self> {
        // largest multiple of the alphabet size that fits in a byte, bytes above it are rejected
        const LIMIT: u8 = (256 / ID_ALPHABET.len() * ID_ALPHABET.len()) as u8;

        let mut id = String::with_capacity(ID_LENGTH);
        let mut buf = [0u8; 16];

        while id.len() < ID_LENGTH {
            rng.fill(&mut buf)?;
            for byte in buf.iter().filter(|b| **b < LIMIT) {
                if id.len() == ID_LENGTH {
                    break;
                }
                id.push(ID_ALPHABET[usize::from(*byte) % ID_ALPHABET.len()] as char);
            }
        }

        Ok(Self(id))
    }

    /// Check whether `value` has the exact shape of an id.
    pub fn is_valid(value: &str) -> bool {
        value.len() == ID_LENGTH && value.bytes().all(|b| b.is_ascii_alphanumeric())
    }

    /// Use a caller-supplied id.
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if Self::is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidCorrelationId(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Id {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(value).map_err(serde::de::Error::custom)
    }
}

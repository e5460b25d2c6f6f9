use rand_chacha::ChaChaRng;
use rand_core::{CryptoRng, RngCore, SeedableRng};
use std::{
    fmt::{self, Debug, Display, Formatter},
    str::FromStr,
};
use zeroize::Zeroize as _;

#[derive(Clone)]
pub struct Seed([u8; Self::SIZE]);

impl Seed {
    pub const SIZE: usize = 32;

    /// Generate a random see with the given Cryptographically secure
    /// Random Number Generator (RNG).
    ///
    /// This is useful to generate one time only `Seed` that does not
    /// need to be remembered or saved.
    pub fn generate<RNG>(rng: &mut RNG) -> Self
    where
        RNG: RngCore + CryptoRng,
    {
        let mut bytes = [0; Self::SIZE];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// use this to seed a ChaCha RNG
    ///
    /// the returned RNG can then be given to a handshake to generate its
    /// ephemeral key. Two handshakes seeded with the same `Seed` will
    /// generate the same ephemeral keys.
    pub fn into_rand_chacha(self) -> ChaChaRng {
        ChaChaRng::from_seed(self.0)
    }
}

impl Drop for Seed {
    fn drop(&mut self) {
        self.0.zeroize()
    }
}

impl Display for Seed {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&hex::encode(&self.0), f)
    }
}

impl Debug for Seed {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Seed").field(&hex::encode(&self.0)).finish()
    }
}

impl AsRef<[u8]> for Seed {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Seed {
    type Err = hex::FromHexError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; Self::SIZE];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl From<[u8; Self::SIZE]> for Seed {
    fn from(seed: [u8; Self::SIZE]) -> Self {
        Self(seed)
    }
}

/// Random number generator that always outputs the same bytes
///
/// Giving this generator to a handshake pins its ephemeral key to the
/// given private key. This is how the published noise test vectors are
/// replayed.
///
/// # Security Consideration
///
/// This is **not** a random number generator. Reusing an ephemeral key
/// across handshakes breaks the forward secrecy of every one of them.
/// Only use it to reproduce test vectors.
pub struct FixedRng {
    bytes: Vec<u8>,
    position: usize,
}

impl FixedRng {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            position: 0,
        }
    }
}

impl RngCore for FixedRng {
    fn next_u32(&mut self) -> u32 {
        rand_core::impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        rand_core::impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        if self.bytes.is_empty() {
            dest.iter_mut().for_each(|byte| *byte = 0);
            return;
        }
        for byte in dest.iter_mut() {
            *byte = self.bytes[self.position];
            self.position = (self.position + 1) % self.bytes.len();
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for FixedRng {}

impl Drop for FixedRng {
    fn drop(&mut self) {
        self.bytes.zeroize()
    }
}

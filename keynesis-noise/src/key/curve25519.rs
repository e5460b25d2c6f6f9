use crate::key::{Dh, SharedSecret};
use cryptoxide::curve25519::{curve25519, curve25519_base};
use rand_core::{CryptoRng, RngCore};
use std::{
    convert::TryFrom,
    fmt::{self, Debug, Display, Formatter},
    str::FromStr,
};
use thiserror::Error;
use zeroize::Zeroize as _;

/// Curve25519 key pair (the `25519` DH function of noise)
#[derive(Clone)]
pub struct SecretKey {
    secret: [u8; Self::SIZE],
    public: PublicKey,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; Self::SIZE]);

impl SecretKey {
    pub const SIZE: usize = 32;

    /// create a dummy instance of the object but filled with zeroes
    #[inline(always)]
    const fn zero() -> Self {
        Self {
            secret: [0; Self::SIZE],
            public: PublicKey([0; PublicKey::SIZE]),
        }
    }

    fn clamp(secret: &mut [u8; Self::SIZE]) {
        secret[0] &= 0b1111_1000;
        secret[31] &= 0b0111_1111;
        secret[31] |= 0b0100_0000;
    }

    fn from_bytes(mut secret: [u8; Self::SIZE]) -> Self {
        let mut s = Self::zero();
        Self::clamp(&mut secret);
        s.public = PublicKey(curve25519_base(&secret));
        s.secret = secret;
        secret.zeroize();
        s
    }

    /// generate a new `SecretKey` with the given random number generator
    pub fn new<Rng>(mut rng: Rng) -> Self
    where
        Rng: RngCore + CryptoRng,
    {
        let mut secret = [0; Self::SIZE];
        rng.fill_bytes(&mut secret);
        Self::from_bytes(secret)
    }

    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    /// generate a shared secret between the owner of the given public key
    /// and ourselves.
    pub fn exchange(&self, public_key: &PublicKey) -> SharedSecret {
        SharedSecret::new(curve25519(&self.secret, &public_key.0))
    }

    /// get a reference to the inner secret bytes
    ///
    /// # Security Consideration
    ///
    /// be mindful that leaking the content of the secret key
    /// defeats the purpose of the key exchange.
    pub fn leak_as_ref(&self) -> &[u8; Self::SIZE] {
        &self.secret
    }
}

impl Dh for SecretKey {
    const SIZE: usize = 32;

    type PublicKey = PublicKey;
    type SharedSecret = SharedSecret;

    fn name() -> &'static str {
        "25519"
    }

    fn generate<RNG>(rng: RNG) -> Self
    where
        RNG: RngCore + CryptoRng,
    {
        Self::new(rng)
    }

    fn from_secret(secret: &[u8]) -> Option<Self> {
        Self::try_from(secret).ok()
    }

    fn public(&self) -> Self::PublicKey {
        self.public_key()
    }

    fn dh(&self, public: &Self::PublicKey) -> Self::SharedSecret {
        self.exchange(public)
    }
}

impl PublicKey {
    pub const SIZE: usize = 32;
}

/* Format ****************************************************************** */

/// conveniently provide a proper implementation to debug for the
/// SecretKey types when only *testing* the library
#[cfg(test)]
impl Debug for SecretKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretKey<Curve25519>")
            .field(&hex::encode(&self.secret[..]))
            .finish()
    }
}

#[cfg(not(test))]
impl Debug for SecretKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretKey<Curve25519>")
            .field(&"...")
            .finish()
    }
}

impl Debug for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey<Curve25519>")
            .field(&hex::encode(&self.0))
            .finish()
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&hex::encode(&self.0), f)
    }
}

/* Conversion ************************************************************** */

#[derive(Debug, Error)]
pub enum SecretKeyError {
    #[error("Invalid size, expecting {}", SecretKey::SIZE)]
    InvalidSize,
}

#[derive(Debug, Error)]
pub enum PublicKeyError {
    #[error("Invalid size, expecting {}", PublicKey::SIZE)]
    InvalidSize,
}

impl From<[u8; Self::SIZE]> for SecretKey {
    fn from(bytes: [u8; Self::SIZE]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl<'a> TryFrom<&'a [u8]> for SecretKey {
    type Error = SecretKeyError;
    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        if value.len() != Self::SIZE {
            Err(Self::Error::InvalidSize)
        } else {
            let mut s = [0; Self::SIZE];
            s.copy_from_slice(value);
            Ok(Self::from_bytes(s))
        }
    }
}

impl FromStr for SecretKey {
    type Err = hex::FromHexError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; Self::SIZE];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self::from_bytes(bytes))
    }
}

impl From<[u8; Self::SIZE]> for PublicKey {
    fn from(bytes: [u8; Self::SIZE]) -> Self {
        Self(bytes)
    }
}

impl<'a> TryFrom<&'a [u8]> for PublicKey {
    type Error = PublicKeyError;
    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        if value.len() != Self::SIZE {
            Err(Self::Error::InvalidSize)
        } else {
            let mut pk = [0; Self::SIZE];
            pk.copy_from_slice(value);
            Ok(Self(pk))
        }
    }
}

impl FromStr for PublicKey {
    type Err = hex::FromHexError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; Self::SIZE];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

/* Drop ******************************************************************** */

/// custom implementation of Drop so the secret key raw data is
/// zeroed before the memory is released
impl Drop for SecretKey {
    fn drop(&mut self) {
        self.secret.zeroize()
    }
}

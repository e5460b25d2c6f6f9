use std::fmt::{self, Debug, Formatter};
use zeroize::Zeroize as _;

/// A Shared Secret, output of a Diffie-Hellman between a local
/// private key and a remote public key
#[derive(Clone)]
pub struct SharedSecret([u8; Self::SIZE]);

impl SharedSecret {
    pub const SIZE: usize = 32;

    pub const fn new(shared_secret: [u8; Self::SIZE]) -> Self {
        Self(shared_secret)
    }
}

/* Format ****************************************************************** */

#[cfg(test)]
impl Debug for SharedSecret {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedSecret")
            .field(&hex::encode(&self.0))
            .finish()
    }
}

#[cfg(not(test))]
impl Debug for SharedSecret {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedSecret").field(&"...").finish()
    }
}

/* Eq ********************************************************************** */

impl PartialEq<Self> for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Eq for SharedSecret {}

/* AsRef ******************************************************************* */

impl AsRef<[u8]> for SharedSecret {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

/* Drop ******************************************************************** */

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.0.zeroize()
    }
}

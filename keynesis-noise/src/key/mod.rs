/*!
# Diffie-Hellman keys

The handshake is generic over the [`Dh`] trait. It only needs to generate
a key pair, to retrieve the public key and to compute the shared secret
with a remote public key.
*/
pub mod curve25519;
mod shared_secret;

pub use self::shared_secret::SharedSecret;
use rand_core::{CryptoRng, RngCore};
use std::convert::TryFrom;

pub trait Dh: Sized {
    /// size of the public key and of the shared secret (`DHLEN`)
    const SIZE: usize;

    type PublicKey: AsRef<[u8]> + Clone + for<'a> TryFrom<&'a [u8]>;

    /// output of [`Dh::dh`], `SIZE` bytes long
    type SharedSecret: AsRef<[u8]>;

    /// name of the function as it appears in the noise protocol name
    fn name() -> &'static str;

    /// generate a new key pair with the given random number generator
    fn generate<RNG>(rng: RNG) -> Self
    where
        RNG: RngCore + CryptoRng;

    /// reconstruct a key pair from the raw private key bytes
    fn from_secret(secret: &[u8]) -> Option<Self>;

    fn public(&self) -> Self::PublicKey;

    fn dh(&self, public: &Self::PublicKey) -> Self::SharedSecret;
}

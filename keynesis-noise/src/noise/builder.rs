use crate::{
    cipher::Cipher,
    hash::Hash,
    key::Dh,
    noise::{HandshakePattern, HandshakeState, HandshakeStateError},
};
use rand_core::{CryptoRng, RngCore};
use std::convert::TryFrom;
use zeroize::Zeroizing;

/// size of a pre-shared symmetric key
pub const PSK_LEN: usize = 32;

/// a pre-shared key, wiped when dropped
pub(crate) type Psk = Zeroizing<[u8; PSK_LEN]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Initiator,
    Responder,
}

impl Role {
    pub fn other(self) -> Self {
        match self {
            Self::Initiator => Self::Responder,
            Self::Responder => Self::Initiator,
        }
    }

    pub fn is_initiator(self) -> bool {
        self == Self::Initiator
    }
}

/// configuration of one handshake
///
/// ```
/// # use keynesis_noise::{noise::{Builder, Role}, cipher::ChaChaPoly, hash::Blake2s, key::curve25519::SecretKey, Seed};
/// # let rng = Seed::from([0; Seed::SIZE]).into_rand_chacha();
/// let handshake = Builder::new("NNpsk0".parse()?)
///     .prologue(b"my application v1")
///     .psk(&[0x42; 32])
///     .build::<SecretKey, ChaChaPoly, Blake2s, _>(Role::Initiator, rng)?;
/// # assert!(handshake.is_initiator());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Builder<'a> {
    pattern: HandshakePattern,
    prologue: &'a [u8],
    local_private_key: Option<&'a [u8]>,
    remote_public_key: Option<&'a [u8]>,
    psks: Vec<&'a [u8]>,
}

impl<'a> Builder<'a> {
    pub fn new(pattern: HandshakePattern) -> Self {
        Self {
            pattern,
            prologue: &[],
            local_private_key: None,
            remote_public_key: None,
            psks: Vec::new(),
        }
    }

    pub fn pattern(&self) -> &HandshakePattern {
        &self.pattern
    }

    /// data both parties need to agree on before the handshake, it is
    /// not transmitted
    pub fn prologue(mut self, prologue: &'a [u8]) -> Self {
        self.prologue = prologue;
        self
    }

    pub fn local_private_key(mut self, key: &'a [u8]) -> Self {
        self.local_private_key = Some(key);
        self
    }

    pub fn remote_public_key(mut self, key: &'a [u8]) -> Self {
        self.remote_public_key = Some(key);
        self
    }

    /// add a pre-shared key, keys are consumed in the order the `psk`
    /// tokens appear in the handshake
    pub fn psk(mut self, psk: &'a [u8]) -> Self {
        self.psks.push(psk);
        self
    }

    pub fn build<DH, C, H, RNG>(
        &self,
        role: Role,
        rng: RNG,
    ) -> Result<HandshakeState<RNG, DH, C, H>, HandshakeStateError>
    where
        DH: Dh,
        C: Cipher,
        H: Hash,
        RNG: RngCore + CryptoRng,
    {
        let expected = self.pattern.psk_count();
        if self.psks.len() != expected {
            return Err(HandshakeStateError::PskCount {
                expected,
                given: self.psks.len(),
            });
        }
        let psks = self
            .psks
            .iter()
            .map(|psk| <[u8; PSK_LEN]>::try_from(*psk).map(Psk::new))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| HandshakeStateError::InvalidPsk)?;

        let s = match self.local_private_key {
            Some(key) => Some(DH::from_secret(key).ok_or(HandshakeStateError::InvalidSecretKey)?),
            None if self.pattern.local_static_required(role) => {
                return Err(HandshakeStateError::MissingLocalStatic)
            }
            None => None,
        };

        let rs = match self.remote_public_key {
            Some(_) if !self.pattern.remote_static_required(role) => {
                return Err(HandshakeStateError::UnexpectedRemoteStatic)
            }
            Some(key) => Some(
                <DH::PublicKey as TryFrom<&[u8]>>::try_from(key)
                    .map_err(|_| HandshakeStateError::InvalidPublicKey)?,
            ),
            None if self.pattern.remote_static_required(role) => {
                return Err(HandshakeStateError::MissingRemoteStatic)
            }
            None => None,
        };

        HandshakeState::new(
            role,
            self.pattern.clone(),
            self.prologue,
            s,
            rs,
            psks,
            rng,
        )
    }
}

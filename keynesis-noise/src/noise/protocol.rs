use crate::{
    cipher::{AesGcm, ChaChaPoly, Cipher},
    hash::{Blake2b, Blake2s, Hash, Sha256, Sha512},
    key::{curve25519, Dh},
    noise::{
        handshake_state::MAX_PROTOCOL_NAME_LEN, Builder, HandshakePattern, HandshakeState,
        HandshakeStateError, PatternError, Role, TransportState, TransportStateError,
    },
};
use rand_core::{CryptoRng, RngCore};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DhFunction {
    Curve25519,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherFunction {
    ChaChaPoly,
    AesGcm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashFunction {
    Blake2b,
    Blake2s,
    Sha256,
    Sha512,
}

/// a full noise protocol: `Noise_<pattern>_<dh>_<cipher>_<hash>`
///
/// ```
/// # use keynesis_noise::noise::{Protocol, Role};
/// # use keynesis_noise::Seed;
/// let protocol: Protocol = "Noise_XXpsk3_25519_ChaChaPoly_BLAKE2s".parse()?;
/// assert_eq!(protocol.pattern().name(), "XXpsk3");
///
/// let builder = protocol
///     .builder()
///     .local_private_key(&[1; 32])
///     .psk(&[2; 32]);
/// let rng = Seed::from([0; Seed::SIZE]).into_rand_chacha();
/// let handshake = protocol.build(&builder, Role::Initiator, rng)?;
/// assert_eq!(handshake.protocol_name(), protocol.to_string());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protocol {
    pattern: HandshakePattern,
    dh: DhFunction,
    cipher: CipherFunction,
    hash: HashFunction,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("The protocol name is longer than {} bytes", MAX_PROTOCOL_NAME_LEN)]
    NameTooLong,

    #[error("Invalid protocol name {0:?}, expecting Noise_<pattern>_<dh>_<cipher>_<hash>")]
    InvalidName(String),

    #[error("Invalid handshake pattern")]
    Pattern(#[from] PatternError),

    #[error("Unsupported Diffie-Hellman function {0:?}")]
    UnknownDh(String),

    #[error("Unsupported cipher {0:?}")]
    UnknownCipher(String),

    #[error("Unsupported hash function {0:?}")]
    UnknownHash(String),
}

/// type erased [`HandshakeState`], for primitives selected at runtime
pub trait Handshake {
    fn protocol_name(&self) -> &str;

    fn is_initiator(&self) -> bool;

    fn is_complete(&self) -> bool;

    fn is_my_turn(&self) -> bool;

    fn message_index(&self) -> usize;

    fn handshake_hash(&self) -> &[u8];

    fn remote_static(&self) -> Option<&[u8]>;

    fn write_message(
        &mut self,
        payload: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, Option<Box<dyn Transport>>), HandshakeStateError>;

    fn read_message(
        &mut self,
        input: &[u8],
        payload: &mut [u8],
    ) -> Result<(usize, Option<Box<dyn Transport>>), HandshakeStateError>;
}

/// type erased [`TransportState`]
pub trait Transport {
    fn handshake_hash(&self) -> &[u8];

    fn is_one_way(&self) -> bool;

    fn count_sent(&self) -> u64;

    fn count_received(&self) -> u64;

    fn write_message(
        &mut self,
        payload: &[u8],
        output: &mut [u8],
    ) -> Result<usize, TransportStateError>;

    fn read_message(&mut self, input: &[u8], payload: &mut [u8])
        -> Result<usize, TransportStateError>;

    fn rekey_outgoing(&mut self) -> Result<(), TransportStateError>;

    fn rekey_incoming(&mut self) -> Result<(), TransportStateError>;
}

impl DhFunction {
    pub fn name(self) -> &'static str {
        match self {
            Self::Curve25519 => curve25519::SecretKey::name(),
        }
    }
}

impl CipherFunction {
    pub fn name(self) -> &'static str {
        match self {
            Self::ChaChaPoly => ChaChaPoly::name(),
            Self::AesGcm => AesGcm::name(),
        }
    }
}

impl HashFunction {
    pub fn name(self) -> &'static str {
        match self {
            Self::Blake2b => <Blake2b as Hash>::name(),
            Self::Blake2s => <Blake2s as Hash>::name(),
            Self::Sha256 => <Sha256 as Hash>::name(),
            Self::Sha512 => <Sha512 as Hash>::name(),
        }
    }
}

impl FromStr for DhFunction {
    type Err = ProtocolError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Curve25519]
            .into_iter()
            .find(|dh| dh.name() == s)
            .ok_or_else(|| ProtocolError::UnknownDh(s.to_owned()))
    }
}

impl FromStr for CipherFunction {
    type Err = ProtocolError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::ChaChaPoly, Self::AesGcm]
            .into_iter()
            .find(|cipher| cipher.name() == s)
            .ok_or_else(|| ProtocolError::UnknownCipher(s.to_owned()))
    }
}

impl FromStr for HashFunction {
    type Err = ProtocolError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Blake2b, Self::Blake2s, Self::Sha256, Self::Sha512]
            .into_iter()
            .find(|hash| hash.name() == s)
            .ok_or_else(|| ProtocolError::UnknownHash(s.to_owned()))
    }
}

impl Protocol {
    pub fn new(
        pattern: HandshakePattern,
        dh: DhFunction,
        cipher: CipherFunction,
        hash: HashFunction,
    ) -> Self {
        Self {
            pattern,
            dh,
            cipher,
            hash,
        }
    }

    pub fn pattern(&self) -> &HandshakePattern {
        &self.pattern
    }

    pub fn dh(&self) -> DhFunction {
        self.dh
    }

    pub fn cipher(&self) -> CipherFunction {
        self.cipher
    }

    pub fn hash(&self) -> HashFunction {
        self.hash
    }

    /// start the configuration of a handshake for this protocol
    pub fn builder<'a>(&self) -> Builder<'a> {
        Builder::new(self.pattern.clone())
    }

    /// build the handshake state with the primitives of this protocol
    ///
    /// The `builder` is expected to be configured for this protocol's
    /// pattern, see [`Protocol::builder`].
    pub fn build<RNG>(
        &self,
        builder: &Builder,
        role: Role,
        rng: RNG,
    ) -> Result<Box<dyn Handshake>, HandshakeStateError>
    where
        RNG: RngCore + CryptoRng + 'static,
    {
        if builder.pattern() != &self.pattern {
            return Err(HandshakeStateError::PatternMismatch);
        }

        match self.dh {
            DhFunction::Curve25519 => self.with_dh::<curve25519::SecretKey, RNG>(builder, role, rng),
        }
    }

    fn with_dh<DH, RNG>(
        &self,
        builder: &Builder,
        role: Role,
        rng: RNG,
    ) -> Result<Box<dyn Handshake>, HandshakeStateError>
    where
        DH: Dh + 'static,
        RNG: RngCore + CryptoRng + 'static,
    {
        match self.cipher {
            CipherFunction::ChaChaPoly => self.with_cipher::<DH, ChaChaPoly, RNG>(builder, role, rng),
            CipherFunction::AesGcm => self.with_cipher::<DH, AesGcm, RNG>(builder, role, rng),
        }
    }

    fn with_cipher<DH, C, RNG>(
        &self,
        builder: &Builder,
        role: Role,
        rng: RNG,
    ) -> Result<Box<dyn Handshake>, HandshakeStateError>
    where
        DH: Dh + 'static,
        C: Cipher + 'static,
        RNG: RngCore + CryptoRng + 'static,
    {
        match self.hash {
            HashFunction::Blake2b => boxed::<DH, C, Blake2b, RNG>(builder, role, rng),
            HashFunction::Blake2s => boxed::<DH, C, Blake2s, RNG>(builder, role, rng),
            HashFunction::Sha256 => boxed::<DH, C, Sha256, RNG>(builder, role, rng),
            HashFunction::Sha512 => boxed::<DH, C, Sha512, RNG>(builder, role, rng),
        }
    }
}

fn boxed<DH, C, H, RNG>(
    builder: &Builder,
    role: Role,
    rng: RNG,
) -> Result<Box<dyn Handshake>, HandshakeStateError>
where
    DH: Dh + 'static,
    C: Cipher + 'static,
    H: Hash + 'static,
    RNG: RngCore + CryptoRng + 'static,
{
    let state = builder.build::<DH, C, H, RNG>(role, rng)?;
    Ok(Box::new(state))
}

impl FromStr for Protocol {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > MAX_PROTOCOL_NAME_LEN {
            return Err(ProtocolError::NameTooLong);
        }

        let invalid = || ProtocolError::InvalidName(s.to_owned());
        let parts: Vec<&str> = s.strip_prefix("Noise_").ok_or_else(invalid)?.split('_').collect();
        match parts.as_slice() {
            [pattern, dh, cipher, hash] => Ok(Self {
                pattern: pattern.parse()?,
                dh: dh.parse()?,
                cipher: cipher.parse()?,
                hash: hash.parse()?,
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Noise_{}_{}_{}_{}",
            self.pattern,
            self.dh.name(),
            self.cipher.name(),
            self.hash.name()
        )
    }
}

impl<RNG, DH, C, H> Handshake for HandshakeState<RNG, DH, C, H>
where
    RNG: RngCore + CryptoRng,
    DH: Dh,
    C: Cipher + 'static,
    H: Hash + 'static,
{
    fn protocol_name(&self) -> &str {
        HandshakeState::protocol_name(self)
    }

    fn is_initiator(&self) -> bool {
        HandshakeState::is_initiator(self)
    }

    fn is_complete(&self) -> bool {
        HandshakeState::is_complete(self)
    }

    fn is_my_turn(&self) -> bool {
        HandshakeState::is_my_turn(self)
    }

    fn message_index(&self) -> usize {
        HandshakeState::message_index(self)
    }

    fn handshake_hash(&self) -> &[u8] {
        HandshakeState::handshake_hash(self)
    }

    fn remote_static(&self) -> Option<&[u8]> {
        HandshakeState::remote_static(self).map(|key| key.as_ref())
    }

    fn write_message(
        &mut self,
        payload: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, Option<Box<dyn Transport>>), HandshakeStateError> {
        let (len, transport) = HandshakeState::write_message(self, payload, output)?;
        Ok((len, transport.map(|t| Box::new(t) as Box<dyn Transport>)))
    }

    fn read_message(
        &mut self,
        input: &[u8],
        payload: &mut [u8],
    ) -> Result<(usize, Option<Box<dyn Transport>>), HandshakeStateError> {
        let (len, transport) = HandshakeState::read_message(self, input, payload)?;
        Ok((len, transport.map(|t| Box::new(t) as Box<dyn Transport>)))
    }
}

impl<C, H> Transport for TransportState<C, H>
where
    C: Cipher,
    H: Hash,
{
    fn handshake_hash(&self) -> &[u8] {
        TransportState::handshake_hash(self)
    }

    fn is_one_way(&self) -> bool {
        TransportState::is_one_way(self)
    }

    fn count_sent(&self) -> u64 {
        TransportState::count_sent(self)
    }

    fn count_received(&self) -> u64 {
        TransportState::count_received(self)
    }

    fn write_message(
        &mut self,
        payload: &[u8],
        output: &mut [u8],
    ) -> Result<usize, TransportStateError> {
        TransportState::write_message(self, payload, output)
    }

    fn read_message(
        &mut self,
        input: &[u8],
        payload: &mut [u8],
    ) -> Result<usize, TransportStateError> {
        TransportState::read_message(self, input, payload)
    }

    fn rekey_outgoing(&mut self) -> Result<(), TransportStateError> {
        TransportState::rekey_outgoing(self)
    }

    fn rekey_incoming(&mut self) -> Result<(), TransportStateError> {
        TransportState::rekey_incoming(self)
    }
}

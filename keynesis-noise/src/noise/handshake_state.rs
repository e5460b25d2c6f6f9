use crate::{
    buffer::{BufRead, BufWrite},
    cipher::{self, Cipher},
    hash::Hash,
    key::Dh,
    noise::{
        builder::{Psk, PSK_LEN}, CipherStateError, HandshakePattern, MessagePattern, Role,
        SymmetricState, Token, TransportState,
    },
};
use rand_core::{CryptoRng, RngCore};
use std::{convert::TryFrom, fmt};
use thiserror::Error;
use tracing::{debug, warn};

/// maximum length of a `Noise_<pattern>_<dh>_<cipher>_<hash>` name
pub const MAX_PROTOCOL_NAME_LEN: usize = 255;

/// maximum length of any noise message, handshake or transport
pub const MAX_MESSAGE_LEN: usize = 65535;

#[derive(Debug, Error)]
pub enum HandshakeStateError {
    #[error("Error while processing an encrypted part of the message")]
    Cipher(#[from] CipherStateError),

    #[error("Not enough space in the output")]
    NotEnoughOutput,

    #[error("Not enough input")]
    NotEnoughInput,

    #[error("Noise messages are limited to {} bytes", MAX_MESSAGE_LEN)]
    MessageTooLarge,

    #[error("The protocol name is longer than {} bytes", MAX_PROTOCOL_NAME_LEN)]
    ProtocolNameTooLong,

    #[error("The ephemeral key can be generated only once")]
    EphemeralAlreadySet,

    #[error("The remote ephemeral key can be received only once")]
    RemoteEphemeralAlreadySet,

    #[error("The key {0:?} is required at this stage of the handshake")]
    MissingKey(&'static str),

    #[error("The handshake pattern requires a local static key")]
    MissingLocalStatic,

    #[error("The handshake pattern requires to know the remote static key")]
    MissingRemoteStatic,

    #[error("The handshake pattern transmits the remote static key, it cannot be set upfront")]
    UnexpectedRemoteStatic,

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Invalid secret key")]
    InvalidSecretKey,

    #[error("Expecting {expected} pre-shared keys but {given} were given")]
    PskCount { expected: usize, given: usize },

    #[error("Pre-shared keys are {} bytes long", PSK_LEN)]
    InvalidPsk,

    #[error("Unexpected token {0} at this stage of the handshake")]
    UnexpectedToken(Token),

    #[error("The builder is configured for another handshake pattern")]
    PatternMismatch,

    #[error("It is not our turn to {0} a handshake message")]
    OutOfTurn(&'static str),

    #[error("The handshake is already complete")]
    Complete,

    #[error("The handshake failed already and cannot be used anymore")]
    Failed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Stage {
    InProgress,
    Complete,
    Failed,
}

/// the Noise handshake state machine
///
/// Messages are written and read alternately following the handshake
/// pattern. Processing the last message of the pattern returns the
/// [`TransportState`]. Once a call returned an error the handshake
/// state is poisoned: all subsequent calls return
/// [`HandshakeStateError::Failed`].
pub struct HandshakeState<RNG, DH: Dh, C, H: Hash> {
    symmetric_state: SymmetricState<C, H>,
    protocol_name: String,
    pattern: HandshakePattern,
    role: Role,
    stage: Stage,
    message_index: usize,

    rng: RNG,
    s: Option<DH>,
    e: Option<DH>,
    rs: Option<DH::PublicKey>,
    re: Option<DH::PublicKey>,

    psks: Vec<Psk>,
    psk_index: usize,
}

fn key<'k, K>(key: &'k Option<K>, name: &'static str) -> Result<&'k K, HandshakeStateError> {
    key.as_ref().ok_or(HandshakeStateError::MissingKey(name))
}

impl<RNG, DH, C, H> HandshakeState<RNG, DH, C, H>
where
    DH: Dh,
    C: Cipher,
    H: Hash,
{
    pub(crate) fn new(
        role: Role,
        pattern: HandshakePattern,
        prologue: &[u8],
        s: Option<DH>,
        rs: Option<DH::PublicKey>,
        psks: Vec<Psk>,
        rng: RNG,
    ) -> Result<Self, HandshakeStateError> {
        let protocol_name = format!(
            "Noise_{}_{}_{}_{}",
            pattern.name(),
            DH::name(),
            C::name(),
            H::name()
        );
        if protocol_name.len() > MAX_PROTOCOL_NAME_LEN {
            return Err(HandshakeStateError::ProtocolNameTooLong);
        }

        let mut symmetric_state = SymmetricState::initialize_symmetric(&protocol_name);
        symmetric_state.mix_hash(prologue);

        let pre_messages = [
            (Role::Initiator, pattern.initiator_pre_messages()),
            (Role::Responder, pattern.responder_pre_messages()),
        ];
        for (owner, tokens) in pre_messages {
            for token in tokens {
                let public = match (token, owner == role) {
                    (Token::S, true) => key(&s, "s")?.public(),
                    (Token::S, false) => key(&rs, "rs")?.clone(),
                    (token, _) => return Err(HandshakeStateError::UnexpectedToken(*token)),
                };
                symmetric_state.mix_hash(&public);
            }
        }

        debug!(
            protocol = %protocol_name,
            initiator = role.is_initiator(),
            "noise handshake initialized"
        );

        Ok(Self {
            symmetric_state,
            protocol_name,
            pattern,
            role,
            stage: Stage::InProgress,
            message_index: 0,
            rng,
            s,
            e: None,
            rs,
            re: None,
            psks,
            psk_index: 0,
        })
    }

    /// `Noise_<pattern>_<dh>_<cipher>_<hash>`
    pub fn protocol_name(&self) -> &str {
        &self.protocol_name
    }

    pub fn pattern(&self) -> &HandshakePattern {
        &self.pattern
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_initiator(&self) -> bool {
        self.role.is_initiator()
    }

    pub fn is_complete(&self) -> bool {
        self.stage == Stage::Complete
    }

    /// index of the next handshake message to write or read
    pub fn message_index(&self) -> usize {
        self.message_index
    }

    /// true if the next message is to be written by us
    pub fn is_my_turn(&self) -> bool {
        self.stage == Stage::InProgress && HandshakePattern::writer(self.message_index) == self.role
    }

    /// the current handshake hash `h`
    ///
    /// Once the handshake is complete this is the unique identifier of
    /// the session, suitable for channel binding.
    pub fn handshake_hash(&self) -> &[u8] {
        self.symmetric_state.get_handshake_hash().as_ref()
    }

    /// the remote static key, if known already
    pub fn remote_static(&self) -> Option<&DH::PublicKey> {
        self.rs.as_ref()
    }

    /// the public key of our ephemeral, once generated
    pub fn local_ephemeral(&self) -> Option<DH::PublicKey> {
        self.e.as_ref().map(Dh::public)
    }

    fn ready(&self, writing: bool) -> Result<&MessagePattern, HandshakeStateError> {
        match self.stage {
            Stage::Complete => Err(HandshakeStateError::Complete),
            Stage::Failed => Err(HandshakeStateError::Failed),
            Stage::InProgress => {
                let writer = HandshakePattern::writer(self.message_index);
                if writing && writer != self.role {
                    Err(HandshakeStateError::OutOfTurn("write"))
                } else if !writing && writer == self.role {
                    Err(HandshakeStateError::OutOfTurn("read"))
                } else {
                    self.pattern
                        .message(self.message_index)
                        .ok_or(HandshakeStateError::Complete)
                }
            }
        }
    }

    /// number of bytes the tokens of the message add to the payload
    fn overhead(&self, message: &MessagePattern) -> usize {
        let psk = self.pattern.has_psk();
        let mut has_key = self.symmetric_state.has_key();
        let mut len = 0;

        for token in message.tokens() {
            match token {
                Token::E => {
                    len += DH::SIZE;
                    has_key |= psk;
                }
                Token::S => {
                    len += DH::SIZE + if has_key { cipher::TAG_LEN } else { 0 };
                }
                Token::EE | Token::ES | Token::SE | Token::SS | Token::Psk => {
                    has_key = true;
                }
            }
        }

        len + if has_key { cipher::TAG_LEN } else { 0 }
    }

    fn encrypted_len(&self, len: usize) -> usize {
        if self.symmetric_state.has_key() {
            len + cipher::TAG_LEN
        } else {
            len
        }
    }

    fn mix_dh(&mut self, token: Token) -> Result<(), HandshakeStateError> {
        let initiator = self.role.is_initiator();
        let shared_secret = match token {
            Token::EE => key(&self.e, "e")?.dh(key(&self.re, "re")?),
            Token::ES if initiator => key(&self.e, "e")?.dh(key(&self.rs, "rs")?),
            Token::ES => key(&self.s, "s")?.dh(key(&self.re, "re")?),
            Token::SE if initiator => key(&self.s, "s")?.dh(key(&self.re, "re")?),
            Token::SE => key(&self.e, "e")?.dh(key(&self.rs, "rs")?),
            Token::SS => key(&self.s, "s")?.dh(key(&self.rs, "rs")?),
            token => return Err(HandshakeStateError::UnexpectedToken(token)),
        };
        self.symmetric_state.mix_key(&shared_secret);
        Ok(())
    }

    fn mix_psk(&mut self) -> Result<(), HandshakeStateError> {
        let psk = self
            .psks
            .get(self.psk_index)
            .ok_or(HandshakeStateError::MissingKey("psk"))?;
        self.symmetric_state.mix_key_and_hash(&psk[..]);
        self.psk_index += 1;
        Ok(())
    }

    fn mix_ephemeral(&mut self, public: &[u8]) {
        self.symmetric_state.mix_hash(public);
        if self.pattern.has_psk() {
            self.symmetric_state.mix_key(public);
        }
    }

    /// after a message is processed successfully, either move to the next
    /// message or split into the transport state
    fn conclude<T>(
        &mut self,
        result: Result<T, HandshakeStateError>,
        direction: &'static str,
        len: usize,
    ) -> Result<(T, Option<TransportState<C, H>>), HandshakeStateError> {
        match result {
            Err(error) => {
                self.stage = Stage::Failed;
                warn!(
                    protocol = %self.protocol_name,
                    message = self.message_index,
                    %error,
                    "noise handshake failed"
                );
                Err(error)
            }
            Ok(value) => {
                debug!(
                    protocol = %self.protocol_name,
                    message = self.message_index,
                    len,
                    "noise handshake message {}",
                    direction
                );

                self.message_index += 1;
                if self.message_index < self.pattern.messages().len() {
                    Ok((value, None))
                } else {
                    let transport = self.split();
                    Ok((value, Some(transport)))
                }
            }
        }
    }

    fn split(&mut self) -> TransportState<C, H> {
        let (c1, c2) = self.symmetric_state.split();
        self.stage = Stage::Complete;

        let one_way = self.pattern.is_one_way();
        let (local, remote) = match self.role {
            Role::Initiator if one_way => (Some(c1), None),
            Role::Responder if one_way => (None, Some(c1)),
            Role::Initiator => (Some(c1), Some(c2)),
            Role::Responder => (Some(c2), Some(c1)),
        };

        debug!(
            protocol = %self.protocol_name,
            initiator = self.role.is_initiator(),
            one_way,
            "noise handshake complete"
        );

        TransportState::new(
            self.symmetric_state.get_handshake_hash().clone(),
            local,
            remote,
            one_way,
        )
    }
}

impl<RNG, DH, C, H> HandshakeState<RNG, DH, C, H>
where
    RNG: RngCore + CryptoRng,
    DH: Dh,
    C: Cipher,
    H: Hash,
{
    /// write the next handshake message, with the given payload, into
    /// `output`
    ///
    /// Returns the number of bytes written and, if it was the last
    /// message of the handshake, the transport state.
    pub fn write_message(
        &mut self,
        payload: impl AsRef<[u8]>,
        output: &mut [u8],
    ) -> Result<(usize, Option<TransportState<C, H>>), HandshakeStateError> {
        let payload = payload.as_ref();
        let message = self.ready(true)?.clone();

        let len = self.overhead(&message) + payload.len();
        let result = if len > MAX_MESSAGE_LEN {
            Err(HandshakeStateError::MessageTooLarge)
        } else if len > output.len() {
            Err(HandshakeStateError::NotEnoughOutput)
        } else {
            self.write_tokens(&message, payload, BufWrite::new(&mut output[..len]))
        };

        self.conclude(result, "written", len)
    }

    fn write_tokens(
        &mut self,
        message: &MessagePattern,
        payload: &[u8],
        mut output: BufWrite,
    ) -> Result<usize, HandshakeStateError> {
        for token in message.tokens() {
            match token {
                Token::E => self.write_e(&mut output)?,
                Token::S => self.write_s(&mut output)?,
                Token::Psk => self.mix_psk()?,
                dh => self.mix_dh(*dh)?,
            }
        }

        let len = self.encrypted_len(payload.len());
        self.symmetric_state
            .encrypt_and_hash(payload, output.reserve(len))?;

        Ok(output.position())
    }

    fn write_e(&mut self, output: &mut BufWrite) -> Result<(), HandshakeStateError> {
        if self.e.is_some() {
            return Err(HandshakeStateError::EphemeralAlreadySet);
        }

        let e = DH::generate(&mut self.rng);
        let public = e.public();
        output.write(public.as_ref());
        self.mix_ephemeral(public.as_ref());
        self.e = Some(e);
        Ok(())
    }

    fn write_s(&mut self, output: &mut BufWrite) -> Result<(), HandshakeStateError> {
        let public = key(&self.s, "s")?.public();
        let len = self.encrypted_len(DH::SIZE);
        self.symmetric_state
            .encrypt_and_hash(public.as_ref(), output.reserve(len))?;
        Ok(())
    }
}

impl<RNG, DH, C, H> HandshakeState<RNG, DH, C, H>
where
    DH: Dh,
    C: Cipher,
    H: Hash,
{
    /// read the next handshake message and decrypt its payload into
    /// `payload`
    ///
    /// Returns the length of the payload and, if it was the last
    /// message of the handshake, the transport state.
    pub fn read_message(
        &mut self,
        input: impl AsRef<[u8]>,
        payload: &mut [u8],
    ) -> Result<(usize, Option<TransportState<C, H>>), HandshakeStateError> {
        let input = input.as_ref();
        let message = self.ready(false)?.clone();

        let overhead = self.overhead(&message);
        let result = if input.len() > MAX_MESSAGE_LEN {
            Err(HandshakeStateError::MessageTooLarge)
        } else if input.len() < overhead {
            Err(HandshakeStateError::NotEnoughInput)
        } else if input.len() - overhead > payload.len() {
            Err(HandshakeStateError::NotEnoughOutput)
        } else {
            let len = input.len() - overhead;
            self.read_tokens(&message, BufRead::new(input), &mut payload[..len])
        };

        self.conclude(result, "read", input.len())
    }

    fn read_tokens(
        &mut self,
        message: &MessagePattern,
        mut input: BufRead,
        payload: &mut [u8],
    ) -> Result<usize, HandshakeStateError> {
        for token in message.tokens() {
            match token {
                Token::E => self.read_e(&mut input)?,
                Token::S => self.read_s(&mut input)?,
                Token::Psk => self.mix_psk()?,
                dh => self.mix_dh(*dh)?,
            }
        }

        Ok(self
            .symmetric_state
            .decrypt_and_hash(input.as_ref(), payload)?)
    }

    fn read_e(&mut self, input: &mut BufRead) -> Result<(), HandshakeStateError> {
        if self.re.is_some() {
            return Err(HandshakeStateError::RemoteEphemeralAlreadySet);
        }

        let bytes = input.slice(DH::SIZE);
        input.advance(DH::SIZE);
        let re = <DH::PublicKey as TryFrom<&[u8]>>::try_from(bytes)
            .map_err(|_| HandshakeStateError::InvalidPublicKey)?;
        self.mix_ephemeral(bytes);
        self.re = Some(re);
        Ok(())
    }

    fn read_s(&mut self, input: &mut BufRead) -> Result<(), HandshakeStateError> {
        let len = self.encrypted_len(DH::SIZE);
        let cipher_text = input.slice(len);
        input.advance(len);

        let mut public = vec![0; DH::SIZE];
        self.symmetric_state
            .decrypt_and_hash(cipher_text, &mut public)?;
        let rs = <DH::PublicKey as TryFrom<&[u8]>>::try_from(public.as_slice())
            .map_err(|_| HandshakeStateError::InvalidPublicKey)?;
        self.rs = Some(rs);
        Ok(())
    }
}

impl<RNG, DH: Dh, C, H: Hash> fmt::Debug for HandshakeState<RNG, DH, C, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeState")
            .field("protocol_name", &self.protocol_name)
            .field("role", &self.role)
            .field("stage", &self.stage)
            .field("message_index", &self.message_index)
            .field("h", &hex::encode(self.symmetric_state.get_handshake_hash()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cipher::{AesGcm, ChaChaPoly},
        hash::{Blake2b, Blake2s, Sha256, Sha512},
        key::curve25519::SecretKey,
        noise::{builder::Builder, transport_state::tests::test_transport},
        seed::{FixedRng, Seed},
    };
    use quickcheck::{Arbitrary, Gen};
    use rand_chacha::ChaChaRng;

    type State<C, H> = HandshakeState<ChaChaRng, SecretKey, C, H>;

    static PSKS: [[u8; PSK_LEN]; 4] = [[0x01; 32], [0x02; 32], [0x03; 32], [0x04; 32]];

    /// the builders of both sides, with all the keys the pattern needs
    fn builders<'a>(
        pattern: &str,
        initiator_s: &'a [u8],
        responder_s: &'a [u8],
        initiator_pk: &'a [u8],
        responder_pk: &'a [u8],
    ) -> (Builder<'a>, Builder<'a>) {
        let pattern: HandshakePattern = pattern.parse().unwrap();

        let mut initiator = Builder::new(pattern.clone()).prologue(b"prologue");
        let mut responder = Builder::new(pattern.clone()).prologue(b"prologue");

        if pattern.local_static_required(Role::Initiator) {
            initiator = initiator.local_private_key(initiator_s);
        }
        if pattern.remote_static_required(Role::Initiator) {
            initiator = initiator.remote_public_key(responder_pk);
        }
        if pattern.local_static_required(Role::Responder) {
            responder = responder.local_private_key(responder_s);
        }
        if pattern.remote_static_required(Role::Responder) {
            responder = responder.remote_public_key(initiator_pk);
        }
        for psk in PSKS.iter().take(pattern.psk_count()) {
            initiator = initiator.psk(psk);
            responder = responder.psk(psk);
        }

        (initiator, responder)
    }

    fn establish_handshake<C: Cipher, H: Hash>(
        pattern: &str,
        rng1: Seed,
        rng2: Seed,
        initiator_s: SecretKey,
        responder_s: SecretKey,
        payloads: &[Vec<u8>],
    ) -> (TransportState<C, H>, TransportState<C, H>) {
        let initiator_pk = initiator_s.public_key();
        let responder_pk = responder_s.public_key();
        let (initiator, responder) = builders(
            pattern,
            initiator_s.leak_as_ref(),
            responder_s.leak_as_ref(),
            initiator_pk.as_ref(),
            responder_pk.as_ref(),
        );

        let mut initiator: State<C, H> = initiator
            .build(Role::Initiator, rng1.into_rand_chacha())
            .unwrap();
        let mut responder: State<C, H> = responder
            .build(Role::Responder, rng2.into_rand_chacha())
            .unwrap();

        let mut index = 0;
        loop {
            let empty = Vec::new();
            let payload = payloads.get(index).unwrap_or(&empty);
            let (writer, reader) = if index % 2 == 0 {
                (&mut initiator, &mut responder)
            } else {
                (&mut responder, &mut initiator)
            };
            assert!(writer.is_my_turn());
            assert!(!reader.is_my_turn());

            let mut message = vec![0u8; MAX_MESSAGE_LEN];
            let (len, writer_transport) = writer.write_message(payload, &mut message).unwrap();
            let mut received = vec![0u8; MAX_MESSAGE_LEN];
            let (received_len, reader_transport) = reader
                .read_message(&message[..len], &mut received)
                .unwrap();

            assert_eq!(&received[..received_len], payload.as_slice());
            assert_eq!(writer.handshake_hash(), reader.handshake_hash());
            index += 1;

            match (writer_transport, reader_transport) {
                (None, None) => continue,
                (Some(writer_transport), Some(reader_transport)) => {
                    assert_eq!(index, writer.pattern().messages().len());
                    assert!(initiator.is_complete());
                    assert!(responder.is_complete());
                    assert_eq!(initiator.remote_static().is_some(), {
                        let pattern = initiator.pattern();
                        pattern.local_static_required(Role::Responder)
                    });
                    assert_eq!(
                        writer_transport.handshake_hash(),
                        initiator.handshake_hash()
                    );
                    return if index % 2 == 1 {
                        (writer_transport, reader_transport)
                    } else {
                        (reader_transport, writer_transport)
                    };
                }
                _ => panic!("both sides complete the handshake with the same message"),
            }
        }
    }

    /// a pattern of the table, possibly with psk modifiers
    #[derive(Debug, Clone)]
    struct AnyPattern(String);

    impl Arbitrary for AnyPattern {
        fn arbitrary(g: &mut Gen) -> Self {
            let names = pattern_names();
            let name = g.choose(&names).unwrap();
            let modifiers = g.choose(&["", "psk0", "psk1", "psk0+psk1"]).unwrap();
            Self(format!("{}{}", name, modifiers))
        }
    }

    fn pattern_names() -> Vec<&'static str> {
        crate::noise::pattern::tests::names().collect()
    }

    fn full_round<C: Cipher, H: Hash>(
        pattern: AnyPattern,
        rng1: Seed,
        rng2: Seed,
        initiator_s: SecretKey,
        responder_s: SecretKey,
        messages_init_to_responder: Vec<Vec<u8>>,
        messages_resp_to_initiator: Vec<Vec<u8>>,
    ) -> bool {
        let (initiator, responder) = establish_handshake::<C, H>(
            &pattern.0,
            rng1,
            rng2,
            initiator_s,
            responder_s,
            &messages_init_to_responder,
        );

        let messages_resp_to_initiator = if initiator.is_one_way() {
            Vec::new()
        } else {
            messages_resp_to_initiator
        };
        test_transport(
            initiator,
            responder,
            messages_init_to_responder,
            messages_resp_to_initiator,
        )
    }

    #[quickcheck]
    fn full_round_chachapoly_blake2s(
        pattern: AnyPattern,
        rng1: Seed,
        rng2: Seed,
        initiator_s: SecretKey,
        responder_s: SecretKey,
        messages_init_to_responder: Vec<Vec<u8>>,
        messages_resp_to_initiator: Vec<Vec<u8>>,
    ) -> bool {
        full_round::<ChaChaPoly, Blake2s>(
            pattern,
            rng1,
            rng2,
            initiator_s,
            responder_s,
            messages_init_to_responder,
            messages_resp_to_initiator,
        )
    }

    #[quickcheck]
    fn full_round_aesgcm_sha512(
        pattern: AnyPattern,
        rng1: Seed,
        rng2: Seed,
        initiator_s: SecretKey,
        responder_s: SecretKey,
        messages_init_to_responder: Vec<Vec<u8>>,
        messages_resp_to_initiator: Vec<Vec<u8>>,
    ) -> bool {
        full_round::<AesGcm, Sha512>(
            pattern,
            rng1,
            rng2,
            initiator_s,
            responder_s,
            messages_init_to_responder,
            messages_resp_to_initiator,
        )
    }

    #[test]
    fn every_pattern_completes() {
        let s1 = SecretKey::from([0x11; 32]);
        let s2 = SecretKey::from([0x22; 32]);
        let payloads = vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()];

        for name in pattern_names() {
            for modifiers in ["", "psk0", "psk1", "psk0+psk1"] {
                let pattern = AnyPattern(format!("{}{}", name, modifiers));
                assert!(
                    full_round::<ChaChaPoly, Blake2s>(
                        pattern.clone(),
                        Seed::from([1; 32]),
                        Seed::from([2; 32]),
                        s1.clone(),
                        s2.clone(),
                        payloads.clone(),
                        payloads.clone(),
                    ),
                    "{:?}",
                    pattern
                );
            }
        }
    }

    #[test]
    fn full_round_other_primitives() {
        let s1 = SecretKey::from([0x11; 32]);
        let s2 = SecretKey::from([0x22; 32]);
        let payloads = vec![b"hello".to_vec(), b"world".to_vec(), b"!".to_vec()];

        for pattern in ["NN", "XX", "IK", "X1X1", "KKpsk2"] {
            let (i, r) = establish_handshake::<ChaChaPoly, Sha256>(
                pattern,
                Seed::from([1; 32]),
                Seed::from([2; 32]),
                s1.clone(),
                s2.clone(),
                &payloads,
            );
            assert!(test_transport(i, r, payloads.clone(), payloads.clone()));

            let (i, r) = establish_handshake::<AesGcm, Blake2b>(
                pattern,
                Seed::from([1; 32]),
                Seed::from([2; 32]),
                s1.clone(),
                s2.clone(),
                &payloads,
            );
            assert!(test_transport(i, r, payloads.clone(), payloads.clone()));
        }
    }

    /// NN first message, no key yet: the ephemeral public key is sent
    /// in clear and the empty payload adds no tag
    #[test]
    fn nn_first_message() {
        const PROTOCOL_NAME: &str = "Noise_NN_25519_ChaChaPoly_SHA256";
        let pinned = [0x42; 32];

        let mut initiator: HandshakeState<_, SecretKey, ChaChaPoly, Sha256> =
            Builder::new("NN".parse().unwrap())
                .build(Role::Initiator, FixedRng::new(pinned.to_vec()))
                .unwrap();
        assert_eq!(initiator.protocol_name(), PROTOCOL_NAME);
        assert_eq!(initiator.message_index(), 0);

        let mut message = [0; 1024];
        let (len, transport) = initiator.write_message(b"", &mut message).unwrap();
        assert!(transport.is_none());
        assert_eq!(len, 32);

        let e = SecretKey::from(pinned).public_key();
        assert_eq!(&message[..len], e.as_ref());

        let sha256 = |data: &[&[u8]]| {
            let mut hasher = Sha256::hasher();
            let mut out = Sha256::zero_hash();
            data.iter().for_each(|data| Hash::input(&mut hasher, data));
            Hash::result(&mut hasher, &mut out);
            out
        };
        // the name fits in 32 bytes: h = name, then the empty prologue
        let h = sha256(&[PROTOCOL_NAME.as_bytes(), &b""[..]]);
        let h = sha256(&[&h[..], e.as_ref()]);
        let h = sha256(&[&h[..], &b""[..]]);
        assert_eq!(initiator.handshake_hash(), &h[..]);
        assert_eq!(initiator.message_index(), 1);
    }

    #[test]
    fn ephemeral_generated_once() {
        let mut initiator: State<ChaChaPoly, Blake2s> = Builder::new("NN".parse().unwrap())
            .build(Role::Initiator, Seed::from([1; 32]).into_rand_chacha())
            .unwrap();
        let mut bytes = [0; 64];
        let mut output = BufWrite::new(&mut bytes);
        initiator.write_e(&mut output).unwrap();
        assert!(matches!(
            initiator.write_e(&mut output),
            Err(HandshakeStateError::EphemeralAlreadySet)
        ));
    }

    #[test]
    fn remote_ephemeral_received_once() {
        let mut responder: State<ChaChaPoly, Blake2s> = Builder::new("NN".parse().unwrap())
            .build(Role::Responder, Seed::from([1; 32]).into_rand_chacha())
            .unwrap();
        let bytes = [9; 64];
        let mut input = BufRead::new(&bytes);
        responder.read_e(&mut input).unwrap();
        assert!(matches!(
            responder.read_e(&mut input),
            Err(HandshakeStateError::RemoteEphemeralAlreadySet)
        ));
    }

    fn nn() -> (State<ChaChaPoly, Blake2s>, State<ChaChaPoly, Blake2s>) {
        let builder = Builder::new("NN".parse().unwrap());
        (
            builder
                .build(Role::Initiator, Seed::from([1; 32]).into_rand_chacha())
                .unwrap(),
            builder
                .build(Role::Responder, Seed::from([2; 32]).into_rand_chacha())
                .unwrap(),
        )
    }

    #[test]
    fn no_message_after_completion() {
        let (mut initiator, mut responder) = nn();
        let mut message = [0; 1024];
        let mut payload = [0; 1024];

        let (len, _) = initiator.write_message(b"", &mut message).unwrap();
        responder.read_message(&message[..len], &mut payload).unwrap();
        let (len, transport) = responder.write_message(b"", &mut message).unwrap();
        assert!(transport.is_some());
        let (_, transport) = initiator.read_message(&message[..len], &mut payload).unwrap();
        assert!(transport.is_some());

        assert!(matches!(
            initiator.write_message(b"", &mut message),
            Err(HandshakeStateError::Complete)
        ));
        assert!(matches!(
            responder.read_message(&message[..len], &mut payload),
            Err(HandshakeStateError::Complete)
        ));
    }

    #[test]
    fn out_of_turn() {
        let (mut initiator, mut responder) = nn();
        let mut message = [0; 1024];
        let mut payload = [0; 1024];

        assert!(matches!(
            responder.write_message(b"", &mut message),
            Err(HandshakeStateError::OutOfTurn("write"))
        ));
        assert!(matches!(
            initiator.read_message(&message[..32], &mut payload),
            Err(HandshakeStateError::OutOfTurn("read"))
        ));
    }

    #[test]
    fn truncated_message_poisons_the_handshake() {
        let (mut initiator, mut responder) = nn();
        let mut message = [0; 1024];
        let mut payload = [0; 1024];

        let (len, _) = initiator.write_message(b"", &mut message).unwrap();
        assert!(matches!(
            responder.read_message(&message[..len - 1], &mut payload),
            Err(HandshakeStateError::NotEnoughInput)
        ));
        assert!(matches!(
            responder.read_message(&message[..len], &mut payload),
            Err(HandshakeStateError::Failed)
        ));
    }

    #[test]
    fn tampered_message_fails() {
        let (mut initiator, mut responder) = nn();
        let mut message = [0; 1024];
        let mut payload = [0; 1024];

        let (len, _) = initiator.write_message(b"", &mut message).unwrap();
        responder.read_message(&message[..len], &mut payload).unwrap();
        let (len, _) = responder.write_message(b"payload", &mut message).unwrap();
        assert_eq!(len, 32 + 7 + 16);

        message[33] ^= 0x80;
        assert!(matches!(
            initiator.read_message(&message[..len], &mut payload),
            Err(HandshakeStateError::Cipher(CipherStateError::InvalidTag))
        ));
        assert!(!initiator.is_complete());
    }

    #[test]
    fn output_too_small() {
        let (mut initiator, _) = nn();
        let mut message = [0; 40];
        assert!(matches!(
            initiator.write_message([0u8; 9], &mut message),
            Err(HandshakeStateError::NotEnoughOutput)
        ));
    }

    #[test]
    fn message_too_large() {
        let (mut initiator, _) = nn();
        let payload = vec![0u8; MAX_MESSAGE_LEN];
        let mut message = vec![0u8; 2 * MAX_MESSAGE_LEN];
        assert!(matches!(
            initiator.write_message(&payload, &mut message),
            Err(HandshakeStateError::MessageTooLarge)
        ));
    }

    #[test]
    fn prologue_mismatch_is_detected() {
        let builder = Builder::new("NN".parse().unwrap());
        let mut initiator: State<ChaChaPoly, Blake2s> = builder
            .clone()
            .prologue(b"v1")
            .build(Role::Initiator, Seed::from([1; 32]).into_rand_chacha())
            .unwrap();
        let mut responder: State<ChaChaPoly, Blake2s> = builder
            .prologue(b"v2")
            .build(Role::Responder, Seed::from([2; 32]).into_rand_chacha())
            .unwrap();

        let mut message = [0; 1024];
        let mut payload = [0; 1024];
        let (len, _) = initiator.write_message(b"", &mut message).unwrap();
        responder.read_message(&message[..len], &mut payload).unwrap();
        let (len, _) = responder.write_message(b"", &mut message).unwrap();
        assert!(initiator
            .read_message(&message[..len], &mut payload)
            .is_err());
    }

    #[test]
    fn protocol_name_too_long() {
        struct LongName;
        impl Cipher for LongName {
            fn name() -> &'static str {
                "LongNameCipherLongNameCipherLongNameCipherLongNameCipherLongNameCipher\
                 LongNameCipherLongNameCipherLongNameCipherLongNameCipherLongNameCipher\
                 LongNameCipherLongNameCipherLongNameCipherLongNameCipherLongNameCipher\
                 LongNameCipherLongNameCipherLongNameCipherLongNameCipherLongName"
            }
            fn encrypt(
                key: &[u8; cipher::KEY_LEN],
                nonce: u64,
                ad: &[u8],
                plaintext: &[u8],
                output: &mut [u8],
            ) -> Result<(), CipherStateError> {
                ChaChaPoly::encrypt(key, nonce, ad, plaintext, output)
            }
            fn decrypt(
                key: &[u8; cipher::KEY_LEN],
                nonce: u64,
                ad: &[u8],
                cipher_text: &[u8],
                output: &mut [u8],
            ) -> Result<(), CipherStateError> {
                ChaChaPoly::decrypt(key, nonce, ad, cipher_text, output)
            }
        }

        let result: Result<State<LongName, Sha256>, _> = Builder::new("NN".parse().unwrap())
            .build(Role::Initiator, Seed::from([1; 32]).into_rand_chacha());
        assert!(matches!(
            result,
            Err(HandshakeStateError::ProtocolNameTooLong)
        ));
    }

    /// a key agreement with 56 bytes keys: the shared secret is the
    /// XOR of the two secrets and the public key is the secret itself
    struct Xor56([u8; 56]);

    impl Dh for Xor56 {
        const SIZE: usize = 56;

        type PublicKey = [u8; 56];
        type SharedSecret = [u8; 56];

        fn name() -> &'static str {
            "Xor56"
        }

        fn generate<RNG>(mut rng: RNG) -> Self
        where
            RNG: RngCore + CryptoRng,
        {
            let mut secret = [0; 56];
            rng.fill_bytes(&mut secret);
            Self(secret)
        }

        fn from_secret(secret: &[u8]) -> Option<Self> {
            <[u8; 56]>::try_from(secret).ok().map(Self)
        }

        fn public(&self) -> Self::PublicKey {
            self.0
        }

        fn dh(&self, public: &Self::PublicKey) -> Self::SharedSecret {
            let mut shared = [0; 56];
            for (i, byte) in shared.iter_mut().enumerate() {
                *byte = self.0[i] ^ public[i];
            }
            shared
        }
    }

    #[test]
    fn key_agreement_of_another_size() {
        type Xor56State = HandshakeState<ChaChaRng, Xor56, ChaChaPoly, Blake2s>;

        let mut initiator: Xor56State = Builder::new("XX".parse().unwrap())
            .local_private_key(&[0x11; 56])
            .build(Role::Initiator, Seed::from([1; 32]).into_rand_chacha())
            .unwrap();
        let mut responder: Xor56State = Builder::new("XX".parse().unwrap())
            .local_private_key(&[0x22; 56])
            .build(Role::Responder, Seed::from([2; 32]).into_rand_chacha())
            .unwrap();
        assert_eq!(initiator.protocol_name(), "Noise_XX_Xor56_ChaChaPoly_BLAKE2s");

        let mut message = [0; 1024];
        let mut payload = [0; 1024];

        let (len, _) = initiator.write_message(b"", &mut message).unwrap();
        assert_eq!(len, 56);
        responder.read_message(&message[..len], &mut payload).unwrap();

        let (len, _) = responder.write_message(b"two", &mut message).unwrap();
        assert_eq!(len, 56 + 56 + 16 + 3 + 16);
        initiator.read_message(&message[..len], &mut payload).unwrap();
        assert_eq!(initiator.remote_static(), Some(&[0x22; 56]));

        let (len, initiator_transport) = initiator.write_message(b"three", &mut message).unwrap();
        assert_eq!(len, 56 + 16 + 5 + 16);
        let (len, responder_transport) = responder
            .read_message(&message[..len], &mut payload)
            .unwrap();
        assert_eq!(&payload[..len], b"three");
        assert_eq!(responder.remote_static(), Some(&[0x11; 56]));

        assert!(test_transport(
            initiator_transport.unwrap(),
            responder_transport.unwrap(),
            vec![b"ping".to_vec()],
            vec![b"pong".to_vec()],
        ));
    }

    #[test]
    fn debug_shows_the_progress_but_no_keys() {
        let mut initiator: State<ChaChaPoly, Blake2s> = Builder::new("NNpsk0".parse().unwrap())
            .psk(&PSKS[0])
            .build(Role::Initiator, Seed::from([1; 32]).into_rand_chacha())
            .unwrap();
        initiator.write_message(b"", &mut [0u8; 128]).unwrap();

        let debug = format!("{:?}", initiator);
        assert!(debug.contains("Noise_NNpsk0_25519_ChaChaPoly_BLAKE2s"));
        assert!(debug.contains("message_index: 1"));
        assert!(debug.contains(&hex::encode(initiator.handshake_hash())));
        assert!(!debug.contains(&hex::encode(PSKS[0])));
    }
}

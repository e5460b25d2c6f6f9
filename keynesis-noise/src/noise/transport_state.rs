use crate::{
    cipher::Cipher,
    hash::Hash,
    noise::{handshake_state::MAX_MESSAGE_LEN, CipherState, CipherStateError},
};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportStateError {
    #[error("Error while encrypting or decrypting the message")]
    Cipher(#[from] CipherStateError),

    #[error("One-way transport, cannot use this direction")]
    OneWay,

    #[error("Noise messages are limited to {} bytes", MAX_MESSAGE_LEN)]
    MessageTooLarge,
}

/// Noise transport session between 2 participant. Communication is
/// Asymmetric. So it is possible to send messages independently from
/// the messages to receive. This allows to continue sending our current
/// messages without having to make sure we are in sync with the remote
/// messages.
///
/// With a one-way handshake pattern the initiator can only send and the
/// responder can only receive.
pub struct TransportState<C, H: Hash> {
    handshake_hash: H::HASH,
    local: Option<CipherState<C>>,
    remote: Option<CipherState<C>>,
    one_way: bool,
}

impl<C, H: Hash> TransportState<C, H> {
    pub(crate) fn new(
        handshake_hash: H::HASH,
        local: Option<CipherState<C>>,
        remote: Option<CipherState<C>>,
        one_way: bool,
    ) -> Self {
        TransportState {
            handshake_hash,
            local,
            remote,
            one_way,
        }
    }

    /// unique identifier of the noise session
    pub fn handshake_hash(&self) -> &[u8] {
        self.handshake_hash.as_ref()
    }

    pub fn is_one_way(&self) -> bool {
        self.one_way
    }

    fn local(&mut self) -> Result<&mut CipherState<C>, TransportStateError> {
        self.local.as_mut().ok_or(TransportStateError::OneWay)
    }

    fn remote(&mut self) -> Result<&mut CipherState<C>, TransportStateError> {
        self.remote.as_mut().ok_or(TransportStateError::OneWay)
    }

    /// get the number of message received from the remote peer
    ///
    /// this is the nonce of the receiving cipher state, it is always `0`
    /// for the initiator of a one-way handshake.
    pub fn count_received(&self) -> u64 {
        self.remote
            .as_ref()
            .map(|remote| remote.nonce().into_u64())
            .unwrap_or_default()
    }

    /// get the number of message sent to the remote peer
    ///
    /// this is the nonce of the sending cipher state, it is always `0`
    /// for the responder of a one-way handshake.
    pub fn count_sent(&self) -> u64 {
        self.local
            .as_ref()
            .map(|local| local.nonce().into_u64())
            .unwrap_or_default()
    }
}

impl<C: Cipher, H: Hash> TransportState<C, H> {
    /// size of the noise message carrying a payload of `len` bytes
    pub fn message_len(len: usize) -> usize {
        len + CipherState::<C>::TAG_LEN
    }

    /// encrypt the payload into `output` for the remote peer, returns the
    /// length of the message
    pub fn write_message(
        &mut self,
        payload: impl AsRef<[u8]>,
        output: &mut [u8],
    ) -> Result<usize, TransportStateError> {
        let payload = payload.as_ref();
        if Self::message_len(payload.len()) > MAX_MESSAGE_LEN {
            return Err(TransportStateError::MessageTooLarge);
        }

        Ok(self.local()?.encrypt_with_ad(b"", payload, output)?)
    }

    /// decrypt the message from the remote peer into `payload`, returns
    /// the length of the payload
    pub fn read_message(
        &mut self,
        input: impl AsRef<[u8]>,
        payload: &mut [u8],
    ) -> Result<usize, TransportStateError> {
        let input = input.as_ref();
        if input.len() > MAX_MESSAGE_LEN {
            return Err(TransportStateError::MessageTooLarge);
        }

        Ok(self.remote()?.decrypt_with_ad(b"", input, payload)?)
    }

    /// update the key used to send messages, the remote peer needs to call
    /// [`rekey_incoming`] at the same point of the stream
    ///
    /// [`rekey_incoming`]: Self::rekey_incoming
    pub fn rekey_outgoing(&mut self) -> Result<(), TransportStateError> {
        Ok(self.local()?.rekey()?)
    }

    /// update the key used to receive messages
    pub fn rekey_incoming(&mut self) -> Result<(), TransportStateError> {
        Ok(self.remote()?.rekey()?)
    }
}

impl<C, H: Hash> fmt::Debug for TransportState<C, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportState")
            .field("handshake_hash", &hex::encode(&self.handshake_hash))
            .field("local", &self.local)
            .field("remote", &self.remote)
            .field("one_way", &self.one_way)
            .finish()
    }
}

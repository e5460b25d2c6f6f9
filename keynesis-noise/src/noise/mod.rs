/*!
# Noise Protocol

The handshake and transport engine of the [Noise Specification]. The
engine is generic over the Diffie-Hellman function ([`Dh`]), the cipher
([`Cipher`]) and the hash function ([`Hash`]). [`Protocol`] parses a
`Noise_<pattern>_<dh>_<cipher>_<hash>` name and selects the primitives
at runtime.

A handshake is configured with a [`Builder`], then messages are written
and read alternately until the last one returns the [`TransportState`].

Have a look at the [Noise Explorer] for the details regarding the
different patterns available here.

[Noise Specification]: http://noiseprotocol.org/noise.html
[Noise Explorer]: https://noiseexplorer.com/patterns/
[`Dh`]: crate::key::Dh
[`Cipher`]: crate::cipher::Cipher
[`Hash`]: crate::hash::Hash
*/
mod builder;
mod cipher_state;
mod handshake_state;
mod pattern;
mod protocol;
mod symmetric_state;
mod transport_state;

pub use self::{
    builder::{Builder, Role, PSK_LEN},
    cipher_state::{CipherState, CipherStateError, Nonce},
    handshake_state::{
        HandshakeState, HandshakeStateError, MAX_MESSAGE_LEN, MAX_PROTOCOL_NAME_LEN,
    },
    pattern::{HandshakePattern, MessagePattern, PatternError, Token},
    protocol::{
        CipherFunction, DhFunction, Handshake, HashFunction, Protocol, ProtocolError, Transport,
    },
    symmetric_state::SymmetricState,
    transport_state::{TransportState, TransportStateError},
};

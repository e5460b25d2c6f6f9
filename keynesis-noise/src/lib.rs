/*!
# Keynesis Noise: the Noise Protocol Framework

Handshake state machine, symmetric key schedule and transport ciphers of
the [Noise Protocol Framework]. The DH function, the ciphers and the hash
functions are provided by [`cryptoxide`] and [`aes_gcm`].

```
use keynesis_noise::noise::{Protocol, Role};
use keynesis_noise::Seed;

let protocol: Protocol = "Noise_NN_25519_ChaChaPoly_BLAKE2s".parse()?;
let builder = protocol.builder();
let mut rng = Seed::from([1; Seed::SIZE]).into_rand_chacha();

let mut initiator = protocol.build(&builder, Role::Initiator, Seed::generate(&mut rng).into_rand_chacha())?;
let mut responder = protocol.build(&builder, Role::Responder, Seed::generate(&mut rng).into_rand_chacha())?;

let mut message = [0; 1024];
let mut payload = [0; 1024];

let (len, _) = initiator.write_message(b"", &mut message)?;
responder.read_message(&message[..len], &mut payload)?;

let (len, responder_transport) = responder.write_message(b"hello", &mut message)?;
let (len, initiator_transport) = initiator.read_message(&message[..len], &mut payload)?;
assert_eq!(&payload[..len], b"hello");

let mut initiator = initiator_transport.unwrap();
let mut responder = responder_transport.unwrap();
assert_eq!(initiator.handshake_hash(), responder.handshake_hash());

let len = initiator.write_message(b"ping", &mut message)?;
let len = responder.read_message(&message[..len], &mut payload)?;
assert_eq!(&payload[..len], b"ping");
# Ok::<(), Box<dyn std::error::Error>>(())
```

[Noise Protocol Framework]: http://noiseprotocol.org/noise.html
*/

#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

mod buffer;
pub mod cipher;
pub mod hash;
pub mod key;
pub mod noise;
mod seed;

pub use self::{
    key::SharedSecret,
    seed::{FixedRng, Seed},
};

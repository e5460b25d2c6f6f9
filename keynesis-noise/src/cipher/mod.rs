/*!
# AEAD ciphers

Both ciphers defined by the noise specification are available: `ChaChaPoly`
(cryptoxide) and `AesGcm` (RustCrypto's AES-256-GCM). Keys are always
32 bytes and tags always 16 bytes, only the nonce encoding differs.
*/
use crate::noise::CipherStateError;
use aes_gcm::{
    aead::{generic_array::GenericArray, AeadInPlace, KeyInit},
    Aes256Gcm,
};
use cryptoxide::chacha20poly1305::ChaCha20Poly1305;
use zeroize::Zeroize as _;

pub const KEY_LEN: usize = 32;
pub const TAG_LEN: usize = 16;

pub trait Cipher {
    /// name of the cipher as it appears in the noise protocol name
    fn name() -> &'static str;

    /// encrypt `plaintext` into `output`
    ///
    /// `output` is expected to be exactly `plaintext.len() + TAG_LEN` long,
    /// the authentication tag being appended after the cipher text.
    fn encrypt(
        key: &[u8; KEY_LEN],
        nonce: u64,
        ad: &[u8],
        plaintext: &[u8],
        output: &mut [u8],
    ) -> Result<(), CipherStateError>;

    /// decrypt `cipher_text` (tag included) into `output`
    ///
    /// `output` is expected to be exactly `cipher_text.len() - TAG_LEN` long.
    fn decrypt(
        key: &[u8; KEY_LEN],
        nonce: u64,
        ad: &[u8],
        cipher_text: &[u8],
        output: &mut [u8],
    ) -> Result<(), CipherStateError>;

    /// `REKEY(k)`: encrypt 32 zero bytes with the maximum nonce and keep
    /// the first 32 bytes of the output as the new key
    fn rekey(key: &[u8; KEY_LEN]) -> Result<[u8; KEY_LEN], CipherStateError> {
        let mut output = [0; KEY_LEN + TAG_LEN];
        Self::encrypt(key, u64::MAX, &[], &[0; KEY_LEN], &mut output)?;

        let mut new_key = [0; KEY_LEN];
        new_key.copy_from_slice(&output[..KEY_LEN]);
        output.zeroize();
        Ok(new_key)
    }
}

/// ChaCha20-Poly1305, nonce encoded as 32 bits of zeroes followed by the
/// little-endian encoding of the 64 bits counter
#[derive(Debug, Clone, Copy, Default)]
pub struct ChaChaPoly;

/// AES-256-GCM, nonce encoded as 32 bits of zeroes followed by the
/// big-endian encoding of the 64 bits counter
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcm;

fn check_lengths(input: usize, output: usize) -> Result<(), CipherStateError> {
    if output < input {
        Err(CipherStateError::NotEnoughOutput)
    } else if output > input {
        Err(CipherStateError::NotEnoughInput)
    } else {
        Ok(())
    }
}

impl ChaChaPoly {
    fn nonce(n: u64) -> [u8; 12] {
        let mut nonce_bytes = [0u8; 12];
        nonce_bytes[4..].copy_from_slice(&n.to_le_bytes());
        nonce_bytes
    }
}

impl Cipher for ChaChaPoly {
    fn name() -> &'static str {
        "ChaChaPoly"
    }

    fn encrypt(
        key: &[u8; KEY_LEN],
        nonce: u64,
        ad: &[u8],
        plaintext: &[u8],
        output: &mut [u8],
    ) -> Result<(), CipherStateError> {
        check_lengths(plaintext.len() + TAG_LEN, output.len())?;

        let (output, tag) = output.split_at_mut(plaintext.len());
        let mut ctx = ChaCha20Poly1305::new(key, &Self::nonce(nonce), ad);
        ctx.encrypt(plaintext, output, tag);
        Ok(())
    }

    fn decrypt(
        key: &[u8; KEY_LEN],
        nonce: u64,
        ad: &[u8],
        cipher_text: &[u8],
        output: &mut [u8],
    ) -> Result<(), CipherStateError> {
        if cipher_text.len() < TAG_LEN {
            return Err(CipherStateError::NotEnoughInput);
        }
        let (cipher_text, tag) = cipher_text.split_at(cipher_text.len() - TAG_LEN);
        check_lengths(cipher_text.len(), output.len())?;

        let mut ctx = ChaCha20Poly1305::new(key, &Self::nonce(nonce), ad);
        if ctx.decrypt(cipher_text, output, tag) {
            Ok(())
        } else {
            output.zeroize();
            Err(CipherStateError::InvalidTag)
        }
    }
}

impl AesGcm {
    fn nonce(n: u64) -> [u8; 12] {
        let mut nonce_bytes = [0u8; 12];
        nonce_bytes[4..].copy_from_slice(&n.to_be_bytes());
        nonce_bytes
    }
}

impl Cipher for AesGcm {
    fn name() -> &'static str {
        "AESGCM"
    }

    fn encrypt(
        key: &[u8; KEY_LEN],
        nonce: u64,
        ad: &[u8],
        plaintext: &[u8],
        output: &mut [u8],
    ) -> Result<(), CipherStateError> {
        check_lengths(plaintext.len() + TAG_LEN, output.len())?;

        let (output, tag_output) = output.split_at_mut(plaintext.len());
        output.copy_from_slice(plaintext);

        let aead = Aes256Gcm::new(GenericArray::from_slice(key));
        let nonce = Self::nonce(nonce);
        let tag = aead
            .encrypt_in_place_detached(GenericArray::from_slice(&nonce), ad, output)
            .map_err(|_| CipherStateError::NotEnoughOutput)?;
        tag_output.copy_from_slice(tag.as_slice());
        Ok(())
    }

    fn decrypt(
        key: &[u8; KEY_LEN],
        nonce: u64,
        ad: &[u8],
        cipher_text: &[u8],
        output: &mut [u8],
    ) -> Result<(), CipherStateError> {
        if cipher_text.len() < TAG_LEN {
            return Err(CipherStateError::NotEnoughInput);
        }
        let (cipher_text, tag) = cipher_text.split_at(cipher_text.len() - TAG_LEN);
        check_lengths(cipher_text.len(), output.len())?;
        output.copy_from_slice(cipher_text);

        let aead = Aes256Gcm::new(GenericArray::from_slice(key));
        let nonce = Self::nonce(nonce);
        aead.decrypt_in_place_detached(
            GenericArray::from_slice(&nonce),
            ad,
            output,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| {
            output.zeroize();
            CipherStateError::InvalidTag
        })
    }
}

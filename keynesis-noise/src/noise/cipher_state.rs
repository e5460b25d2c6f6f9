use crate::cipher::{self, Cipher};
use std::{fmt, marker::PhantomData};
use thiserror::Error;
use zeroize::Zeroize as _;

#[derive(Debug, Default, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct Nonce(u64);

pub struct CipherState<C> {
    k: [u8; cipher::KEY_LEN],
    n: Nonce,
    has_key: bool,
    cipher: PhantomData<C>,
}

#[derive(Debug, Error)]
pub enum CipherStateError {
    #[error("The nonce has reached 2^64-1 operations already")]
    Nonce,

    #[error("Not enough bytes allocated in the output's")]
    NotEnoughOutput,

    #[error("Not enough inputs, cannot process the data")]
    NotEnoughInput,

    #[error("Authenticated decryption failed, invalid final tag")]
    InvalidTag,
}

impl Nonce {
    const fn zero() -> Self {
        Self(0)
    }

    /// reserved value, it is never used to encrypt a message
    const fn max() -> Self {
        Self(u64::MAX)
    }

    pub(crate) fn into_u64(self) -> u64 {
        self.0
    }

    fn increment(self) -> Self {
        Self(self.0 + 1)
    }
}

impl<C> fmt::Debug for CipherState<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherState")
            .field("has_key", &self.has_key)
            .field("n", &self.n.0)
            .finish_non_exhaustive()
    }
}

impl<C> Clone for CipherState<C> {
    fn clone(&self) -> Self {
        Self {
            k: self.k,
            n: self.n,
            has_key: self.has_key,
            cipher: PhantomData,
        }
    }
}

impl<C> CipherState<C> {
    pub const KEY_LEN: usize = cipher::KEY_LEN;
    pub const TAG_LEN: usize = cipher::TAG_LEN;

    pub fn new() -> Self {
        Self {
            k: [0; cipher::KEY_LEN],
            n: Nonce::zero(),
            has_key: false,
            cipher: PhantomData,
        }
    }

    pub fn initialize_key(k: [u8; cipher::KEY_LEN]) -> Self {
        Self {
            k,
            n: Nonce::zero(),
            has_key: true,
            cipher: PhantomData,
        }
    }

    #[inline(always)]
    pub fn has_key(&self) -> bool {
        self.has_key
    }

    #[inline(always)]
    pub(crate) fn nonce(&self) -> &Nonce {
        &self.n
    }

    #[cfg(test)]
    pub(crate) fn set_nonce(&mut self, n: u64) {
        self.n = Nonce(n);
    }

    /// size of the output when encrypting `len` bytes
    pub fn encrypted_len(&self, len: usize) -> usize {
        if self.has_key() {
            len + Self::TAG_LEN
        } else {
            len
        }
    }

    fn check_nonce(&self) -> Result<(), CipherStateError> {
        if self.n == Nonce::max() {
            Err(CipherStateError::Nonce)
        } else {
            Ok(())
        }
    }
}

impl<C: Cipher> CipherState<C> {
    /// encrypt the `plaintext` into `output`, returns the number of bytes
    /// written
    ///
    /// Without a key the plaintext is copied as is.
    pub fn encrypt_with_ad(
        &mut self,
        ad: impl AsRef<[u8]>,
        plaintext: impl AsRef<[u8]>,
        output: &mut [u8],
    ) -> Result<usize, CipherStateError> {
        let plaintext = plaintext.as_ref();
        let len = self.encrypted_len(plaintext.len());
        if len > output.len() {
            return Err(CipherStateError::NotEnoughOutput);
        }

        if self.has_key() {
            self.check_nonce()?;
            C::encrypt(
                &self.k,
                self.n.into_u64(),
                ad.as_ref(),
                plaintext,
                &mut output[..len],
            )?;
            self.n = self.n.increment();
        } else {
            output[..len].copy_from_slice(plaintext);
        }

        Ok(len)
    }

    /// decrypt the `cipher_text` into `output`, returns the number of bytes
    /// of the plaintext
    ///
    /// Without a key the cipher text is copied as is.
    pub fn decrypt_with_ad(
        &mut self,
        ad: impl AsRef<[u8]>,
        cipher_text: impl AsRef<[u8]>,
        output: &mut [u8],
    ) -> Result<usize, CipherStateError> {
        let cipher_text = cipher_text.as_ref();

        if self.has_key() {
            self.check_nonce()?;
            if cipher_text.len() < Self::TAG_LEN {
                return Err(CipherStateError::NotEnoughInput);
            }

            let len = cipher_text.len() - Self::TAG_LEN;
            if len > output.len() {
                return Err(CipherStateError::NotEnoughOutput);
            }

            C::decrypt(
                &self.k,
                self.n.into_u64(),
                ad.as_ref(),
                cipher_text,
                &mut output[..len],
            )?;
            self.n = self.n.increment();
            Ok(len)
        } else {
            let len = cipher_text.len();
            if len > output.len() {
                return Err(CipherStateError::NotEnoughOutput);
            }
            output[..len].copy_from_slice(cipher_text);
            Ok(len)
        }
    }

    /// one way function to derive a new cipher key from the previous key
    ///
    /// this prevents compromised keys to decrypt older messages. The nonce
    /// is left untouched.
    pub fn rekey(&mut self) -> Result<(), CipherStateError> {
        if self.has_key() {
            self.k = C::rekey(&self.k)?;
        }
        Ok(())
    }
}

impl<C> Default for CipherState<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Drop for CipherState<C> {
    fn drop(&mut self) {
        self.k.zeroize()
    }
}

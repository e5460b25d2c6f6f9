use crate::{
    cipher::{self, Cipher},
    hash::Hash,
    noise::{CipherState, CipherStateError},
};
use std::fmt;
use zeroize::Zeroize as _;

pub struct SymmetricState<C, H: Hash> {
    cipher_state: CipherState<C>,
    ck: H::HASH,
    h: H::HASH,
    hasher: H,
}

impl<C, H> fmt::Debug for SymmetricState<C, H>
where
    H: Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(&format!("SymmetricState<{}>", H::name()))
            .field("h", &hex::encode(&self.h))
            .field("cipher_state", &self.cipher_state)
            .finish_non_exhaustive()
    }
}

impl<C, H: Hash> SymmetricState<C, H> {
    pub fn has_key(&self) -> bool {
        self.cipher_state.has_key()
    }

    pub fn get_handshake_hash(&self) -> &H::HASH {
        &self.h
    }
}

impl<C, H> SymmetricState<C, H>
where
    C: Cipher,
    H: Hash,
{
    pub fn initialize_symmetric(protocol_name: impl AsRef<[u8]>) -> Self {
        let protocol_name = protocol_name.as_ref();
        let mut h = H::zero_hash();
        let mut ck = H::zero_hash();
        let cipher_state = CipherState::new();
        let mut hasher = H::hasher();

        if protocol_name.len() > H::HASH_LEN {
            hasher.input(protocol_name);
            hasher.result(&mut h);
        } else {
            h.as_mut()[..protocol_name.len()].copy_from_slice(protocol_name);
        }

        ck.as_mut().copy_from_slice(h.as_ref());

        Self {
            h,
            ck,
            cipher_state,
            hasher,
        }
    }

    pub fn mix_key(&mut self, input_key_material: impl AsRef<[u8]>) {
        let mut temp_k = H::zero_hash();

        hkdf(
            &mut self.hasher,
            self.ck.clone().as_ref(),
            input_key_material.as_ref(),
            Output::Output2,
            &mut self.ck,
            &mut temp_k,
            &mut H::zero_hash(),
        );

        self.cipher_state = CipherState::initialize_key(truncate(&mut temp_k));
    }

    pub fn mix_hash(&mut self, data: impl AsRef<[u8]>) {
        self.hasher.reset();
        self.hasher.input(self.h.as_ref());
        self.hasher.input(data.as_ref());
        self.hasher.result(&mut self.h);
    }

    /// used by the `psk` token only
    pub fn mix_key_and_hash(&mut self, input_key_material: impl AsRef<[u8]>) {
        let mut temp_h = H::zero_hash();
        let mut temp_k = H::zero_hash();

        hkdf(
            &mut self.hasher,
            self.ck.clone().as_ref(),
            input_key_material.as_ref(),
            Output::Output3,
            &mut self.ck,
            &mut temp_h,
            &mut temp_k,
        );

        self.mix_hash(&temp_h);

        self.cipher_state = CipherState::initialize_key(truncate(&mut temp_k));
    }

    pub fn encrypt_and_hash(
        &mut self,
        plaintext: impl AsRef<[u8]>,
        output: &mut [u8],
    ) -> Result<usize, CipherStateError> {
        let size = self
            .cipher_state
            .encrypt_with_ad(&self.h, plaintext, output)?;
        self.mix_hash(&output[..size]);
        Ok(size)
    }

    /// the hash is updated with the *received* cipher text, not with
    /// the decrypted plaintext
    pub fn decrypt_and_hash(
        &mut self,
        cipher_text: impl AsRef<[u8]>,
        output: &mut [u8],
    ) -> Result<usize, CipherStateError> {
        let size = self
            .cipher_state
            .decrypt_with_ad(&self.h, &cipher_text, output)?;
        self.mix_hash(cipher_text.as_ref());
        Ok(size)
    }

    /// derive the two transport cipher states
    ///
    /// The chaining key is wiped afterward: only the handshake hash
    /// remains usable.
    pub fn split(&mut self) -> (CipherState<C>, CipherState<C>) {
        let mut temp_k1 = H::zero_hash();
        let mut temp_k2 = H::zero_hash();

        hkdf(
            &mut self.hasher,
            self.ck.as_ref(),
            &[],
            Output::Output2,
            &mut temp_k1,
            &mut temp_k2,
            &mut H::zero_hash(),
        );
        self.ck.as_mut().zeroize();

        (
            CipherState::initialize_key(truncate(&mut temp_k1)),
            CipherState::initialize_key(truncate(&mut temp_k2)),
        )
    }
}

impl<C, H: Hash> Drop for SymmetricState<C, H> {
    fn drop(&mut self) {
        self.ck.as_mut().zeroize();
        self.h.as_mut().zeroize();
    }
}

/// keep the first 32 bytes of an HKDF output as a cipher key, the
/// output is wiped
fn truncate(output: &mut impl AsMut<[u8]>) -> [u8; cipher::KEY_LEN] {
    let output = output.as_mut();
    let mut k = [0; cipher::KEY_LEN];
    k.copy_from_slice(&output[..cipher::KEY_LEN]);
    output.zeroize();
    k
}

fn hmac<H: Hash>(hasher: &mut H, key: &[u8], data: &[u8], extra: Option<&[u8]>, out: &mut H::HASH) {
    debug_assert!(key.len() <= H::BLOCK_LEN);

    let mut inner = H::zero_hash();
    let mut inner_pad = H::zero_block();
    let mut out_pad = H::zero_block();

    inner_pad.as_mut().iter_mut().for_each(|byte| *byte = 0x36);
    out_pad.as_mut().iter_mut().for_each(|byte| *byte = 0x5c);

    for (i, e) in key.iter().copied().enumerate() {
        inner_pad.as_mut()[i] ^= e;
        out_pad.as_mut()[i] ^= e;
    }

    hasher.reset();
    hasher.input(&inner_pad);
    hasher.input(data);
    if let Some(extra) = extra {
        hasher.input(extra);
    }
    hasher.result(&mut inner);

    hasher.reset();
    hasher.input(&out_pad);
    hasher.input(&inner);
    hasher.result(out);

    inner.as_mut().zeroize();
    inner_pad.as_mut().zeroize();
    out_pad.as_mut().zeroize();
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
enum Output {
    Output2,
    Output3,
}

fn hkdf<H: Hash>(
    hasher: &mut H,
    chaining_key: &[u8],
    input_key_material: &[u8],
    output: Output,
    output1: &mut H::HASH,
    output2: &mut H::HASH,
    output3: &mut H::HASH,
) {
    let mut tmp_key = H::zero_hash();
    hmac(hasher, chaining_key, input_key_material, None, &mut tmp_key);

    hmac(hasher, tmp_key.as_ref(), &[1u8], None, output1);

    hmac(
        hasher,
        tmp_key.as_ref(),
        output1.as_ref(),
        Some(&[0x02]),
        output2,
    );

    if output == Output::Output3 {
        hmac(
            hasher,
            tmp_key.as_ref(),
            output2.as_ref(),
            Some(&[0x03]),
            output3,
        );
    }

    tmp_key.as_mut().zeroize();
}

//! AEAD encryption for backup archive envelopes.
//!
//! Each encrypted archive is `nonce (12 bytes) || ciphertext+tag`. The key
//! material from the referenced Secret is hashed to a fixed 32-byte key
//! with SHA-256 so operators can supply any length of key material.

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

fn derive_key(key_material: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(key_material);
    hasher.finalize().into()
}

pub fn encrypt(plaintext: &[u8], key_material: &[u8]) -> Result<Vec<u8>> {
    let key_bytes = derive_key(key_material);
    let unbound = UnboundKey::new(&AES_256_GCM, &key_bytes)
        .map_err(|_| Error::Encryption("failed to construct AEAD key".to_string()))?;
    let key = LessSafeKey::new(unbound);

    let rng = SystemRandom::new();
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| Error::Encryption("failed to generate nonce".to_string()))?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| Error::Encryption("AEAD seal failed".to_string()))?;

    let mut envelope = Vec::with_capacity(NONCE_LEN + in_out.len());
    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend_from_slice(&in_out);
    Ok(envelope)
}

pub fn decrypt(envelope: &[u8], key_material: &[u8]) -> Result<Vec<u8>> {
    if envelope.len() < NONCE_LEN {
        return Err(Error::Encryption("envelope shorter than nonce".to_string()));
    }
    let (nonce_bytes, ciphertext) = envelope.split_at(NONCE_LEN);

    let key_bytes = derive_key(key_material);
    let unbound = UnboundKey::new(&AES_256_GCM, &key_bytes)
        .map_err(|_| Error::Encryption("failed to construct AEAD key".to_string()))?;
    let key = LessSafeKey::new(unbound);

    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| Error::Encryption("invalid nonce length".to_string()))?;

    let mut in_out = ciphertext.to_vec();
    let plaintext = key
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| Error::Encryption("AEAD open failed, wrong key or corrupted envelope".to_string()))?;

    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let plaintext = b"archive payload".to_vec();
        let key = b"a-backup-encryption-secret";
        let envelope = encrypt(&plaintext, key).unwrap();
        assert_ne!(envelope, plaintext);
        let decrypted = decrypt(&envelope, key).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let plaintext = b"archive payload".to_vec();
        let envelope = encrypt(&plaintext, b"key-one").unwrap();
        assert!(decrypt(&envelope, b"key-two").is_err());
    }
}

//! Randomness and credential hashing.
//!
//! Ticket codes and temporary staff passwords gate entry to an event, so every
//! random byte comes through [`SecureRandom`], never from an ad hoc generator.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

/// Bytes of entropy in a ticket code (128 bits).
pub const TICKET_CODE_BYTES: usize = 16;

pub const TEMPORARY_PASSWORD_LEN: usize = 12;

const SALT_BYTES: usize = 16;

const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub trait SecureRandom: Send + Sync {
    fn fill_bytes(&self, dest: &mut [u8]);
}

/// Operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSecureRandom;

impl SecureRandom for OsSecureRandom {
    fn fill_bytes(&self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}

/// Opaque QR payload: 128 random bits, base64url without padding.
pub fn ticket_code(rng: &dyn SecureRandom) -> String {
    let mut bytes = [0u8; TICKET_CODE_BYTES];
    rng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Alphanumeric password drawn by rejection sampling so every symbol is
/// equally likely.
pub fn temporary_password(rng: &dyn SecureRandom, len: usize) -> String {
    // Largest multiple of the alphabet size that fits in a byte.
    let limit = (256 / PASSWORD_ALPHABET.len() * PASSWORD_ALPHABET.len()) as u8;
    let mut password = String::with_capacity(len);
    let mut buf = [0u8; 32];
    while password.len() < len {
        rng.fill_bytes(&mut buf);
        for &byte in buf.iter().filter(|&&b| b < limit) {
            if password.len() == len {
                break;
            }
            password.push(PASSWORD_ALPHABET[byte as usize % PASSWORD_ALPHABET.len()] as char);
        }
    }
    password
}

/// Argon2id digest in PHC string form; the salt travels inside the string.
pub fn hash_password(rng: &dyn SecureRandom, password: &str) -> anyhow::Result<String> {
    let mut bytes = [0u8; SALT_BYTES];
    rng.fill_bytes(&mut bytes);
    let salt = SaltString::encode_b64(&bytes)
        .map_err(|e| anyhow::anyhow!("cannot encode password salt: {}", e))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("cannot hash password: {}", e))?;
    Ok(hash.to_string())
}

/// False for a wrong password and for a stored value that is not a PHC string.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

//! Cryptographic core for envx.
//!
//! This module provides:
//! - AES-GCM seal/open with associated data (`encryption`)
//! - The identity → master key → data key hierarchy (`keys`)
//! - Per-secret envelope encryption and the `envx:` format (`value`)

pub mod encryption;
pub mod keys;
pub mod value;

// Re-export the most commonly used items so callers can write:
//   use envx::crypto::{encrypt_value, decrypt_value, MasterKey, ...};
pub use encryption::{open, seal};
pub use keys::{derive_master_key, DataEncryptionKey, Identity, KeyStrategy, MasterKey};
pub use value::{
    decrypt as decrypt_value, encrypt as encrypt_value, is_encrypted, reveal, EncryptedValue,
};

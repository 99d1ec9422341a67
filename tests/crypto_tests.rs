//! Integration tests for the envx crypto core.

use envx::crypto::{
    decrypt_value, derive_master_key, encrypt_value, open, reveal, seal, EncryptedValue, Identity,
    KeyStrategy, MasterKey,
};
use envx::errors::EnvxError;
use zeroize::Zeroizing;

struct TestIdentity(&'static str);

impl Identity for TestIdentity {
    fn secret_string(&self) -> Zeroizing<String> {
        Zeroizing::new(self.0.to_string())
    }

    fn recipient(&self) -> String {
        format!("envx1{}", self.0.to_lowercase())
    }
}

fn master_key(secret: &'static str) -> MasterKey {
    let id = TestIdentity(secret);
    derive_master_key(Some(&id as &dyn Identity)).expect("derive master key")
}

// ---------------------------------------------------------------------------
// AEAD primitive
// ---------------------------------------------------------------------------

#[test]
fn seal_open_roundtrip_for_every_key_size() {
    for len in [16usize, 24, 32] {
        let key = vec![0x42u8; len];
        let sealed = seal(&key, b"hello", b"ctx").expect("seal");
        assert_eq!(open(&key, &sealed, b"ctx").expect("open"), b"hello");
    }
}

#[test]
fn seal_rejects_bad_key_size() {
    let err = seal(&[0u8; 20], b"x", b"").unwrap_err();
    assert!(matches!(err, EnvxError::InvalidKeySize(20)));
}

#[test]
fn open_with_wrong_aad_fails() {
    let key = [7u8; 32];
    let sealed = seal(&key, b"secret", b"DB_URL").unwrap();
    assert!(matches!(
        open(&key, &sealed, b"API_KEY"),
        Err(EnvxError::AuthenticationFailed)
    ));
}

#[test]
fn open_short_input_is_too_short() {
    let key = [7u8; 32];
    assert!(matches!(
        open(&key, &[0u8; 5], b""),
        Err(EnvxError::CiphertextTooShort)
    ));
}

// ---------------------------------------------------------------------------
// Key hierarchy
// ---------------------------------------------------------------------------

#[test]
fn master_key_is_deterministic_per_identity() {
    let a1 = master_key("ENVX-SECRET-KEY-AAAA");
    let a2 = master_key("ENVX-SECRET-KEY-AAAA");
    let b = master_key("ENVX-SECRET-KEY-BBBB");

    assert_eq!(a1.as_bytes(), a2.as_bytes());
    assert_ne!(a1.as_bytes(), b.as_bytes());
}

#[test]
fn master_key_without_identity_is_unavailable() {
    assert!(matches!(
        derive_master_key(None),
        Err(EnvxError::KeyUnavailable)
    ));
    assert!(matches!(
        KeyStrategy::new(None).master_key(),
        Err(EnvxError::KeyUnavailable)
    ));
}

#[test]
fn key_strategy_memoizes_master_key() {
    let keys = KeyStrategy::new(Some(Box::new(TestIdentity("ENVX-SECRET-KEY-MEMO"))));
    let first = keys.master_key().unwrap() as *const MasterKey;
    let second = keys.master_key().unwrap() as *const MasterKey;
    assert_eq!(first, second);
    assert_eq!(
        keys.master_key().unwrap().as_bytes(),
        master_key("ENVX-SECRET-KEY-MEMO").as_bytes()
    );
}

// ---------------------------------------------------------------------------
// Envelope engine
// ---------------------------------------------------------------------------

#[test]
fn value_roundtrip_preserves_bytes() {
    let mk = master_key("ENVX-SECRET-KEY-ROUNDTRIP");
    let large = vec![0xA5u8; 1 << 20];
    let cases: [&[u8]; 4] = [b"", b"\x00\x01\xff\xfe", "pässwörd 🔑".as_bytes(), &large];

    for plaintext in cases {
        let value = encrypt_value(&mk, plaintext, "NAME").unwrap();
        assert_eq!(decrypt_value(&mk, &value, "NAME").unwrap(), plaintext);
    }
}

#[test]
fn value_is_bound_to_its_name() {
    let mk = master_key("ENVX-SECRET-KEY-NAMES");
    let value = encrypt_value(&mk, b"postgres://db", "DATABASE_URL").unwrap();
    assert!(decrypt_value(&mk, &value, "OTHER_URL").is_err());
}

#[test]
fn value_needs_the_same_identity() {
    let value = encrypt_value(&master_key("ENVX-SECRET-KEY-ONE"), b"x", "K").unwrap();
    assert!(decrypt_value(&master_key("ENVX-SECRET-KEY-TWO"), &value, "K").is_err());
}

#[test]
fn encrypting_twice_gives_different_output() {
    let mk = master_key("ENVX-SECRET-KEY-FRESH");
    let a = encrypt_value(&mk, b"same", "K").unwrap();
    let b = encrypt_value(&mk, b"same", "K").unwrap();
    assert_ne!(a.wrapped_dek, b.wrapped_dek);
    assert_ne!(a.ciphertext, b.ciphertext);
}

#[test]
fn serialized_value_parses_back() {
    let mk = master_key("ENVX-SECRET-KEY-TEXT");
    let value = encrypt_value(&mk, b"hunter2", "PASSWORD").unwrap();
    let text = value.to_string();

    assert!(text.starts_with("envx:"));
    assert_eq!(text.matches(':').count(), 2);

    let parsed: EncryptedValue = text.parse().unwrap();
    assert_eq!(parsed, value);
    assert_eq!(
        reveal(&mk, &text, "PASSWORD").unwrap().as_str(),
        "hunter2"
    );
}

#[test]
fn reveal_passes_plaintext_through() {
    let mk = master_key("ENVX-SECRET-KEY-PLAIN");
    assert_eq!(reveal(&mk, "plain-value", "K").unwrap().as_str(), "plain-value");
    assert!(reveal(&mk, "envx:only-one-part", "K").is_err());
}

#[test]
fn tampered_ciphertext_is_rejected() {
    let mk = master_key("ENVX-SECRET-KEY-TAMPER");
    let mut value = encrypt_value(&mk, b"secret", "K").unwrap();

    // Swap the ciphertext for one sealed under another value's key.
    let other = encrypt_value(&mk, b"secret", "K").unwrap();
    value.ciphertext = other.ciphertext;

    assert!(matches!(
        decrypt_value(&mk, &value, "K"),
        Err(EnvxError::DecryptionFailed(_))
    ));
}

use chrono::{DateTime, Utc};
use thiserror::Error;

/// All errors that can occur in envx.
///
/// Messages never carry secret plaintext; at most they name a secret.
#[derive(Debug, Error)]
pub enum EnvxError {
    // --- Key errors ---
    #[error("Private key not available — set ENVX_PRIVATE_KEY or pass --identity")]
    KeyUnavailable,

    #[error("Invalid key size: {0} bytes (must be 16, 24, or 32)")]
    InvalidKeySize(usize),

    // --- AEAD errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Ciphertext too short — missing nonce")]
    CiphertextTooShort,

    #[error("Authentication failed — wrong key, wrong name, or corrupted data")]
    AuthenticationFailed,

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    // --- Value format errors ---
    #[error("Not an encrypted value")]
    NotAnEncryptedValue,

    #[error("Malformed encrypted value: {0}")]
    MalformedValue(String),

    // --- Env file errors ---
    #[error("Secret '{0}' not found")]
    SecretNotFound(String),

    #[error("Invalid variable name '{0}' — use ASCII letters, digits, and underscores")]
    InvalidName(String),

    // --- Agent envelope errors ---
    #[error("No secrets provided")]
    EmptySecrets,

    #[error("Scope is required — pass at least one key")]
    EmptyScope,

    #[error("Requested key '{0}' is not among the provided secrets")]
    ScopeKeyMissing(String),

    #[error("Envelope expired at {}", .0.to_rfc3339())]
    Expired(DateTime<Utc>),

    #[error("Invalid envelope format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported envelope version '{0}'")]
    UnsupportedVersion(String),

    // --- Audit errors ---
    #[error("No audit log found")]
    NoAuditLog,

    #[error("Audit error: {0}")]
    AuditError(String),

    // --- Identity errors ---
    #[error("Identity error: {0}")]
    IdentityError(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Child process exited with code {0}")]
    ChildProcessFailed(i32),

    #[error("No command specified — use `envx run -- <command>` or `envx envelope run <envelope> -- <command>`")]
    NoCommandSpecified,
}

/// Convenience type alias for envx results.
pub type Result<T> = std::result::Result<T, EnvxError>;

//! Ed25519 workspace identities.
//!
//! This is the concrete identity the CLI hands to the key hierarchy.  The
//! core only sees it through the `Identity` trait.
//!
//! Serialized forms:
//! - private: `ENVX-SECRET-KEY-<64 upper-case hex chars>`
//! - public:  `envx1<64 lower-case hex chars>`

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ed25519_dalek::SigningKey;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::crypto::Identity;
use crate::errors::{EnvxError, Result};

/// Prefix of a serialized private identity.
pub const SECRET_KEY_PREFIX: &str = "ENVX-SECRET-KEY-";

/// Prefix of a public recipient string.
pub const RECIPIENT_PREFIX: &str = "envx1";

/// Environment variable that carries a serialized identity.
pub const PRIVATE_KEY_ENV: &str = "ENVX_PRIVATE_KEY";

/// An Ed25519 key pair used as a long-term workspace identity.
pub struct Ed25519Identity {
    signing_key: SigningKey,
}

impl Ed25519Identity {
    /// Generate a new identity from 32 bytes of OS randomness.
    pub fn generate() -> Self {
        let mut seed = Zeroizing::new([0u8; 32]);
        rand::rng().fill_bytes(seed.as_mut_slice());
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Parse the `ENVX-SECRET-KEY-...` form.
    pub fn parse(s: &str) -> Result<Self> {
        let hex_part = s
            .trim()
            .strip_prefix(SECRET_KEY_PREFIX)
            .ok_or_else(|| EnvxError::IdentityError(format!("missing {SECRET_KEY_PREFIX} prefix")))?;

        let bytes = Zeroizing::new(
            hex::decode(hex_part)
                .map_err(|e| EnvxError::IdentityError(format!("invalid hex: {e}")))?,
        );

        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            EnvxError::IdentityError(format!("secret key must be 32 bytes, got {}", bytes.len()))
        })?;
        let seed = Zeroizing::new(seed);

        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }
}

impl FromStr for Ed25519Identity {
    type Err = EnvxError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Identity for Ed25519Identity {
    fn secret_string(&self) -> Zeroizing<String> {
        let seed = Zeroizing::new(self.signing_key.to_bytes());
        Zeroizing::new(format!("{SECRET_KEY_PREFIX}{}", hex::encode_upper(seed.as_slice())))
    }

    fn recipient(&self) -> String {
        let public = self.signing_key.verifying_key();
        format!("{RECIPIENT_PREFIX}{}", hex::encode(public.to_bytes()))
    }
}

/// Find the identity for a workspace, trying in order:
/// 1. `ENVX_PRIVATE_KEY` env var
/// 2. an explicit `--identity` file
/// 3. `identity_file` from `.envx.toml` (skipped if the file is absent)
///
/// Returns `Ok(None)` when nothing is configured.
pub fn load_identity(
    settings: &Settings,
    workdir: &Path,
    explicit: Option<&Path>,
) -> Result<Option<Ed25519Identity>> {
    if let Ok(raw) = std::env::var(PRIVATE_KEY_ENV) {
        if !raw.trim().is_empty() {
            tracing::debug!(source = PRIVATE_KEY_ENV, "loading identity");
            let raw = Zeroizing::new(raw);
            return Ed25519Identity::parse(&raw)
                .map(Some)
                .map_err(|e| EnvxError::IdentityError(format!("{PRIVATE_KEY_ENV}: {e}")));
        }
    }

    if let Some(path) = explicit {
        tracing::debug!(path = %path.display(), "loading identity from --identity");
        return read_identity_file(path).map(Some);
    }

    if let Some(path) = settings.identity_path(workdir) {
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading identity from settings");
            return read_identity_file(&path).map(Some);
        }
        tracing::debug!(path = %path.display(), "configured identity file not found");
    }

    Ok(None)
}

/// Read an identity file; `#` lines and blank lines are ignored.
pub fn read_identity_file(path: &Path) -> Result<Ed25519Identity> {
    let contents = Zeroizing::new(fs::read_to_string(path).map_err(|e| {
        EnvxError::IdentityError(format!("cannot read {}: {e}", path.display()))
    })?);

    let line = contents
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .ok_or_else(|| {
            EnvxError::IdentityError(format!("no identity found in {}", path.display()))
        })?;

    Ed25519Identity::parse(line)
}

/// Write `identity` to a new file at `path` with owner-only permissions.
///
/// Refuses to overwrite an existing file.
pub fn write_identity_file(path: &Path, identity: &Ed25519Identity) -> Result<PathBuf> {
    if path.exists() {
        return Err(EnvxError::IdentityError(format!(
            "identity file already exists at {}",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                EnvxError::IdentityError(format!("cannot create identity directory: {e}"))
            })?;
        }
    }

    let contents = Zeroizing::new(format!(
        "# public key: {}\n{}\n",
        identity.recipient(),
        identity.secret_string().as_str()
    ));

    fs::write(path, contents.as_bytes())
        .map_err(|e| EnvxError::IdentityError(format!("failed to write identity: {e}")))?;

    // On Unix, restrict permissions to owner-only read/write.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms).map_err(|e| {
            EnvxError::IdentityError(format!("failed to set identity permissions: {e}"))
        })?;
    }

    Ok(path.to_path_buf())
}

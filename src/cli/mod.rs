//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod env_parser;
pub mod output;

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use chrono::Duration;
use clap::Parser;
use zeroize::Zeroizing;

use crate::audit::{self, EntryFields, Op};
use crate::config::Settings;
use crate::crypto::{Identity, KeyStrategy};
use crate::errors::{EnvxError, Result};
use crate::identity::load_identity;

/// envx CLI: encrypted secrets and time-boxed agent envelopes.
#[derive(Parser)]
#[command(
    name = "envx",
    about = "Encrypted secrets and time-boxed envelopes for agents",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace directory (default: current directory)
    #[arg(long, global = true, env = "ENVX_WORKDIR")]
    pub workdir: Option<PathBuf>,

    /// Path to an identity file (overridden by ENVX_PRIVATE_KEY)
    #[arg(long, global = true)]
    pub identity: Option<PathBuf>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Generate a new identity
    Keygen {
        /// Write the identity to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Encrypt a value into the `envx:` format
    Encrypt {
        /// Secret name (bound into the ciphertext)
        name: String,
        /// Secret value (omit to read stdin or prompt)
        value: Option<String>,
    },

    /// Decrypt an `envx:` value (plaintext passes through)
    Decrypt {
        /// Secret name the value was encrypted under
        name: String,
        /// The stored value
        value: String,
    },

    /// Encrypt a value and store it in the env file
    Set {
        /// Variable name
        name: String,
        /// Value (omit to read stdin or prompt)
        value: Option<String>,

        /// Store the value unencrypted (for non-secret settings)
        #[arg(long)]
        plain: bool,
    },

    /// Print one decrypted value, or all of them as JSON
    Get {
        /// Variable name (omit for every variable)
        name: Option<String>,
    },

    /// List the variables in the env file
    List,

    /// Remove a variable from the env file
    Delete {
        /// Variable name
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Re-encrypt every `envx:` value under fresh data keys
    Rotate {
        /// Report what would be rotated without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Run a command with the env file's decrypted values injected
    Run {
        /// Command and arguments (after --)
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    /// Create, inspect, and use agent envelopes
    Envelope {
        #[command(subcommand)]
        action: EnvelopeAction,
    },

    /// View and verify the audit log
    Audit {
        #[command(subcommand)]
        action: AuditAction,
    },

    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Envelope subcommands.
#[derive(clap::Subcommand)]
pub enum EnvelopeAction {
    /// Seal selected secrets from the env file into an envelope token
    Create {
        /// Secret names to include (comma-separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        scope: Vec<String>,

        /// Lifetime, e.g. 30m, 1h, 1h30m (default from .envx.toml)
        #[arg(short, long)]
        ttl: Option<String>,

        /// Write the token to a file instead of stdout
        #[arg(short, long)]
        output_file: Option<PathBuf>,
    },

    /// Show envelope metadata without decrypting any secret
    Inspect {
        /// Envelope token, or `-` to read it from stdin
        token: String,

        /// Print metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a command with the envelope's secrets injected
    Run {
        /// Envelope token, or `-` to read it from stdin
        token: String,

        /// Command and arguments (after --)
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    /// List recent envelope activity from the audit log
    List {
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        last: usize,
    },
}

/// Audit subcommands.
#[derive(clap::Subcommand)]
pub enum AuditAction {
    /// Show recent audit entries
    Show {
        /// Number of entries to show (0 for all)
        #[arg(long, default_value = "10")]
        last: usize,
    },

    /// Check the hash chain for tampering
    Verify,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve the workspace directory from `--workdir` or the current directory.
pub fn workdir(cli: &Cli) -> Result<PathBuf> {
    match &cli.workdir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(std::env::current_dir()?),
    }
}

/// Build the key strategy for this invocation.
///
/// A missing identity is not an error here; it surfaces as
/// `KeyUnavailable` only when a command actually needs the master key.
pub fn key_strategy(cli: &Cli, settings: &Settings, workdir: &std::path::Path) -> Result<KeyStrategy> {
    let identity = load_identity(settings, workdir, cli.identity.as_deref())?
        .map(|id| Box::new(id) as Box<dyn Identity>);

    if identity.is_none() {
        tracing::debug!("no identity configured");
    }

    Ok(KeyStrategy::new(identity))
}

/// Read an envelope token argument; `-` means stdin.
pub fn read_token(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.trim().to_string());
    }

    if io::stdin().is_terminal() {
        return Err(EnvxError::CommandFailed(
            "expected an envelope token on stdin".into(),
        ));
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf.trim().to_string())
}

/// Take a secret value from the argument, piped stdin, or a hidden prompt.
///
/// Piped input loses its trailing newline.
pub fn read_secret_value(name: &str, value: Option<&str>) -> Result<Zeroizing<String>> {
    if let Some(v) = value {
        output::warning("Value provided on command line — it may appear in shell history.");
        return Ok(Zeroizing::new(v.to_string()));
    }

    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim_end_matches(['\n', '\r']).len();
        buf.truncate(trimmed);
        return Ok(buf);
    }

    let entered = dialoguer::Password::new()
        .with_prompt(format!("Enter value for {name}"))
        .interact()
        .map_err(|e| EnvxError::CommandFailed(format!("input prompt: {e}")))?;
    Ok(Zeroizing::new(entered))
}

/// Parse a TTL like "30s", "15m", "1h", "7d", or a chain such as "1h30m".
///
/// A leading `-` gives a negative duration.
pub fn parse_ttl(input: &str) -> Result<Duration> {
    let input = input.trim();
    let invalid = || {
        EnvxError::CommandFailed(format!(
            "invalid ttl '{input}' — use a format like 30m, 1h, 1h30m, or 7d"
        ))
    };

    let (negative, mut rest) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total = Duration::zero();
    while !rest.is_empty() {
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return Err(invalid());
        }

        let num: i64 = rest[..digits].parse().map_err(|_| invalid())?;
        let unit = rest[digits..].chars().next().ok_or_else(invalid)?;

        let part = match unit {
            's' => Duration::try_seconds(num),
            'm' => Duration::try_minutes(num),
            'h' => Duration::try_hours(num),
            'd' => Duration::try_days(num),
            _ => None,
        }
        .ok_or_else(invalid)?;

        total = total.checked_add(&part).ok_or_else(invalid)?;
        rest = &rest[digits + unit.len_utf8()..];
    }

    Ok(if negative { -total } else { total })
}

/// Record an audit entry if auditing is enabled.
///
/// A failed write never fails the command; it is reported as a warning.
pub fn log_audit(settings: &Settings, workdir: &std::path::Path, op: Op, fields: EntryFields) {
    if !settings.audit {
        return;
    }

    if let Err(e) = audit::append(workdir, op, fields) {
        tracing::warn!(op = %op, error = %e, "audit append failed");
        output::warning(&format!("Could not write audit entry: {e}"));
    }
}

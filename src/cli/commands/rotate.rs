//! `envx rotate` — re-encrypt every `envx:` value under a fresh data key.
//!
//! The identity stays the same; each value gets a new DEK and nonce, so the
//! stored ciphertext changes while the plaintext does not.  Plaintext
//! variables are left alone.

use crate::audit::{EntryFields, Op};
use crate::cli::env_parser::EnvFile;
use crate::cli::{key_strategy, log_audit, output, workdir, Cli};
use crate::config::Settings;
use crate::crypto::value::VALUE_PREFIX;
use crate::crypto::{encrypt_value, reveal};
use crate::errors::Result;

/// Execute the `rotate` command.
pub fn execute(cli: &Cli, dry_run: bool) -> Result<()> {
    let workdir = workdir(cli)?;
    let settings = Settings::load(&workdir)?;
    let mut file = EnvFile::load(&settings.env_file_path(&workdir))?;

    let encrypted: Vec<(String, String)> = file
        .entries()
        .into_iter()
        .filter(|(_, value)| value.starts_with(VALUE_PREFIX))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    if encrypted.is_empty() {
        output::info("No encrypted variables to rotate.");
        return Ok(());
    }

    if dry_run {
        output::info(&format!("Would rotate {} variable(s):", encrypted.len()));
        for (name, _) in &encrypted {
            println!("  {name}");
        }
        return Ok(());
    }

    let keys = key_strategy(cli, &settings, &workdir)?;
    let master_key = keys.master_key()?;

    // Decrypt everything before touching the file so one bad value
    // leaves it as it was.
    let mut rotated = Vec::with_capacity(encrypted.len());
    for (name, value) in &encrypted {
        let plaintext = reveal(master_key, value, name)?;
        let fresh = encrypt_value(master_key, plaintext.as_bytes(), name)?;
        rotated.push((name.clone(), fresh.to_string()));
    }

    for (name, value) in &rotated {
        file.set(name, value)?;
    }
    file.save()?;

    let names: Vec<String> = rotated.into_iter().map(|(name, _)| name).collect();
    let count = names.len();
    log_audit(
        &settings,
        &workdir,
        Op::Rotate,
        EntryFields {
            scope: Some(names),
            ..EntryFields::default()
        },
    );
    output::success(&format!("Rotated {count} variable(s)"));

    Ok(())
}

//! `envx set` — encrypt a value and store it in the env file.

use crate::audit::{EntryFields, Op};
use crate::cli::env_parser::{validate_name, EnvFile};
use crate::cli::{key_strategy, log_audit, output, read_secret_value, workdir, Cli};
use crate::config::Settings;
use crate::crypto::encrypt_value;
use crate::errors::Result;

/// Execute the `set` command.
pub fn execute(cli: &Cli, name: &str, value: Option<&str>, plain: bool) -> Result<()> {
    validate_name(name)?;

    let workdir = workdir(cli)?;
    let settings = Settings::load(&workdir)?;
    let keys = key_strategy(cli, &settings, &workdir)?;

    // Fail on a missing identity before asking for the value.
    let master_key = if plain { None } else { Some(keys.master_key()?) };

    let plaintext = read_secret_value(name, value)?;
    let stored = match master_key {
        Some(mk) => encrypt_value(mk, plaintext.as_bytes(), name)?.to_string(),
        None => plaintext.as_str().to_string(),
    };

    let mut file = EnvFile::load(&settings.env_file_path(&workdir))?;
    let existed = file.set(name, &stored)?;
    file.save()?;

    log_audit(
        &settings,
        &workdir,
        Op::Set,
        EntryFields {
            scope: Some(vec![name.to_string()]),
            ..EntryFields::default()
        },
    );

    let file_name = file.path().display();
    let verb = if existed { "updated in" } else { "added to" };
    let how = if plain { "plaintext" } else { "encrypted" };
    output::success(&format!(
        "'{name}' {verb} {file_name} ({how}, {} total)",
        file.len()
    ));
    output::tip("Run your app: envx run -- <command>");

    Ok(())
}

//! `envx delete` — remove a variable from the env file.

use dialoguer::Confirm;

use crate::audit::{EntryFields, Op};
use crate::cli::env_parser::EnvFile;
use crate::cli::{log_audit, output, workdir, Cli};
use crate::config::Settings;
use crate::errors::{EnvxError, Result};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, name: &str, force: bool) -> Result<()> {
    let workdir = workdir(cli)?;
    let settings = Settings::load(&workdir)?;
    let mut file = EnvFile::load(&settings.env_file_path(&workdir))?;

    if file.get(name).is_none() {
        return Err(EnvxError::SecretNotFound(name.to_string()));
    }

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete '{name}' from {}?", file.path().display()))
            .default(false)
            .interact()
            .map_err(|e| EnvxError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    file.remove(name);
    file.save()?;

    log_audit(
        &settings,
        &workdir,
        Op::Delete,
        EntryFields {
            scope: Some(vec![name.to_string()]),
            ..EntryFields::default()
        },
    );
    output::success(&format!("Deleted '{name}'"));

    Ok(())
}

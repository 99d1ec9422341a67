//! `envx run` — run a command with the env file's values injected.

use std::process::Command;

use crate::audit::{EntryFields, Op};
use crate::cli::env_parser::EnvFile;
use crate::cli::{key_strategy, log_audit, output, workdir, Cli};
use crate::config::Settings;
use crate::errors::{EnvxError, Result};

/// Execute the `run` command, forwarding the child's exit code.
pub fn execute(cli: &Cli, command: &[String]) -> Result<()> {
    if command.is_empty() {
        return Err(EnvxError::NoCommandSpecified);
    }

    let workdir = workdir(cli)?;
    let settings = Settings::load(&workdir)?;
    let keys = key_strategy(cli, &settings, &workdir)?;
    let file = EnvFile::load(&settings.env_file_path(&workdir))?;

    let secrets = file.reveal_all(&keys)?;
    output::success(&format!(
        "Injected {} secrets into environment",
        secrets.len()
    ));

    let program = &command[0];
    let mut fields = EntryFields {
        scope: Some(secrets.iter().map(|(name, _)| name.clone()).collect()),
        command: Some(program.clone()),
        ..EntryFields::default()
    };

    let status = Command::new(program)
        .args(&command[1..])
        .envs(secrets)
        .status();

    let status = match status {
        Ok(status) => status,
        Err(e) => {
            log_audit(&settings, &workdir, Op::Get, fields);
            return Err(EnvxError::CommandFailed(format!("failed to start '{program}': {e}")));
        }
    };

    fields.exit_code = status.code();
    log_audit(&settings, &workdir, Op::Get, fields);

    match status.code() {
        Some(0) => Ok(()),
        Some(code) => Err(EnvxError::ChildProcessFailed(code)),
        None => Err(EnvxError::CommandFailed(
            "child process terminated by signal".into(),
        )),
    }
}

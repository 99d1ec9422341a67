//! `envx envelope` — hand scoped, time-boxed secrets to an agent.
//!
//! Usage:
//!   envx envelope create --scope DB_URL,API_KEY --ttl 30m
//!   envx envelope inspect <TOKEN>
//!   envx envelope run <TOKEN> -- npm test
//!   envx envelope list

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;

use crate::agent::AgentEnvelope;
use crate::audit::{AuditLog, EntryFields, Op};
use crate::cli::env_parser::load_secrets;
use crate::cli::{key_strategy, log_audit, output, parse_ttl, read_token, workdir, Cli};
use crate::config::Settings;
use crate::errors::{EnvxError, Result};

/// Execute `envelope create`.
pub fn create(
    cli: &Cli,
    scope: &[String],
    ttl: Option<&str>,
    output_file: Option<&Path>,
) -> Result<()> {
    let workdir = workdir(cli)?;
    let settings = Settings::load(&workdir)?;
    let keys = key_strategy(cli, &settings, &workdir)?;

    let ttl_str = ttl.unwrap_or(settings.default_ttl.as_str());
    let ttl = parse_ttl(ttl_str)?;

    let env_path = settings.env_file_path(&workdir);
    tracing::debug!(path = %env_path.display(), scope = ?scope, "loading secrets");
    let secrets = load_secrets(&env_path, scope, &keys)?;

    let envelope = AgentEnvelope::create(&secrets, scope, ttl)?;
    let token = envelope.to_token()?;

    log_audit(
        &settings,
        &workdir,
        Op::EnvelopeCreate,
        EntryFields {
            scope: Some(envelope.scope.clone()),
            session_id: Some(envelope.session_id.clone()),
            ttl: Some(ttl_str.to_string()),
            ..EntryFields::default()
        },
    );

    match output_file {
        Some(path) => {
            write_token_file(path, &token)?;
            output::success(&format!(
                "Envelope with {} secret(s) written to {}",
                envelope.scope.len(),
                path.display()
            ));
            output::info(&format!(
                "Expires at {}",
                envelope.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        None => println!("{token}"),
    }

    Ok(())
}

/// Execute `envelope inspect`.  Never decrypts a secret.
pub fn inspect(cli: &Cli, token: &str, json: bool) -> Result<()> {
    let token = read_token(token)?;
    let info = crate::agent::inspect_token(&token)?;

    let workdir = workdir(cli)?;
    let settings = Settings::load(&workdir)?;
    log_audit(
        &settings,
        &workdir,
        Op::EnvelopeInspect,
        EntryFields {
            session_id: Some(info.session_id.clone()),
            ..EntryFields::default()
        },
    );

    if json {
        let rendered = serde_json::to_string_pretty(&info)
            .map_err(|e| EnvxError::SerializationError(e.to_string()))?;
        println!("{rendered}");
    } else {
        output::print_envelope_info(&info);
    }

    Ok(())
}

/// Execute `envelope run` — inject the envelope's secrets into a child process.
pub fn run(cli: &Cli, token: &str, command: &[String]) -> Result<()> {
    if command.is_empty() {
        return Err(EnvxError::NoCommandSpecified);
    }

    let token = read_token(token)?;
    let envelope = AgentEnvelope::parse(&token)?;
    let secrets = envelope.unwrap()?;

    let workdir = workdir(cli)?;
    let settings = Settings::load(&workdir)?;

    output::success(&format!(
        "Injected {} secrets into environment",
        secrets.len()
    ));

    let program = &command[0];
    let args = &command[1..];

    let status = Command::new(program).args(args).envs(&secrets).status();

    let mut fields = EntryFields {
        scope: Some(envelope.scope.clone()),
        session_id: Some(envelope.session_id.clone()),
        command: Some(program.clone()),
        ..EntryFields::default()
    };

    let status = match status {
        Ok(status) => status,
        Err(e) => {
            log_audit(&settings, &workdir, Op::EnvelopeRun, fields);
            return Err(EnvxError::CommandFailed(format!("failed to start '{program}': {e}")));
        }
    };

    fields.exit_code = status.code();
    log_audit(&settings, &workdir, Op::EnvelopeRun, fields);

    // Forward the child's exit code.
    match status.code() {
        Some(0) => Ok(()),
        Some(code) => Err(EnvxError::ChildProcessFailed(code)),
        None => Err(EnvxError::CommandFailed(
            "child process terminated by signal".into(),
        )),
    }
}

/// Execute `envelope list` — recent envelope activity from the audit log.
pub fn list(cli: &Cli, last: usize) -> Result<()> {
    let workdir = workdir(cli)?;

    let entries = match AuditLog::new(&workdir).envelope_history(last) {
        Ok(entries) => entries,
        Err(EnvxError::NoAuditLog) => Vec::new(),
        Err(e) => return Err(e),
    };

    if entries.is_empty() {
        output::info("No envelope activity recorded.");
        output::tip("Run `envx envelope create --scope <KEYS>` to issue one.");
        return Ok(());
    }

    output::print_audit_table(&entries);
    Ok(())
}

/// Write a token file readable only by the owner.
fn write_token_file(path: &Path, token: &str) -> Result<()> {
    let mut file = fs::File::create(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    writeln!(file, "{token}")?;
    Ok(())
}

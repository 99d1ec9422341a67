//! `envx get` — print decrypted values from the env file.

use crate::audit::{EntryFields, Op};
use crate::cli::env_parser::EnvFile;
use crate::cli::{key_strategy, log_audit, workdir, Cli};
use crate::config::Settings;
use crate::errors::{EnvxError, Result};

/// Execute the `get` command.
///
/// With a name, prints that value.  Without one, prints every variable as a
/// JSON object.
pub fn execute(cli: &Cli, name: Option<&str>) -> Result<()> {
    let workdir = workdir(cli)?;
    let settings = Settings::load(&workdir)?;
    let keys = key_strategy(cli, &settings, &workdir)?;
    let file = EnvFile::load(&settings.env_file_path(&workdir))?;

    let scope = match name {
        Some(name) => {
            let value = file.reveal(name, &keys)?;
            println!("{value}");
            vec![name.to_string()]
        }
        None => {
            let values = file.reveal_all(&keys)?;
            let names: Vec<String> = values.iter().map(|(k, _)| k.clone()).collect();
            let object: serde_json::Map<String, serde_json::Value> = values
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect();
            let rendered = serde_json::to_string_pretty(&object)
                .map_err(|e| EnvxError::SerializationError(e.to_string()))?;
            println!("{rendered}");
            names
        }
    };

    log_audit(
        &settings,
        &workdir,
        Op::Get,
        EntryFields {
            scope: Some(scope),
            ..EntryFields::default()
        },
    );

    Ok(())
}

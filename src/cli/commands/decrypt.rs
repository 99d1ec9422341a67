//! `envx decrypt` — reveal a stored value.

use crate::audit::{EntryFields, Op};
use crate::cli::{key_strategy, log_audit, workdir, Cli};
use crate::config::Settings;
use crate::crypto::value::VALUE_PREFIX;
use crate::crypto::reveal;
use crate::errors::Result;

/// Execute the `decrypt` command.
///
/// Values without the `envx:` prefix are printed unchanged and need no
/// identity.
pub fn execute(cli: &Cli, name: &str, value: &str) -> Result<()> {
    if !value.starts_with(VALUE_PREFIX) {
        println!("{value}");
        return Ok(());
    }

    let workdir = workdir(cli)?;
    let settings = Settings::load(&workdir)?;
    let keys = key_strategy(cli, &settings, &workdir)?;

    let plaintext = reveal(keys.master_key()?, value, name)?;

    log_audit(
        &settings,
        &workdir,
        Op::Get,
        EntryFields {
            scope: Some(vec![name.to_string()]),
            ..EntryFields::default()
        },
    );

    println!("{}", plaintext.as_str());
    Ok(())
}

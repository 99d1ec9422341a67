//! `envx encrypt` — turn a plaintext into an `envx:` value for a .env file.
//!
//! Nothing is stored, so nothing is audited; `envx set` is the storing form.

use crate::cli::{key_strategy, read_secret_value, workdir, Cli};
use crate::config::Settings;
use crate::crypto::encrypt_value;
use crate::errors::Result;

/// Execute the `encrypt` command.
pub fn execute(cli: &Cli, name: &str, value: Option<&str>) -> Result<()> {
    let workdir = workdir(cli)?;
    let settings = Settings::load(&workdir)?;
    let keys = key_strategy(cli, &settings, &workdir)?;

    // Resolve the master key before prompting so a missing identity fails fast.
    let master_key = keys.master_key()?;

    let plaintext = read_secret_value(name, value)?;
    let encrypted = encrypt_value(master_key, plaintext.as_bytes(), name)?;

    println!("{encrypted}");
    Ok(())
}

//! `envx list` — show the env file's variable names.

use crate::cli::env_parser::EnvFile;
use crate::cli::{output, workdir, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `list` command.  Needs no identity and decrypts nothing.
pub fn execute(cli: &Cli) -> Result<()> {
    let workdir = workdir(cli)?;
    let settings = Settings::load(&workdir)?;
    let file = EnvFile::load(&settings.env_file_path(&workdir))?;

    let entries = file.entries();
    if entries.is_empty() {
        output::info(&format!("No variables in {}.", file.path().display()));
        output::tip("Add one: envx set <NAME>");
        return Ok(());
    }

    output::info(&format!(
        "{} — {} variable(s)",
        file.path().display(),
        entries.len()
    ));
    output::print_variables_table(&entries);

    Ok(())
}

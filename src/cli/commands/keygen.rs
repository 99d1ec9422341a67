//! `envx keygen` — generate a new workspace identity.
//!
//! Usage:
//!   envx keygen                     # print the identity to stdout
//!   envx keygen --output id.key     # write it to a file (mode 0600)

use std::path::Path;

use crate::cli::output;
use crate::crypto::Identity;
use crate::errors::Result;
use crate::identity::{write_identity_file, Ed25519Identity, PRIVATE_KEY_ENV};

/// Execute the `keygen` command.
pub fn execute(output_path: Option<&Path>) -> Result<()> {
    let identity = Ed25519Identity::generate();

    match output_path {
        Some(path) => {
            let written = write_identity_file(path, &identity)?;
            tracing::info!(path = %written.display(), "identity written");

            output::success(&format!("Identity written to {}", written.display()));
            output::info(&format!("Public key: {}", identity.recipient()));
            output::tip(&format!(
                "Set `identity_file` in .envx.toml or pass --identity {}",
                written.display()
            ));
        }
        None => {
            println!("# public key: {}", identity.recipient());
            println!("{}", identity.secret_string().as_str());
            output::warning(&format!(
                "Store this key safely; export it as {PRIVATE_KEY_ENV} to use it."
            ));
        }
    }

    Ok(())
}

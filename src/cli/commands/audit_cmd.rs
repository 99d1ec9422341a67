//! `envx audit` — display and verify the audit log.
//!
//! Usage:
//!   envx audit show              # show last 10 entries
//!   envx audit show --last 50    # show last 50
//!   envx audit verify            # check the hash chain

use crate::audit::AuditLog;
use crate::cli::{output, workdir, Cli};
use crate::errors::{EnvxError, Result};

/// Execute `audit show`.
pub fn show(cli: &Cli, last: usize) -> Result<()> {
    let workdir = workdir(cli)?;
    let log = AuditLog::new(&workdir);

    let entries = match log.show(last) {
        Ok(entries) => entries,
        Err(EnvxError::NoAuditLog) => {
            output::info("No audit log found in this workspace.");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    output::print_audit_table(&entries);
    Ok(())
}

/// Execute `audit verify`.
///
/// Exits non-zero when the chain is broken so scripts can gate on it.
pub fn verify(cli: &Cli) -> Result<()> {
    let workdir = workdir(cli)?;
    let log = AuditLog::new(&workdir);
    let report = log.verify()?;

    if report.is_intact() {
        output::success(&format!(
            "Audit chain intact ({} entries)",
            report.total_entries
        ));
        return Ok(());
    }

    tracing::warn!(breaks = ?report.breaks, "audit chain broken");
    let lines: Vec<String> = report.breaks.iter().map(ToString::to_string).collect();
    Err(EnvxError::AuditError(format!(
        "chain broken at line(s) {} of {} in {}",
        lines.join(", "),
        report.total_entries,
        log.path().display()
    )))
}

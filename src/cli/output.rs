//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::agent::{EnvelopeInfo, EnvelopeStatus};
use crate::audit::{AuditEntry, Op};
use crate::crypto::value::VALUE_PREFIX;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print envelope metadata as a two-column table.
pub fn print_envelope_info(info: &EnvelopeInfo) {
    let status = match info.status {
        EnvelopeStatus::Valid => style(info.status.as_str()).green().to_string(),
        EnvelopeStatus::Expired => style(info.status.as_str()).red().to_string(),
    };

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Session".to_string(), info.session_id.clone()]);
    table.add_row(vec![
        "Created".to_string(),
        info.created_at.format(TIME_FORMAT).to_string(),
    ]);
    table.add_row(vec![
        "Expires".to_string(),
        info.expires_at.format(TIME_FORMAT).to_string(),
    ]);
    table.add_row(vec!["Scope".to_string(), info.scope.join(", ")]);
    table.add_row(vec!["Keys".to_string(), info.keys_included.to_string()]);
    table.add_row(vec!["Status".to_string(), status]);

    println!("{table}");
}

/// Print audit entries in a formatted table.
pub fn print_audit_table(entries: &[AuditEntry]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Operation", "Session", "Scope", "Details"]);

    for entry in entries {
        let scope = entry
            .scope
            .as_ref()
            .map(|s| s.join(", "))
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            entry.timestamp.format(TIME_FORMAT).to_string(),
            colorize_operation(entry.op),
            short_session(entry.session_id.as_deref()),
            scope,
            entry_details(entry),
        ]);
    }

    println!(
        "{}",
        style(format!("{} audit entries:", entries.len())).bold()
    );
    println!("{table}");
}

/// Print env file variables with how each is stored.  Values are never shown.
pub fn print_variables_table(entries: &[(&str, &str)]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Stored"]);

    for (name, value) in entries {
        let stored = if value.starts_with(VALUE_PREFIX) {
            style("encrypted").green().to_string()
        } else {
            style("plaintext").yellow().to_string()
        };
        table.add_row(vec![name.to_string(), stored]);
    }

    println!("{table}");
}

/// Summarize the optional detail fields of an entry.
fn entry_details(entry: &AuditEntry) -> String {
    let mut parts = Vec::new();
    if let Some(ttl) = &entry.ttl {
        parts.push(format!("ttl={ttl}"));
    }
    if let Some(cmd) = &entry.command {
        parts.push(format!("cmd={cmd}"));
    }
    if let Some(code) = entry.exit_code {
        parts.push(format!("exit={code}"));
    }
    if let Some(tool) = &entry.tool {
        parts.push(format!("tool={tool}"));
    }

    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(" ")
    }
}

/// First 8 characters of a session id.
fn short_session(sid: Option<&str>) -> String {
    match sid {
        Some(sid) => sid.chars().take(8).collect(),
        None => "-".to_string(),
    }
}

/// Colorize operation names for display.
fn colorize_operation(op: Op) -> String {
    let name = op.as_str();
    match op {
        Op::EnvelopeCreate => style(name).green().to_string(),
        Op::EnvelopeRun => style(name).magenta().to_string(),
        Op::EnvelopeInspect => style(name).cyan().to_string(),
        Op::Set => style(name).blue().to_string(),
        Op::Delete => style(name).red().to_string(),
        Op::Rotate => style(name).yellow().to_string(),
        Op::Get | Op::McpCall => name.to_string(),
    }
}

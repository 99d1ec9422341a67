//! Audit entry shape as written to `audit.logl`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of operation recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    EnvelopeCreate,
    EnvelopeRun,
    EnvelopeInspect,
    Set,
    Get,
    Delete,
    Rotate,
    McpCall,
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Op::EnvelopeCreate => "envelope_create",
            Op::EnvelopeRun => "envelope_run",
            Op::EnvelopeInspect => "envelope_inspect",
            Op::Set => "set",
            Op::Get => "get",
            Op::Delete => "delete",
            Op::Rotate => "rotate",
            Op::McpCall => "mcp_call",
        }
    }

    /// Operations that hand secrets to an agent.
    pub fn is_envelope_use(self) -> bool {
        matches!(self, Op::EnvelopeCreate | Op::EnvelopeRun)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied details for an entry.  Every field is optional and
/// omitted from the JSON line when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFields {
    pub scope: Option<Vec<String>>,
    pub session_id: Option<String>,
    pub ttl: Option<String>,
    pub command: Option<String>,
    pub exit_code: Option<i32>,
    pub tool: Option<String>,
}

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,

    pub op: Op,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Vec<String>>,

    #[serde(rename = "sid", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,

    #[serde(rename = "cmd", default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(rename = "exit", default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,

    /// Hex SHA-256 of the previous raw line; empty for the first entry.
    #[serde(default)]
    pub prev_hash: String,
}

impl AuditEntry {
    pub fn new(op: Op, fields: EntryFields, timestamp: DateTime<Utc>, prev_hash: String) -> Self {
        Self {
            timestamp,
            op,
            scope: fields.scope,
            session_id: fields.session_id,
            ttl: fields.ttl,
            command: fields.command,
            exit_code: fields.exit_code,
            tool: fields.tool,
            prev_hash,
        }
    }
}

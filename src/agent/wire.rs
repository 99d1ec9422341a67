//! The `envelope:v1:` token encoding.
//!
//! The token is `envelope:v1:` followed by standard base64 of a UTF-8
//! JSON object.  Byte fields inside the JSON are base64 strings and the
//! timestamps are RFC 3339.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::AgentEnvelope;
use crate::errors::{EnvxError, Result};
use crate::format::Parsed;

/// Family prefix shared by every envelope version.
const FAMILY_PREFIX: &str = "envelope:";

/// The only version this build reads and writes.
pub const TOKEN_VERSION: &str = "v1";

/// Full prefix of a current token.
pub const TOKEN_PREFIX: &str = "envelope:v1:";

#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    #[serde(default, deserialize_with = "string_or_empty")]
    session_id: String,
    created_at: String,
    expires_at: String,
    #[serde(default, deserialize_with = "string_items")]
    scope: Vec<String>,
    #[serde(default)]
    unwrap_secret: String,
    #[serde(default)]
    wrapped_session_key: String,
    #[serde(default)]
    encrypted_secrets: BTreeMap<String, serde_json::Value>,
}

impl AgentEnvelope {
    /// Encode the envelope, unwrap secret included, as one opaque token.
    pub fn to_token(&self) -> Result<String> {
        let wire = WireEnvelope {
            session_id: self.session_id.clone(),
            created_at: self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            expires_at: self.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            scope: self.scope.clone(),
            unwrap_secret: BASE64.encode(&self.unwrap_secret),
            wrapped_session_key: BASE64.encode(&self.wrapped_session_key),
            encrypted_secrets: self
                .encrypted_secrets
                .iter()
                .map(|(name, ct)| (name.clone(), serde_json::Value::String(BASE64.encode(ct))))
                .collect(),
        };

        let json = serde_json::to_vec(&wire)
            .map_err(|e| EnvxError::SerializationError(format!("envelope: {e}")))?;

        Ok(format!("{TOKEN_PREFIX}{}", BASE64.encode(json)))
    }

    /// Recognise a token, telling foreign strings apart from broken ones.
    pub fn detect(token: &str) -> Parsed<Self> {
        let Some(rest) = token.strip_prefix(FAMILY_PREFIX) else {
            return Parsed::NotThisFormat;
        };

        let Some((version, payload)) = rest.split_once(':') else {
            return Parsed::Malformed(EnvxError::InvalidFormat("missing version marker".into()));
        };

        if version != TOKEN_VERSION {
            let looks_versioned = version
                .strip_prefix('v')
                .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
            return Parsed::Malformed(if looks_versioned {
                EnvxError::UnsupportedVersion(version.to_string())
            } else {
                EnvxError::InvalidFormat(format!("bad version marker '{version}'"))
            });
        }

        match decode_payload(payload) {
            Ok(envelope) => Parsed::Valid(envelope),
            Err(err) => Parsed::Malformed(err),
        }
    }

    /// Parse a token produced by `to_token`.
    pub fn parse(token: &str) -> Result<Self> {
        Self::detect(token)
            .into_result(|| EnvxError::InvalidFormat(format!("missing {TOKEN_PREFIX} prefix")))
    }
}

fn decode_payload(payload: &str) -> Result<AgentEnvelope> {
    let json = BASE64
        .decode(payload)
        .map_err(|e| EnvxError::InvalidFormat(format!("base64 decode: {e}")))?;

    let wire: WireEnvelope = serde_json::from_slice(&json)
        .map_err(|e| EnvxError::InvalidFormat(format!("json parse: {e}")))?;

    let created_at = parse_timestamp("created_at", &wire.created_at)?;
    let expires_at = parse_timestamp("expires_at", &wire.expires_at)?;

    let unwrap_secret = BASE64
        .decode(&wire.unwrap_secret)
        .map_err(|e| EnvxError::InvalidFormat(format!("decode unwrap_secret: {e}")))?;
    let wrapped_session_key = BASE64
        .decode(&wire.wrapped_session_key)
        .map_err(|e| EnvxError::InvalidFormat(format!("decode wrapped_session_key: {e}")))?;

    // Entries that are not base64 strings are dropped, not fatal.
    let encrypted_secrets = wire
        .encrypted_secrets
        .into_iter()
        .filter_map(|(name, value)| {
            let ct = BASE64.decode(value.as_str()?).ok()?;
            Some((name, ct))
        })
        .collect();

    Ok(AgentEnvelope {
        session_id: wire.session_id,
        created_at,
        expires_at,
        scope: wire.scope,
        unwrap_secret,
        wrapped_session_key,
        encrypted_secrets,
    })
}

/// A non-string `session_id` reads as empty.
fn string_or_empty<'de, D>(de: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(de)?;
    Ok(value.as_str().unwrap_or_default().to_string())
}

/// Keep only the string items of `scope`.
fn string_items<'de, D>(de: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(de)?;
    Ok(value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default())
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EnvxError::InvalidFormat(format!("parse {field}: {e}")))
}

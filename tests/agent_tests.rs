//! Integration tests for agent envelopes: create → token → parse → unwrap.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use envx::agent::{inspect_token, AgentEnvelope, EnvelopeStatus, TOKEN_PREFIX};
use envx::errors::EnvxError;

fn secrets(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn scope(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn scoped_roundtrip_through_token() {
    let envelope = AgentEnvelope::create(
        &secrets(&[("A", "1"), ("B", "2")]),
        &scope(&["A"]),
        Duration::hours(1),
    )
    .unwrap();

    let token = envelope.to_token().unwrap();
    assert!(token.starts_with(TOKEN_PREFIX));

    let parsed = AgentEnvelope::parse(&token).unwrap();
    assert_eq!(parsed, envelope);

    let unwrapped = parsed.unwrap().unwrap();
    assert_eq!(unwrapped, secrets(&[("A", "1")]));
}

#[test]
fn expired_envelope_refuses_to_unwrap() {
    let envelope = AgentEnvelope::create(
        &secrets(&[("A", "1")]),
        &scope(&["A"]),
        Duration::hours(-1),
    )
    .unwrap();

    let parsed = AgentEnvelope::parse(&envelope.to_token().unwrap()).unwrap();
    assert!(matches!(parsed.unwrap(), Err(EnvxError::Expired(_))));
    assert_eq!(parsed.inspect().status, EnvelopeStatus::Expired);
}

#[test]
fn envelope_expires_exactly_at_deadline() {
    let envelope =
        AgentEnvelope::create(&secrets(&[("A", "1")]), &scope(&["A"]), Duration::minutes(5))
            .unwrap();

    let before = envelope.expires_at - Duration::seconds(1);
    assert!(envelope.unwrap_at(before).is_ok());
    assert!(matches!(
        envelope.unwrap_at(envelope.expires_at),
        Err(EnvxError::Expired(_))
    ));
}

#[test]
fn create_validates_inputs() {
    let one = secrets(&[("A", "1")]);

    assert!(matches!(
        AgentEnvelope::create(&HashMap::new(), &scope(&["A"]), Duration::hours(1)),
        Err(EnvxError::EmptySecrets)
    ));
    assert!(matches!(
        AgentEnvelope::create(&one, &[], Duration::hours(1)),
        Err(EnvxError::EmptyScope)
    ));
    assert!(matches!(
        AgentEnvelope::create(&one, &scope(&["A", "B"]), Duration::hours(1)),
        Err(EnvxError::ScopeKeyMissing(name)) if name == "B"
    ));
}

#[test]
fn inspect_reveals_metadata_only() {
    let envelope = AgentEnvelope::create(
        &secrets(&[("DB_URL", "postgres://x"), ("API_KEY", "k")]),
        &scope(&["DB_URL", "API_KEY"]),
        Duration::minutes(30),
    )
    .unwrap();
    let token = envelope.to_token().unwrap();

    let info = inspect_token(&token).unwrap();
    assert_eq!(info.session_id, envelope.session_id);
    assert_eq!(info.scope, scope(&["DB_URL", "API_KEY"]));
    assert_eq!(info.keys_included, 2);
    assert_eq!(info.status, EnvelopeStatus::Valid);
    assert!(info.expires_at > Utc::now());

    let json = serde_json::to_string(&info).unwrap();
    assert!(!json.contains("postgres://x"));
}

#[test]
fn each_envelope_gets_a_new_session() {
    let s = secrets(&[("A", "1")]);
    let a = AgentEnvelope::create(&s, &scope(&["A"]), Duration::hours(1)).unwrap();
    let b = AgentEnvelope::create(&s, &scope(&["A"]), Duration::hours(1)).unwrap();
    assert_ne!(a.session_id, b.session_id);
    assert_ne!(a.unwrap_secret, b.unwrap_secret);
}

#[test]
fn parse_rejects_foreign_and_future_tokens() {
    assert!(matches!(
        AgentEnvelope::parse("not-a-token"),
        Err(EnvxError::InvalidFormat(_))
    ));
    assert!(matches!(
        AgentEnvelope::parse("envelope:v2:e30="),
        Err(EnvxError::UnsupportedVersion(v)) if v == "v2"
    ));
    assert!(matches!(
        AgentEnvelope::parse("envelope:v1:!!!not-base64!!!"),
        Err(EnvxError::InvalidFormat(_))
    ));
}

#[test]
fn tampered_unwrap_secret_fails_decryption() {
    let mut envelope =
        AgentEnvelope::create(&secrets(&[("A", "1")]), &scope(&["A"]), Duration::hours(1))
            .unwrap();
    envelope.unwrap_secret[0] ^= 0xFF;

    assert!(matches!(
        envelope.unwrap(),
        Err(EnvxError::DecryptionFailed(_))
    ));
}

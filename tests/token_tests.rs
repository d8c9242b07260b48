// Signed-token behavior through the public API

use dogyenta_algo::token::{TokenCodec, TokenError};
use serde_json::{Map, Value};
use std::time::Duration;

fn payload() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("email".to_string(), Value::from("adopter@example.com"));
    map.insert("sub".to_string(), Value::from("user-42"));
    map
}

#[test]
fn test_issue_and_verify_round_trip() {
    let codec = TokenCodec::new("integration-secret").unwrap();
    let token = codec.issue(&payload(), Duration::from_secs(3600)).unwrap();

    // Compact three-part form
    assert_eq!(token.split('.').count(), 3);

    let claims = codec.verify(&token).unwrap();
    assert_eq!(claims.get("email").unwrap(), "adopter@example.com");
    assert_eq!(claims.get("sub").unwrap(), "user-42");
}

#[test]
fn test_jti_is_unique_per_token() {
    let codec = TokenCodec::new("integration-secret").unwrap();
    let (_, jti_a) = codec
        .issue_with_jti(&payload(), Duration::from_secs(3600))
        .unwrap();
    let (_, jti_b) = codec
        .issue_with_jti(&payload(), Duration::from_secs(3600))
        .unwrap();
    assert_ne!(jti_a, jti_b);
}

#[test]
fn test_payload_tampering_is_rejected() {
    let codec = TokenCodec::new("integration-secret").unwrap();
    let token = codec.issue(&payload(), Duration::from_secs(3600)).unwrap();

    // Swap the payload segment for one signed with a different secret
    let other = TokenCodec::new("attacker-secret").unwrap();
    let mut evil_payload = payload();
    evil_payload.insert("email".to_string(), Value::from("victim@example.com"));
    let forged = other
        .issue(&evil_payload, Duration::from_secs(3600))
        .unwrap();

    let parts: Vec<&str> = token.split('.').collect();
    let forged_parts: Vec<&str> = forged.split('.').collect();
    let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

    assert!(codec.verify(&spliced).is_err());
    assert!(matches!(
        codec.verify(&forged),
        Err(TokenError::BadSignature)
    ));
}

#[test]
fn test_garbage_is_malformed_not_a_panic() {
    let codec = TokenCodec::new("integration-secret").unwrap();
    for garbage in ["", "x", "a.b", "a.b.c.d", "not base64 at all!!"] {
        assert!(matches!(codec.verify(garbage), Err(TokenError::Malformed)));
    }
}

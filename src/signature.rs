//! GitHub webhook authenticity checks (`X-Hub-Signature`, HMAC-SHA1).

use serde_json::Value;
use tracing::error;

use hex::decode as hex_decode;
use hmac::{Hmac, Mac};
use sha1::Sha1;
type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_PREFIX: &str = "sha1";

/// Why an inbound webhook was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureRejection {
    #[error("The X-Hub-Signature header was not received in the request.")]
    MissingSignature,

    #[error("The X-GitHub-Event header was not received in the request.")]
    MissingEvent,

    #[error("Invalid webhook payload: {0}")]
    MissingRepository(String),

    #[error("Invalid X-Hub-Signature header: {0}")]
    MalformedSignature(String),

    #[error("The received webhook payload was not signed with the configured secret.")]
    DigestMismatch,
}

/// Checks `signature_header` (`sha1=<hex>`) against the HMAC-SHA1 of `payload`.
pub fn verify_github_signature(
    secret: &str,
    payload: &[u8],
    signature_header: &str,
) -> Result<(), SignatureRejection> {
    let malformed = || SignatureRejection::MalformedSignature(signature_header.to_string());

    let mut parts = signature_header.split('=');
    let (algorithm, git_signature) = match (parts.next(), parts.next(), parts.next()) {
        (Some(algorithm), Some(digest), None) => (algorithm, digest),
        _ => return Err(malformed()),
    };
    if algorithm != SIGNATURE_PREFIX {
        return Err(malformed());
    }

    // GitHub sends lowercase hex digests only.
    if !git_signature
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    {
        return Err(malformed());
    }
    let git_signature_bytes = hex_decode(git_signature).map_err(|_| malformed())?;

    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureRejection::DigestMismatch)?;
    mac.update(payload);

    // Constant-time comparison
    mac.verify_slice(&git_signature_bytes)
        .map_err(|_| SignatureRejection::DigestMismatch)
}

/// Runs the full acceptance sequence for a GitHub webhook.
pub fn check_github_event(
    secret: &str,
    signature: Option<&str>,
    event: Option<&str>,
    contents: &[u8],
    data: &Value,
) -> Result<(), SignatureRejection> {
    let signature = signature
        .filter(|s| !s.is_empty())
        .ok_or(SignatureRejection::MissingSignature)?;

    event
        .filter(|e| !e.is_empty())
        .ok_or(SignatureRejection::MissingEvent)?;

    if !data.get("repository").is_some_and(is_truthy) {
        return Err(SignatureRejection::MissingRepository(data.to_string()));
    }

    verify_github_signature(secret, contents, signature)
}

/// Boolean form of [`check_github_event`]; logs the rejection reason.
pub fn is_valid_gh_event(
    secret: &str,
    signature: Option<&str>,
    event: Option<&str>,
    contents: &[u8],
    data: &Value,
) -> bool {
    match check_github_event(secret, signature, event, contents, data) {
        Ok(()) => true,
        Err(rejection) => {
            error!("{}", rejection);
            false
        }
    }
}

/// Hex `sha1=` signature for `payload`, as GitHub would send it.
pub fn sign_payload(secret: &str, payload: &[u8]) -> Option<String> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(format!(
        "{}={}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "s3cret";

    fn payload() -> Value {
        json!({"repository": {"full_name": "foo/bar"}})
    }

    #[test]
    fn accepts_correct_signature() {
        let body = br#"{"repository":{"full_name":"foo/bar"}}"#;
        let signature = sign_payload(SECRET, body).unwrap();
        assert_eq!(signature.len(), "sha1=".len() + 40);
        assert!(is_valid_gh_event(
            SECRET,
            Some(&signature),
            Some("deployment"),
            body,
            &payload()
        ));
    }

    #[test]
    fn known_digest_vector() {
        // HMAC-SHA1("key", "The quick brown fox jumps over the lazy dog")
        let body = b"The quick brown fox jumps over the lazy dog";
        let header = "sha1=de7c9b85b8b78aa6bc8a7a36f70a90701c9db4d9";
        assert_eq!(verify_github_signature("key", body, header), Ok(()));
        assert_eq!(sign_payload("key", body).unwrap(), header);

        let uppercase = "sha1=DE7C9B85B8B78AA6BC8A7A36F70A90701C9DB4D9";
        assert_eq!(
            verify_github_signature("key", body, uppercase),
            Err(SignatureRejection::MalformedSignature(uppercase.to_string()))
        );
    }

    #[test]
    fn rejects_missing_headers_and_repository() {
        let body = b"{}";
        let signature = sign_payload(SECRET, body).unwrap();

        assert_eq!(
            check_github_event(SECRET, None, Some("deployment"), body, &payload()),
            Err(SignatureRejection::MissingSignature)
        );
        assert_eq!(
            check_github_event(SECRET, Some(""), Some("deployment"), body, &payload()),
            Err(SignatureRejection::MissingSignature)
        );
        assert_eq!(
            check_github_event(SECRET, Some(&signature), None, body, &payload()),
            Err(SignatureRejection::MissingEvent)
        );
        assert!(matches!(
            check_github_event(SECRET, Some(&signature), Some("deployment"), body, &json!({})),
            Err(SignatureRejection::MissingRepository(_))
        ));
        assert!(matches!(
            check_github_event(
                SECRET,
                Some(&signature),
                Some("deployment"),
                body,
                &json!({"repository": {}})
            ),
            Err(SignatureRejection::MissingRepository(_))
        ));
        assert!(matches!(
            check_github_event(SECRET, Some(&signature), Some("deployment"), body, &json!("x")),
            Err(SignatureRejection::MissingRepository(_))
        ));
    }

    #[test]
    fn rejects_malformed_headers() {
        let body = b"{}";
        let digest = sign_payload(SECRET, body).unwrap()["sha1=".len()..].to_string();

        for header in [
            format!("sha256={}", digest),
            format!("SHA1={}", digest),
            digest.clone(),
            format!("sha1={}=", digest),
            "sha1=zz".to_string(),
            format!("sha1={}", &digest[..38]),
            format!("sha1={}00", digest),
            format!("sha1={}", digest.to_uppercase()),
        ] {
            assert!(
                verify_github_signature(SECRET, body, &header).is_err(),
                "accepted {}",
                header
            );
        }
    }

    #[test]
    fn single_bit_mutation_is_rejected() {
        let body = br#"{"repository":{"full_name":"foo/bar"},"deployment":{"id":"42"}}"#.to_vec();
        let signature = sign_payload(SECRET, &body).unwrap();
        assert!(verify_github_signature(SECRET, &body, &signature).is_ok());

        for idx in [0, body.len() / 2, body.len() - 1] {
            let mut mutated = body.clone();
            mutated[idx] ^= 0x01;
            assert_eq!(
                verify_github_signature(SECRET, &mutated, &signature),
                Err(SignatureRejection::DigestMismatch)
            );
        }

        let mut digest = hex::decode(&signature["sha1=".len()..]).unwrap();
        digest[7] ^= 0x80;
        let mutated_header = format!("sha1={}", hex::encode(digest));
        assert_eq!(
            verify_github_signature(SECRET, &body, &mutated_header),
            Err(SignatureRejection::DigestMismatch)
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = b"payload";
        let signature = sign_payload("other", body).unwrap();
        assert_eq!(
            verify_github_signature(SECRET, body, &signature),
            Err(SignatureRejection::DigestMismatch)
        );
    }
}

//! Webhook related structures

use serde_json::Value;

/// A single inbound GitHub webhook delivery.
/// Built per request and dropped once routing completes.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub event_kind: String,
    pub delivery_id: String,
    pub signature_header: String,
    pub raw_bytes: Vec<u8>,
    pub payload: Value,
}

impl WebhookEvent {
    /// `payload.repository.full_name`, if the payload carries one.
    pub fn repository_full_name(&self) -> Option<&str> {
        repository_full_name(&self.payload)
    }
}

pub fn repository_full_name(payload: &Value) -> Option<&str> {
    payload
        .get("repository")
        .and_then(|r| r.get("full_name"))
        .and_then(|n| n.as_str())
}

/// Read-only projection of `payload.deployment`.
/// Missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deployment {
    pub id: String,
    pub sha: String,
    pub task: String,
    pub environment: String,
}

impl Deployment {
    pub fn from_payload(payload: &Value) -> Self {
        let deployment = payload.get("deployment");
        let field = |name: &str| {
            deployment
                .and_then(|d| d.get(name))
                .map(scalar_to_string)
                .unwrap_or_default()
        };

        Self {
            id: field("id"),
            sha: field("sha"),
            task: field("task"),
            environment: field("environment"),
        }
    }
}

/// `payload.deployment_status`; only `state` is consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentStatus {
    pub state: Option<String>,
}

impl DeploymentStatus {
    pub fn from_payload(payload: &Value) -> Self {
        let state = payload
            .get("deployment_status")
            .and_then(|s| s.get("state"))
            .and_then(|s| s.as_str())
            .map(String::from);
        Self { state }
    }

    pub fn is_success(&self) -> bool {
        self.state.as_deref() == Some("success")
    }
}

// GitHub sends deployment ids as integers; parameters are always strings.
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deployment_fields_default_to_empty() {
        let payload = json!({"deployment": {"id": "42", "task": "deploy"}});
        let deployment = Deployment::from_payload(&payload);
        assert_eq!(
            deployment,
            Deployment {
                id: "42".into(),
                sha: "".into(),
                task: "deploy".into(),
                environment: "".into(),
            }
        );

        assert_eq!(Deployment::from_payload(&json!({})), Deployment::default());
    }

    #[test]
    fn numeric_deployment_id_becomes_string() {
        let payload = json!({"deployment": {"id": 1234567, "sha": "abc"}});
        let deployment = Deployment::from_payload(&payload);
        assert_eq!(deployment.id, "1234567");
        assert_eq!(deployment.sha, "abc");
    }

    #[test]
    fn deployment_status_success_only_on_exact_state() {
        let success = json!({"deployment_status": {"state": "success"}});
        assert!(DeploymentStatus::from_payload(&success).is_success());

        for state in ["failure", "pending", "SUCCESS"] {
            let payload = json!({"deployment_status": {"state": state}});
            assert!(!DeploymentStatus::from_payload(&payload).is_success());
        }
        assert!(!DeploymentStatus::from_payload(&json!({"deployment_status": {}})).is_success());
        assert_eq!(DeploymentStatus::from_payload(&json!("string")).state, None);
    }

    #[test]
    fn full_name_lookup() {
        let payload = json!({"repository": {"full_name": "foo/bar"}});
        assert_eq!(repository_full_name(&payload), Some("foo/bar"));
        assert_eq!(repository_full_name(&json!({"repository": "bar"})), None);
    }
}

//! Messages published to the CI trigger topics.
//!
//! Two formats are understood by the downstream job runner:
//!
//! - default format: a bare repository block, which triggers every job
//!   configured with that repository's URL
//! - custom format: flagged with `custom_format`, names a single `job` and
//!   carries the `parameters` passed to it

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{PipelineError, Result};
use crate::webhook::Deployment;

/// A single `{name, type, value}` job parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl JobParameter {
    pub fn string(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: "string".to_string(),
            value: value.to_string(),
        }
    }
}

/// Custom-format message naming the job to trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub job: String,
    pub parameters: Vec<JobParameter>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub custom_format: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Repository block of a default-format message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    pub name: String,
    pub owner: RepositoryOwner,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub name: String,
}

impl RepositoryDescriptor {
    pub fn new(host: &str, repo_org: &str, repo_name: &str) -> Self {
        Self {
            name: repo_name.to_string(),
            owner: RepositoryOwner {
                name: repo_org.to_string(),
            },
            url: format!("https://{}/{}/{}", host, repo_org, repo_name),
        }
    }
}

/// Compose the message body for a trigger topic.
///
/// Without `custom_data` this is the default format. With it, `custom_data`
/// must be a JSON object; it is returned with `custom_format: true` added and
/// every other key untouched.
pub fn compose_message(
    host: &str,
    repo_org: &str,
    repo_name: &str,
    custom_data: Option<Value>,
) -> Result<Value> {
    match custom_data {
        None => Ok(json!({
            "repository": RepositoryDescriptor::new(host, repo_org, repo_name),
        })),
        Some(Value::Object(mut data)) => {
            data.insert("custom_format".to_string(), Value::Bool(true));
            Ok(Value::Object(data))
        }
        Some(_) => Err(PipelineError::InvalidCustomData),
    }
}

/// The four deployment parameters, in the order the jobs expect them.
pub fn deployment_parameters(deployment: &Deployment) -> Vec<JobParameter> {
    vec![
        JobParameter::string("deployment_id", &deployment.id),
        JobParameter::string("sha", &deployment.sha),
        JobParameter::string("task", &deployment.task),
        JobParameter::string("environment", &deployment.environment),
    ]
}

/// Metadata passed to the CI system: the job to run and its parameters.
/// `custom_format` is stamped later by [`compose_message`].
pub fn compose_custom_data(job: &str, deployment: &Deployment) -> OutboundMessage {
    OutboundMessage {
        job: job.to_string(),
        parameters: deployment_parameters(deployment),
        custom_format: false,
    }
}

/// Full custom-format message that triggers `job` for `deployment`.
pub fn compose_job_message(
    host: &str,
    repo_org: &str,
    repo_name: &str,
    job: &str,
    deployment: &Deployment,
) -> Result<Value> {
    let custom_data = serde_json::to_value(compose_custom_data(job, deployment))
        .map_err(|_| PipelineError::InvalidCustomData)?;
    compose_message(host, repo_org, repo_name, Some(custom_data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format_describes_repository() {
        let msg = compose_message("github.com", "org", "repo", None).unwrap();
        assert_eq!(
            msg,
            json!({
                "repository": {
                    "name": "repo",
                    "owner": {"name": "org"},
                    "url": "https://github.com/org/repo",
                }
            })
        );
    }

    #[test]
    fn custom_format_keeps_keys_and_adds_marker() {
        let custom = json!({
            "job": "prov_job",
            "parameters": [{"name": "sha", "type": "string", "value": "abc"}],
            "extra": 1,
        });
        let msg = compose_message("github.com", "org", "repo", Some(custom.clone())).unwrap();

        let mut expected = custom.as_object().unwrap().clone();
        expected.insert("custom_format".into(), json!(true));
        assert_eq!(msg, Value::Object(expected));
    }

    #[test]
    fn non_object_custom_data_is_rejected() {
        for bad in [json!("job"), json!([1, 2]), json!(3), Value::Null] {
            assert!(matches!(
                compose_message("github.com", "org", "repo", Some(bad)),
                Err(PipelineError::InvalidCustomData)
            ));
        }
    }

    #[test]
    fn custom_data_serializes_without_marker() {
        let custom = compose_custom_data("prov_job", &Deployment::default());
        let value = serde_json::to_value(&custom).unwrap();
        assert_eq!(value["job"], "prov_job");
        assert_eq!(value["parameters"].as_array().unwrap().len(), 4);
        assert!(value.get("custom_format").is_none());
    }

    #[test]
    fn job_message_carries_four_parameters() {
        let deployment = Deployment {
            id: "42".into(),
            sha: "deadbeef".into(),
            ..Default::default()
        };
        let msg = compose_job_message("github.com", "org", "repo", "prov_job", &deployment).unwrap();
        let parsed: OutboundMessage = serde_json::from_value(msg).unwrap();

        assert_eq!(
            parsed,
            OutboundMessage {
                job: "prov_job".into(),
                parameters: vec![
                    JobParameter::string("deployment_id", "42"),
                    JobParameter::string("sha", "deadbeef"),
                    JobParameter::string("task", ""),
                    JobParameter::string("environment", ""),
                ],
                custom_format: true,
            }
        );
    }
}

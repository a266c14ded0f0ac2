//! Process configuration, read once at startup.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::error::{PipelineError, Result};

pub const DEFAULT_REPO_ORG: &str = "foo";
pub const DEFAULT_REPO_NAME: &str = "bar";
pub const DEFAULT_TOPIC: &str = "insert_sns_arn_here";
pub const DEFAULT_PROVISIONING_JOB: &str = "prov_job";
pub const DEFAULT_SECOND_STAGE_JOB: &str = "sitespeed_job";
pub const DEFAULT_WEBHOOK_SECRET: &str = "insert_webhook_secret_here";
pub const DEFAULT_PORT: u16 = 0;
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_GITHUB_HOST: &str = "github.com";

/// Environment variable naming an optional TOML config file
pub const CONFIG_PATH_VAR: &str = "PIPELINE_CONFIG";

/// Immutable pipeline configuration shared by the validator, router and publisher.
#[derive(Clone, PartialEq)]
pub struct PipelineConfig {
    pub repo_org: String,
    pub repo_name: String,
    pub provisioning_topic: String,
    pub second_stage_topic: String,
    pub provisioning_job: String,
    pub second_stage_job: String,
    pub webhook_secret: String,
    pub port: u16,
    pub bind_host: String,
    pub github_host: String,
    pub log_dir: Option<PathBuf>,
}

/// Shape of the optional TOML file. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    repo_org: Option<String>,
    repo_name: Option<String>,
    provisioning_topic: Option<String>,
    second_stage_topic: Option<String>,
    provisioning_job: Option<String>,
    second_stage_job: Option<String>,
    webhook_secret: Option<String>,
    port: Option<u16>,
    bind_host: Option<String>,
    github_host: Option<String>,
    log_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            repo_org: DEFAULT_REPO_ORG.to_string(),
            repo_name: DEFAULT_REPO_NAME.to_string(),
            provisioning_topic: DEFAULT_TOPIC.to_string(),
            second_stage_topic: DEFAULT_TOPIC.to_string(),
            provisioning_job: DEFAULT_PROVISIONING_JOB.to_string(),
            second_stage_job: DEFAULT_SECOND_STAGE_JOB.to_string(),
            webhook_secret: DEFAULT_WEBHOOK_SECRET.to_string(),
            port: DEFAULT_PORT,
            bind_host: DEFAULT_BIND_HOST.to_string(),
            github_host: DEFAULT_GITHUB_HOST.to_string(),
            log_dir: None,
        }
    }
}

// The secret never ends up in logs.
impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("repo_org", &self.repo_org)
            .field("repo_name", &self.repo_name)
            .field("provisioning_topic", &self.provisioning_topic)
            .field("second_stage_topic", &self.second_stage_topic)
            .field("provisioning_job", &self.provisioning_job)
            .field("second_stage_job", &self.second_stage_job)
            .field("webhook_secret", &"<redacted>")
            .field("port", &self.port)
            .field("bind_host", &self.bind_host)
            .field("github_host", &self.github_host)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl PipelineConfig {
    /// Load configuration from `.env`, the optional `PIPELINE_CONFIG` TOML file
    /// and the process environment, in increasing order of precedence.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let vars: HashMap<String, String> = std::env::vars().collect();
        let file_contents = match vars.get(CONFIG_PATH_VAR) {
            Some(path) => Some(fs::read_to_string(path).map_err(|e| {
                PipelineError::ConfigError(format!(
                    "Failed to read config file '{}': {}",
                    path, e
                ))
            })?),
            None => None,
        };

        Self::from_sources(file_contents.as_deref(), &vars)
    }

    /// Build a configuration from TOML text and a set of environment variables.
    pub fn from_sources(file_contents: Option<&str>, vars: &HashMap<String, String>) -> Result<Self> {
        let file: FileConfig = match file_contents {
            Some(text) => toml::from_str(text)?,
            None => FileConfig::default(),
        };

        let defaults = PipelineConfig::default();
        let pick = |key: &str, from_file: Option<String>, default: String| -> String {
            vars.get(key).cloned().or(from_file).unwrap_or(default)
        };

        let port = match vars.get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                PipelineError::ConfigError(format!("Invalid PORT '{}': {}", raw, e))
            })?,
            None => file.port.unwrap_or(defaults.port),
        };

        Ok(Self {
            repo_org: pick("PIPELINE_REPO_ORG", file.repo_org, defaults.repo_org),
            repo_name: pick("PIPELINE_REPO_NAME", file.repo_name, defaults.repo_name),
            provisioning_topic: pick(
                "PROVISIONING_TOPIC",
                file.provisioning_topic,
                defaults.provisioning_topic,
            ),
            second_stage_topic: pick(
                "SITESPEED_TOPIC",
                file.second_stage_topic,
                defaults.second_stage_topic,
            ),
            provisioning_job: pick(
                "PROVISIONING_JOB",
                file.provisioning_job,
                defaults.provisioning_job,
            ),
            second_stage_job: pick(
                "SITESPEED_JOB",
                file.second_stage_job,
                defaults.second_stage_job,
            ),
            webhook_secret: pick(
                "WEBHOOK_SECRET_TOKEN",
                file.webhook_secret,
                defaults.webhook_secret,
            ),
            port,
            bind_host: pick("BIND_HOST", file.bind_host, defaults.bind_host),
            github_host: pick("GITHUB_HOST", file.github_host, defaults.github_host),
            log_dir: vars.get("LOG_DIR").map(PathBuf::from).or(file.log_dir),
        })
    }

    /// The single `org/name` repository this service acts on.
    pub fn handled_repo(&self) -> String {
        format!("{}/{}", self.repo_org, self.repo_name)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

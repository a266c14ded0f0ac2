//! Decides which downstream job, if any, a validated event triggers.
//!
//! The pipeline has two stages:
//!
//! 1. A `deployment` event for the handled repository triggers the
//!    provisioning job.
//! 2. The provisioning job reports back with a `deployment_status` event;
//!    a `success` state triggers the second-stage job.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::message::compose_job_message;
use crate::publisher::{Publisher, publish_message};
use crate::webhook::{Deployment, DeploymentStatus, repository_full_name};

pub const DEPLOYMENT_EVENT: &str = "deployment";
pub const DEPLOYMENT_STATUS_EVENT: &str = "deployment_status";

/// Why no downstream action was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoActionReason {
    InvalidPayload,
    UnhandledRepository(String),
    UnhandledEvent(String),
    DeploymentNotSuccessful(Option<String>),
}

impl fmt::Display for NoActionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoActionReason::InvalidPayload => write!(f, "invalid webhook payload"),
            NoActionReason::UnhandledRepository(repo) => write!(f, "unhandled repo: {}", repo),
            NoActionReason::UnhandledEvent(event) => {
                write!(f, "{} events do not need to be handled", event)
            }
            NoActionReason::DeploymentNotSuccessful(state) => {
                write!(f, "deployment state {:?} does not continue the pipeline", state)
            }
        }
    }
}

/// Result of routing one event. Publish failures are returned as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    NoAction(NoActionReason),
    Published(String),
}

impl RouteOutcome {
    pub fn message_id(&self) -> Option<&str> {
        match self {
            RouteOutcome::Published(id) => Some(id),
            RouteOutcome::NoAction(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct EventRouter {
    config: Arc<PipelineConfig>,
    publisher: Arc<dyn Publisher>,
}

impl EventRouter {
    pub fn new(config: Arc<PipelineConfig>, publisher: Arc<dyn Publisher>) -> Self {
        Self { config, publisher }
    }

    /// Parse the webhook payload and trigger downstream jobs.
    pub async fn route(&self, event: &str, data: &Value) -> Result<RouteOutcome> {
        if !data.get("repository").is_some_and(Value::is_object) {
            error!("Invalid webhook payload: {}", data);
            return Ok(RouteOutcome::NoAction(NoActionReason::InvalidPayload));
        }

        let repo_name = repository_full_name(data).unwrap_or_default();
        if repo_name != self.config.handled_repo() {
            debug!("Unhandled repo: {}", repo_name);
            return Ok(RouteOutcome::NoAction(NoActionReason::UnhandledRepository(
                repo_name.to_string(),
            )));
        }

        match event {
            DEPLOYMENT_EVENT => {
                debug!("Deployment event passed to the handler.");
                self.handle_deployment_event(&Deployment::from_payload(data))
                    .await
            }
            DEPLOYMENT_STATUS_EVENT => {
                debug!("Deployment status event passed to the handler.");
                self.handle_deployment_status_event(
                    &Deployment::from_payload(data),
                    &DeploymentStatus::from_payload(data),
                )
                .await
            }
            other => {
                debug!("{} events do not need to be handled.", other);
                Ok(RouteOutcome::NoAction(NoActionReason::UnhandledEvent(
                    other.to_string(),
                )))
            }
        }
    }

    /// Every deployment starts the pipeline with the provisioning job. That job
    /// posts a `success` deployment status to move on to the second stage.
    pub async fn handle_deployment_event(&self, deployment: &Deployment) -> Result<RouteOutcome> {
        info!("Received deployment event");
        debug!("{:?}", deployment);

        self.trigger_job(
            &self.config.provisioning_topic,
            &self.config.provisioning_job,
            deployment,
        )
        .await
    }

    pub async fn handle_deployment_status_event(
        &self,
        deployment: &Deployment,
        status: &DeploymentStatus,
    ) -> Result<RouteOutcome> {
        info!("Received deployment status event: {:?}", status.state);
        debug!("For the deployment: {:?}", deployment);

        if !status.is_success() {
            return Ok(RouteOutcome::NoAction(
                NoActionReason::DeploymentNotSuccessful(status.state.clone()),
            ));
        }

        self.trigger_job(
            &self.config.second_stage_topic,
            &self.config.second_stage_job,
            deployment,
        )
        .await
    }

    async fn trigger_job(
        &self,
        topic: &str,
        job: &str,
        deployment: &Deployment,
    ) -> Result<RouteOutcome> {
        let message = compose_job_message(
            &self.config.github_host,
            &self.config.repo_org,
            &self.config.repo_name,
            job,
            deployment,
        )?;
        let message_id = publish_message(self.publisher.as_ref(), topic, &message).await?;
        info!("Triggered job '{}' via {} (MessageId {})", job, topic, message_id);
        Ok(RouteOutcome::Published(message_id))
    }
}

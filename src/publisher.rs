//! Publishing trigger messages to the pub/sub broker.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_config::retry::RetryConfig;
use aws_sdk_sns::error::DisplayErrorContext;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::{PipelineError, Result};

/// A pub/sub topic sink. Returns the broker-assigned message id.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, message: &str) -> Result<String>;
}

/// Publishes to AWS SNS topics; SQS queues subscribed to them feed the job runner.
#[derive(Clone, Debug)]
pub struct SnsPublisher {
    client: aws_sdk_sns::Client,
}

impl SnsPublisher {
    pub fn new(client: aws_sdk_sns::Client) -> Self {
        Self { client }
    }

    /// Client for `sdk_config` with SDK retries turned off: a publish is
    /// attempted exactly once, so a job is never triggered twice.
    pub fn from_sdk_config(sdk_config: &SdkConfig) -> Self {
        let config = aws_sdk_sns::config::Builder::from(sdk_config)
            .retry_config(RetryConfig::disabled())
            .build();
        Self::new(aws_sdk_sns::Client::from_conf(config))
    }

    /// Region and credentials come from the standard AWS environment.
    pub async fn from_env() -> Self {
        let sdk_config = aws_config::from_env()
            .retry_config(RetryConfig::disabled())
            .load()
            .await;
        Self::from_sdk_config(&sdk_config)
    }
}

#[async_trait]
impl Publisher for SnsPublisher {
    async fn publish(&self, topic: &str, message: &str) -> Result<String> {
        let response = self
            .client
            .publish()
            .topic_arn(topic)
            .message(message)
            .send()
            .await
            .map_err(|e| PipelineError::publish_failed(topic, DisplayErrorContext(&e)))?;

        match response.message_id() {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => Err(PipelineError::publish_failed(
                topic,
                format!("Could not publish message. Response was: {:?}", response),
            )),
        }
    }
}

/// Serialize `message` to JSON text and publish it to `topic`.
pub async fn publish_message(
    publisher: &dyn Publisher,
    topic: &str,
    message: &Value,
) -> Result<String> {
    let body = serde_json::to_string(message)
        .map_err(|e| PipelineError::publish_failed(topic, e))?;
    debug!("Publishing to {}. Message is {}", topic, body);

    match publisher.publish(topic, &body).await {
        Ok(message_id) => {
            debug!("Successfully published MessageId {}", message_id);
            Ok(message_id)
        }
        Err(e) => {
            error!("Publishing to {} failed: {}", topic, e);
            Err(e)
        }
    }
}

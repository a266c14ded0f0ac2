use std::io;

/// Custom error type for deploy_pipeline operations
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom data must be passed as a JSON object")]
    InvalidCustomData,

    #[error("Publish failed for topic '{topic}': {cause}")]
    PublishFailed { topic: String, cause: String },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

impl PipelineError {
    pub fn publish_failed(topic: &str, cause: impl ToString) -> Self {
        PipelineError::PublishFailed {
            topic: topic.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Helper type for Results that use PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;

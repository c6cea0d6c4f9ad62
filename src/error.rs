use crate::config::ConfigError;
use crate::datasource::{DataSourceError, LoadError};
use crate::engine::EpochError;
use crate::publish::PublishError;
use thiserror::Error;

/// Fatal failure of a job run. Nothing is published once one of these is raised.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Dataset error: {0}")]
    Dataset(#[from] LoadError),
    #[error("Missing reference data: {0}")]
    MissingReference(String),
    #[error("Epoch not found: {0}")]
    EpochNotFound(#[from] EpochError),
    #[error("Remote call failed ({context}): {source}")]
    RemoteCall {
        context: String,
        #[source]
        source: DataSourceError,
    },
    #[error("Publish failed: {0}")]
    Publish(#[from] PublishError),
    #[error("Dataset read task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl RunError {
    pub fn remote(context: impl Into<String>, source: DataSourceError) -> Self {
        RunError::RemoteCall {
            context: context.into(),
            source,
        }
    }
}

impl From<ConfigError> for RunError {
    fn from(err: ConfigError) -> Self {
        RunError::Configuration(err.to_string())
    }
}

impl From<sqlx::Error> for RunError {
    fn from(err: sqlx::Error) -> Self {
        RunError::Publish(PublishError::Database(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UnixSecs;

    #[test]
    fn test_run_error_display() {
        let err = RunError::from(ConfigError::MissingEnv("RPC_URL".to_string()));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required environment variable: RPC_URL"
        );

        let err = RunError::from(EpochError::NotFound(UnixSecs::new(42)));
        assert_eq!(
            err.to_string(),
            "Epoch not found: epoch table has no entry for boundary 42"
        );

        let err = RunError::remote("spot price RETRO", DataSourceError::RateLimited);
        assert_eq!(
            err.to_string(),
            "Remote call failed (spot price RETRO): Rate limited"
        );
    }
}

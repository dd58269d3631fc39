use thiserror::Error;
use uuid::Uuid;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid touchpoint type: {0}")]
    InvalidTouchpointType(String),

    #[error("invalid channel: {0}")]
    InvalidChannel(String),

    #[error("journey {0} not found")]
    JourneyNotFound(Uuid),

    #[error("store error: {0}")]
    Store(String),

    #[error("analysis error: {0}")]
    Analysis(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

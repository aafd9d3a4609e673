use thiserror::Error;

use crate::core::types::ActorId;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Actor not found: {0}")]
    ActorNotFound(ActorId),

    #[error("World construction failed: {0}")]
    WorldConstruction(String),

    #[error("No world bound to service '{0}'")]
    NoWorldBound(&'static str),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;

//! Host-side error type.

use bb_engine::CaslError;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("command queue full")]
    CommandQueueFull,

    #[error(transparent)]
    Engine(#[from] CaslError),
}

pub type Result<T> = std::result::Result<T, HostError>;

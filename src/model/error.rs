use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required constants: {}", .0.join(", "))]
    MissingConfig(Vec<&'static str>),

    #[error("invalid acl: {0}, expected one of `public-read`, `private`")]
    InvalidAcl(String),

    #[error("{message}")]
    Remote { message: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("failed to read attachment metadata: {message}")]
    Manifest { message: String },

    #[error("no attachment found with id {0}")]
    UnknownAttachment(u64),

    #[error("{0}")]
    Failed(String),
}

impl Error {
    pub fn remote(message: impl Into<String>) -> Self {
        Error::Remote {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

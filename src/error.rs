use thiserror::Error;

use crate::audio::decode::DecodeError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Numerical error: {0}")]
    Numerical(String),
    #[error("{name}: {source}")]
    Representation {
        name: String,
        #[source]
        source: Box<Error>,
    },
    #[error("{file}: {source}")]
    File {
        file: String,
        #[source]
        source: Box<Error>,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Attach the name of the representation that was being computed.
    pub fn in_representation(self, name: impl Into<String>) -> Self {
        Error::Representation {
            name: name.into(),
            source: Box::new(self),
        }
    }

    /// Attach the input file the error belongs to.
    pub fn in_file(self, file: impl Into<String>) -> Self {
        Error::File {
            file: file.into(),
            source: Box::new(self),
        }
    }

    pub fn is_configuration(&self) -> bool {
        match self {
            Error::Configuration(_) => true,
            Error::Representation { source, .. } | Error::File { source, .. } => source.is_configuration(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Representation { source, .. } | Error::File { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

//! Error types shared by the modem client, decoder and writers

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModemError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Login failed: {raw}")]
    Auth { raw: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
        body: String,
    },

    #[error("Unexpected response to {action}: {source}")]
    Decode {
        action: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Metrics sink error: {0}")]
    Sink(String),
}

impl ModemError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModemError>;

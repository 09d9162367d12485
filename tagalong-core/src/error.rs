//! Error types shared by the core and both front ends

use std::path::PathBuf;

/// Top-level error for anything that can stop a frame loop or a scene from starting.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("asset load failed: {0}")]
    Asset(String),

    #[error("could not schedule next frame: {0}")]
    Schedule(String),

    #[error("draw failed: {0}")]
    Render(String),
}

/// Errors raised while reading a scene configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors raised while decoding a model file.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("file too small to be a valid STL ({0} bytes)")]
    TooSmall(usize),

    #[error("unexpected end of file: header declares {declared} triangles, found {found}")]
    Truncated { declared: usize, found: usize },

    #[error("malformed ASCII STL near: {0}")]
    Ascii(String),
}

pub type Result<T> = std::result::Result<T, Error>;

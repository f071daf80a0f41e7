use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a configuration or parsing archives.
#[derive(Debug, Error)]
pub enum JdepsError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open archive {path}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("{path} is a multi-release jar file but no release was specified")]
    MultiReleaseNotSelected { path: PathBuf },

    #[error("{path}: malformed multi-release entry {entry}")]
    MalformedMultiRelease { path: PathBuf, entry: String },

    #[error("class {class} already associated with version {existing}, cannot change to {version}")]
    MultiReleaseConflict {
        class: String,
        existing: u32,
        version: u32,
    },

    #[error("module not found: {0}")]
    ModuleNotFound(String),

    #[error("invalid module descriptor in {path}: {message}")]
    ModuleDescriptor { path: PathBuf, message: String },

    #[error("module resolution failed: {0}")]
    Resolution(String),

    #[error("parse task for {archive} did not complete")]
    TaskAborted { archive: String },

    #[error("failed to start parser pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

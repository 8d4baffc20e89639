use thiserror::Error;

/// Errors surfaced while constructing a medium or provider from a parameter
/// dictionary. Runtime numerical edges inside `SampleT_maj` (infinite tMax,
/// zero majorant, empty bounds intersection) are *not* errors — those are
/// handled by explicit branches, never by this type.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("malformed parameter `{field}`: {message}")]
    Configuration { field: String, message: String },

    #[error("missing required parameter `{0}`")]
    MissingParameter(String),

    #[error("failed to read sparse grid file {path}: {source}")]
    SparseGridIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed sparse grid file {path}: {reason}")]
    SparseGridFormat { path: String, reason: String },
}

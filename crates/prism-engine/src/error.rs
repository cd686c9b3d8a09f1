use std::path::PathBuf;

use crate::render::geometry::GeometryError;
use crate::render::shader::ShaderStage;

/// Unrecoverable pipeline setup failure.
///
/// Every variant is fatal: there is no fallback shader, placeholder texture or
/// degraded rendering path. The library never terminates the process itself;
/// the host logs the diagnostic and decides how to exit.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// The graphics context could not be created or made current.
    #[error("graphics context unavailable: {0}")]
    Context(String),

    /// A GPU buffer, texture or backbuffer could not be allocated.
    #[error("allocation failed for {what}: {reason}")]
    Allocation { what: &'static str, reason: String },

    /// A shader stage failed to compile. `log` carries the compiler diagnostic.
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: ShaderStage, log: String },

    /// The two stages compiled but do not form a valid program.
    #[error("shader program failed to link:\n{log}")]
    Link { log: String },

    /// A required attribute or uniform is absent from the linked program.
    #[error("required shader symbol `{0}` not found")]
    MissingSymbol(&'static str),

    #[error("asset `{name}` not found (looked in {path})")]
    AssetNotFound { name: String, path: PathBuf },

    /// The asset exists but reading it failed (permissions, not a file, ...).
    #[error("asset `{name}` could not be read from {path}: {source}")]
    AssetRead {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image asset `{name}`: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// The pipeline configuration contradicts itself or the linked program.
    #[error("invalid pipeline configuration: {0}")]
    Config(String),

    #[error("invalid geometry: {0}")]
    Geometry(#[from] GeometryError),
}

impl SetupError {
    /// Returns the compiler or linker log when this is a shader failure.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            SetupError::Compile { log, .. } | SetupError::Link { log } => Some(log),
            _ => None,
        }
    }
}

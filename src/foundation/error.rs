/// Convenience result type used across tilerender.
pub type TileRenderResult<T> = Result<T, TileRenderError>;

/// Top-level error taxonomy used by renderer APIs.
#[derive(thiserror::Error, Debug)]
pub enum TileRenderError {
    /// Invalid render configuration, detected before any allocation.
    #[error("configuration error: {0}")]
    Config(String),

    /// The external per-pixel shading stage failed for a tile.
    #[error("shading error: {0}")]
    Shading(String),

    /// Internal invariant violated while evaluating a render step.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TileRenderError {
    /// Build a [`TileRenderError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`TileRenderError::Shading`] value.
    pub fn shading(msg: impl Into<String>) -> Self {
        Self::Shading(msg.into())
    }

    /// Build a [`TileRenderError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`TileRenderError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Whether this error was raised by configuration validation.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<serde_json::Error> for TileRenderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

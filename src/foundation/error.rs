/// Convenience result type used across radartrail.
pub type TrailResult<T> = Result<T, TrailError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum TrailError {
    /// Invalid caller-provided data (dimensions, sizes, parameters).
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or malformed configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Unreadable file or unknown container format.
    #[error("decode error: {0}")]
    Decode(String),

    /// Pixel layout outside of 8-bit indexed and 24/32-bit color.
    #[error("unsupported bit depth: {0}")]
    UnsupportedDepth(u32),

    /// Failure while encoding or writing an output frame.
    #[error("encode error: {0}")]
    Encode(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrailError {
    /// Build a [`TrailError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TrailError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`TrailError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`TrailError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

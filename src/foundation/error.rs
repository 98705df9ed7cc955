/// Convenience result type used across memecap.
pub type MemecapResult<T> = Result<T, MemecapError>;

/// Top-level error taxonomy shared by the compositor, gateway and assistant.
#[derive(thiserror::Error, Debug)]
pub enum MemecapError {
    /// Malformed or missing input, caught before any external call.
    #[error("validation error: {0}")]
    Validation(String),

    /// The source image could not be read, fetched or decoded.
    #[error("image load error: {0}")]
    ImageLoad(String),

    /// A rendering surface or font face could not be provided.
    #[error("unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    /// The upstream service failed at the transport level or returned a
    /// non-success status.
    #[error("upstream error{}: {message}", status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Upstream {
        /// HTTP status, when a response was received.
        status: Option<u16>,
        /// Human-readable failure description.
        message: String,
    },

    /// The upstream call succeeded but its payload does not match the
    /// declared response shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// No JSON value could be recovered from free-form upstream text.
    #[error("response parse error: {0}")]
    ResponseParse(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MemecapError {
    /// Build a [`MemecapError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`MemecapError::ImageLoad`] value.
    pub fn image_load(msg: impl Into<String>) -> Self {
        Self::ImageLoad(msg.into())
    }

    /// Build a [`MemecapError::UnsupportedEnvironment`] value.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedEnvironment(msg.into())
    }

    /// Build a [`MemecapError::Upstream`] value.
    pub fn upstream(status: Option<u16>, msg: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: msg.into(),
        }
    }

    /// Build a [`MemecapError::MalformedResponse`] value.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Build a [`MemecapError::ResponseParse`] value.
    pub fn response_parse(msg: impl Into<String>) -> Self {
        Self::ResponseParse(msg.into())
    }

    /// Build a [`MemecapError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Whether the failure was caused by the caller's input rather than by
    /// the environment or an external service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Serde(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

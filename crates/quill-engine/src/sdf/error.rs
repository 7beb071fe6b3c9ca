use std::fmt;

/// Why a distance-field call produced no texture.
///
/// At the public boundary every variant is handled the same way (log, release,
/// return `None`); the variants exist so logs and fallback strategies can tell
/// them apart.
#[derive(Debug, Clone, PartialEq)]
pub enum SdfError {
    /// `initialize` has not been called.
    NotInitialized,
    /// `destroy` has been called; the pipeline is terminal.
    Disposed,
    /// Missing buffers, zero counts or unusable settings.
    InvalidInput(String),
    /// The GPU device has been lost.
    ContextLost,
    /// Configuration rejected at `initialize`.
    Config(String),
    /// Resource creation, pass recording or submission failed.
    Pipeline(String),
}

impl SdfError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Short class name used in log lines.
    pub fn class(&self) -> &'static str {
        match self {
            Self::NotInitialized | Self::Disposed => "not-initialized",
            Self::InvalidInput(_) => "invalid-input",
            Self::ContextLost => "context-invalid",
            Self::Config(_) => "config",
            Self::Pipeline(_) => "pipeline-failure",
        }
    }
}

impl fmt::Display for SdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "distance-field pipeline is not initialized"),
            Self::Disposed => write!(f, "distance-field pipeline has been destroyed"),
            Self::InvalidInput(msg) => write!(f, "invalid stroke input: {msg}"),
            Self::ContextLost => write!(f, "gpu device has been lost"),
            Self::Config(msg) => write!(f, "invalid distance-field config: {msg}"),
            Self::Pipeline(msg) => write!(f, "distance-field pass failed: {msg}"),
        }
    }
}

impl std::error::Error for SdfError {}

impl From<anyhow::Error> for SdfError {
    fn from(err: anyhow::Error) -> Self {
        Self::Pipeline(format!("{err:#}"))
    }
}

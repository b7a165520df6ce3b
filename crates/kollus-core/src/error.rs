//! Error types module
//!
//! All upload failures are unified under [`UploadError`]. The three variants
//! separate caller mistakes (caught before any request is sent), failures to
//! reach or understand the server, and explicit rejections by the server.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like invalid request combinations
    Debug,
    /// Warning level - for server-side rejections
    Warn,
    /// Error level - for unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The caller supplied an invalid combination of request fields.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network, connectivity or response parse failure.
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    /// The server answered but signaled failure.
    #[error("Remote rejection{}: {message}", code_suffix(.code))]
    RemoteRejection { code: Option<i64>, message: String },
}

pub type UploadResult<T> = Result<T, UploadError>;

fn code_suffix(code: &Option<i64>) -> String {
    code.map(|c| format!(" (code {})", c)).unwrap_or_default()
}

impl UploadError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn transport(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Transport {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn rejected(code: Option<i64>, message: impl Into<String>) -> Self {
        Self::RemoteRejection {
            code,
            message: message.into(),
        }
    }

    /// Machine-readable error code (e.g., "TRANSPORT_ERROR")
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Transport { .. } => "TRANSPORT_ERROR",
            Self::RemoteRejection { .. } => "REMOTE_REJECTION",
        }
    }

    /// Whether repeating the same call could succeed. Nothing in this crate
    /// retries; the flag is informational for callers.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Configuration(_) => LogLevel::Debug,
            Self::RemoteRejection { .. } => LogLevel::Warn,
            Self::Transport { .. } => LogLevel::Error,
        }
    }
}

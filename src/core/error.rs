//! Error types for the logging engine

pub type Result<T> = std::result::Result<T, LogError>;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Sink error with sink name
    #[error("Sink '{name}' failed: {message}")]
    Sink { name: String, message: String },

    /// File sink error with path
    #[error("File sink error for '{path}': {message}")]
    FileSink { path: String, message: String },

    /// File rotation error
    #[error("Rotation failed for '{path}': {message}")]
    Rotation { path: String, message: String },

    /// All candidate endpoints rejected a batch
    #[error("Delivery failed for all {candidates} endpoints: {message}")]
    Delivery { candidates: usize, message: String },

    /// HTTP transport failure for a single endpoint
    #[error("Transport error for '{url}': {message}")]
    Transport { url: String, message: String },

    /// Endpoint answered with a failure status
    #[error("Endpoint '{url}' answered {status}")]
    EndpointStatus { url: String, status: u16 },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Errors collected while closing sinks at shutdown
    #[error("Shutdown finished with {} sink error(s): {}", errors.len(), errors.join("; "))]
    Shutdown { errors: Vec<String> },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LogError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LogError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a sink error
    pub fn sink(name: impl Into<String>, message: impl Into<String>) -> Self {
        LogError::Sink {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a file sink error
    pub fn file_sink(path: impl Into<String>, message: impl Into<String>) -> Self {
        LogError::FileSink {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a rotation error
    pub fn rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LogError::Rotation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        LogError::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LogError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LogError::Other(msg.into())
    }
}

use thiserror::Error;

/// Result type for radio pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while configuring or running a pipeline stage
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid stage configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A token on the sample stream was not a number
    #[error("Invalid sample {token:?} on line {line}")]
    ParseError { line: usize, token: String },

    /// Reading or writing the sample stream failed
    #[error("Stream I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transform panicked on one or more items
    #[error("Transform panicked on {failed} item(s): {message}")]
    TransformPanicked { failed: usize, message: String },

    /// Worker spawn or join failure
    #[error("Thread error: {0}")]
    ThreadError(String),

    /// Pool shutdown failure
    #[error("Pipeline shutdown error: {0}")]
    ShutdownError(String),
}

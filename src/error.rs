use thiserror::Error;

/// Failure reported by a transport executor for a single request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("server answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("request rejected before sending: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("no request mapping for operation '{0}'")]
    UnmappedOperation(String),
    #[error("{operation} requires parameter '{param}'")]
    MissingParam {
        operation: &'static str,
        param: &'static str,
    },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

// Error types for the Trellis binding core

use thiserror::Error;

/// Errors raised by the binding and formatting pipeline.
///
/// Ordinary malformed input never produces an `Error`; it is recorded in the
/// `ModelStateDictionary` instead. These variants cover configuration mistakes,
/// hard limits and transport-level failures.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Value provider error: {0}")]
    ValueProvider(String),

    #[error("Could not create a model binder for model object of type '{0}'")]
    NoModelBinder(String),

    #[error("Action '{action}' has more than one parameter bound from the request body: {parameters}")]
    AmbiguousBody { action: String, parameters: String },

    #[error("Model binder '{0}' is not registered")]
    InvalidBinderType(String),

    #[error("Model binding exceeded the maximum recursion depth of {depth} at '{model_name}'")]
    RecursionDepthExceeded { depth: usize, model_name: String },

    #[error("Collection bound to '{model_name}' exceeded the maximum size of {limit}")]
    CollectionTooLarge { limit: usize, model_name: String },

    #[error("No service registered for type '{0}'")]
    ServiceNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Unsupported Media Type: {0}")]
    UnsupportedMediaType(String),

    #[error("Not Acceptable: {0}")]
    NotAcceptable(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::ValueProvider(_) => 400,
            Error::BadRequest(_) => 400,
            Error::Deserialization(_) => 400,
            Error::CollectionTooLarge { .. } => 400,
            Error::UnsupportedMediaType(_) => 415,
            Error::NotAcceptable(_) => 406,

            // Default to 500 for configuration and server-side failures
            _ => 500,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

//! Error types for the meeting gateway

use thiserror::Error;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors that can occur while running gateway sessions
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Reading a configuration file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A call leg rejected an operation
    #[error("Call leg error in {operation}: {details}")]
    Leg { operation: String, details: String },

    /// The telephony platform could not place a call
    #[error("Telephony error: {message}")]
    Telephony { message: String },

    /// Operation attempted in a state that does not allow it
    #[error("Invalid state: {message}")]
    InvalidState { message: String },
}

impl GatewayError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a call leg error
    pub fn leg(operation: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Leg {
            operation: operation.into(),
            details: details.into(),
        }
    }

    /// Create a telephony error
    pub fn telephony(message: impl Into<String>) -> Self {
        Self::Telephony {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }
}

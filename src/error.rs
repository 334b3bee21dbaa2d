//! Error types for spell-bridge
//!
//! Provides structured error handling across all bridge components.

use thiserror::Error;

/// Main error type for the bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Error loading, instantiating, or initializing the guest module.
    /// Terminal: a facade that failed to construct cannot be retried.
    #[error("module error: {message}")]
    Module {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Error reading or writing guest linear memory
    #[error("memory error: {message}")]
    Memory { message: String },

    /// Bounds fault while decoding a result buffer
    #[error("decode error at offset {offset}: needed {needed} bytes, {available} available")]
    Decode {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Guest contract violation observed by the host
    #[error("contract violation: {message}")]
    Contract { message: String },

    /// Worker initialization or request failure
    #[error("worker error: {message}")]
    Worker { message: String },

    /// Text could not be decoded with the configured encoding
    #[error("encoding error: {message}")]
    Encoding { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Create a module error
    pub fn module(message: impl Into<String>) -> Self {
        Self::Module {
            message: message.into(),
            source: None,
        }
    }

    /// Create a module error with source
    pub fn module_with_source(message: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Module {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a memory error
    pub fn memory(message: impl Into<String>) -> Self {
        Self::Memory {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(offset: usize, needed: usize, available: usize) -> Self {
        Self::Decode {
            offset,
            needed,
            available,
        }
    }

    /// Create a contract-violation error
    pub fn contract(message: impl Into<String>) -> Self {
        Self::Contract {
            message: message.into(),
        }
    }

    /// Create a worker error
    pub fn worker(message: impl Into<String>) -> Self {
        Self::Worker {
            message: message.into(),
        }
    }

    /// Create an encoding error
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }
}

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

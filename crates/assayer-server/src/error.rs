//! Mock server errors.

use std::net::SocketAddr;

use thiserror::Error;

/// Result type alias using [`ServerError`].
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors raised while starting a [`MockServer`](crate::MockServer).
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("Bind error: failed to bind to {addr}")]
    Bind {
        /// The requested address.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The background runtime or thread could not be created.
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

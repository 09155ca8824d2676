//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Servidor TCP que:
//! 1. Escucha en host:port
//! 2. Acepta conexiones y las reparte a un pool fijo de workers
//! 3. Lee un request por conexión y lo despacha al router
//! 4. Escribe una respuesta y cierra

pub mod tcp;
pub mod workers;

pub use tcp::{Server, ShutdownHandle};
pub use workers::WorkerPool;

use crate::http::ParseError;
use thiserror::Error;

/// Errores del servidor
#[derive(Debug, Error)]
pub enum ServerError {
    /// No se pudo abrir el puerto
    #[error("Cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Request ilegible
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Error de socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

//! # Módulo HTTP
//!
//! Protocolo HTTP mínimo escrito a mano, sin librerías de alto nivel:
//!
//! - Parsing de un request por conexión (request line, headers, body)
//! - Sobre de respuesta fijo (`200 OK` + JSON + CORS)
//! - Códigos de estado y cuerpos de error JSON
//!
//! ### Formato de Request
//!
//! ```text
//! GET /api/v1/products/7 HTTP/1.1\r\n
//! Header-Name: Header-Value\r\n
//! \r\n
//! ```
//!
//! Una conexión lleva exactamente un request y una respuesta; después se
//! cierra. No hay keep-alive ni chunked transfer.

pub mod request;
pub mod response;
pub mod status;

pub use request::{ParseError, Request};
pub use response::{error_body, not_found_body, Response};
pub use status::StatusCode;

//! # Construcción de Respuestas HTTP
//!
//! Toda respuesta sale con el mismo sobre:
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 13\r\n
//! Access-Control-Allow-Origin: *\r\n
//! Access-Control-Allow-Methods: GET, POST, PUT, DELETE, PATCH\r\n
//! Access-Control-Allow-Headers: Content-Type\r\n
//! \r\n
//! {"ok": true}
//! ```
//!
//! El status real de la operación va dentro del JSON (`"status": 404`);
//! la status line es siempre `200 OK`, salvo el `400` para una request line
//! malformada.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use storefront_server::http::Response;
//!
//! let response = Response::envelope(r#"{"message": "Hello"}"#);
//! let bytes = response.to_bytes();
//! assert!(bytes.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```

use super::StatusCode;
use crate::codec::{self, Map};

/// Headers CORS fijos de toda respuesta
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, PATCH"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

/// Representa una respuesta HTTP completa
#[derive(Debug, Clone)]
pub struct Response {
    /// Código de la status line
    status: StatusCode,

    /// Headers en orden de escritura
    headers: Vec<(String, String)>,

    /// Cuerpo JSON
    body: Vec<u8>,
}

impl Response {
    /// Respuesta con el status dado y el sobre fijo
    ///
    /// `Content-Length` se calcula sobre los bytes UTF-8 del cuerpo.
    pub fn new(status: StatusCode, body: &str) -> Self {
        let body = body.as_bytes().to_vec();
        let mut headers = Vec::with_capacity(2 + CORS_HEADERS.len());
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
        headers.push(("Content-Length".to_string(), body.len().to_string()));
        headers.extend(
            CORS_HEADERS
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string())),
        );

        Self {
            status,
            headers,
            body,
        }
    }

    /// Respuesta normal de dispatch: siempre `200 OK`
    pub fn envelope(body: &str) -> Self {
        Self::new(StatusCode::Ok, body)
    }

    /// Respuesta para una request line malformada
    ///
    /// Cuerpo: `{"status":400,"error":"Bad Request"}`
    pub fn bad_request() -> Self {
        let status = StatusCode::BadRequest;
        Self::new(status, &error_body(status, status.reason_phrase()))
    }

    /// Convierte la respuesta a bytes listos para enviar por el socket
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(128 + self.body.len());

        // 1. Status line
        result.extend_from_slice(format!("HTTP/1.1 {}\r\n", self.status).as_bytes());

        // 2. Headers
        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        // 3. Línea vacía
        result.extend_from_slice(b"\r\n");

        // 4. Body
        result.extend_from_slice(&self.body);

        result
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Obtiene un header por nombre
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Cuerpo de error estructurado: `{"status":<code>,"error":<message>}`
///
/// # Ejemplo
/// ```
/// use storefront_server::http::{error_body, StatusCode};
///
/// assert_eq!(
///     error_body(StatusCode::NotFound, "Product not found with ID: 9"),
///     r#"{"status":404,"error":"Product not found with ID: 9"}"#
/// );
/// ```
pub fn error_body(status: StatusCode, message: &str) -> String {
    let mut body = Map::with_capacity(2);
    body.insert("status", status.as_u16());
    body.insert("error", message);
    codec::to_json(&body)
}

/// Cuerpo para una ruta inexistente
///
/// `{"status":404,"error":"Not Found","message":"No route found for GET /x"}`
pub fn not_found_body(method: &str, path: &str) -> String {
    let status = StatusCode::NotFound;
    let mut body = Map::with_capacity(3);
    body.insert("status", status.as_u16());
    body.insert("error", status.reason_phrase());
    body.insert("message", format!("No route found for {} {}", method, path));
    codec::to_json(&body)
}

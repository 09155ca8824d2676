//! # Parsing de Requests HTTP
//! src/http/request.rs
//!
//! Parser incremental sobre un `BufRead`: se lee la request line, los
//! headers hasta la línea vacía y, si hay `Content-Length`, exactamente esa
//! cantidad de bytes de body. No hay chunked ni keep-alive.
//!
//! ## Formato de un Request
//!
//! ```text
//! POST /api/v1/products HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 27\r\n
//! \r\n
//! {"name":"Mouse","price":10}
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD /path VERSION` (al menos 3 tokens)
//! 2. **Headers**: Pares `Name: Value`; las líneas sin `:` se ignoran
//! 3. **Empty Line**: separa headers del body
//! 4. **Body**: `Content-Length` bytes, o vacío

use std::collections::HashMap;
use std::io::{self, BufRead, Read};
use thiserror::Error;

/// Límite de body aceptado
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Representa un request HTTP parseado
#[derive(Debug, Clone)]
pub struct Request {
    /// Método tal como llegó (GET, POST, PATCH...)
    method: String,

    /// Path de la petición, incluida la query string si la hay
    path: String,

    /// Headers HTTP (ej: {"Host": "localhost:8080"})
    headers: HashMap<String, String>,

    /// Versión HTTP (ej: "HTTP/1.1")
    version: String,

    /// Body decodificado como UTF-8
    body: String,
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Error)]
pub enum ParseError {
    /// El cliente cerró sin mandar la request line
    #[error("Empty request")]
    EmptyRequest,

    /// Menos de 3 tokens en la request line
    #[error("Invalid request line: {0:?}")]
    InvalidRequestLine(String),

    /// Content-Length no numérico o fuera de rango
    #[error("Invalid Content-Length: {0:?}")]
    InvalidContentLength(String),

    /// Body que no es UTF-8
    #[error("Request body is not valid UTF-8")]
    InvalidBody,

    /// Error de lectura del socket
    #[error("I/O error while reading request: {0}")]
    Io(#[from] io::Error),
}

impl ParseError {
    /// El error se responde con un `400 Bad Request`
    ///
    /// Los errores de I/O y el request vacío solo se loguean.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            ParseError::InvalidRequestLine(_)
                | ParseError::InvalidContentLength(_)
                | ParseError::InvalidBody
        )
    }
}

impl Request {
    /// Lee un request completo desde el stream
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use storefront_server::http::Request;
    ///
    /// let raw = b"POST /products HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}";
    /// let request = Request::read_from(&mut &raw[..]).unwrap();
    ///
    /// assert_eq!(request.method(), "POST");
    /// assert_eq!(request.path(), "/products");
    /// assert_eq!(request.body(), "{}");
    /// ```
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<Self, ParseError> {
        // 1. Request line
        let line = read_line(reader)?.ok_or(ParseError::EmptyRequest)?;
        let (method, path, version) = Self::parse_request_line(&line)?;

        // 2. Headers hasta la línea vacía (o EOF)
        let mut headers = HashMap::new();
        while let Some(line) = read_line(reader)? {
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = Self::parse_header(&line) {
                headers.insert(name, value);
            }
        }

        // 3. Body
        let body = Self::read_body(reader, &headers)?;

        Ok(Request {
            method,
            path,
            headers,
            version,
            body,
        })
    }

    /// Parsea un request que ya está completo en memoria
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let mut reader = buffer;
        Self::read_from(&mut reader)
    }

    /// Parsea la request line
    ///
    /// Formato: `GET /path HTTP/1.1`. Tokens extra se ignoran.
    fn parse_request_line(line: &str) -> Result<(String, String, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.len() < 3 {
            return Err(ParseError::InvalidRequestLine(line.to_string()));
        }

        Ok((
            parts[0].to_string(),
            parts[1].to_string(),
            parts[2].to_string(),
        ))
    }

    /// `Name: Value` con ambos lados recortados; sin nombre no hay header
    fn parse_header(line: &str) -> Option<(String, String)> {
        let colon_pos = line.find(':')?;
        if colon_pos == 0 {
            return None;
        }
        let name = line[..colon_pos].trim().to_string();
        let value = line[colon_pos + 1..].trim().to_string();
        Some((name, value))
    }

    /// Lee exactamente `Content-Length` bytes
    fn read_body<R: Read>(
        reader: &mut R,
        headers: &HashMap<String, String>,
    ) -> Result<String, ParseError> {
        let Some(raw) = header_value(headers, "Content-Length") else {
            return Ok(String::new());
        };

        let length: usize = raw
            .parse()
            .map_err(|_| ParseError::InvalidContentLength(raw.to_string()))?;
        if length > MAX_BODY_BYTES {
            return Err(ParseError::InvalidContentLength(raw.to_string()));
        }
        if length == 0 {
            return Ok(String::new());
        }

        let mut buffer = vec![0u8; length];
        reader.read_exact(&mut buffer)?;
        String::from_utf8(buffer).map_err(|_| ParseError::InvalidBody)
    }

    // === Métodos públicos para acceder a los campos ===

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

fn header_value<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Lee una línea sin el terminador (`\r\n` o `\n`); `None` en EOF
fn read_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut raw = Vec::new();
    if reader.read_until(b'\n', &mut raw)? == 0 {
        return Ok(None);
    }
    while matches!(raw.last(), Some(b'\n' | b'\r')) {
        raw.pop();
    }
    Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
}

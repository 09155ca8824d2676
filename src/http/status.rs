//! # Códigos de Estado HTTP
//!
//! Códigos que aparecen en la status line (solo 200 y 400) y en el campo
//! `"status"` de los cuerpos de error JSON.
//!
//! - **2xx**: Éxito (200 OK)
//! - **4xx**: Error del cliente (400, 401, 404)
//! - **5xx**: Error del servidor (500, 503)

/// Representa los códigos de estado HTTP que usa el servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK - Toda respuesta de dispatch, sin importar el cuerpo
    Ok = 200,

    /// 400 Bad Request - Request line malformada o datos inválidos
    BadRequest = 400,

    /// 401 Unauthorized - Credenciales o token inválidos
    Unauthorized = 401,

    /// 404 Not Found - Ruta o recurso no encontrado
    NotFound = 404,

    /// 500 Internal Server Error - El handler falló
    InternalServerError = 500,

    /// 503 Service Unavailable - Pool de recursos agotado
    ServiceUnavailable = 503,
}

impl StatusCode {
    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use storefront_server::http::StatusCode;
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Retorna el texto de razón (reason phrase) asociado al código
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

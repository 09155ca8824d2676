//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Registro ordenado de rutas `(método, matcher, handler)`.
//!
//! ## Arquitectura
//!
//! ```text
//! (method, path, headers, body) → Router → primera ruta que acepta → handler → body JSON
//! ```
//!
//! - El orden de registro importa: gana la primera ruta cuyo método sea
//!   igual y cuyo matcher acepte el path.
//! - El registro se arma con `&mut self` al arrancar; después el router se
//!   comparte detrás de un `Arc` y solo se lee.
//! - Sin ruta → cuerpo 404; handler que falla o entra en pánico → cuerpo 500.

pub mod matcher;

pub use matcher::{PathMatcher, Template};

use crate::http::{error_body, not_found_body, StatusCode};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Error que puede devolver un handler
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Un handler recibe `(path, body, headers)` y retorna el cuerpo JSON
pub type Handler =
    Box<dyn Fn(&str, &str, &HashMap<String, String>) -> Result<String, HandlerError> + Send + Sync>;

/// Ruta registrada
pub struct Route {
    method: String,
    matcher: PathMatcher,
    handler: Handler,
}

impl Route {
    /// Método idéntico (sensible a mayúsculas) y path aceptado
    pub fn matches(&self, method: &str, path: &str) -> bool {
        self.method == method && self.matcher.matches(path)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.matcher)
    }
}

/// Router con rutas en orden de registro
pub struct Router {
    routes: Vec<Route>,

    /// Prefijo aplicado a cada ruta al registrarla (ej: "/api/v1")
    base_path: String,
}

impl Router {
    /// Crea un nuevo router vacío, sin base path
    pub fn new() -> Self {
        Self::with_base_path("")
    }

    /// Crea un router cuyas rutas quedan bajo `base_path`
    ///
    /// Una barra final en el base path se ignora.
    pub fn with_base_path(base_path: &str) -> Self {
        Self {
            routes: Vec::new(),
            base_path: base_path.trim_end_matches('/').to_string(),
        }
    }

    /// Registra una ruta con su handler
    ///
    /// # Ejemplo
    /// ```
    /// use std::collections::HashMap;
    /// use storefront_server::router::{PathMatcher, Router};
    ///
    /// let mut router = Router::with_base_path("/api/v1");
    /// router.register("GET", PathMatcher::exact("/hello"), |_path, _body, _headers| {
    ///     Ok(r#"{"message":"Hello"}"#.to_string())
    /// });
    ///
    /// let body = router.dispatch("GET", "/api/v1/hello", &HashMap::new(), "");
    /// assert_eq!(body, r#"{"message":"Hello"}"#);
    /// ```
    pub fn register<F>(&mut self, method: &str, matcher: PathMatcher, handler: F) -> &mut Self
    where
        F: Fn(&str, &str, &HashMap<String, String>) -> Result<String, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        let matcher = matcher.with_prefix(&self.base_path);
        tracing::debug!(method, route = %matcher, "route registered");
        self.routes.push(Route {
            method: method.to_string(),
            matcher,
            handler: Box::new(handler),
        });
        self
    }

    // === Atajos por método: `:x` en el template crea un matcher Param ===

    pub fn get<F>(&mut self, template: &str, handler: F) -> &mut Self
    where
        F: Fn(&str, &str, &HashMap<String, String>) -> Result<String, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.register("GET", PathMatcher::from_template(template), handler)
    }

    pub fn post<F>(&mut self, template: &str, handler: F) -> &mut Self
    where
        F: Fn(&str, &str, &HashMap<String, String>) -> Result<String, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.register("POST", PathMatcher::from_template(template), handler)
    }

    pub fn put<F>(&mut self, template: &str, handler: F) -> &mut Self
    where
        F: Fn(&str, &str, &HashMap<String, String>) -> Result<String, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.register("PUT", PathMatcher::from_template(template), handler)
    }

    pub fn patch<F>(&mut self, template: &str, handler: F) -> &mut Self
    where
        F: Fn(&str, &str, &HashMap<String, String>) -> Result<String, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.register("PATCH", PathMatcher::from_template(template), handler)
    }

    pub fn delete<F>(&mut self, template: &str, handler: F) -> &mut Self
    where
        F: Fn(&str, &str, &HashMap<String, String>) -> Result<String, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.register("DELETE", PathMatcher::from_template(template), handler)
    }

    /// Busca la primera ruta que acepta y ejecuta su handler
    ///
    /// Nunca falla: sin ruta retorna el cuerpo 404 y un handler que falla
    /// (por `Err` o por pánico) se traduce a un cuerpo 500.
    pub fn dispatch(
        &self,
        method: &str,
        path: &str,
        headers: &HashMap<String, String>,
        body: &str,
    ) -> String {
        let Some(route) = self.routes.iter().find(|route| route.matches(method, path)) else {
            tracing::debug!(method, path, "no route matched");
            return not_found_body(method, path);
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (route.handler)(path, body, headers)));

        let message = match outcome {
            Ok(Ok(response)) => return response,
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(&*payload),
        };

        tracing::error!(method, path, error = %message, "handler failed");
        error_body(
            StatusCode::InternalServerError,
            &format!("Internal Server Error: {}", message),
        )
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Segmento `index` del path (desde 0, ignorando barras vacías)
///
/// # Ejemplo
/// ```
/// use storefront_server::router::path_segment;
///
/// assert_eq!(path_segment("/api/v1/products/7", 3), Some("7"));
/// assert_eq!(path_segment("/api/v1/products/7", 4), None);
/// ```
pub fn path_segment(path: &str, index: usize) -> Option<&str> {
    path.split('/').filter(|s| !s.is_empty()).nth(index)
}

/// Segmento contando desde el final (0 = último)
///
/// Útil cuando el base path cambia la cantidad de segmentos iniciales.
pub fn path_segment_from_end(path: &str, index: usize) -> Option<&str> {
    path.split('/').filter(|s| !s.is_empty()).rev().nth(index)
}

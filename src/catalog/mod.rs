//! # Catálogo
//! src/catalog/mod.rs
//!
//! Servicios de ejemplo que usan el núcleo: productos en memoria,
//! usuarios, autenticación con tokens firmados y un health check que toma una
//! conexión del pool.
//!
//! Se construyen primero y después registran sus closures en el router;
//! nunca guardan una referencia al router.
//!
//! Los errores de negocio (404, 400, 401, 503) se devuelven como cuerpo
//! JSON con la forma `{"status":N,"error":"..."}`. Los errores internos se
//! propagan y el router los convierte en un cuerpo 500.

pub mod auth;
pub mod health;
pub mod products;
pub mod users;

pub use auth::{AuthService, NewUser, User};
pub use products::{Product, ProductStore};

use crate::codec::CodecError;
use crate::http::{error_body, StatusCode};
use crate::pool::{Pool, ResourceManager};
use crate::router::{HandlerError, Router};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found with ID: {0}")]
    NotFound(i64),

    #[error("User not found")]
    UserNotFound,

    #[error("User not found with ID: {0}")]
    UserIdNotFound(i64),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Codec(#[from] CodecError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Catalog state poisoned")]
    Poisoned,
}

impl CatalogError {
    /// Status del cuerpo de error; `None` para errores internos
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CatalogError::NotFound(_)
            | CatalogError::UserNotFound
            | CatalogError::UserIdNotFound(_) => Some(StatusCode::NotFound),
            CatalogError::Invalid(_) | CatalogError::Codec(_) => Some(StatusCode::BadRequest),
            CatalogError::Unauthorized(_) => Some(StatusCode::Unauthorized),
            CatalogError::Poisoned => None,
        }
    }
}

/// Traduce el resultado de un servicio a la respuesta del handler
pub(crate) fn respond(result: Result<String, CatalogError>) -> Result<String, HandlerError> {
    match result {
        Ok(body) => Ok(body),
        Err(e) => match e.status() {
            Some(status) => Ok(error_body(status, &e.to_string())),
            None => Err(Box::new(e)),
        },
    }
}

/// Servicios del catálogo ya construidos
pub struct Catalog<M: ResourceManager + 'static> {
    pub products: Arc<ProductStore>,
    pub auth: Arc<AuthService>,
    pub backend: Option<Arc<Pool<M>>>,
}

impl<M: ResourceManager + 'static> Catalog<M> {
    /// Registra todas las rutas, en orden: productos, usuarios, auth, health
    pub fn register_routes(&self, router: &mut Router) {
        products::register_routes(router, Arc::clone(&self.products));
        users::register_routes(router, Arc::clone(&self.auth));
        auth::register_routes(router, Arc::clone(&self.auth));
        health::register_routes(router, self.backend.clone());
        tracing::info!(routes = router.len(), base = router.base_path(), "catalog routes registered");
    }
}

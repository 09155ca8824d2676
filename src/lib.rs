//! # Storefront Server
//! src/lib.rs
//!
//! Servidor HTTP/1.1 concurrente construido sin framework: el loop de
//! aceptación, el parsing de peticiones, el router, el pool de recursos,
//! el codec JSON y los tokens firmados están implementados aquí.
//!
//! ## Arquitectura
//!
//! - `http`: Parsing de peticiones y serialización de respuestas
//! - `server`: Loop TCP, pool de workers y manejo de conexiones
//! - `router`: Rutas exactas, con parámetros (`/products/:id`) y regex
//! - `pool`: Pool acotado y bloqueante de recursos con health check
//! - `codec`: Conversión estructural entre valores y texto JSON
//! - `token`: Tokens `header.payload.signature` con HMAC-SHA256
//! - `catalog`: Servicios de ejemplo (productos, auth, health)
//! - `config`: Configuración por CLI y variables de entorno
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use storefront_server::config::Config;
//! use storefront_server::router::Router;
//! use storefront_server::server::Server;
//!
//! let mut router = Router::with_base_path("/api/v1");
//! router.get("/ping", |_, _, _| Ok(r#"{"pong":true}"#.to_string()));
//!
//! let server = Server::new(Config::default(), router);
//! server.run().expect("Error al iniciar servidor");
//! ```

pub mod catalog;
pub mod codec;
pub mod config;
pub mod http;
pub mod pool;
pub mod router;
pub mod server;
pub mod token;

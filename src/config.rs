//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor con soporte para argumentos CLI y variables
//! de entorno (el flag gana sobre la variable).
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./storefront_server --port 8080 \
//!   --workers 16 \
//!   --pool-size 5 \
//!   --backend-addr 127.0.0.1:5432 \
//!   --jwt-secret s3cr3t
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 JWT_SECRET=s3cr3t ./storefront_server
//! ```

use clap::Parser;
use std::time::Duration;
use thiserror::Error;

/// Valor inválido en la configuración
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid configuration: {0}")]
pub struct ConfigError(pub String);

/// Configuración del servidor
#[derive(Debug, Clone, Parser)]
#[command(name = "storefront_server")]
#[command(about = "Servidor HTTP de catálogo con router, pool de recursos y tokens firmados")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    /// Threads del pool de conexiones (por defecto: CPUs × 4)
    #[arg(long, env = "WORKERS")]
    pub workers: Option<usize>,

    /// Prefijo de todas las rutas de la API
    #[arg(long = "api-base-path", default_value = "/api/v1", env = "API_BASE_PATH")]
    pub api_base_path: String,

    // === Pool de recursos ===

    /// Cantidad de conexiones al backend
    #[arg(long = "pool-size", default_value = "5", env = "POOL_SIZE")]
    pub pool_size: usize,

    /// Espera máxima por una conexión libre, en milisegundos
    #[arg(long = "pool-timeout-ms", default_value = "10000", env = "POOL_TIMEOUT_MS")]
    pub pool_timeout_ms: u64,

    /// Plazo del chequeo de vida de una conexión, en milisegundos
    #[arg(
        long = "validation-timeout-ms",
        default_value = "2000",
        env = "POOL_VALIDATION_TIMEOUT_MS"
    )]
    pub validation_timeout_ms: u64,

    /// Dirección del backend (sin ella no se crea pool)
    #[arg(long = "backend-addr", env = "BACKEND_ADDR")]
    pub backend_addr: Option<String>,

    // === Tokens ===

    /// Secreto HMAC para firmar tokens
    #[arg(long = "jwt-secret", default_value = "change-me", env = "JWT_SECRET")]
    pub jwt_secret: String,

    /// Contraseña de la cuenta `admin` (sin ella no se crea ninguna cuenta)
    #[arg(long = "admin-password", env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    // === Logging ===

    /// Filtro de logs (sintaxis de `EnvFilter`)
    #[arg(long = "log", default_value = "info", env = "RUST_LOG")]
    pub log_filter: String,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use storefront_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Workers efectivos: el configurado, o CPUs × 4
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| num_cpus::get() * 4)
    }

    pub fn pool_timeout(&self) -> Duration {
        Duration::from_millis(self.pool_timeout_ms)
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_millis(self.validation_timeout_ms)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == Some(0) {
            return Err(ConfigError("Workers must be >= 1".to_string()));
        }

        if self.pool_size == 0 {
            return Err(ConfigError("Pool size must be >= 1".to_string()));
        }
        if self.pool_timeout_ms == 0 {
            return Err(ConfigError("Pool timeout must be > 0".to_string()));
        }
        if self.validation_timeout_ms == 0 {
            return Err(ConfigError("Validation timeout must be > 0".to_string()));
        }

        if self.jwt_secret.is_empty() {
            return Err(ConfigError("JWT secret cannot be empty".to_string()));
        }

        if !self.api_base_path.is_empty() && !self.api_base_path.starts_with('/') {
            return Err(ConfigError(format!(
                "API base path must start with '/': {}",
                self.api_base_path
            )));
        }

        Ok(())
    }

    /// Loguea un resumen de la configuración
    pub fn print_summary(&self) {
        tracing::info!(
            address = %self.address(),
            workers = self.worker_count(),
            base_path = %self.api_base_path,
            "network"
        );

        match &self.backend_addr {
            Some(backend) => tracing::info!(
                backend = %backend,
                size = self.pool_size,
                timeout_ms = self.pool_timeout_ms,
                validation_ms = self.validation_timeout_ms,
                "resource pool"
            ),
            None => tracing::info!("resource pool disabled (no backend address)"),
        }

        if self.jwt_secret == "change-me" {
            tracing::warn!("using the default JWT secret");
        }
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            workers: None,
            api_base_path: "/api/v1".to_string(),
            pool_size: 5,
            pool_timeout_ms: 10_000,
            validation_timeout_ms: 2_000,
            backend_addr: None,
            jwt_secret: "change-me".to_string(),
            admin_password: None,
            log_filter: "info".to_string(),
        }
    }
}

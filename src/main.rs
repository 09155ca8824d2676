//! # Storefront Server - Entry Point
//! src/main.rs
//!
//! Construye los servicios del catálogo, registra sus rutas y arranca el
//! servidor. Si hay `--backend-addr` se crea además el pool de conexiones.

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use storefront_server::catalog::{AuthService, Catalog, ProductStore};
use storefront_server::config::Config;
use storefront_server::pool::tcp::TcpManager;
use storefront_server::pool::{Pool, PoolConfig};
use storefront_server::router::Router;
use storefront_server::server::Server;
use tracing_subscriber::EnvFilter;

fn main() {
    let config = Config::parse();

    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(config) {
        tracing::error!(error = %e, "fatal error");
        std::process::exit(1);
    }
}

fn run(config: Config) -> Result<(), Box<dyn Error>> {
    config.validate()?;
    config.print_summary();

    let backend = match &config.backend_addr {
        Some(addr) => {
            let manager = TcpManager::new(addr.as_str(), config.validation_timeout())?;
            Some(Arc::new(Pool::new(manager, PoolConfig::from_config(&config))?))
        }
        None => None,
    };

    let auth = AuthService::new(config.jwt_secret.as_str());
    if let Some(password) = &config.admin_password {
        auth.add_user("admin", "admin@localhost", password, "ADMIN")?;
    }

    let catalog = Catalog {
        products: Arc::new(ProductStore::new()),
        auth: Arc::new(auth),
        backend: backend.clone(),
    };

    let mut router = Router::with_base_path(&config.api_base_path);
    catalog.register_routes(&mut router);

    let mut server = Server::new(config, router);
    if let Some(pool) = backend {
        server = server.with_pool(pool);
    }
    server.run()?;
    Ok(())
}

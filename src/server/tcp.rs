//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! El thread principal solo acepta; cada conexión se procesa de punta a
//! punta en un worker del pool. Una conexión que falla se loguea y se
//! cierra sin afectar al resto.

use super::{ServerError, WorkerPool};
use crate::config::Config;
use crate::http::{ParseError, Request, Response};
use crate::pool::PoolStatus;
use crate::router::Router;
use std::io::{BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Permite detener el accept loop desde otro thread
///
/// El flag se revisa una vez por iteración: un `accept` ya bloqueado no se
/// interrumpe hasta que llega la siguiente conexión.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    running: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Servidor HTTP concurrente
pub struct Server {
    config: Config,
    router: Arc<Router>,
    pool: Option<Arc<dyn PoolStatus>>,
    running: Arc<AtomicBool>,
}

impl Server {
    /// El router llega completo: después de esto solo se lee
    pub fn new(config: Config, router: Router) -> Self {
        Self {
            config,
            router: Arc::new(router),
            pool: None,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Pool cuyas estadísticas se reportan al arrancar y al detenerse
    pub fn with_pool(mut self, pool: Arc<dyn PoolStatus>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            running: Arc::clone(&self.running),
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Abre el puerto configurado y atiende hasta el shutdown
    pub fn run(&self) -> Result<(), ServerError> {
        let address = self.config.address();
        let listener = TcpListener::bind(&address).map_err(|source| ServerError::Bind {
            addr: address.clone(),
            source,
        })?;
        self.run_on(listener)
    }

    /// Atiende conexiones en un listener ya abierto
    pub fn run_on(&self, listener: TcpListener) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        let workers = WorkerPool::new(self.config.worker_count());

        tracing::info!(
            address = %local_addr,
            workers = workers.size(),
            routes = self.router.len(),
            "server listening"
        );
        self.log_pool_stats();

        for stream in listener.incoming() {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            match stream {
                Ok(stream) => {
                    let router = Arc::clone(&self.router);
                    workers.execute(move || {
                        let peer = stream
                            .peer_addr()
                            .map(|addr| addr.to_string())
                            .unwrap_or_else(|_| "unknown".to_string());
                        if let Err(e) = handle_connection(stream, &router) {
                            tracing::warn!(peer = %peer, error = %e, "connection failed");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }

        tracing::info!(pending = workers.pending(), "server stopping");
        drop(workers);
        self.log_pool_stats();
        tracing::info!("server stopped");
        Ok(())
    }

    fn log_pool_stats(&self) {
        if let Some(pool) = &self.pool {
            let stats = pool.stats();
            tracing::info!(
                capacity = stats.capacity,
                idle = stats.idle,
                live = stats.live,
                "pool stats"
            );
        }
    }
}

/// Procesa una conexión: un request, una respuesta
///
/// El socket se cierra al salir (drop), haya error o no.
pub fn handle_connection(stream: TcpStream, router: &Router) -> Result<(), ServerError> {
    let start = Instant::now();
    let mut reader = BufReader::new(&stream);

    let request = match Request::read_from(&mut reader) {
        Ok(request) => request,
        Err(ParseError::EmptyRequest) => {
            tracing::debug!("connection closed without a request");
            return Ok(());
        }
        Err(e) if e.is_bad_request() => {
            tracing::warn!(error = %e, "bad request");
            write_response(&stream, &Response::bad_request())?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let body = router.dispatch(
        request.method(),
        request.path(),
        request.headers(),
        request.body(),
    );
    write_response(&stream, &Response::envelope(&body))?;

    tracing::info!(
        method = request.method(),
        path = request.path(),
        bytes = body.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "request served"
    );
    Ok(())
}

fn write_response(mut stream: &TcpStream, response: &Response) -> std::io::Result<()> {
    stream.write_all(&response.to_bytes())?;
    stream.flush()
}

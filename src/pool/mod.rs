//! # Pool de Recursos
//! src/pool/mod.rs
//!
//! Pool bloqueante de capacidad fija para conexiones a un backend.
//!
//! ## Funcionamiento
//!
//! ```text
//! acquire() ──► ¿hay libres? ──sí──► chequeo de vida ──ok──► handle
//!                   │                     │
//!                   no                 inválido
//!                   │                     │
//!             Condvar::wait_timeout   se descarta y se crea uno nuevo
//!                   │
//!             timeout ──► PoolError::Timeout
//!
//! release(handle) ──► ¿cerrado? ──no──► vuelve a la lista libre + notify_one
//!                          │
//!                          sí ──► libera el hueco + notify_one
//! ```
//!
//! Un hueco libre (por un release cerrado o un reemplazo que no pudo
//! conectar) se repone en el próximo `acquire` que no encuentre recursos
//! libres, sin superar nunca la capacidad.
//!
//! Todo el estado vive bajo un único `Mutex`; los que esperan usan la
//! `Condvar` (nada de spin-polling).

pub mod tcp;

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Fábrica y verificador de recursos del pool
///
/// El pool no sabe qué es un recurso: solo pide crearlos, sondearlos y
/// preguntar si están cerrados.
pub trait ResourceManager: Send + Sync {
    type Resource: Send;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Abre un recurso nuevo
    fn connect(&self) -> Result<Self::Resource, Self::Error>;

    /// Chequeo de vida barato.
    ///
    /// `deadline` es el máximo que el chequeo puede bloquear (el
    /// `validation_timeout` del pool). Un chequeo que nunca bloquea puede
    /// ignorarlo; uno que hace I/O bloqueante debe respetarlo y tratar el
    /// vencimiento como recurso inválido.
    fn is_valid(&self, resource: &mut Self::Resource, deadline: Duration) -> bool;

    /// El recurso fue cerrado explícitamente y no puede volver al pool
    fn is_closed(&self, resource: &Self::Resource) -> bool;
}

/// Errores del pool
#[derive(Debug, Error)]
pub enum PoolError {
    /// Nadie liberó un recurso dentro del plazo
    #[error("Timeout waiting for a pooled connection after {0:?}")]
    Timeout(Duration),

    /// No se pudo abrir (o reabrir) un recurso
    #[error("Cannot create pooled connection: {0}")]
    Connect(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Un thread entró en pánico con el lock tomado
    #[error("Pool state poisoned")]
    Poisoned,
}

/// Parámetros del pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Cantidad de recursos creados al inicio
    pub capacity: usize,

    /// Tiempo máximo de espera en `acquire`
    pub acquire_timeout: Duration,

    /// Plazo del chequeo de vida
    pub validation_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            acquire_timeout: Duration::from_millis(10_000),
            validation_timeout: Duration::from_secs(2),
        }
    }
}

impl PoolConfig {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            capacity: config.pool_size,
            acquire_timeout: Duration::from_millis(config.pool_timeout_ms),
            validation_timeout: Duration::from_millis(config.validation_timeout_ms),
        }
    }
}

/// Estado protegido por el mutex
struct PoolState<R> {
    /// Recursos libres
    free: VecDeque<R>,

    /// Recursos vivos (libres + prestados); nunca supera la capacidad
    live: usize,
}

/// Foto del estado del pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: usize,
    pub idle: usize,
    pub live: usize,
}

/// Lectura de estadísticas sin conocer el tipo de recurso
pub trait PoolStatus: Send + Sync {
    fn stats(&self) -> PoolStats;
}

/// Pool bloqueante de capacidad fija
pub struct Pool<M: ResourceManager> {
    manager: M,
    config: PoolConfig,
    state: Mutex<PoolState<M::Resource>>,
    available: Condvar,
}

impl<M: ResourceManager> Pool<M> {
    /// Crea el pool y abre `capacity` recursos de inmediato
    ///
    /// Falla si alguno de los recursos iniciales no se puede abrir.
    pub fn new(manager: M, config: PoolConfig) -> Result<Self, PoolError> {
        let mut free = VecDeque::with_capacity(config.capacity);
        for _ in 0..config.capacity {
            let resource = manager
                .connect()
                .map_err(|e| PoolError::Connect(Box::new(e)))?;
            free.push_back(resource);
        }

        tracing::info!(capacity = config.capacity, "resource pool ready");

        Ok(Self {
            manager,
            state: Mutex::new(PoolState {
                live: free.len(),
                free,
            }),
            config,
            available: Condvar::new(),
        })
    }

    /// Toma un recurso, esperando como máximo `acquire_timeout`
    pub fn acquire(&self) -> Result<M::Resource, PoolError> {
        self.acquire_timeout(self.config.acquire_timeout)
    }

    /// Toma un recurso con un plazo explícito
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<M::Resource, PoolError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock()?;

        loop {
            if let Some(mut resource) = state.free.pop_front() {
                if self.manager.is_valid(&mut resource, self.config.validation_timeout) {
                    return Ok(resource);
                }
                // El inválido se descarta; su lugar lo ocupa uno nuevo para quien llamó
                tracing::warn!("pooled connection failed liveness check, recreating");
                drop(resource);
                return self.recreate_slot(state);
            }

            // Hubo releases de recursos cerrados: se repone el hueco en vez de esperar
            if state.live < self.config.capacity {
                state.live += 1;
                return self.recreate_slot(state);
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(?timeout, "pool exhausted");
                return Err(PoolError::Timeout(timeout));
            }

            let (guard, _) = self
                .available
                .wait_timeout(state, deadline - now)
                .map_err(|_| PoolError::Poisoned)?;
            state = guard;
        }
    }

    /// Igual que `acquire` pero devuelve un guard que libera al salir de scope
    pub fn get(&self) -> Result<PooledResource<'_, M>, PoolError> {
        Ok(PooledResource {
            pool: self,
            resource: Some(self.acquire()?),
        })
    }

    /// Devuelve un recurso al pool y despierta a un solo thread en espera
    ///
    /// Un recurso cerrado no vuelve a circular: se descarta sin ruido y su
    /// hueco queda disponible para una conexión nueva.
    pub fn release(&self, resource: M::Resource) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        if self.manager.is_closed(&resource) {
            // El hueco queda libre: quien espera puede abrir uno nuevo
            state.live = state.live.saturating_sub(1);
            self.available.notify_one();
            tracing::debug!("released connection was closed, dropping it");
            return;
        }

        state.free.push_back(resource);
        self.available.notify_one();
    }

    /// Abre un recurso para un hueco ya contado en `live`.
    ///
    /// La conexión se abre fuera del lock; si falla, el hueco se libera.
    fn recreate_slot(
        &self,
        state: MutexGuard<'_, PoolState<M::Resource>>,
    ) -> Result<M::Resource, PoolError> {
        drop(state);
        match self.manager.connect() {
            Ok(resource) => Ok(resource),
            Err(e) => {
                if let Ok(mut state) = self.state.lock() {
                    state.live = state.live.saturating_sub(1);
                }
                // Otro thread podría reponer el hueco
                self.available.notify_one();
                tracing::error!(error = %e, "cannot recreate pooled connection");
                Err(PoolError::Connect(Box::new(e)))
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    fn lock(&self) -> Result<MutexGuard<'_, PoolState<M::Resource>>, PoolError> {
        self.state.lock().map_err(|_| PoolError::Poisoned)
    }
}

impl<M: ResourceManager> PoolStatus for Pool<M> {
    fn stats(&self) -> PoolStats {
        let (idle, live) = match self.state.lock() {
            Ok(state) => (state.free.len(), state.live),
            Err(_) => (0, 0),
        };
        PoolStats {
            capacity: self.config.capacity,
            idle,
            live,
        }
    }
}

impl<M: ResourceManager> fmt::Debug for Pool<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool").field("stats", &self.stats()).finish()
    }
}

/// Recurso prestado que vuelve al pool al hacer drop
pub struct PooledResource<'a, M: ResourceManager> {
    pool: &'a Pool<M>,
    resource: Option<M::Resource>,
}

impl<M: ResourceManager> Deref for PooledResource<'_, M> {
    type Target = M::Resource;

    fn deref(&self) -> &Self::Target {
        // Solo `drop` vacía el Option
        self.resource.as_ref().expect("resource present until drop")
    }
}

impl<M: ResourceManager> DerefMut for PooledResource<'_, M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.resource.as_mut().expect("resource present until drop")
    }
}

impl<M: ResourceManager> Drop for PooledResource<'_, M> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            self.pool.release(resource);
        }
    }
}

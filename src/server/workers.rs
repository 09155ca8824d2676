//! # Pool de Workers
//! src/server/workers.rs
//!
//! Cantidad fija de threads que consumen una cola FIFO de conexiones.
//!
//! ```text
//! accept loop ──execute()──► [cola + Condvar] ──► worker 0..N ──► job()
//! ```
//!
//! Un job que entra en pánico no mata a su worker. Al hacer drop del pool
//! se marca el cierre, se despierta a todos y se espera a que terminen los
//! jobs ya encolados.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Queue {
    jobs: VecDeque<Job>,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    condvar: Condvar,
}

/// Pool de threads de tamaño fijo
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Lanza `size` workers (al menos uno)
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                jobs: VecDeque::new(),
                shutdown: false,
            }),
            condvar: Condvar::new(),
        });

        let workers = (0..size)
            .filter_map(|id| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("http-worker-{}", id))
                    .spawn(move || worker_loop(shared))
                    .map_err(|e| tracing::error!(worker = id, error = %e, "cannot spawn worker"))
                    .ok()
            })
            .collect();

        Self { shared, workers }
    }

    /// Encola un job; lo ejecuta el primer worker libre
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Ok(mut queue) = self.shared.queue.lock() else {
            tracing::error!("worker queue poisoned, dropping job");
            return;
        };
        if queue.shutdown {
            return;
        }
        queue.jobs.push_back(Box::new(job));
        self.shared.condvar.notify_one();
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Jobs esperando un worker
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().map(|q| q.jobs.len()).unwrap_or(0)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Ok(mut queue) = self.shared.queue.lock() {
            queue.shutdown = true;
        }
        self.shared.condvar.notify_all();

        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// Bucle de cada worker: esperar job, ejecutarlo, repetir
fn worker_loop(shared: Arc<Shared>) {
    loop {
        let job = {
            let Ok(mut queue) = shared.queue.lock() else {
                return;
            };
            loop {
                if let Some(job) = queue.jobs.pop_front() {
                    break job;
                }
                if queue.shutdown {
                    return;
                }
                queue = match shared.condvar.wait(queue) {
                    Ok(guard) => guard,
                    Err(_) => return,
                };
            }
        };

        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!(
                worker = thread::current().name().unwrap_or("?"),
                "job panicked"
            );
        }
    }
}

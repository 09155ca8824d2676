//! `GET /health`: toma y devuelve una conexión del pool
//!
//! ```text
//! {"status":"UP","pool":{"capacity":5,"idle":5,"live":5}}
//! {"status":503,"error":"Service Unavailable: Timeout waiting for a pooled connection after 10s"}
//! ```

use crate::codec::{self, Map, Value};
use crate::http::{error_body, StatusCode};
use crate::pool::{Pool, PoolStats, PoolStatus, ResourceManager};
use crate::router::Router;
use std::sync::Arc;

fn stats_value(stats: PoolStats) -> Value {
    let mut map = Map::with_capacity(3);
    map.insert("capacity", stats.capacity as i64);
    map.insert("idle", stats.idle as i64);
    map.insert("live", stats.live as i64);
    Value::Object(map)
}

/// Cuerpo del health check
pub fn check<M: ResourceManager>(pool: Option<&Pool<M>>) -> String {
    let mut body = Map::with_capacity(2);
    body.insert("status", "UP");

    match pool {
        None => {
            body.insert("pool", Value::Null);
        }
        Some(pool) => {
            if let Err(e) = pool.get() {
                tracing::warn!(error = %e, "health check could not get a connection");
                let status = StatusCode::ServiceUnavailable;
                return error_body(status, &format!("{}: {}", status.reason_phrase(), e));
            }
            body.insert("pool", stats_value(pool.stats()));
        }
    }

    codec::to_json(&body)
}

pub fn register_routes<M: ResourceManager + 'static>(
    router: &mut Router,
    pool: Option<Arc<Pool<M>>>,
) {
    router.get("/health", move |_, _, _| Ok(check(pool.as_deref())));
}

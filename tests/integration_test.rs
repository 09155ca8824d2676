//! Tests de integración para el servidor HTTP
//! tests/integration_test.rs
//!
//! Cada test levanta su propio servidor en un puerto efímero con los
//! servicios del catálogo y le habla con un cliente TCP crudo.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use storefront_server::catalog::{AuthService, Catalog, ProductStore};
use storefront_server::codec::{self, Map, Value};
use storefront_server::config::Config;
use storefront_server::pool::tcp::TcpManager;
use storefront_server::pool::{Pool, PoolConfig};
use storefront_server::router::Router;
use storefront_server::server::{Server, ShutdownHandle};

const SECRET: &str = "integration-secret";

/// Servidor corriendo en background; se detiene al salir de scope
struct TestServer {
    addr: SocketAddr,
    handle: ShutdownHandle,
    runner: Option<JoinHandle<()>>,
}

impl TestServer {
    fn start(backend: Option<Arc<Pool<TcpManager>>>) -> Self {
        let auth = AuthService::new(SECRET);
        auth.add_user("admin", "admin@localhost", "s3cr3t", "ADMIN").unwrap();

        let catalog = Catalog {
            products: Arc::new(ProductStore::new()),
            auth: Arc::new(auth),
            backend,
        };
        let mut router = Router::with_base_path("/api/v1");
        catalog.register_routes(&mut router);

        let mut config = Config::default();
        config.workers = Some(4);
        let server = Server::new(config, router);
        let handle = server.shutdown_handle();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let runner = thread::spawn(move || {
            server.run_on(listener).unwrap();
        });

        Self {
            addr,
            handle,
            runner: Some(runner),
        }
    }

    /// Envía bytes crudos y retorna la response completa
    fn send_raw(&self, raw: &[u8]) -> String {
        let mut stream = TcpStream::connect(self.addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        stream.set_write_timeout(Some(Duration::from_secs(5))).unwrap();

        stream.write_all(raw).unwrap();
        stream.flush().unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    fn send(&self, method: &str, path: &str, headers: &[(&str, &str)], body: &str) -> String {
        let mut request = format!("{} {} HTTP/1.1\r\nHost: localhost\r\n", method, path);
        for (name, value) in headers {
            request.push_str(&format!("{}: {}\r\n", name, value));
        }
        if !body.is_empty() {
            request.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        request.push_str("\r\n");
        request.push_str(body);
        self.send_raw(request.as_bytes())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.shutdown();
        // Despierta el accept bloqueado
        let _ = TcpStream::connect(self.addr);
        if let Some(runner) = self.runner.take() {
            let _ = runner.join();
        }
    }
}

/// Helper: extrae el body JSON de una response HTTP
fn extract_body(response: &str) -> &str {
    if let Some(pos) = response.find("\r\n\r\n") {
        &response[pos + 4..]
    } else {
        ""
    }
}

/// Helper: headers de la response en orden de aparición
fn extract_headers(response: &str) -> Vec<(String, String)> {
    let head = response.split("\r\n\r\n").next().unwrap_or_default();
    head.lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}

#[test]
fn test_create_and_fetch_product() {
    let server = TestServer::start(None);

    let created = server.send(
        "POST",
        "/api/v1/products",
        &[("Content-Type", "application/json")],
        r#"{"name":"Laptop","price":999.99,"stockQuantity":3,"category":"electronics"}"#,
    );
    assert!(created.starts_with("HTTP/1.1 200 OK\r\n"), "got: {}", created);
    let product: Map = codec::from_json(extract_body(&created)).unwrap();
    assert_eq!(product.get("id").and_then(Value::as_i64), Some(1));

    let response = server.send("GET", "/api/v1/products/1", &[], "");
    let body = extract_body(&response);
    let product: Map = codec::from_json(body).unwrap();
    assert_eq!(product.get("name").and_then(Value::as_str), Some("Laptop"));
    assert_eq!(product.get("price").and_then(Value::as_f64), Some(999.99));

    let headers = extract_headers(&response);
    let length = headers
        .iter()
        .find(|(name, _)| name == "Content-Length")
        .map(|(_, value)| value.parse::<usize>().unwrap())
        .unwrap();
    assert_eq!(length, body.len());
}

#[test]
fn test_product_listing_and_updates() {
    let server = TestServer::start(None);

    for (name, category) in [("Mouse", "electronics"), ("Mug", "kitchen")] {
        let body = format!(r#"{{"name":"{}","price":10.0,"stockQuantity":1,"category":"{}"}}"#, name, category);
        server.send("POST", "/api/v1/products", &[], &body);
    }

    let listing = server.send("GET", "/api/v1/products", &[], "");
    let all: Vec<Value> = codec::from_json(extract_body(&listing)).unwrap();
    assert_eq!(all.len(), 2);

    let kitchen = server.send("GET", "/api/v1/products/category/kitchen", &[], "");
    assert!(extract_body(&kitchen).contains(r#""name":"Mug""#));
    assert!(!extract_body(&kitchen).contains("Mouse"));

    let stock = server.send("PATCH", "/api/v1/products/1/stock", &[], r#"{"stockQuantity":42}"#);
    assert!(extract_body(&stock).contains(r#""stockQuantity":42"#));

    let deleted = server.send("DELETE", "/api/v1/products/2", &[], "");
    assert!(extract_body(&deleted).contains("Product deleted successfully"));

    let missing = server.send("GET", "/api/v1/products/2", &[], "");
    assert!(missing.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(
        extract_body(&missing),
        r#"{"status":404,"error":"Product not found with ID: 2"}"#
    );
}

#[test]
fn test_unknown_route_is_404_body() {
    let server = TestServer::start(None);

    let response = server.send("GET", "/nope", &[], "");
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(
        extract_body(&response),
        r#"{"status":404,"error":"Not Found","message":"No route found for GET /nope"}"#
    );
}

#[test]
fn test_malformed_request_line_is_400() {
    let server = TestServer::start(None);

    let response = server.send_raw(b"GARBAGE\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "got: {}", response);
    assert_eq!(extract_body(&response), r#"{"status":400,"error":"Bad Request"}"#);
}

#[test]
fn test_cors_headers_in_order() {
    let server = TestServer::start(None);

    let response = server.send("GET", "/api/v1/products", &[], "");
    let names: Vec<String> = extract_headers(&response)
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(
        names,
        vec![
            "Content-Type",
            "Content-Length",
            "Access-Control-Allow-Origin",
            "Access-Control-Allow-Methods",
            "Access-Control-Allow-Headers",
        ]
    );

    let headers: HashMap<String, String> = extract_headers(&response).into_iter().collect();
    assert_eq!(headers["Content-Type"], "application/json");
    assert_eq!(headers["Access-Control-Allow-Origin"], "*");
}

#[test]
fn test_login_and_me() {
    let server = TestServer::start(None);

    let login = server.send(
        "POST",
        "/api/v1/auth/login",
        &[],
        r#"{"username":"admin","password":"s3cr3t"}"#,
    );
    let login: Map = codec::from_json(extract_body(&login)).unwrap();
    let token = login.get("token").and_then(Value::as_str).unwrap().to_string();
    assert_eq!(token.split('.').count(), 3);

    let bearer = format!("Bearer {}", token);
    let me = server.send("GET", "/api/v1/auth/me", &[("Authorization", &bearer)], "");
    assert!(extract_body(&me).contains(r#""username":"admin""#));
    assert!(extract_body(&me).contains(r#""role":"ADMIN""#));

    let denied = server.send("GET", "/api/v1/auth/me", &[], "");
    assert_eq!(
        extract_body(&denied),
        r#"{"status":401,"error":"Invalid or expired token"}"#
    );
}

#[test]
fn test_health_with_backend_pool() {
    let backend = TcpListener::bind("127.0.0.1:0").unwrap();
    let manager = TcpManager::new(backend.local_addr().unwrap(), Duration::from_secs(1)).unwrap();
    let pool = Pool::new(
        manager,
        PoolConfig {
            capacity: 2,
            acquire_timeout: Duration::from_millis(500),
            validation_timeout: Duration::from_millis(50),
        },
    )
    .unwrap();
    let server = TestServer::start(Some(Arc::new(pool)));

    let response = server.send("GET", "/api/v1/health", &[], "");
    assert_eq!(
        extract_body(&response),
        r#"{"status":"UP","pool":{"capacity":2,"idle":2,"live":2}}"#
    );
}

#[test]
fn test_concurrent_clients() {
    let server = Arc::new(TestServer::start(None));

    let clients: Vec<_> = (0..8)
        .map(|i| {
            let server = Arc::clone(&server);
            thread::spawn(move || {
                let body = format!(r#"{{"name":"P{}","price":1.5,"stockQuantity":{}}}"#, i, i);
                let response = server.send("POST", "/api/v1/products", &[], &body);
                assert!(extract_body(&response).contains(&format!(r#""name":"P{}""#, i)));
            })
        })
        .collect();
    for client in clients {
        client.join().unwrap();
    }

    let listing = server.send("GET", "/api/v1/products", &[], "");
    let all: Vec<Value> = codec::from_json(extract_body(&listing)).unwrap();
    assert_eq!(all.len(), 8);
}

#[test]
fn test_deeply_nested_body_does_not_kill_server() {
    let server = TestServer::start(None);

    let deep = format!("{}{}", "[".repeat(20_000), "]".repeat(20_000));
    let response = server.send("POST", "/api/v1/products", &[], &deep);
    assert!(extract_body(&response).starts_with(r#"{"status":400,"#), "got: {}", response);

    // El servidor sigue atendiendo
    let listing = server.send("GET", "/api/v1/products", &[], "");
    assert_eq!(extract_body(&listing), "[]");
}

#[test]
fn test_user_crud_and_authenticate() {
    let server = TestServer::start(None);

    let created = server.send(
        "POST",
        "/api/v1/users",
        &[],
        r#"{"username":"ana","email":"ana@example.com","password":"pw"}"#,
    );
    let user: Map = codec::from_json(extract_body(&created)).unwrap();
    // El admin sembrado ocupa el id 1
    assert_eq!(user.get("id").and_then(Value::as_i64), Some(2));
    assert!(!extract_body(&created).contains("password"));

    let listing = server.send("GET", "/api/v1/users", &[], "");
    let all: Vec<Value> = codec::from_json(extract_body(&listing)).unwrap();
    assert_eq!(all.len(), 2);

    let ok = server.send(
        "POST",
        "/api/v1/users/authenticate",
        &[],
        r#"{"username":"ana","password":"pw"}"#,
    );
    assert!(extract_body(&ok).contains(r#""username":"ana""#));

    let deleted = server.send("DELETE", "/api/v1/users/2", &[], "");
    assert_eq!(extract_body(&deleted), r#"{"message":"User deleted successfully"}"#);

    let missing = server.send("GET", "/api/v1/users/2", &[], "");
    assert_eq!(
        extract_body(&missing),
        r#"{"status":404,"error":"User not found with ID: 2"}"#
    );
}

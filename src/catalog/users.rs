//! Usuarios
//!
//! | Ruta                        | Acción                                  |
//! |-----------------------------|-----------------------------------------|
//! | `GET /users`                | listar                                  |
//! | `GET /users/:id`            | uno por id                              |
//! | `POST /users`               | crear (`username`, `email`, `password`) |
//! | `PUT /users/:id`            | reemplazar                              |
//! | `DELETE /users/:id`         | borrar                                  |
//! | `POST /users/authenticate`  | verificar credenciales sin emitir token |
//!
//! Ninguna respuesta incluye la contraseña ni su hash.

use super::auth::{text_field, NewUser};
use super::{respond, AuthService, CatalogError};
use crate::codec::{self, Map};
use crate::router::{path_segment_from_end, Router};
use std::sync::Arc;

fn parse_id(path: &str) -> Result<i64, CatalogError> {
    path_segment_from_end(path, 0)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| CatalogError::Invalid("Invalid user ID format".into()))
}

fn authenticate(auth: &AuthService, body: &str) -> Result<String, CatalogError> {
    let credentials: Map = codec::from_json(body)?;
    let username = text_field(&credentials, "username");
    let password = text_field(&credentials, "password");
    if username.is_empty() || password.is_empty() {
        return Err(CatalogError::Invalid(
            "Username and password are required".into(),
        ));
    }
    Ok(codec::to_json(&auth.authenticate(username, password)?))
}

pub fn register_routes(router: &mut Router, auth: Arc<AuthService>) {
    let a = Arc::clone(&auth);
    router.get("/users", move |_, _, _| Ok(codec::to_json(&a.users()?)));

    let a = Arc::clone(&auth);
    router.get("/users/:id", move |path, _, _| {
        respond(parse_id(path).and_then(|id| match a.user(id)? {
            Some(user) => Ok(codec::to_json(&user)),
            None => Err(CatalogError::UserIdNotFound(id)),
        }))
    });

    let a = Arc::clone(&auth);
    router.post("/users", move |_, body, _| {
        respond(
            codec::from_json::<NewUser>(body)
                .map_err(CatalogError::from)
                .and_then(|input| a.create_user(input))
                .map(|user| codec::to_json(&user)),
        )
    });

    let a = Arc::clone(&auth);
    router.put("/users/:id", move |path, body, _| {
        respond(parse_id(path).and_then(|id| {
            let input = codec::from_json::<NewUser>(body)?;
            Ok(codec::to_json(&a.update_user(id, input)?))
        }))
    });

    let a = Arc::clone(&auth);
    router.delete("/users/:id", move |path, _, _| {
        respond(parse_id(path).and_then(|id| {
            if a.delete_user(id)? {
                let mut body = Map::new();
                body.insert("message", "User deleted successfully");
                Ok(codec::to_json(&body))
            } else {
                Err(CatalogError::UserIdNotFound(id))
            }
        }))
    });

    let a = auth;
    router.post("/users/authenticate", move |_, body, _| {
        respond(authenticate(&a, body))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Value;
    use std::collections::HashMap;

    fn router() -> Router {
        let mut router = Router::with_base_path("/api/v1");
        register_routes(&mut router, Arc::new(AuthService::new("users-secret")));
        router
    }

    fn dispatch(router: &Router, method: &str, path: &str, body: &str) -> String {
        router.dispatch(method, path, &HashMap::new(), body)
    }

    fn call(router: &Router, method: &str, path: &str, body: &str) -> Map {
        codec::from_json(&dispatch(router, method, path, body)).unwrap()
    }

    const ANA: &str = r#"{"username":"ana","email":"ana@example.com","password":"pw","fullName":"Ana Pérez"}"#;

    #[test]
    fn test_create_and_get() {
        let router = router();
        let created = call(&router, "POST", "/api/v1/users", ANA);
        assert_eq!(created.get("id").and_then(Value::as_i64), Some(1));
        assert_eq!(created.get("role").and_then(Value::as_str), Some("USER"));
        assert_eq!(created.get("active"), Some(&Value::Bool(true)));
        assert!(created.get("password").is_none());

        let fetched = call(&router, "GET", "/api/v1/users/1", "");
        assert_eq!(fetched.get("fullName").and_then(Value::as_str), Some("Ana Pérez"));

        let all: Vec<Value> = codec::from_json(&dispatch(&router, "GET", "/api/v1/users", "")).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_create_validation() {
        let router = router();
        assert_eq!(
            dispatch(&router, "POST", "/api/v1/users", r#"{"username":"ana","email":"a@x"}"#),
            r#"{"status":400,"error":"Password cannot be empty"}"#
        );

        dispatch(&router, "POST", "/api/v1/users", ANA);
        assert_eq!(
            dispatch(&router, "POST", "/api/v1/users", ANA),
            r#"{"status":400,"error":"Username already exists"}"#
        );
    }

    #[test]
    fn test_not_found_and_bad_id() {
        let router = router();
        assert_eq!(
            dispatch(&router, "GET", "/api/v1/users/7", ""),
            r#"{"status":404,"error":"User not found with ID: 7"}"#
        );
        assert_eq!(
            dispatch(&router, "DELETE", "/api/v1/users/x", ""),
            r#"{"status":400,"error":"Invalid user ID format"}"#
        );
    }

    #[test]
    fn test_update_keeps_role_and_rehashes_password() {
        let router = router();
        dispatch(&router, "POST", "/api/v1/users", ANA);

        let updated = call(
            &router,
            "PUT",
            "/api/v1/users/1",
            r#"{"username":"ana.p","email":"ana@example.com","password":"nuevo"}"#,
        );
        assert_eq!(updated.get("username").and_then(Value::as_str), Some("ana.p"));
        assert_eq!(updated.get("role").and_then(Value::as_str), Some("USER"));
        assert_eq!(updated.get("id").and_then(Value::as_i64), Some(1));

        let ok = dispatch(
            &router,
            "POST",
            "/api/v1/users/authenticate",
            r#"{"username":"ana.p","password":"nuevo"}"#,
        );
        assert!(ok.contains(r#""username":"ana.p""#));

        assert_eq!(
            dispatch(
                &router,
                "PUT",
                "/api/v1/users/5",
                r#"{"username":"x","email":"x@x","password":"p"}"#
            ),
            r#"{"status":404,"error":"User not found with ID: 5"}"#
        );
    }

    #[test]
    fn test_delete_does_not_reuse_ids() {
        let router = router();
        dispatch(&router, "POST", "/api/v1/users", ANA);
        assert_eq!(
            dispatch(&router, "DELETE", "/api/v1/users/1", ""),
            r#"{"message":"User deleted successfully"}"#
        );

        let bo = call(
            &router,
            "POST",
            "/api/v1/users",
            r#"{"username":"bo","email":"bo@example.com","password":"pw"}"#,
        );
        assert_eq!(bo.get("id").and_then(Value::as_i64), Some(2));
    }

    #[test]
    fn test_authenticate() {
        let router = router();
        dispatch(&router, "POST", "/api/v1/users", ANA);

        let user = call(
            &router,
            "POST",
            "/api/v1/users/authenticate",
            r#"{"username":"ana","password":"pw"}"#,
        );
        assert_eq!(user.get("email").and_then(Value::as_str), Some("ana@example.com"));
        assert!(!user.keys().any(|k| k.contains("password")));

        assert_eq!(
            dispatch(&router, "POST", "/api/v1/users/authenticate", r#"{"username":"ana","password":"x"}"#),
            r#"{"status":401,"error":"Invalid username or password"}"#
        );
        assert_eq!(
            dispatch(&router, "POST", "/api/v1/users/authenticate", r#"{"username":"ana"}"#),
            r#"{"status":400,"error":"Username and password are required"}"#
        );
    }

    #[test]
    fn test_inactive_user_cannot_authenticate() {
        let router = router();
        dispatch(
            &router,
            "POST",
            "/api/v1/users",
            r#"{"username":"old","email":"o@x","password":"pw","active":false}"#,
        );
        assert!(dispatch(
            &router,
            "POST",
            "/api/v1/users/authenticate",
            r#"{"username":"old","password":"pw"}"#
        )
        .contains("401"));
    }
}

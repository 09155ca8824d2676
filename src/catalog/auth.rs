//! Usuarios y autenticación con tokens firmados
//!
//! - `POST /auth/login` `{"username","password"}` → `{"token": "..."}`
//! - `GET /auth/me` con `Authorization: Bearer <token>` → el usuario
//! - `POST /auth/logout` → `{"success": true}` (tokens sin estado)

use super::{respond, CatalogError};
use crate::codec::{self, Map, Value};
use crate::record;
use crate::router::Router;
use crate::token::{self, hmac::constant_time_eq};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

const BAD_CREDENTIALS: &str = "Invalid username or password";
const BAD_TOKEN: &str = "Invalid or expired token";

/// Usuario; el hash de la contraseña nunca se serializa
#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub active: bool,
    password_hash: String,
}

record!(User {
    id => "id",
    username => "username",
    email => "email",
    full_name => "fullName",
    role => "role",
    active => "active",
});

fn hash_password(password: &str) -> String {
    Sha256::digest(password.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Datos de alta o modificación de un usuario (incluye la contraseña en claro)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub role: String,
    pub active: Option<bool>,
}

record!(NewUser {
    username => "username",
    email => "email",
    password => "password",
    full_name => "fullName",
    role => "role",
    active => "active",
});

impl NewUser {
    fn validate(&self) -> Result<(), CatalogError> {
        if self.username.is_empty() {
            return Err(CatalogError::Invalid("Username cannot be empty".into()));
        }
        if self.email.is_empty() {
            return Err(CatalogError::Invalid("Email cannot be empty".into()));
        }
        if self.password.is_empty() {
            return Err(CatalogError::Invalid("Password cannot be empty".into()));
        }
        Ok(())
    }
}

struct Directory {
    users: BTreeMap<i64, User>,
    next_id: i64,
}

impl Directory {
    fn by_username(&self, username: &str) -> Option<&User> {
        self.users.values().find(|u| u.username == username)
    }
}

pub struct AuthService {
    secret: String,
    directory: RwLock<Directory>,
}

impl AuthService {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            directory: RwLock::new(Directory {
                users: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Alta de usuario activo; el rol vacío pasa a `USER`
    pub fn add_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<User, CatalogError> {
        self.create_user(NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: role.to_string(),
            ..NewUser::default()
        })
    }

    pub fn create_user(&self, input: NewUser) -> Result<User, CatalogError> {
        input.validate()?;

        let mut directory = self.write()?;
        if directory.by_username(&input.username).is_some() {
            return Err(CatalogError::Invalid("Username already exists".into()));
        }

        let id = directory.next_id;
        directory.next_id += 1;
        let user = User {
            id: Some(id),
            username: input.username,
            email: input.email,
            full_name: input.full_name,
            role: if input.role.is_empty() { "USER".to_string() } else { input.role },
            active: input.active.unwrap_or(true),
            password_hash: hash_password(&input.password),
        };
        directory.users.insert(id, user.clone());
        Ok(user)
    }

    pub fn users(&self) -> Result<Vec<User>, CatalogError> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    pub fn user(&self, id: i64) -> Result<Option<User>, CatalogError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    /// Reemplaza los datos de un usuario.
    ///
    /// La contraseña se vuelve a hashear salvo que llegue el hash guardado;
    /// rol vacío y `active` ausente conservan el valor anterior.
    pub fn update_user(&self, id: i64, input: NewUser) -> Result<User, CatalogError> {
        input.validate()?;

        let mut directory = self.write()?;
        let existing = directory
            .users
            .get(&id)
            .cloned()
            .ok_or(CatalogError::UserIdNotFound(id))?;

        if existing.username != input.username && directory.by_username(&input.username).is_some() {
            return Err(CatalogError::Invalid("Username already exists".into()));
        }

        let password_hash = if input.password == existing.password_hash {
            existing.password_hash
        } else {
            hash_password(&input.password)
        };
        let user = User {
            id: Some(id),
            username: input.username,
            email: input.email,
            full_name: input.full_name,
            role: if input.role.is_empty() { existing.role } else { input.role },
            active: input.active.unwrap_or(existing.active),
            password_hash,
        };
        directory.users.insert(id, user.clone());
        Ok(user)
    }

    pub fn delete_user(&self, id: i64) -> Result<bool, CatalogError> {
        Ok(self.write()?.users.remove(&id).is_some())
    }

    /// Usuario activo con esas credenciales
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User, CatalogError> {
        let directory = self.read()?;
        let hashed = hash_password(password);
        directory
            .by_username(username)
            .filter(|u| u.active)
            .filter(|u| constant_time_eq(u.password_hash.as_bytes(), hashed.as_bytes()))
            .cloned()
            .ok_or_else(|| CatalogError::Unauthorized(BAD_CREDENTIALS.into()))
    }

    /// Verifica credenciales y firma un token con id, username y rol
    pub fn login(&self, username: &str, password: &str) -> Result<String, CatalogError> {
        let user = self.authenticate(username, password)?;

        let mut claims = Map::with_capacity(3);
        claims.insert("id", user.id.unwrap_or_default());
        claims.insert("username", user.username.as_str());
        claims.insert("role", user.role.as_str());

        tracing::info!(username, "login");
        Ok(token::sign(&codec::to_json(&claims), &self.secret))
    }

    /// Usuario dueño de un token válido
    pub fn me(&self, jwt: &str) -> Result<User, CatalogError> {
        if jwt.is_empty() || !token::verify(jwt, &self.secret) {
            return Err(CatalogError::Unauthorized(BAD_TOKEN.into()));
        }
        let id = token::claims(jwt)
            .and_then(|claims| claims.get("id").and_then(Value::as_i64))
            .ok_or_else(|| CatalogError::Unauthorized(BAD_TOKEN.into()))?;

        self.user(id)?.ok_or(CatalogError::UserNotFound)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Directory>, CatalogError> {
        self.directory.read().map_err(|_| CatalogError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Directory>, CatalogError> {
        self.directory.write().map_err(|_| CatalogError::Poisoned)
    }
}

fn login(auth: &AuthService, body: &str) -> Result<String, CatalogError> {
    let credentials: Map = codec::from_json(body)?;
    let jwt = auth.login(
        text_field(&credentials, "username"),
        text_field(&credentials, "password"),
    )?;

    let mut response = Map::new();
    response.insert("token", jwt);
    Ok(codec::to_json(&response))
}

pub(super) fn text_field<'a>(map: &'a Map, key: &str) -> &'a str {
    map.get(key).and_then(Value::as_str).unwrap_or_default()
}

pub fn register_routes(router: &mut Router, auth: Arc<AuthService>) {
    let a = Arc::clone(&auth);
    router.post("/auth/login", move |_, body, _| respond(login(&a, body)));

    let a = Arc::clone(&auth);
    router.get("/auth/me", move |_, _, headers| {
        let jwt = token::bearer(headers).unwrap_or_default();
        respond(a.me(jwt).map(|user| codec::to_json(&user)))
    });

    router.post("/auth/logout", |_, _, _| {
        let mut response = Map::new();
        response.insert("success", true);
        Ok(codec::to_json(&response))
    });
}

//! # Codec JSON Estructural
//! src/codec/mod.rs
//!
//! Serializador/parser JSON propio, sin reflexión:
//!
//! ```text
//! Record/escalar ──ToValue──► Value ──encode──► texto
//! texto ──parse──► Value ──FromValue──► Record/escalar
//! ```
//!
//! - `value`: la unión etiquetada `Value` y el mapa ordenado `Map`
//! - `encode` / `decode`: texto ⇄ `Value`
//! - `record`: contrato explícito por tipo (`record!`) y coerciones
//! - `datetime`: fechas ISO-8601 locales

pub mod datetime;
pub mod decode;
pub mod encode;
pub mod error;
pub mod record;
pub mod value;

pub use datetime::LocalDateTime;
pub use decode::parse;
pub use encode::encode;
pub use error::CodecError;
pub use record::{decode_record, FromValue, Record, ToValue};
pub use value::{Map, Number, Value};

/// Serializa cualquier tipo con representación JSON
///
/// # Ejemplo
/// ```
/// use storefront_server::codec::to_json;
///
/// assert_eq!(to_json(&vec![1, 2, 3]), "[1,2,3]");
/// assert_eq!(to_json("hola"), "\"hola\"");
/// ```
pub fn to_json<T: ToValue + ?Sized>(value: &T) -> String {
    encode(&value.to_value())
}

/// Parsea texto y lo convierte al tipo pedido
///
/// # Ejemplo
/// ```
/// use storefront_server::codec::{from_json, Map};
///
/// let map: Map = from_json(r#"{"stockQuantity": 5}"#).unwrap();
/// assert_eq!(map.get("stockQuantity").and_then(|v| v.as_i64()), Some(5));
/// ```
pub fn from_json<T: FromValue>(text: &str) -> Result<T, CodecError> {
    T::from_value(&parse(text)?)
}

//! # Records y conversiones de tipos
//! src/codec/record.rs
//!
//! Contrato explícito entre tipos de la aplicación y el `Value` genérico:
//!
//! - [`ToValue`]: cómo se ve un tipo al serializarlo
//! - [`FromValue`]: cómo se construye un tipo desde un `Value`, aplicando
//!   la coerción más estrecha posible (entero → flotante sí, flotante →
//!   entero no)
//! - [`Record`]: un struct con campos nombrados; se serializa como objeto y
//!   se decodifica asignando campo por campo
//!
//! Los records se declaran con la macro [`record!`](crate::record), que
//! genera la tabla `campo Rust → clave JSON` para ambos sentidos.

use super::datetime::LocalDateTime;
use super::error::CodecError;
use super::value::{Map, Number, Value};
use std::collections::BTreeMap;

/// Conversión de un tipo a `Value`
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Conversión desde `Value` con coerción estrecha
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, CodecError>;
}

/// Struct con campos nombrados expuestos como objeto JSON
pub trait Record: Default {
    /// Campos en orden de declaración
    fn to_map(&self) -> Map;

    /// Asigna un campo por su clave JSON.
    ///
    /// Retorna `Ok(false)` si la clave no corresponde a ningún campo.
    fn set_field(&mut self, key: &str, value: &Value) -> Result<bool, CodecError>;
}

/// Decodifica un objeto en un record partiendo de `Default`
///
/// Las claves desconocidas se ignoran para que clientes más nuevos puedan
/// mandar campos extra.
pub fn decode_record<T: Record>(value: &Value) -> Result<T, CodecError> {
    let map = value.as_object().ok_or(CodecError::Type {
        expected: "object",
        found: value.kind(),
    })?;

    let mut record = T::default();
    for (key, field) in map.iter() {
        record.set_field(key, field)?;
    }
    Ok(record)
}

fn mismatch(expected: &'static str, value: &Value) -> CodecError {
    CodecError::Type {
        expected,
        found: value.kind(),
    }
}

// === ToValue ===

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for Map {
    fn to_value(&self) -> Value {
        Value::Object(self.clone())
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! int_to_value {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    Value::Number(Number::Int(i64::from(*self)))
                }
            }
        )*
    };
}

int_to_value!(i8, i16, i32, i64, u8, u16, u32);

impl ToValue for u64 {
    fn to_value(&self) -> Value {
        match i64::try_from(*self) {
            Ok(i) => Value::Number(Number::Int(i)),
            Err(_) => Value::Number(Number::Float(*self as f64)),
        }
    }
}

impl ToValue for usize {
    fn to_value(&self) -> Value {
        (*self as u64).to_value()
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Number(Number::Float(f64::from(*self)))
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Number(Number::Float(*self))
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToValue for LocalDateTime {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

impl<T: ToValue> ToValue for BTreeMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Object(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }
}

// === FromValue ===

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, CodecError> {
        Ok(value.clone())
    }
}

impl FromValue for Map {
    fn from_value(value: &Value) -> Result<Self, CodecError> {
        value.as_object().cloned().ok_or_else(|| mismatch("object", value))
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, CodecError> {
        value.as_bool().ok_or_else(|| mismatch("boolean", value))
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, CodecError> {
        value.as_i64().ok_or_else(|| mismatch("integer", value))
    }
}

macro_rules! int_from_value {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: &Value) -> Result<Self, CodecError> {
                    let wide = i64::from_value(value)?;
                    <$t>::try_from(wide).map_err(|_| CodecError::Range {
                        value: wide.to_string(),
                        target: stringify!($t),
                    })
                }
            }
        )*
    };
}

int_from_value!(i32, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, CodecError> {
        value.as_f64().ok_or_else(|| mismatch("number", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, CodecError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("string", value))
    }
}

impl FromValue for LocalDateTime {
    fn from_value(value: &Value) -> Result<Self, CodecError> {
        value
            .as_str()
            .ok_or_else(|| mismatch("date-time string", value))?
            .parse()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, CodecError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, CodecError> {
        value
            .as_array()
            .ok_or_else(|| mismatch("array", value))?
            .iter()
            .map(T::from_value)
            .collect()
    }
}

/// Declara un record: mapea campos del struct a claves JSON
///
/// Genera `Record`, `ToValue` y `FromValue` para el tipo. El struct debe
/// implementar `Default` (los campos ausentes en el JSON conservan su valor
/// por defecto) y cada campo debe implementar `ToValue` y `FromValue`.
///
/// # Ejemplo
/// ```
/// use storefront_server::record;
/// use storefront_server::codec::{from_json, to_json};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Item {
///     id: i64,
///     stock_quantity: i32,
///     active: bool,
/// }
///
/// record!(Item {
///     id => "id",
///     stock_quantity => "stockQuantity",
///     active => "active",
/// });
///
/// let item = Item { id: 7, stock_quantity: 3, active: true };
/// let text = to_json(&item);
/// assert_eq!(text, r#"{"id":7,"stockQuantity":3,"active":true}"#);
/// assert_eq!(from_json::<Item>(&text).unwrap(), item);
/// ```
#[macro_export]
macro_rules! record {
    ($ty:ty { $($field:ident => $key:literal),* $(,)? }) => {
        impl $crate::codec::Record for $ty {
            fn to_map(&self) -> $crate::codec::Map {
                #[allow(unused_mut)]
                let mut map = $crate::codec::Map::new();
                $(
                    map.insert($key, $crate::codec::ToValue::to_value(&self.$field));
                )*
                map
            }

            #[allow(unused_variables)]
            fn set_field(
                &mut self,
                key: &str,
                value: &$crate::codec::Value,
            ) -> ::std::result::Result<bool, $crate::codec::CodecError> {
                match key {
                    $(
                        $key => {
                            self.$field = $crate::codec::FromValue::from_value(value)
                                .map_err(|e| e.in_field($key))?;
                            Ok(true)
                        }
                    )*
                    _ => Ok(false),
                }
            }
        }

        impl $crate::codec::ToValue for $ty {
            fn to_value(&self) -> $crate::codec::Value {
                $crate::codec::Value::Object($crate::codec::Record::to_map(self))
            }
        }

        impl $crate::codec::FromValue for $ty {
            fn from_value(
                value: &$crate::codec::Value,
            ) -> ::std::result::Result<Self, $crate::codec::CodecError> {
                $crate::codec::decode_record(value)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{from_json, parse, to_json};

    #[derive(Debug, Default, PartialEq)]
    struct Account {
        id: i64,
        name: String,
        active: bool,
    }

    record!(Account {
        id => "id",
        name => "name",
        active => "active",
    });

    #[derive(Debug, Default, PartialEq)]
    struct Listing {
        sku: Option<String>,
        price: f64,
        stock_quantity: i32,
        tags: Vec<String>,
        created_at: Option<LocalDateTime>,
        owner: Option<Account>,
    }

    record!(Listing {
        sku => "sku",
        price => "price",
        stock_quantity => "stockQuantity",
        tags => "tags",
        created_at => "createdAt",
        owner => "owner",
    });

    #[test]
    fn test_record_exposes_named_fields() {
        let account = Account {
            id: 7,
            name: "x".to_string(),
            active: true,
        };
        let map = account.to_map();

        assert_eq!(map.get("id"), Some(&Value::from(7)));
        assert_eq!(map.get("name"), Some(&Value::from("x")));
        assert_eq!(map.get("active"), Some(&Value::from(true)));
        assert_eq!(to_json(&account), r#"{"id":7,"name":"x","active":true}"#);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let account: Account = from_json(r#"{"id": 1, "role": "admin", "name": "ana"}"#).unwrap();
        assert_eq!(account.id, 1);
        assert_eq!(account.name, "ana");
        assert!(!account.active);
    }

    #[test]
    fn test_missing_keys_keep_defaults() {
        let listing: Listing = from_json(r#"{"price": 3}"#).unwrap();
        assert_eq!(listing.price, 3.0);
        assert_eq!(listing.sku, None);
        assert!(listing.tags.is_empty());
    }

    #[test]
    fn test_coercions() {
        let listing: Listing = from_json(
            r#"{
                "sku": "A-1",
                "price": 19,
                "stockQuantity": 4,
                "tags": ["x", "y"],
                "createdAt": "2024-05-01T10:00:00",
                "owner": {"id": 2, "name": "bo", "active": true}
            }"#,
        )
        .unwrap();

        // entero → flotante (decimal desde número)
        assert_eq!(listing.price, 19.0);
        assert_eq!(listing.stock_quantity, 4);
        assert_eq!(listing.tags, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(
            listing.created_at,
            Some(LocalDateTime::new(2024, 5, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(listing.owner.map(|o| o.name), Some("bo".to_string()));
    }

    #[test]
    fn test_narrowing_is_rejected() {
        let err = from_json::<Listing>(r#"{"stockQuantity": 2.5}"#).unwrap_err();
        assert!(matches!(err, CodecError::Field { ref field, .. } if field == "stockQuantity"));

        let err = from_json::<Listing>(r#"{"stockQuantity": 9999999999}"#).unwrap_err();
        assert!(err.to_string().contains("out of range"));

        assert!(from_json::<Account>(r#"{"name": 5}"#).is_err());
        assert!(from_json::<Listing>(r#"{"createdAt": "ayer"}"#).is_err());
    }

    #[test]
    fn test_null_into_option() {
        let listing: Listing = from_json(r#"{"sku": null, "createdAt": null}"#).unwrap();
        assert_eq!(listing.sku, None);
        assert_eq!(listing.created_at, None);
    }

    #[test]
    fn test_record_requires_object() {
        assert!(matches!(
            from_json::<Account>("[1, 2]"),
            Err(CodecError::Type { expected: "object", .. })
        ));
    }

    #[test]
    fn test_record_roundtrip_through_text() {
        let listing = Listing {
            sku: Some("B-2".to_string()),
            price: 5.5,
            stock_quantity: 10,
            tags: vec!["sale".to_string()],
            created_at: LocalDateTime::new(2024, 1, 2, 3, 4, 5),
            owner: None,
        };
        let text = to_json(&listing);
        assert!(text.contains(r#""createdAt":"2024-01-02T03:04:05""#));
        assert!(text.contains(r#""owner":null"#));
        assert_eq!(from_json::<Listing>(&text).unwrap(), listing);
    }

    #[test]
    fn test_lists_of_records() {
        let accounts = vec![Account::default(), Account { id: 2, ..Default::default() }];
        let value = parse(&to_json(&accounts)).unwrap();
        assert_eq!(value.as_array().map(|a| a.len()), Some(2));
        assert_eq!(Vec::<Account>::from_value(&value).unwrap(), accounts);
    }

    #[test]
    fn test_large_unsigned_becomes_float() {
        assert_eq!(u64::MAX.to_value(), Value::Number(Number::Float(u64::MAX as f64)));
        assert_eq!(5u64.to_value(), Value::from(5));
    }
}

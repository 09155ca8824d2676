//! # Serialización a texto JSON
//! src/codec/encode.rs
//!
//! Recorre un `Value` y escribe su representación compacta (sin espacios).

use super::value::{Number, Value};
use std::fmt::Write;

/// Serializa un valor a texto JSON
///
/// # Ejemplo
/// ```
/// use storefront_server::codec::{encode, Map, Value};
///
/// let mut map = Map::new();
/// map.insert("id", 42);
/// map.insert("name", "Widget");
///
/// assert_eq!(encode(&Value::Object(map)), r#"{"id":42,"name":"Widget"}"#);
/// ```
pub fn encode(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(*n, out),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(item, out);
            }
            out.push('}');
        }
    }
}

fn write_number(n: Number, out: &mut String) {
    match n {
        Number::Int(i) => {
            let _ = write!(out, "{}", i);
        }
        // JSON no tiene representación para NaN/Infinity
        Number::Float(f) if !f.is_finite() => out.push_str("null"),
        Number::Float(f) => {
            let start = out.len();
            let _ = write!(out, "{}", f);
            // Un flotante siempre lleva punto para que decode lo lea como flotante
            if !out[start..].contains('.') {
                out.push_str(".0");
            }
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

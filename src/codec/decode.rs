//! # Parser JSON
//! src/codec/decode.rs
//!
//! Parser recursivo mínimo. En lugar de un tokenizer completo, cada
//! contenedor se parte en sus elementos de primer nivel recorriendo el
//! texto una vez y llevando:
//!
//! - profundidad de llaves `{}` y corchetes `[]`
//! - si estamos dentro de comillas (y si el caracter anterior era `\`)
//!
//! Una coma solo separa elementos cuando ambas profundidades son 0 y no
//! estamos dentro de un string. Cada fragmento se parsea recursivamente,
//! hasta [`MAX_DEPTH`] contenedores anidados.

use super::error::CodecError;
use super::value::{Map, Number, Value};

/// Máximo de objetos/arreglos anidados que acepta `parse`
pub const MAX_DEPTH: usize = 128;

/// Parsea texto JSON a un `Value`
///
/// # Ejemplo
/// ```
/// use storefront_server::codec::{parse, Value};
///
/// let value = parse(r#"{"id": 7, "tags": ["a", "b"]}"#).unwrap();
/// assert_eq!(value.get("id"), Some(&Value::from(7)));
/// ```
pub fn parse(text: &str) -> Result<Value, CodecError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CodecError::Empty);
    }
    parse_value(trimmed, 0)
}

/// `depth` es la cantidad de contenedores que envuelven a `fragment`
fn parse_value(fragment: &str, depth: usize) -> Result<Value, CodecError> {
    let s = fragment.trim();
    if (s.starts_with('{') || s.starts_with('[')) && depth >= MAX_DEPTH {
        return Err(CodecError::TooDeep { limit: MAX_DEPTH });
    }
    match s {
        "null" => Ok(Value::Null),
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        _ if s.starts_with('"') => parse_string(s).map(Value::String),
        _ if s.starts_with('{') => parse_object(s, depth + 1),
        _ if s.starts_with('[') => parse_array(s, depth + 1),
        _ => parse_number(s),
    }
}

fn parse_object(s: &str, depth: usize) -> Result<Value, CodecError> {
    if !s.ends_with('}') || s.len() < 2 {
        return Err(CodecError::unbalanced(s));
    }
    let inner = s[1..s.len() - 1].trim();
    let mut map = Map::new();
    if inner.is_empty() {
        return Ok(Value::Object(map));
    }

    for pair in split_top_level(inner, s)? {
        let colon = find_unquoted(pair, ':').ok_or_else(|| CodecError::syntax(pair))?;
        let key_text = pair[..colon].trim();
        if !key_text.starts_with('"') {
            return Err(CodecError::syntax(pair));
        }
        let key = parse_string(key_text)?;
        let value = parse_value(&pair[colon + 1..], depth)?;
        map.insert(key, value);
    }

    Ok(Value::Object(map))
}

fn parse_array(s: &str, depth: usize) -> Result<Value, CodecError> {
    if !s.ends_with(']') || s.len() < 2 {
        return Err(CodecError::unbalanced(s));
    }
    let inner = s[1..s.len() - 1].trim();
    if inner.is_empty() {
        return Ok(Value::Array(Vec::new()));
    }

    split_top_level(inner, s)?
        .into_iter()
        .map(|item| parse_value(item, depth))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

/// Parte el interior de un contenedor en sus elementos de primer nivel
///
/// `container` es el texto completo (con delimitadores), solo se usa para
/// reportar errores.
fn split_top_level<'a>(inner: &'a str, container: &str) -> Result<Vec<&'a str>, CodecError> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut braces: i32 = 0;
    let mut brackets: i32 = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, ch) in inner.char_indices() {
        if in_quotes {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_quotes = false;
            }
            continue;
        }

        match ch {
            '"' => in_quotes = true,
            '{' => braces += 1,
            '}' => braces -= 1,
            '[' => brackets += 1,
            ']' => brackets -= 1,
            ',' if braces == 0 && brackets == 0 => {
                parts.push(check_part(&inner[start..i], container)?);
                start = i + 1;
            }
            _ => {}
        }

        if braces < 0 || brackets < 0 {
            return Err(CodecError::unbalanced(container));
        }
    }

    if in_quotes || braces != 0 || brackets != 0 {
        return Err(CodecError::unbalanced(container));
    }

    parts.push(check_part(&inner[start..], container)?);
    Ok(parts)
}

// "[1,,2]" o "[1,]" dejan fragmentos vacíos
fn check_part<'a>(part: &'a str, container: &str) -> Result<&'a str, CodecError> {
    let part = part.trim();
    if part.is_empty() {
        Err(CodecError::syntax(container))
    } else {
        Ok(part)
    }
}

/// Posición del primer `target` fuera de comillas
fn find_unquoted(s: &str, target: char) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, ch) in s.char_indices() {
        if in_quotes {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_quotes = false;
            }
        } else if ch == '"' {
            in_quotes = true;
        } else if ch == target {
            return Some(i);
        }
    }
    None
}

/// Parsea un literal string completo (con sus comillas) y resuelve escapes
fn parse_string(s: &str) -> Result<String, CodecError> {
    if s.len() < 2 || !s.starts_with('"') || !s.ends_with('"') {
        return Err(CodecError::syntax(s));
    }
    let inner = &s[1..s.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        match ch {
            // Una comilla sin escapar en medio significa que el fragmento no es un solo string
            '"' => return Err(CodecError::syntax(s)),
            '\\' => {
                let escaped = chars.next().ok_or_else(|| CodecError::syntax(s))?;
                match escaped {
                    '"' => out.push('"'),
                    '\\' => out.push('\\'),
                    '/' => out.push('/'),
                    'b' => out.push('\u{08}'),
                    'f' => out.push('\u{0C}'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'u' => out.push(parse_unicode_escape(&mut chars, s)?),
                    _ => return Err(CodecError::syntax(s)),
                }
            }
            c => out.push(c),
        }
    }

    Ok(out)
}

fn parse_unicode_escape(chars: &mut std::str::Chars<'_>, s: &str) -> Result<char, CodecError> {
    let high = read_hex4(chars, s)?;
    if !(0xD800..0xDC00).contains(&high) {
        return char::from_u32(high).ok_or_else(|| CodecError::syntax(s));
    }

    // Par sustituto: debe seguir \uDC00..\uDFFF
    if chars.next() != Some('\\') || chars.next() != Some('u') {
        return Err(CodecError::syntax(s));
    }
    let low = read_hex4(chars, s)?;
    if !(0xDC00..0xE000).contains(&low) {
        return Err(CodecError::syntax(s));
    }
    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
    char::from_u32(code).ok_or_else(|| CodecError::syntax(s))
}

fn read_hex4(chars: &mut std::str::Chars<'_>, s: &str) -> Result<u32, CodecError> {
    let mut code = 0u32;
    for _ in 0..4 {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| CodecError::syntax(s))?;
        code = code * 16 + digit;
    }
    Ok(code)
}

/// Sin punto decimal → entero; con punto (o exponente) → flotante
fn parse_number(s: &str) -> Result<Value, CodecError> {
    let looks_numeric = s.starts_with(|c: char| c == '-' || c.is_ascii_digit())
        && s.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'));
    if !looks_numeric {
        return Err(CodecError::syntax(s));
    }

    if !s.contains('.') {
        if let Ok(i) = s.parse::<i64>() {
            return Ok(Value::Number(Number::Int(i)));
        }
    }

    s.parse::<f64>()
        .map(|f| Value::Number(Number::Float(f)))
        .map_err(|_| CodecError::syntax(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse("null").unwrap(), Value::Null);
        assert_eq!(parse(" true ").unwrap(), Value::Bool(true));
        assert_eq!(parse("false").unwrap(), Value::Bool(false));
        assert_eq!(parse("42").unwrap(), Value::from(42));
        assert_eq!(parse("-3").unwrap(), Value::from(-3));
        assert_eq!(parse("\"hola\"").unwrap(), Value::from("hola"));
    }

    #[test]
    fn test_numbers_int_vs_float() {
        assert_eq!(parse("10").unwrap(), Value::Number(Number::Int(10)));
        assert_eq!(parse("10.0").unwrap(), Value::Number(Number::Float(10.0)));
        assert_eq!(parse("1e3").unwrap(), Value::Number(Number::Float(1000.0)));
        // No cabe en i64: se degrada a flotante en vez de fallar
        assert!(matches!(
            parse("99999999999999999999").unwrap(),
            Value::Number(Number::Float(_))
        ));
    }

    #[test]
    fn test_parse_object_keeps_document_order() {
        let value = parse(r#"{"z": 1, "a": "x", "m": null}"#).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_parse_nested() {
        let value = parse(r#"{"a": {"b": [1, {"c": [true, false]}]}, "d": []}"#).unwrap();
        let c = value
            .get("a")
            .and_then(|a| a.get("b"))
            .and_then(|b| b.as_array())
            .map(|items| items[1].clone())
            .unwrap();
        assert_eq!(c.get("c"), Some(&Value::Array(vec![Value::Bool(true), Value::Bool(false)])));
        assert_eq!(value.get("d"), Some(&Value::Array(vec![])));
    }

    #[test]
    fn test_commas_and_colons_inside_strings() {
        let value = parse(r#"{"text": "a, b: {c} [d]", "n": 1}"#).unwrap();
        assert_eq!(value.get("text"), Some(&Value::from("a, b: {c} [d]")));
        assert_eq!(value.get("n"), Some(&Value::from(1)));
    }

    #[test]
    fn test_escaped_quote_before_backslash() {
        // El string termina en una barra escapada: "\\" seguido de la comilla de cierre
        let value = parse(r#"{"path": "C:\\", "next": 2}"#).unwrap();
        assert_eq!(value.get("path"), Some(&Value::from("C:\\")));
        assert_eq!(value.get("next"), Some(&Value::from(2)));
    }

    #[test]
    fn test_unicode_escapes() {
        assert_eq!(parse(r#""\u00e9""#).unwrap(), Value::from("é"));
        assert_eq!(parse(r#""\ud83d\ude00""#).unwrap(), Value::from("😀"));
        assert!(parse(r#""\ud83d""#).is_err());
    }

    #[test]
    fn test_errors_name_the_fragment() {
        let err = parse(r#"{"a": nope}"#).unwrap_err();
        assert_eq!(err, CodecError::Syntax { fragment: "nope".to_string() });
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_unbalanced_input() {
        assert!(matches!(parse(r#"{"a": [1, 2}"#), Err(CodecError::Unbalanced { .. })));
        assert!(matches!(parse(r#"{"a": "open}"#), Err(CodecError::Unbalanced { .. })));
        assert!(matches!(parse("[1, 2"), Err(CodecError::Unbalanced { .. })));
    }

    #[test]
    fn test_trailing_and_double_commas() {
        assert!(parse("[1,]").is_err());
        assert!(parse("[1,,2]").is_err());
        assert!(parse(r#"{"a":1,}"#).is_err());
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(parse("   "), Err(CodecError::Empty));
        assert!(parse("[1 2]").is_err());
        assert!(parse(r#"{a: 1}"#).is_err());
        assert!(parse(r#"{"a" 1}"#).is_err());
        assert!(parse("NaN").is_err());
        assert!(parse(r#""a"b""#).is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let at_limit = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse(&at_limit).is_ok());

        let over = format!("{}1{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        assert_eq!(parse(&over), Err(CodecError::TooDeep { limit: MAX_DEPTH }));

        let objects = format!("{}{}", r#"{"a":"#.repeat(MAX_DEPTH + 1), "}".repeat(MAX_DEPTH + 1));
        assert_eq!(parse(&objects), Err(CodecError::TooDeep { limit: MAX_DEPTH }));
    }

    #[test]
    fn test_deep_input_fails_without_exhausting_stack() {
        // Un thread con stack chico, como el de un worker
        let deep = format!("{}{}", "[".repeat(20_000), "]".repeat(20_000));
        let result = std::thread::Builder::new()
            .stack_size(1024 * 1024)
            .spawn(move || parse(&deep))
            .unwrap()
            .join()
            .unwrap();
        assert!(matches!(result, Err(CodecError::TooDeep { .. })));
    }

    #[test]
    fn test_roundtrip_flat_map() {
        let mut map = Map::new();
        map.insert("name", "Widget \"deluxe\"\n");
        map.insert("id", 42);
        map.insert("price", 19.99);
        map.insert("active", true);
        map.insert("deleted", Value::Null);
        let original = Value::Object(map);

        assert_eq!(parse(&encode(&original)).unwrap(), original);
    }

    #[test]
    fn test_accepts_serde_json_output() {
        let text = serde_json::json!({"a": [1, 2.5, "x"], "b": {"c": null}}).to_string();
        let value = parse(&text).unwrap();
        assert_eq!(value.get("b").and_then(|b| b.get("c")), Some(&Value::Null));
        assert_eq!(value.get("a").and_then(|a| a.as_array()).map(|a| a.len()), Some(3));
    }
}

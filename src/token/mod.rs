//! # Tokens firmados (JWT HS256)
//! src/token/mod.rs
//!
//! Tokens sin estado con tres segmentos base64url sin padding:
//!
//! ```text
//! base64url(header) . base64url(payload) . base64url(HMAC-SHA256(secret, header.payload))
//! ```
//!
//! El header es fijo (`{"alg":"HS256","typ":"JWT"}`). Si el payload no trae
//! `"exp"`, `sign` le agrega uno a una hora del momento de firma. La
//! expiración se evalúa al verificar, contra el reloj del sistema.

pub mod hmac;

use crate::codec::{self, Map};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Header fijo de todos los tokens
pub const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Vida por defecto de un token: 1 hora
pub const DEFAULT_TTL_SECS: u64 = 60 * 60;

const EXP_KEY: &str = "\"exp\"";
const EXP_PREFIX: &str = "\"exp\":";

/// Segundos desde epoch
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Firma un payload JSON con el secreto compartido
///
/// # Ejemplo
/// ```
/// use storefront_server::token;
///
/// let jwt = token::sign(r#"{"id":1,"role":"admin"}"#, "secreto");
/// assert!(token::verify(&jwt, "secreto"));
/// assert!(!token::verify(&jwt, "otro"));
/// ```
pub fn sign(payload: &str, secret: &str) -> String {
    sign_at(payload, secret, now_secs())
}

/// Igual que [`sign`] pero con el instante de emisión explícito
pub fn sign_at(payload: &str, secret: &str, issued_at: u64) -> String {
    let payload = with_expiration(payload, issued_at + DEFAULT_TTL_SECS);

    let header_b64 = URL_SAFE_NO_PAD.encode(HEADER);
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload.as_bytes());
    let signing_input = format!("{}.{}", header_b64, payload_b64);

    let signature = hmac::hmac_sha256(secret.as_bytes(), signing_input.as_bytes());
    format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature))
}

/// Agrega `"exp"` antes de la llave de cierre si el payload no lo trae.
///
/// Es un parche de texto, no una re-serialización: el orden y formato de
/// las claves del cliente se conservan tal cual. Si el payload no termina
/// en `}` se deja sin tocar.
fn with_expiration(payload: &str, exp: u64) -> String {
    if payload.contains(EXP_KEY) {
        return payload.to_string();
    }
    let trimmed = payload.trim_end();
    let Some(body) = trimmed.strip_suffix('}') else {
        return payload.to_string();
    };

    // `{}` no lleva coma antes de la nueva clave
    let separator = if body.trim_end().ends_with('{') { "" } else { "," };
    format!("{}{}{}{}}}", body, separator, EXP_PREFIX, exp)
}

/// Verifica firma y expiración
///
/// Retorna `false` ante cualquier problema (formato, firma o expirado),
/// sin distinguir la causa.
pub fn verify(token: &str, secret: &str) -> bool {
    verify_at(token, secret, now_secs())
}

pub fn verify_at(token: &str, secret: &str, now: u64) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return false;
    }

    let signing_input = format!("{}.{}", parts[0], parts[1]);
    let expected = hmac::hmac_sha256(secret.as_bytes(), signing_input.as_bytes());
    let expected_b64 = URL_SAFE_NO_PAD.encode(expected);

    if !hmac::constant_time_eq(expected_b64.as_bytes(), parts[2].as_bytes()) {
        return false;
    }

    !is_expired_at(token, now)
}

/// Payload JSON decodificado (sin verificar la firma)
pub fn payload(token: &str) -> Option<String> {
    let segment = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    String::from_utf8(bytes).ok()
}

/// Payload parseado como objeto (sin verificar la firma)
pub fn claims(token: &str) -> Option<Map> {
    codec::from_json(&payload(token)?).ok()
}

/// El token expiró según el reloj del sistema
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, now_secs())
}

/// Busca `"exp":` en el payload y lee la primera corrida de dígitos.
///
/// - Sin `exp` → nunca expira
/// - Payload ilegible o número inválido → expirado
pub fn is_expired_at(token: &str, now: u64) -> bool {
    let Some(payload) = payload(token) else {
        return true;
    };
    let Some(idx) = payload.find(EXP_PREFIX) else {
        return false;
    };

    let rest = &payload[idx + EXP_PREFIX.len()..];
    let digits: String = rest
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return false;
    }

    match digits.parse::<u64>() {
        Ok(exp) => now > exp,
        Err(_) => true,
    }
}

/// Extrae el token de `Authorization: Bearer <token>`
pub fn bearer(headers: &HashMap<String, String>) -> Option<&str> {
    let value = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("Authorization"))
        .map(|(_, value)| value.as_str())?;
    // El parser de headers recorta espacios, así que "Bearer " llega como "Bearer".
    // Sin el esquema el valor se toma entero como token.
    let token = match value.strip_prefix("Bearer") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => value.trim(),
    };
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";
    const NOW: u64 = 1_700_000_000;

    #[test]
    fn test_sign_then_verify() {
        let jwt = sign_at(r#"{"id":1}"#, SECRET, NOW);
        assert_eq!(jwt.split('.').count(), 3);
        assert!(verify_at(&jwt, SECRET, NOW));
        assert!(verify(&sign(r#"{"id":1}"#, SECRET), SECRET));
    }

    #[test]
    fn test_wrong_secret() {
        let jwt = sign_at(r#"{"id":1}"#, SECRET, NOW);
        assert!(!verify_at(&jwt, "other-secret", NOW));
    }

    #[test]
    fn test_exp_is_injected() {
        let jwt = sign_at(r#"{"id":1,"username":"ana"}"#, SECRET, NOW);
        assert_eq!(
            payload(&jwt).unwrap(),
            format!(r#"{{"id":1,"username":"ana","exp":{}}}"#, NOW + 3600)
        );
    }

    #[test]
    fn test_exp_injected_into_empty_object() {
        let jwt = sign_at("{}", SECRET, NOW);
        assert_eq!(payload(&jwt).unwrap(), format!(r#"{{"exp":{}}}"#, NOW + 3600));
        assert!(claims(&jwt).is_some());
    }

    #[test]
    fn test_existing_exp_is_kept() {
        let jwt = sign_at(r#"{"id":1,"exp":42}"#, SECRET, NOW);
        assert_eq!(payload(&jwt).unwrap(), r#"{"id":1,"exp":42}"#);
        // exp en el pasado: firma válida pero expirado
        assert!(is_expired_at(&jwt, NOW));
        assert!(!verify_at(&jwt, SECRET, NOW));
    }

    #[test]
    fn test_expires_after_one_hour() {
        let jwt = sign_at(r#"{"id":1}"#, SECRET, NOW);
        assert!(!is_expired_at(&jwt, NOW + 3600));
        assert!(is_expired_at(&jwt, NOW + 3601));
        assert!(!verify_at(&jwt, SECRET, NOW + 3601));
    }

    #[test]
    fn test_tampered_payload_fails() {
        let jwt = sign_at(r#"{"id":1,"role":"user"}"#, SECRET, NOW);
        let parts: Vec<&str> = jwt.split('.').collect();
        let forged_payload = URL_SAFE_NO_PAD.encode(r#"{"id":1,"role":"admin","exp":99999999999}"#);
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert!(!verify_at(&forged, SECRET, NOW));

        // Cambiar un solo caracter del segmento de payload
        let mut chars: Vec<char> = parts[1].chars().collect();
        chars[3] = if chars[3] == 'A' { 'B' } else { 'A' };
        let flipped: String = chars.into_iter().collect();
        let tampered = format!("{}.{}.{}", parts[0], flipped, parts[2]);
        assert!(!verify_at(&tampered, SECRET, NOW));
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(!verify_at("a.b", SECRET, NOW));
        assert!(!verify_at("a.b.c.d", SECRET, NOW));
        assert!(!verify_at("", SECRET, NOW));
        assert!(is_expired_at("not-a-token", NOW));
        assert!(is_expired_at("x.%%%.y", NOW));
    }

    #[test]
    fn test_missing_exp_never_expires() {
        let payload_b64 = URL_SAFE_NO_PAD.encode(r#"{"id":1}"#);
        let token = format!("h.{}.s", payload_b64);
        assert!(!is_expired_at(&token, u64::MAX));
    }

    #[test]
    fn test_unparseable_exp_is_expired() {
        let payload_b64 = URL_SAFE_NO_PAD.encode(r#"{"exp":999999999999999999999999}"#);
        let token = format!("h.{}.s", payload_b64);
        assert!(is_expired_at(&token, NOW));
    }

    #[test]
    fn test_non_object_payload_left_untouched() {
        let jwt = sign_at("hola", SECRET, NOW);
        assert_eq!(payload(&jwt).unwrap(), "hola");
        assert!(verify_at(&jwt, SECRET, NOW));
    }

    #[test]
    fn test_claims() {
        let jwt = sign_at(r#"{"id":5,"username":"bo"}"#, SECRET, NOW);
        let claims = claims(&jwt).unwrap();
        assert_eq!(claims.get("id").and_then(|v| v.as_i64()), Some(5));
        assert_eq!(claims.get("exp").and_then(|v| v.as_i64()), Some((NOW + 3600) as i64));
    }

    #[test]
    fn test_bearer() {
        let mut headers = HashMap::new();
        headers.insert("authorization".to_string(), "Bearer abc.def.ghi".to_string());
        assert_eq!(bearer(&headers), Some("abc.def.ghi"));

        headers.insert("authorization".to_string(), "Bearer ".to_string());
        assert_eq!(bearer(&headers), None);
        assert_eq!(bearer(&HashMap::new()), None);
    }

    #[test]
    fn test_bearer_needs_space_after_scheme() {
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), "Bearerabc".to_string());
        assert_eq!(bearer(&headers), Some("Bearerabc"));

        headers.insert("Authorization".to_string(), "Bearer\tabc".to_string());
        assert_eq!(bearer(&headers), Some("abc"));

        headers.insert("Authorization".to_string(), "abc.def.ghi".to_string());
        assert_eq!(bearer(&headers), Some("abc.def.ghi"));
    }
}

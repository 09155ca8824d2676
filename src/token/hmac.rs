//! # HMAC-SHA256
//! src/token/hmac.rs
//!
//! HMAC (RFC 2104) sobre el `Sha256` de la crate `sha2`:
//!
//! ```text
//! HMAC(K, m) = H((K' ⊕ opad) || H((K' ⊕ ipad) || m))
//! ```
//!
//! donde `K'` es la clave rellenada con ceros hasta el tamaño de bloque
//! (64 bytes), o su hash si es más larga.

use sha2::{Digest, Sha256};

const BLOCK_SIZE: usize = 64;
const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

/// Calcula HMAC-SHA256(key, message)
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    let mut block = [0u8; BLOCK_SIZE];
    if key.len() > BLOCK_SIZE {
        let digest = Sha256::digest(key);
        block[..digest.len()].copy_from_slice(&digest);
    } else {
        block[..key.len()].copy_from_slice(key);
    }

    let mut inner = Sha256::new();
    inner.update(block.map(|b| b ^ IPAD));
    inner.update(message);
    let inner_hash = inner.finalize();

    let mut outer = Sha256::new();
    outer.update(block.map(|b| b ^ OPAD));
    outer.update(inner_hash);
    outer.finalize().into()
}

/// Compara en tiempo constante respecto del contenido.
///
/// Solo el largo produce una salida temprana.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

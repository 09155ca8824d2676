//! # Errores del Codec
//! src/codec/error.rs

use thiserror::Error;

/// Largo máximo del fragmento que se copia dentro de un error
const MAX_FRAGMENT: usize = 64;

/// Errores de parsing y de conversión de tipos
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Texto vacío o solo espacios
    #[error("Error parsing JSON: empty input")]
    Empty,

    /// Fragmento que no es ningún valor JSON reconocible
    #[error("Error parsing JSON: invalid fragment `{fragment}`")]
    Syntax { fragment: String },

    /// Llaves, corchetes o comillas sin cerrar
    #[error("Error parsing JSON: unbalanced delimiters in `{fragment}`")]
    Unbalanced { fragment: String },

    /// Más contenedores anidados de los permitidos
    #[error("Error parsing JSON: nesting deeper than {limit} levels")]
    TooDeep { limit: usize },

    /// El valor existe pero no tiene la forma pedida
    #[error("expected {expected}, found {found}")]
    Type {
        expected: &'static str,
        found: &'static str,
    },

    /// Número fuera del rango del tipo destino
    #[error("number {value} out of range for {target}")]
    Range { value: String, target: &'static str },

    /// Texto que no es una fecha-hora ISO-8601 local
    #[error("invalid ISO-8601 local date-time `{0}`")]
    DateTime(String),

    /// Error al asignar un campo de un record
    #[error("field `{field}`: {source}")]
    Field {
        field: String,
        #[source]
        source: Box<CodecError>,
    },
}

impl CodecError {
    pub(crate) fn syntax(fragment: &str) -> Self {
        CodecError::Syntax {
            fragment: truncate(fragment),
        }
    }

    pub(crate) fn unbalanced(fragment: &str) -> Self {
        CodecError::Unbalanced {
            fragment: truncate(fragment),
        }
    }

    /// Envuelve el error con el nombre del campo que se estaba asignando
    pub fn in_field(self, field: &str) -> Self {
        CodecError::Field {
            field: field.to_string(),
            source: Box::new(self),
        }
    }
}

fn truncate(fragment: &str) -> String {
    match fragment.char_indices().nth(MAX_FRAGMENT) {
        Some((idx, _)) => format!("{}...", &fragment[..idx]),
        None => fragment.to_string(),
    }
}

//! Matchers de path
//!
//! | Tipo     | Ejemplo                 | Acepta                          |
//! |----------|-------------------------|---------------------------------|
//! | Exact    | `/products`             | igualdad byte a byte            |
//! | Param    | `/products/:id/stock`   | un segmento no vacío por `:x`   |
//! | Regex    | `/products/(\d+)`       | el path completo (anclado)      |
//!
//! No se normaliza la barra final: `/products/` no es `/products`.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// Template con segmentos literales y placeholders `:nombre`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

/// Antepone `/` a un template no vacío que no la tiene: `products/:id` es `/products/:id`
fn rooted(template: &str) -> String {
    if template.is_empty() || template.starts_with('/') {
        template.to_string()
    } else {
        format!("/{}", template)
    }
}

impl Template {
    pub fn parse(source: &str) -> Self {
        let source = rooted(source);
        let segments = source
            .split('/')
            .skip(1)
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(segment.to_string()),
            })
            .collect();

        Self { source, segments }
    }

    fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let rest = path.strip_prefix('/')?;
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Param(name) if !part.is_empty() => {
                    params.insert(name.clone(), part.to_string());
                }
                _ => return None,
            }
        }
        Some(params)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Criterio para aceptar un path
#[derive(Debug, Clone)]
pub enum PathMatcher {
    /// Igualdad exacta
    Exact(String),

    /// Template con placeholders
    Param(Template),

    /// Expresión regular sobre todo lo que sigue a `prefix`
    Regex { prefix: String, regex: Regex },
}

impl PathMatcher {
    pub fn exact(path: &str) -> Self {
        PathMatcher::Exact(rooted(path))
    }

    pub fn param(template: &str) -> Self {
        PathMatcher::Param(Template::parse(template))
    }

    /// Compila el patrón anclado a todo el path
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{})$", pattern))?;
        Ok(PathMatcher::Regex {
            prefix: String::new(),
            regex,
        })
    }

    /// `Exact` si no hay placeholders, `Param` si los hay
    pub fn from_template(template: &str) -> Self {
        if template.split('/').any(|segment| segment.starts_with(':')) {
            Self::param(template)
        } else {
            Self::exact(template)
        }
    }

    /// Antepone el base path de la API
    pub fn with_prefix(self, base: &str) -> Self {
        if base.is_empty() {
            return self;
        }
        match self {
            PathMatcher::Exact(path) => PathMatcher::Exact(format!("{}{}", base, path)),
            PathMatcher::Param(template) => Self::param(&format!("{}{}", base, template.as_str())),
            PathMatcher::Regex { prefix, regex } => PathMatcher::Regex {
                prefix: format!("{}{}", base, prefix),
                regex,
            },
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathMatcher::Exact(expected) => expected == path,
            PathMatcher::Param(template) => template.captures(path).is_some(),
            PathMatcher::Regex { prefix, regex } => path
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| regex.is_match(rest)),
        }
    }

    /// Valores capturados del path
    ///
    /// - `Param`: un valor por placeholder, con su nombre
    /// - `Regex`: grupos con nombre y grupos numerados (`"1"`, `"2"`...)
    /// - `Exact`: vacío
    ///
    /// # Ejemplo
    /// ```
    /// use storefront_server::router::PathMatcher;
    ///
    /// let matcher = PathMatcher::param("/products/:id/stock");
    /// let params = matcher.captures("/products/42/stock").unwrap();
    /// assert_eq!(params["id"], "42");
    /// ```
    pub fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        match self {
            PathMatcher::Exact(expected) => (expected == path).then(HashMap::new),
            PathMatcher::Param(template) => template.captures(path),
            PathMatcher::Regex { prefix, regex } => {
                let rest = path.strip_prefix(prefix.as_str())?;
                let caps = regex.captures(rest)?;

                let mut params = HashMap::new();
                for (index, name) in regex.capture_names().enumerate().skip(1) {
                    if let Some(value) = caps.get(index) {
                        params.insert(index.to_string(), value.as_str().to_string());
                        if let Some(name) = name {
                            params.insert(name.to_string(), value.as_str().to_string());
                        }
                    }
                }
                Some(params)
            }
        }
    }
}

impl fmt::Display for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathMatcher::Exact(path) => write!(f, "{}", path),
            PathMatcher::Param(template) => write!(f, "{}", template.as_str()),
            PathMatcher::Regex { prefix, regex } => write!(f, "{}~{}", prefix, regex.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_no_trailing_slash_normalization() {
        let matcher = PathMatcher::exact("/products");
        assert!(matcher.matches("/products"));
        assert!(!matcher.matches("/products/"));
        assert!(!matcher.matches("/product"));
    }

    #[test]
    fn test_template_without_leading_slash() {
        let matcher = PathMatcher::param("products/:id");
        assert!(matcher.matches("/products/7"));
        assert!(!matcher.matches("/7"));
        assert_eq!(matcher.captures("/products/7").unwrap()["id"], "7");

        let prefixed = PathMatcher::from_template("products").with_prefix("/api/v1");
        assert!(prefixed.matches("/api/v1/products"));

        let prefixed = PathMatcher::param("products/:id").with_prefix("/api/v1");
        assert!(prefixed.matches("/api/v1/products/3"));
    }

    #[test]
    fn test_param_one_segment_per_placeholder() {
        let matcher = PathMatcher::param("/products/:id");
        assert!(matcher.matches("/products/7"));
        assert!(matcher.matches("/products/abc"));
        assert!(!matcher.matches("/products/"));
        assert!(!matcher.matches("/products"));
        assert!(!matcher.matches("/products/7/stock"));
    }

    #[test]
    fn test_param_captures() {
        let matcher = PathMatcher::param("/products/category/:category");
        let params = matcher.captures("/products/category/audio").unwrap();
        assert_eq!(params.get("category").map(String::as_str), Some("audio"));
        assert!(matcher.captures("/products/kind/audio").is_none());
    }

    #[test]
    fn test_regex_is_anchored() {
        let matcher = PathMatcher::regex(r"/products/(\d+)").unwrap();
        assert!(matcher.matches("/products/12"));
        assert!(!matcher.matches("/products/12/price"));
        assert!(!matcher.matches("/x/products/12"));
        assert!(!matcher.matches("/products/ab"));
    }

    #[test]
    fn test_regex_captures() {
        let matcher = PathMatcher::regex(r"/products/(?P<id>\d+)/(stock|price)").unwrap();
        let params = matcher.captures("/products/5/price").unwrap();
        assert_eq!(params["id"], "5");
        assert_eq!(params["1"], "5");
        assert_eq!(params["2"], "price");
    }

    #[test]
    fn test_invalid_regex() {
        assert!(PathMatcher::regex("/products/(").is_err());
    }

    #[test]
    fn test_with_prefix() {
        let exact = PathMatcher::exact("/products").with_prefix("/api/v1");
        assert!(exact.matches("/api/v1/products"));
        assert!(!exact.matches("/products"));

        let param = PathMatcher::param("/products/:id").with_prefix("/api/v1");
        assert_eq!(param.captures("/api/v1/products/3").unwrap()["id"], "3");

        let regex = PathMatcher::regex(r"/products/(\d+)").unwrap().with_prefix("/api/v1");
        assert!(regex.matches("/api/v1/products/3"));
        assert!(!regex.matches("/products/3"));
        assert_eq!(regex.captures("/api/v1/products/3").unwrap()["1"], "3");
    }

    #[test]
    fn test_from_template() {
        assert!(matches!(PathMatcher::from_template("/auth/me"), PathMatcher::Exact(_)));
        assert!(matches!(PathMatcher::from_template("/products/:id"), PathMatcher::Param(_)));
    }
}

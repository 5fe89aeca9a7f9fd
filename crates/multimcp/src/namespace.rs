//! Namespaced resource identifiers: `backendName:uri`.
//!
//! Resources are never deduplicated by URI. Each one is exposed under its
//! owning backend's name, so `inventory://overview` served by
//! `resource_server` becomes `resource_server:inventory://overview`.
//!
//! Decoding splits at the *first* colon. When the text after that colon
//! starts with `//`, the colon belonged to a URI scheme and the identifier
//! carries no namespace at all; it decodes as [`ResourceTarget::Bare`].
//! Resource URIs are absolute (they always carry a scheme), so an encoded
//! identifier never takes that path.

use crate::error::{MultiError, MultiResult};

/// Separator between backend name and URI.
pub const SEPARATOR: char = ':';

/// A decoded resource identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceTarget<'a> {
    /// `backend:uri`
    Namespaced {
        /// Owning backend
        backend: &'a str,
        /// URI as the backend knows it
        uri: &'a str,
    },
    /// A plain `scheme://...` URI with no backend prefix
    Bare(&'a str),
}

/// Qualify `uri` with the backend that serves it.
///
/// ```
/// assert_eq!(
///     multimcp::namespace::encode("resource_server", "inventory://overview"),
///     "resource_server:inventory://overview",
/// );
/// ```
pub fn encode(backend: &str, uri: &str) -> String {
    let mut identifier = String::with_capacity(backend.len() + 1 + uri.len());
    identifier.push_str(backend);
    identifier.push(SEPARATOR);
    identifier.push_str(uri);
    identifier
}

/// Split an identifier into backend and URI.
///
/// # Errors
///
/// Returns [`MultiError::MalformedIdentifier`] if the identifier contains no
/// colon, or if the namespace before the first colon is empty.
pub fn decode(identifier: &str) -> MultiResult<ResourceTarget<'_>> {
    let Some((backend, uri)) = identifier.split_once(SEPARATOR) else {
        return Err(MultiError::malformed(identifier, "no ':' separator"));
    };
    if uri.starts_with("//") {
        return Ok(ResourceTarget::Bare(identifier));
    }
    if backend.is_empty() {
        return Err(MultiError::malformed(identifier, "empty backend name"));
    }
    Ok(ResourceTarget::Namespaced { backend, uri })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(encode("a", "file:///tmp/x"), "a:file:///tmp/x");
    }

    #[test]
    fn test_decode_namespaced_with_scheme() {
        assert_eq!(
            decode("resource_server:inventory://overview").unwrap(),
            ResourceTarget::Namespaced {
                backend: "resource_server",
                uri: "inventory://overview",
            }
        );
    }

    #[test]
    fn test_decode_namespaced_template() {
        assert_eq!(
            decode("resource_server:inventory://item/{item_id}").unwrap(),
            ResourceTarget::Namespaced {
                backend: "resource_server",
                uri: "inventory://item/{item_id}",
            }
        );
    }

    #[test]
    fn test_decode_namespaced_without_authority() {
        assert_eq!(
            decode("docs:urn:isbn:0451450523").unwrap(),
            ResourceTarget::Namespaced {
                backend: "docs",
                uri: "urn:isbn:0451450523",
            }
        );
    }

    #[test]
    fn test_decode_bare() {
        assert_eq!(
            decode("inventory://overview").unwrap(),
            ResourceTarget::Bare("inventory://overview")
        );
    }

    #[test]
    fn test_decode_malformed() {
        let err = decode("no-colon-here").unwrap_err();
        assert!(matches!(err, MultiError::MalformedIdentifier { .. }));
        assert!(matches!(
            decode(":inventory"),
            Err(MultiError::MalformedIdentifier { .. })
        ));
        assert!(decode("").is_err());
    }
}

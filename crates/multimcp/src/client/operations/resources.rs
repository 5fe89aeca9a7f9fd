//! Resource dispatch
//!
//! Resources are addressed by namespaced identifier (`backend:uri`) and fail
//! loudly: every routing or backend failure is returned as `Err`.

use multimcp_types::ResourceResult;
use tracing::debug;

use crate::error::{MultiError, MultiResult};
use crate::manager::LiveBackend;
use crate::namespace::{self, ResourceTarget};

impl super::super::core::MultiServerClient {
    /// Read a resource by its namespaced identifier.
    ///
    /// The identifier is split at its first `:` into the backend name and
    /// the URI forwarded to that backend, so
    /// `resource_server:inventory://item/42` reads `inventory://item/42` from
    /// `resource_server`.
    ///
    /// # Errors
    ///
    /// - [`MultiError::MalformedIdentifier`] if the identifier has no `:` or
    ///   an empty backend name
    /// - [`MultiError::MissingNamespace`] for a bare URI such as
    ///   `inventory://overview`
    /// - [`MultiError::UnknownBackend`] / [`MultiError::BackendUnavailable`]
    ///   if the prefix names no live backend
    /// - [`MultiError::Backend`] if the backend fails the read
    /// - [`MultiError::NotConnected`] before `connect_all`
    pub async fn read_resource(&self, identifier: &str) -> MultiResult<ResourceResult> {
        let (backend, uri) = match namespace::decode(identifier)? {
            ResourceTarget::Namespaced { backend, uri } => (backend, uri),
            ResourceTarget::Bare(uri) => {
                return Err(MultiError::MissingNamespace {
                    uri: uri.to_string(),
                });
            }
        };
        let live = self.snapshot().named(self.config(), backend)?;
        forward(&live, uri).await
    }

    /// Read a resource from a named backend. `uri` is forwarded verbatim.
    ///
    /// # Errors
    ///
    /// As [`read_resource`](Self::read_resource), minus the identifier
    /// errors.
    pub async fn read_resource_on(&self, backend: &str, uri: &str) -> MultiResult<ResourceResult> {
        let live = self.snapshot().named(self.config(), backend)?;
        forward(&live, uri).await
    }
}

async fn forward(backend: &LiveBackend, uri: &str) -> MultiResult<ResourceResult> {
    debug!(uri = %uri, backend = %backend.name(), "reading resource");
    backend
        .session()
        .read_resource(uri)
        .await
        .map_err(|source| MultiError::from_session(backend.name(), "resources/read", source))
}

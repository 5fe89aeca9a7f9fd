//! Prompt dispatch
//!
//! Prompts are routed by name like tools but fail loudly like resources.

use multimcp_types::PromptResult;
use tracing::debug;

use crate::catalog::CapabilityKind;
use crate::error::{MultiError, MultiResult};
use crate::manager::LiveBackend;
use crate::session::PromptArguments;

impl super::super::core::MultiServerClient {
    /// Render a prompt on whichever backend owns its name.
    ///
    /// # Errors
    ///
    /// - [`MultiError::NotFound`] if no backend lists the prompt
    /// - [`MultiError::BackendUnavailable`] if its backend has disconnected
    /// - [`MultiError::Backend`] if the backend rejects the request, e.g. a
    ///   missing required argument
    /// - [`MultiError::NotConnected`] before `connect_all`
    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<PromptArguments>,
    ) -> MultiResult<PromptResult> {
        let snapshot = self.snapshot();
        snapshot.ensure_connected()?;
        let owner = snapshot.aggregation.routes.route_prompt(name)?;
        let live = snapshot.live(owner)?;
        forward(&live, name, arguments).await
    }

    /// Render a prompt on a named backend, bypassing name routing.
    ///
    /// # Errors
    ///
    /// [`MultiError::UnknownBackend`], [`MultiError::BackendUnavailable`],
    /// [`MultiError::CapabilityMissing`] or [`MultiError::NotInBackend`]
    /// when the backend cannot serve the prompt, otherwise as
    /// [`get_prompt`](Self::get_prompt).
    pub async fn get_prompt_on(
        &self,
        backend: &str,
        name: &str,
        arguments: Option<PromptArguments>,
    ) -> MultiResult<PromptResult> {
        let live = self
            .snapshot()
            .named_with(self.config(), backend, CapabilityKind::Prompt, name)?;
        forward(&live, name, arguments).await
    }
}

async fn forward(
    backend: &LiveBackend,
    name: &str,
    arguments: Option<PromptArguments>,
) -> MultiResult<PromptResult> {
    debug!(prompt = %name, backend = %backend.name(), "getting prompt");
    backend
        .session()
        .get_prompt(name, arguments)
        .await
        .map_err(|source| MultiError::from_session(backend.name(), "prompts/get", source))
}

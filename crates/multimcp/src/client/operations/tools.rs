//! Tool dispatch
//!
//! Tool failures are data: routing failures come back as error-flagged
//! results with `_meta.errorKind`, and results the backend flagged as errors
//! pass through untouched. Only a failing session (transport or protocol
//! error) surfaces as `Err`.

use std::sync::Arc;

use multimcp_types::ToolResult;
use tracing::{debug, warn};

use crate::catalog::CapabilityKind;
use crate::error::{MultiError, MultiResult};
use crate::manager::LiveBackend;
use crate::session::ToolArguments;

impl super::super::core::MultiServerClient {
    /// Call a tool on whichever backend owns its name.
    ///
    /// # Returns
    ///
    /// The backend's result unchanged. If the name is unknown, the client is
    /// not connected or the owning backend has gone away, an error-flagged
    /// result describing the problem.
    ///
    /// # Errors
    ///
    /// Returns [`MultiError::Backend`] when the backend's session fails while
    /// serving the call.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use multimcp::prelude::*;
    /// # async fn example(client: MultiServerClient) -> MultiResult<()> {
    /// let result = client.call_tool("no_such_tool", None).await?;
    /// assert!(result.is_error());
    /// assert_eq!(result.first_text(), Some("Unknown tool: no_such_tool"));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<ToolArguments>,
    ) -> MultiResult<ToolResult> {
        let snapshot = self.snapshot();
        let routed = snapshot.ensure_connected().and_then(|()| {
            let owner = snapshot.aggregation.routes.route_tool(name)?;
            snapshot.live(owner)
        });
        match routed {
            Ok(backend) => forward(backend, name, arguments).await,
            Err(err) => Ok(rejected(name, &err)),
        }
    }

    /// Call a tool on a named backend, bypassing name routing.
    ///
    /// This is the way to reach a tool whose name lost a collision.
    ///
    /// # Returns
    ///
    /// As [`call_tool`](Self::call_tool). Error-flagged results report an
    /// unknown backend, a backend without tools, a tool that backend does not
    /// list, or a backend that is no longer connected.
    ///
    /// # Errors
    ///
    /// Returns [`MultiError::Backend`] when the backend's session fails.
    pub async fn call_tool_on(
        &self,
        backend: &str,
        name: &str,
        arguments: Option<ToolArguments>,
    ) -> MultiResult<ToolResult> {
        let snapshot = self.snapshot();
        match snapshot.named_with(self.config(), backend, CapabilityKind::Tool, name) {
            Ok(live) => forward(live, name, arguments).await,
            Err(err) => Ok(rejected(name, &err)),
        }
    }
}

fn rejected(name: &str, err: &MultiError) -> ToolResult {
    warn!(tool = %name, error = %err, "tool call rejected");
    err.to_tool_result()
}

async fn forward(
    backend: Arc<LiveBackend>,
    name: &str,
    arguments: Option<ToolArguments>,
) -> MultiResult<ToolResult> {
    debug!(tool = %name, backend = %backend.name(), "calling tool");
    match backend.session().call_tool(name, arguments).await {
        Ok(result) => Ok(result),
        Err(source) => {
            let err = MultiError::from_session(backend.name(), "tools/call", source);
            if err.is_routing_error() {
                // The session closed underneath the call
                Ok(rejected(name, &err))
            } else {
                Err(err)
            }
        }
    }
}

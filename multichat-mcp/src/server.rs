//! MCP Server implementation for MultiChat.
//!
//! The tool set is not fixed at compile time: it is whatever the active
//! messenger registered into its [`Namespace`], so `tools/list` and
//! `tools/call` are answered from the namespace directly.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
};

use multichat_messenger::{Messenger, Namespace, ToolOutput};

#[derive(Clone)]
pub struct MultichatMcp {
    messenger: Arc<dyn Messenger>,
    namespace: Arc<Namespace>,
}

impl MultichatMcp {
    /// Collect the messenger's operations. Call after `connect` succeeds.
    pub fn new(messenger: Arc<dyn Messenger>) -> multichat_messenger::Result<Self> {
        let mut namespace = Namespace::new();
        Arc::clone(&messenger).register_operations(&mut namespace)?;
        tracing::info!(
            "{} messenger registered {} tools",
            messenger.name(),
            namespace.len()
        );

        Ok(Self {
            messenger,
            namespace: Arc::new(namespace),
        })
    }

    fn tools(&self) -> Vec<Tool> {
        self.namespace
            .operations()
            .map(|op| {
                Tool::new(
                    op.name().to_string(),
                    op.description().to_string(),
                    op.input_schema(),
                )
            })
            .collect()
    }

    fn instructions(&self) -> String {
        let names = self
            .namespace
            .operations()
            .map(|op| op.name())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "MultiChat MCP Server - connected to {}. Available tools: {names}. \
             Tool failures are reported as error results with a readable message.",
            self.messenger.name()
        )
    }

    /// Dispatch one call by exact name.
    pub(crate) async fn call(
        &self,
        request: CallToolRequestParams,
        ct: &tokio_util::sync::CancellationToken,
    ) -> Result<CallToolResult, McpError> {
        let name = request.name.as_ref();
        let args = request.arguments.unwrap_or_default();

        match self.namespace.dispatch(name, args, ct).await {
            Some(output) => {
                if output.is_error {
                    tracing::debug!("Tool '{name}' returned an error result");
                }
                Ok(into_call_result(output))
            }
            None => {
                tracing::warn!("Call to unknown tool '{name}'");
                Err(McpError::invalid_params(format!("unknown tool: {name}"), None))
            }
        }
    }
}

/// Main text first, then each note as its own text block.
fn into_call_result(output: ToolOutput) -> CallToolResult {
    let mut content = Vec::with_capacity(1 + output.notes.len());
    content.push(Content::text(output.text));
    content.extend(output.notes.into_iter().map(Content::text));

    if output.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

impl ServerHandler for MultichatMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(self.instructions()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.call(request, &context.ct).await
    }
}

#[cfg(test)]
#[path = "test_mocks.rs"]
#[allow(clippy::unwrap_used, clippy::panic)]
pub(crate) mod test_mocks;

#[cfg(test)]
#[path = "server_tests.rs"]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests;

#[cfg(test)]
#[path = "client_integration_tests.rs"]
#[allow(clippy::unwrap_used, clippy::panic)]
mod client_integration_tests;

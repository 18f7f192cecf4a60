use std::sync::Arc;
use std::time::Instant;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Implementation, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};

use crate::config::Config;
use crate::dispatch::registry::Registry;
use crate::response::{ToolMetadata, ToolResponse};
use crate::tools::listparsers::{ListParsersResponse, ParserInfo};
use crate::tools::parse::ParseToolRequest;

#[derive(Clone)]
pub struct ChemParseServer {
    registry: Arc<Registry>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ChemParseServer {
    pub fn new(config: Config) -> Self {
        Self::with_registry(Arc::new(Registry::from_config(config)))
    }

    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "parse",
        description = "Convert a computational-chemistry output file (GAMESS, NWChem) into a JSON record. Pass metadata.experimentId to use it as the record id. Use `listparsers` for parser names."
    )]
    async fn parse(
        &self,
        Parameters(req): Parameters<ParseToolRequest>,
    ) -> Result<CallToolResult, McpError> {
        let start = Instant::now();
        let parser = req.parser_name();

        if req.input_path.trim().is_empty() {
            return Err(McpError::invalid_params("input_path must not be empty", None));
        }
        let meta = tokio::fs::metadata(&req.input_path).await.map_err(|e| {
            McpError::invalid_params(format!("input file not found: {}: {e}", req.input_path), None)
        })?;
        if !meta.is_file() {
            return Err(McpError::invalid_params(
                format!("{} is not a file", req.input_path),
                None,
            ));
        }

        let parse_req = self.registry.request(&req.input_path, req.metadata);

        let response = match self.registry.parse(&parser, &parse_req).await {
            Ok(result) => match serde_json::to_string(&result.document) {
                Ok(json) => ToolResponse::json(
                    json,
                    ToolMetadata {
                        tool_name: "parse".to_string(),
                        parser_used: result.parser,
                        duration_seconds: start.elapsed().as_secs_f64(),
                    },
                ),
                Err(e) => return Err(McpError::internal_error(e.to_string(), None)),
            },
            // Already logged by the registry.
            Err(e) => ToolResponse::error(
                e.user_message(),
                ToolMetadata {
                    tool_name: "parse".to_string(),
                    parser_used: parser,
                    duration_seconds: start.elapsed().as_secs_f64(),
                },
            ),
        };

        Ok(response.into_call_tool_result())
    }

    #[tool(
        name = "listparsers",
        description = "List available document parsers with their scripts and output files.",
        annotations(read_only_hint = true)
    )]
    async fn listparsers(&self) -> Result<CallToolResult, McpError> {
        let parsers: Vec<ParserInfo> = self
            .registry
            .list_parsers()
            .into_iter()
            .map(ParserInfo::from)
            .collect();

        let list = ListParsersResponse { parsers };
        let response = ToolResponse::success(
            list.to_markdown(),
            ToolMetadata {
                tool_name: "listparsers".to_string(),
                parser_used: "none".to_string(),
                duration_seconds: 0.0,
            },
        );

        Ok(response.into_call_tool_result())
    }
}

#[tool_handler]
impl ServerHandler for ChemParseServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "chemparse".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "chemparse: converts GAMESS and NWChem output files into JSON records.\n\n\
                 1. Call `listparsers` for parser names.\n\
                 2. Call `parse` with `parser`, an absolute `input_path`, and optional \
                    `metadata` (`experimentId` becomes the record id)."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

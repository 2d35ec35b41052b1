use std::io::{self, BufRead, Write};

use tracing::info;
use weather_mcp_core::{Dispatcher, RegistryError, ServerInfo, ToolRegistry};

use crate::config::{Config, ToolSet};
use crate::tools::{self, ToolContext};
use crate::transport;

pub const SERVER_NAME: &str = "weather-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn build_registry(set: ToolSet, ctx: &ToolContext) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    for spec in tools::definitions(set, ctx) {
        registry.register(spec)?;
    }
    Ok(registry)
}

pub struct McpServer {
    dispatcher: Dispatcher,
}

impl McpServer {
    pub fn new(set: ToolSet, ctx: &ToolContext) -> Result<Self, RegistryError> {
        let registry = build_registry(set, ctx)?;
        info!(
            tools = ?registry.names().collect::<Vec<_>>(),
            "tools registered"
        );
        let dispatcher = Dispatcher::new(registry)
            .with_server_info(ServerInfo::new(SERVER_NAME, SERVER_VERSION));
        Ok(Self { dispatcher })
    }

    pub fn from_config(config: &Config) -> Result<Self, RegistryError> {
        Self::new(config.tools, &ToolContext::from_config(config))
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn handle_request(&self, input: &str) -> Option<String> {
        transport::process_line(&self.dispatcher, input).map(|r| transport::encode_response(&r))
    }

    pub fn handle_chunk(&self, chunk: &str) -> Vec<String> {
        self.dispatcher
            .dispatch_chunk(chunk)
            .iter()
            .map(transport::encode_response)
            .collect()
    }

    pub fn serve<R: BufRead, W: Write>(&self, reader: R, writer: W) -> io::Result<()> {
        transport::serve(&self.dispatcher, reader, writer)
    }
}

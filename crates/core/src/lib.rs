pub mod dispatcher;
pub mod jsonrpc;
pub mod registry;
pub mod schema;
#[cfg(test)]
mod testutils;
pub mod tool;

pub use dispatcher::{
    panic_message, Dispatcher, Method, ServerInfo, DISCOVERY_ALIASES, PROTOCOL_VERSION,
};
pub use jsonrpc::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, Outcome, INTERNAL_ERROR, INVALID_PARAMS,
    METHOD_NOT_FOUND, PARSE_ERROR,
};
pub use registry::{RegistryError, ToolDefinition, ToolRegistry, ToolSpec};
pub use schema::{validate, Constraints, FieldKind, FieldSpec, Schema, ValidationError};
pub use tool::{Arguments, Content, HandlerError, ToolHandler, ToolOutcome, ToolResult};

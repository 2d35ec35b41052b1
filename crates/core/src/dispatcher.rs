use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info_span, warn};

use crate::jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::registry::{ToolRegistry, ToolSpec};
use crate::tool::Arguments;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const DISCOVERY_ALIASES: [&str; 4] = [
    "mcp.server.listTools",
    "listTools",
    "mcp.listTools",
    "tools/list",
];

const NOTIFICATION_PREFIX: &str = "notifications/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method<'a> {
    Initialize,
    Ping,
    ListTools,
    CallTool,
    /// Any other name is taken as a tool name.
    Invoke(&'a str),
}

impl<'a> Method<'a> {
    pub fn parse(method: &'a str) -> Self {
        match method {
            "initialize" => Method::Initialize,
            "ping" => Method::Ping,
            "tools/call" => Method::CallTool,
            m if DISCOVERY_ALIASES.contains(&m) => Method::ListTools,
            m => Method::Invoke(m),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl ServerInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug)]
pub struct Dispatcher {
    registry: ToolRegistry,
    server_info: ServerInfo,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            server_info: ServerInfo::default(),
        }
    }

    pub fn with_server_info(mut self, server_info: ServerInfo) -> Self {
        self.server_info = server_info;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn dispatch(&self, line: &str) -> JsonRpcResponse {
        match decode(line) {
            Ok(request) => self.handle_request(request),
            Err(response) => response,
        }
    }

    /// Like [`Dispatcher::dispatch`], but stays silent for blank lines and
    /// for `notifications/*` messages that carry no id.
    pub fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        if line.trim().is_empty() {
            return None;
        }
        match decode(line) {
            Ok(request)
                if request.is_notification() && request.method.starts_with(NOTIFICATION_PREFIX) =>
            {
                debug!(method = %request.method, "notification received");
                None
            }
            Ok(request) => Some(self.handle_request(request)),
            Err(response) => Some(response),
        }
    }

    pub fn dispatch_chunk(&self, chunk: &str) -> Vec<JsonRpcResponse> {
        chunk
            .split('\n')
            .filter_map(|line| self.handle_line(line.trim_end_matches('\r')))
            .collect()
    }

    pub fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.response_id();
        debug!(method = %request.method, id = %id, "request received");

        match Method::parse(&request.method) {
            Method::Initialize => JsonRpcResponse::success(id, self.initialize_result()),
            Method::Ping => JsonRpcResponse::success(id, json!({})),
            Method::ListTools => {
                JsonRpcResponse::success(id, json!({ "tools": self.registry.list() }))
            }
            Method::CallTool => self.call_tool(id, request.params),
            Method::Invoke(name) => match self.registry.lookup(name) {
                Ok(spec) => invoke(spec, id, request.params),
                Err(_) => {
                    warn!(method = %name, "unknown method");
                    JsonRpcResponse::error(
                        id,
                        JsonRpcError::method_not_found().with_data(name.to_string()),
                    )
                }
            },
        }
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": self.server_info.name,
                "version": self.server_info.version
            }
        })
    }

    fn call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: CallParams = match params.map(serde_json::from_value) {
            Some(Ok(p)) => p,
            Some(Err(e)) => return JsonRpcResponse::error(id, JsonRpcError::invalid_params(e)),
            None => {
                return JsonRpcResponse::error(id, JsonRpcError::invalid_params("missing params"))
            }
        };

        match self.registry.lookup(&params.name) {
            Ok(spec) => invoke(spec, id, params.arguments),
            Err(_) => {
                warn!(tool = %params.name, "unknown tool");
                JsonRpcResponse::error(id, JsonRpcError::method_not_found().with_data(params.name))
            }
        }
    }
}

fn decode(line: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    serde_json::from_str(line).map_err(|e| {
        warn!(error = %e, "failed to parse request");
        JsonRpcResponse::parse_error()
    })
}

fn invoke(spec: &ToolSpec, id: Value, params: Option<Value>) -> JsonRpcResponse {
    let raw = match params {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params("params must be an object"),
            )
        }
    };

    let args = match spec.schema().validate(&raw) {
        Ok(args) => args,
        Err(e) => {
            debug!(tool = spec.name(), error = %e, "argument validation failed");
            return JsonRpcResponse::error(id, JsonRpcError::invalid_params(e));
        }
    };

    // A panic is recorded by the process panic hook, inside this span.
    let span = info_span!("tool", name = spec.name());
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        span.in_scope(|| spec.handler().call(Arguments::new(args)))
    }));

    match outcome {
        Ok(Ok(result)) => match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => {
                error!(tool = spec.name(), error = %e, "failed to encode tool result");
                JsonRpcResponse::error(id, JsonRpcError::internal_error())
            }
        },
        Ok(Err(e)) => {
            error!(tool = spec.name(), error = %e, "tool handler failed");
            JsonRpcResponse::error(id, JsonRpcError::internal_error())
        }
        Err(_) => JsonRpcResponse::error(id, JsonRpcError::internal_error()),
    }
}

pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

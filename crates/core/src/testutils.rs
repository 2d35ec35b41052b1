use serde::Deserialize;

use crate::registry::{ToolRegistry, ToolSpec};
use crate::schema::{FieldSpec, Schema};
use crate::tool::{Arguments, HandlerError, ToolOutcome, ToolResult};

#[derive(Deserialize)]
struct AddArgs {
    a: f64,
    b: f64,
}

pub fn fixture_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry
        .register(ToolSpec::new(
            "echo",
            "Echo a message back",
            Schema::new().field("message", FieldSpec::string("Text to echo").required()),
            |args: Arguments| -> ToolOutcome {
                let message = args
                    .get("message")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                Ok(ToolResult::text(message))
            },
        ))
        .unwrap();

    registry
        .register(ToolSpec::new(
            "add",
            "Add two numbers",
            Schema::new()
                .field("a", FieldSpec::number("Left operand").required())
                .field("b", FieldSpec::number("Right operand").required()),
            |args: Arguments| -> ToolOutcome {
                let AddArgs { a, b } = args.parse()?;
                Ok(ToolResult::text((a + b).to_string()))
            },
        ))
        .unwrap();

    registry
        .register(ToolSpec::new(
            "fail",
            "Always fails",
            Schema::new(),
            |_: Arguments| -> ToolOutcome { Err(HandlerError::failed("deliberate failure")) },
        ))
        .unwrap();

    registry
        .register(ToolSpec::new(
            "explode",
            "Always panics",
            Schema::new(),
            |_: Arguments| -> ToolOutcome { panic!("boom") },
        ))
        .unwrap();

    registry
}

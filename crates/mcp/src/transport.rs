use std::io::{self, BufRead, ErrorKind, Write};
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;
use tracing::{error, info, warn};
use weather_mcp_core::{panic_message, Dispatcher, JsonRpcError, JsonRpcResponse};

const INTERNAL_ERROR_LINE: &str =
    r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#;

pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| l.to_string())
            .unwrap_or_default();
        error!(%location, panic = %panic_message(info.payload()), "panic");
    }));
}

/// Reads newline-delimited requests until EOF, writing one JSON line per
/// response. Only unrecoverable IO errors end the loop early.
pub fn serve<R: BufRead, W: Write>(
    dispatcher: &Dispatcher,
    reader: R,
    writer: W,
) -> io::Result<()> {
    serve_lines(reader, writer, |line| dispatcher.handle_line(line))
}

fn serve_lines<R, W, F>(mut reader: R, mut writer: W, handle: F) -> io::Result<()>
where
    R: BufRead,
    W: Write,
    F: Fn(&str) -> Option<JsonRpcResponse>,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                info!("stdin closed, shutting down");
                return Ok(());
            }
            Ok(_) => {}
            Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::InvalidData) => {
                warn!(error = %e, "skipping unreadable input");
                continue;
            }
            Err(e) => {
                error!(error = %e, "failed to read stdin");
                return Err(e);
            }
        }

        let line = String::from_utf8_lossy(&buf);
        if let Some(response) = guarded(&handle, &line) {
            write_response(&mut writer, &response).inspect_err(|e| {
                error!(error = %e, "failed to write response");
            })?;
        }
    }
}

pub fn process_line(dispatcher: &Dispatcher, line: &str) -> Option<JsonRpcResponse> {
    guarded(|line| dispatcher.handle_line(line), line)
}

fn guarded<F>(handle: F, line: &str) -> Option<JsonRpcResponse>
where
    F: Fn(&str) -> Option<JsonRpcResponse>,
{
    let line = line.trim_end_matches(['\r', '\n']);
    panic::catch_unwind(AssertUnwindSafe(|| handle(line))).unwrap_or_else(|_| {
        Some(JsonRpcResponse::error(
            Value::Null,
            JsonRpcError::internal_error(),
        ))
    })
}

pub fn encode_response(response: &JsonRpcResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        error!(error = %e, "failed to encode response");
        INTERNAL_ERROR_LINE.to_string()
    })
}

fn write_response<W: Write>(writer: &mut W, response: &JsonRpcResponse) -> io::Result<()> {
    writeln!(writer, "{}", encode_response(response))?;
    writer.flush()
}

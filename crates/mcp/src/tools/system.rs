use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use weather_mcp_core::{
    Arguments, FieldSpec, HandlerError, Schema, ToolOutcome, ToolResult, ToolSpec,
};

use super::ToolContext;
use crate::host;
use crate::shell::{build_command, CommandRunner, HostCommand, Platform, MAX_SHUTDOWN_DELAY};

pub fn shutdown(ctx: &ToolContext) -> ToolSpec {
    let runner = Arc::clone(&ctx.runner);
    let platform = ctx.platform;
    ToolSpec::new(
        "shutdown_system",
        "Shutdown or restart the system",
        Schema::new()
            .field(
                "restart",
                FieldSpec::boolean("True to restart, false to shutdown").default_value(false),
            )
            .field(
                "delay",
                FieldSpec::number("Delay in seconds before shutdown")
                    .range(0.0, MAX_SHUTDOWN_DELAY as f64)
                    .default_value(0),
            )
            .field(
                "force",
                FieldSpec::boolean("Force shutdown without confirmation").default_value(false),
            ),
        move |args: Arguments| -> ToolOutcome {
            shutdown_system(runner.as_ref(), platform, args.parse()?)
        },
    )
}

pub fn screenshot(ctx: &ToolContext) -> ToolSpec {
    let runner = Arc::clone(&ctx.runner);
    let platform = ctx.platform;
    ToolSpec::new(
        "capture_screenshot",
        "Capture the primary screen and save it as a PNG file",
        Schema::new().field(
            "savePath",
            FieldSpec::string(
                "Where to save the screenshot; defaults to screenshot-<timestamp>.png in the working directory",
            )
            .min_length(1),
        ),
        move |args: Arguments| -> ToolOutcome {
            capture_screenshot(runner.as_ref(), platform, args.parse()?)
        },
    )
}

pub fn system_time(ctx: &ToolContext) -> ToolSpec {
    let started_at = ctx.started_at;
    ToolSpec::new(
        "get_system_time",
        "Get the local and UTC time, timezone offset and uptime of the host",
        Schema::new(),
        move |_: Arguments| -> ToolOutcome { get_system_time(started_at) },
    )
}

#[derive(Debug, Deserialize)]
struct ShutdownArgs {
    restart: bool,
    delay: f64,
    force: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScreenshotArgs {
    save_path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TimeSnapshot {
    local_time: String,
    utc_time: String,
    timezone_offset: String,
    unix_timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    uptime_seconds: Option<u64>,
    process_uptime_seconds: u64,
    os: String,
    os_version: String,
}

fn shutdown_system(
    runner: &dyn CommandRunner,
    platform: Platform,
    args: ShutdownArgs,
) -> ToolOutcome {
    let ShutdownArgs {
        restart,
        delay,
        force,
    } = args;
    let delay = delay as u64;
    info!(restart, delay, force, platform = platform.name(), "shutdown requested");

    let planned = build_command(
        &HostCommand::Shutdown {
            restart,
            delay,
            force,
        },
        platform,
    );

    match runner.run(&planned) {
        Ok(_) => {
            let action = if restart { "restart" } else { "shut down" };
            let after = if delay > 0 {
                format!(" after {} seconds", delay)
            } else {
                String::new()
            };
            Ok(ToolResult::text(format!(
                "Shutdown command executed. The system will {}{}.",
                action, after
            )))
        }
        Err(e) => {
            warn!(error = %e, "shutdown command failed");
            Ok(ToolResult::failure(format!(
                "Failed to execute shutdown command: {}",
                e
            )))
        }
    }
}

/// Resolves where a screenshot is written.
///
/// Without a path the file lands in the working directory, named after
/// `now`. A missing `.png` extension is appended.
pub fn screenshot_path(save_path: Option<&str>, now: DateTime<Local>) -> PathBuf {
    match save_path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => {
            let path = PathBuf::from(p);
            let is_png = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
            if is_png {
                path
            } else {
                let mut os = path.into_os_string();
                os.push(".png");
                PathBuf::from(os)
            }
        }
        None => PathBuf::from(format!("screenshot-{}.png", now.format("%Y%m%d-%H%M%S"))),
    }
}

fn capture_screenshot(
    runner: &dyn CommandRunner,
    platform: Platform,
    args: ScreenshotArgs,
) -> ToolOutcome {
    let path = screenshot_path(args.save_path.as_deref(), Local::now());
    info!(path = %path.display(), "capturing screenshot");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!(path = %parent.display(), error = %e, "could not create screenshot directory");
            return Ok(ToolResult::failure(format!(
                "Failed to capture screenshot: {}",
                e
            )));
        }
    }

    let planned = build_command(&HostCommand::Screenshot { path: path.clone() }, platform);
    match runner.run(&planned) {
        Ok(_) => Ok(ToolResult::text(format!(
            "Screenshot saved to {}",
            path.display()
        ))),
        Err(e) => {
            warn!(error = %e, "screenshot command failed");
            Ok(ToolResult::failure(format!(
                "Failed to capture screenshot: {}",
                e
            )))
        }
    }
}

fn get_system_time(started_at: Instant) -> ToolOutcome {
    let local = Local::now();
    let utc: DateTime<Utc> = local.with_timezone(&Utc);
    let os = host::os_info();

    let snapshot = TimeSnapshot {
        local_time: local.to_rfc3339(),
        utc_time: utc.to_rfc3339(),
        timezone_offset: local.offset().to_string(),
        unix_timestamp: utc.timestamp(),
        uptime_seconds: host::system_uptime(),
        process_uptime_seconds: started_at.elapsed().as_secs(),
        os: os.name,
        os_version: os.version,
    };

    let text = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| HandlerError::failed(e.to_string()))?;
    Ok(ToolResult::text(text))
}

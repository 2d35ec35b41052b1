use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Largest delay `shutdown /t` accepts on Windows (ten years).
pub const MAX_SHUTDOWN_DELAY: u64 = 315_360_000;

const LAUNCH_GRACE: Duration = Duration::from_secs(1);
const LAUNCH_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Default,
    Chrome,
    Firefox,
    Safari,
    Edge,
}

impl Browser {
    pub const NAMES: [&'static str; 5] = ["default", "chrome", "firefox", "safari", "edge"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Default => "default",
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Safari => "safari",
            Browser::Edge => "edge",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    Shutdown {
        restart: bool,
        delay: u64,
        force: bool,
    },
    Screenshot {
        path: PathBuf,
    },
    OpenUrl {
        url: String,
        browser: Browser,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Execution {
    /// Run to completion and capture the output.
    #[default]
    Wait,
    /// Start a program that may keep running; only an early exit is checked.
    Launch,
    /// Start and return at once.
    Detach,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommand {
    pub command: String,
    pub execution: Execution,
}

impl PlannedCommand {
    pub fn new(command: impl Into<String>, execution: Execution) -> Self {
        Self {
            command: command.into(),
            execution,
        }
    }
}

pub fn build_command(cmd: &HostCommand, platform: Platform) -> PlannedCommand {
    match cmd {
        HostCommand::Shutdown {
            restart,
            delay,
            force,
        } => shutdown_command(*restart, *delay, *force, platform),
        HostCommand::Screenshot { path } => {
            PlannedCommand::new(
                screenshot_command(&path.to_string_lossy(), platform),
                Execution::Wait,
            )
        }
        HostCommand::OpenUrl { url, browser } => PlannedCommand::new(
            open_url_command(url, *browser, platform),
            Execution::Launch,
        ),
    }
}

fn shutdown_command(restart: bool, delay: u64, force: bool, platform: Platform) -> PlannedCommand {
    let delay = delay.min(MAX_SHUTDOWN_DELAY);
    match platform {
        Platform::Windows => {
            let mut cmd = String::from(if restart { "shutdown /r" } else { "shutdown /s" });
            if force {
                cmd.push_str(" /f");
            }
            cmd.push_str(&format!(" /t {}", delay));
            PlannedCommand::new(cmd, Execution::Wait)
        }
        Platform::MacOs => {
            // osascript has no delay option
            let action = if restart { "restart" } else { "shut down" };
            let cmd = format!("osascript -e 'tell app \"System Events\" to {}'", action);
            if delay > 0 {
                PlannedCommand::new(format!("sleep {} && {}", delay, cmd), Execution::Detach)
            } else {
                PlannedCommand::new(cmd, Execution::Wait)
            }
        }
        Platform::Linux => {
            let flag = if restart { "-r" } else { "-h" };
            let when = if force {
                "now".to_string()
            } else {
                format!("+{}", delay / 60)
            };
            PlannedCommand::new(format!("shutdown {} {}", flag, when), Execution::Wait)
        }
    }
}

fn screenshot_command(path: &str, platform: Platform) -> String {
    match platform {
        Platform::MacOs => format!("screencapture -x {}", posix_quote(path)),
        Platform::Linux => {
            let quoted = posix_quote(path);
            format!(
                "gnome-screenshot -f {} || import -window root {}",
                quoted, quoted
            )
        }
        Platform::Windows => format!(
            "powershell -NoProfile -Command \"Add-Type -AssemblyName System.Windows.Forms,System.Drawing; \
             $b = [System.Windows.Forms.Screen]::PrimaryScreen.Bounds; \
             $bmp = New-Object System.Drawing.Bitmap $b.Width, $b.Height; \
             $g = [System.Drawing.Graphics]::FromImage($bmp); \
             $g.CopyFromScreen($b.Location, [System.Drawing.Point]::Empty, $b.Size); \
             $bmp.Save({}, [System.Drawing.Imaging.ImageFormat]::Png)\"",
            powershell_quote(path)
        ),
    }
}

fn open_url_command(url: &str, browser: Browser, platform: Platform) -> String {
    match platform {
        Platform::Windows => {
            let quoted = windows_quote(url);
            match browser {
                Browser::Chrome => format!("start \"\" chrome {}", quoted),
                Browser::Firefox => format!("start \"\" firefox {}", quoted),
                Browser::Edge => format!("start \"\" msedge {}", quoted),
                Browser::Default | Browser::Safari => format!("start \"\" {}", quoted),
            }
        }
        Platform::MacOs => {
            let quoted = posix_quote(url);
            match browser {
                Browser::Chrome => format!("open -a \"Google Chrome\" {}", quoted),
                Browser::Firefox => format!("open -a \"Firefox\" {}", quoted),
                Browser::Safari => format!("open -a \"Safari\" {}", quoted),
                Browser::Edge => format!("open -a \"Microsoft Edge\" {}", quoted),
                Browser::Default => format!("open {}", quoted),
            }
        }
        Platform::Linux => {
            let quoted = posix_quote(url);
            let fallback = match browser {
                Browser::Chrome => Some("google-chrome"),
                Browser::Firefox => Some("firefox"),
                Browser::Edge => Some("microsoft-edge"),
                Browser::Default | Browser::Safari => None,
            };
            match fallback {
                Some(bin) => format!("xdg-open {} || {} {}", quoted, bin, quoted),
                None => format!("xdg-open {}", quoted),
            }
        }
    }
}

pub fn posix_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

pub fn windows_quote(arg: &str) -> String {
    format!("\"{}\"", arg.replace('"', ""))
}

fn powershell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('"', "").replace('\'', "''"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("command `{command}` failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

pub trait CommandRunner: Send + Sync {
    fn run(&self, planned: &PlannedCommand) -> Result<CommandOutput, CommandError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, planned: &PlannedCommand) -> Result<CommandOutput, CommandError> {
        info!(command = %planned.command, execution = ?planned.execution, "running host command");
        match planned.execution {
            Execution::Wait => run_to_completion(&planned.command),
            Execution::Launch => launch(&planned.command, LAUNCH_GRACE),
            Execution::Detach => launch(&planned.command, Duration::ZERO),
        }
    }
}

fn run_to_completion(command: &str) -> Result<CommandOutput, CommandError> {
    let output = shell(command)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| CommandError::Spawn {
            command: command.to_string(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    debug!(status = ?output.status.code(), %stdout, %stderr, "host command finished");

    if !output.status.success() {
        return Err(CommandError::Failed {
            command: command.to_string(),
            status: output.status.to_string(),
            stderr,
        });
    }

    Ok(CommandOutput {
        status: output.status.code(),
        stdout,
        stderr,
    })
}

// No pipes are attached, so children left behind by the shell cannot hold
// the call open. A command still running after `grace` is reaped on its own
// thread.
fn launch(command: &str, grace: Duration) -> Result<CommandOutput, CommandError> {
    let mut child = shell(command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| CommandError::Spawn {
            command: command.to_string(),
            source,
        })?;

    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) if status.success() => {
                return Ok(CommandOutput {
                    status: status.code(),
                    ..Default::default()
                })
            }
            Ok(Some(status)) => {
                return Err(CommandError::Failed {
                    command: command.to_string(),
                    status: status.to_string(),
                    stderr: String::new(),
                })
            }
            Ok(None) if started.elapsed() < grace => thread::sleep(LAUNCH_POLL),
            Ok(None) => break,
            Err(e) => {
                warn!(command, error = %e, "could not poll command");
                break;
            }
        }
    }

    debug!(command, "command still running in the background");
    let command = command.to_string();
    thread::spawn(move || match child.wait() {
        Ok(status) if !status.success() => {
            warn!(%command, %status, "background command failed")
        }
        Ok(_) => debug!(%command, "background command finished"),
        Err(e) => warn!(%command, error = %e, "could not wait for background command"),
    });
    Ok(CommandOutput::default())
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    use std::os::windows::process::CommandExt;
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").raw_arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

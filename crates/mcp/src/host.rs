use std::fs;
use std::process::Command;

use serde::Serialize;

use crate::shell::Platform;

const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OsInfo {
    pub name: String,
    pub version: String,
}

pub fn os_info() -> OsInfo {
    let platform = Platform::current();
    let name = match platform {
        Platform::Windows => "Windows",
        Platform::MacOs => "macOS",
        Platform::Linux => "Linux",
    };
    OsInfo {
        name: name.to_string(),
        version: os_version(platform).unwrap_or_else(|| UNKNOWN.to_string()),
    }
}

fn os_version(platform: Platform) -> Option<String> {
    match platform {
        Platform::Linux => fs::read_to_string("/proc/sys/kernel/osrelease")
            .ok()
            .map(|s| s.trim().to_string()),
        Platform::MacOs => command_stdout("sw_vers", &["-productVersion"]),
        Platform::Windows => command_stdout("cmd", &["/C", "ver"]).map(|s| parse_windows_ver(&s)),
    }
    .filter(|s| !s.is_empty())
}

/// Seconds since boot, where the host exposes it.
pub fn system_uptime() -> Option<u64> {
    match Platform::current() {
        Platform::Linux => parse_proc_uptime(&fs::read_to_string("/proc/uptime").ok()?),
        Platform::MacOs => {
            let boot = parse_boottime(&command_stdout("sysctl", &["-n", "kern.boottime"])?)?;
            let now = chrono::Utc::now().timestamp();
            u64::try_from(now - boot).ok()
        }
        Platform::Windows => None,
    }
}

fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn parse_proc_uptime(contents: &str) -> Option<u64> {
    let secs: f64 = contents.split_whitespace().next()?.parse().ok()?;
    Some(secs as u64)
}

// `{ sec = 1700000000, usec = 0 } Tue Nov 14 ...`
fn parse_boottime(contents: &str) -> Option<i64> {
    let rest = contents.split("sec = ").nth(1)?;
    rest.split(',').next()?.trim().parse().ok()
}

// `Microsoft Windows [Version 10.0.19045.3803]`
fn parse_windows_ver(output: &str) -> String {
    output
        .split("Version ")
        .nth(1)
        .and_then(|rest| rest.split(']').next())
        .unwrap_or(output)
        .trim()
        .to_string()
}

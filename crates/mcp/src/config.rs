use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::nws;
use crate::url_finder;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ToolSet {
    /// Weather, shutdown, browser search, screenshot and system time.
    #[default]
    Full,
    /// Weather, shutdown and browser search only.
    Minimal,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "weather-mcp")]
#[command(version)]
#[command(about = "JSON-RPC tool server on stdio: NWS weather lookups and host commands")]
pub struct Config {
    #[arg(
        long,
        env = "WEATHER_MCP_LOG_FILE",
        default_value = "weather.log",
        help = "Log file, appended to"
    )]
    pub log_file: PathBuf,

    #[arg(
        long,
        env = "RUST_LOG",
        default_value = crate::logging::DEFAULT_FILTER,
        help = "tracing filter directives"
    )]
    pub log_filter: String,

    #[arg(
        long,
        env = "WEATHER_MCP_NWS_BASE_URL",
        default_value = nws::DEFAULT_BASE_URL,
        help = "NWS API base URL"
    )]
    pub nws_base_url: String,

    #[arg(
        long,
        env = "WEATHER_MCP_USER_AGENT",
        default_value = nws::DEFAULT_USER_AGENT,
        help = "User-Agent sent to the NWS API"
    )]
    pub user_agent: String,

    #[arg(
        long,
        env = "WEATHER_MCP_SEARCH_ENGINE",
        default_value = url_finder::DEFAULT_SEARCH_ENGINE,
        help = "Fallback search URL, {query} is replaced by the search term"
    )]
    pub search_engine: String,

    #[arg(
        long,
        env = "WEATHER_MCP_TOOLS",
        value_enum,
        default_value_t = ToolSet::Full,
        help = "Tool set to register"
    )]
    pub tools: ToolSet,
}

mod browser;
mod system;
mod weather;

use std::sync::Arc;
use std::time::Instant;

use weather_mcp_core::ToolSpec;

use crate::config::{Config, ToolSet};
use crate::nws::{NwsClient, WeatherSource};
use crate::shell::{CommandRunner, Platform, SystemRunner};
use crate::url_finder::UrlFinder;

pub use system::screenshot_path;

#[derive(Clone)]
pub struct ToolContext {
    pub weather: Arc<dyn WeatherSource>,
    pub runner: Arc<dyn CommandRunner>,
    pub platform: Platform,
    pub url_finder: Arc<UrlFinder>,
    pub started_at: Instant,
}

impl ToolContext {
    pub fn new(weather: Arc<dyn WeatherSource>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            weather,
            runner,
            platform: Platform::current(),
            url_finder: Arc::new(UrlFinder::default()),
            started_at: Instant::now(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let weather = NwsClient::new(config.nws_base_url.as_str(), &config.user_agent);
        Self::new(Arc::new(weather), Arc::new(SystemRunner))
            .with_url_finder(UrlFinder::new(config.search_engine.as_str()))
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_url_finder(mut self, url_finder: UrlFinder) -> Self {
        self.url_finder = Arc::new(url_finder);
        self
    }
}

pub fn definitions(set: ToolSet, ctx: &ToolContext) -> Vec<ToolSpec> {
    let mut tools = vec![
        weather::alerts(ctx),
        weather::forecast(ctx),
        system::shutdown(ctx),
        browser::open_search(ctx),
    ];
    if set == ToolSet::Full {
        tools.push(system::screenshot(ctx));
        tools.push(system::system_time(ctx));
    }
    tools
}

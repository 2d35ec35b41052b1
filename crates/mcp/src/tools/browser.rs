use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};
use weather_mcp_core::{Arguments, FieldSpec, Schema, ToolOutcome, ToolResult, ToolSpec};

use super::ToolContext;
use crate::shell::{build_command, Browser, CommandRunner, HostCommand, Platform};
use crate::url_finder::UrlFinder;

pub fn open_search(ctx: &ToolContext) -> ToolSpec {
    let runner = Arc::clone(&ctx.runner);
    let finder = Arc::clone(&ctx.url_finder);
    let platform = ctx.platform;
    ToolSpec::new(
        "open_browser_search",
        "Open a browser and search for a term; opens `url` when given, otherwise \
         infers a site from the term or falls back to the default search engine",
        Schema::new()
            .field(
                "searchTerm",
                FieldSpec::string("Term to search for").required(),
            )
            .field(
                "url",
                FieldSpec::string("URL to open; may contain a {query} placeholder"),
            )
            .field(
                "browser",
                FieldSpec::one_of(Browser::NAMES, "Browser to use").default_value("default"),
            )
            .field(
                "autoFindUrl",
                FieldSpec::boolean("Try to infer a website from the search term")
                    .default_value(true),
            ),
        move |args: Arguments| -> ToolOutcome {
            open_browser_search(runner.as_ref(), &finder, platform, args.parse()?)
        },
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    search_term: String,
    url: Option<String>,
    browser: Browser,
    auto_find_url: bool,
}

fn open_browser_search(
    runner: &dyn CommandRunner,
    finder: &UrlFinder,
    platform: Platform,
    args: SearchArgs,
) -> ToolOutcome {
    let resolved = finder.resolve(&args.search_term, args.url.as_deref(), args.auto_find_url);
    info!(
        term = %args.search_term,
        url = %resolved.url,
        source = ?resolved.source,
        browser = args.browser.as_str(),
        "opening browser"
    );

    let planned = build_command(
        &HostCommand::OpenUrl {
            url: resolved.url.clone(),
            browser: args.browser,
        },
        platform,
    );

    match runner.run(&planned) {
        Ok(_) => {
            let label = match args.browser {
                Browser::Default => "default browser",
                other => other.as_str(),
            };
            Ok(ToolResult::text(format!(
                "Opened {} with search \"{}\" ({})",
                label, args.search_term, resolved.url
            )))
        }
        Err(e) => {
            warn!(error = %e, "could not open browser");
            Ok(ToolResult::failure(format!("Failed to open browser: {}", e)))
        }
    }
}

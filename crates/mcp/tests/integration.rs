use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use weather_mcp::config::ToolSet;
use weather_mcp::nws::{FetchError, WeatherSource};
use weather_mcp::server::McpServer;
use weather_mcp::shell::{
    CommandError, CommandOutput, CommandRunner, Execution, Platform, PlannedCommand,
};
use weather_mcp::tools::ToolContext;
use weather_mcp::url_finder::UrlFinder;

const BASE: &str = "https://nws.test";

#[derive(Default)]
struct FakeWeather {
    responses: HashMap<String, Value>,
    requested: Mutex<Vec<String>>,
}

impl FakeWeather {
    fn with(mut self, url: &str, body: Value) -> Self {
        self.responses.insert(url.to_string(), body);
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl WeatherSource for FakeWeather {
    fn base_url(&self) -> &str {
        BASE
    }

    fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
    }
}

#[derive(Default)]
struct RecordingRunner {
    commands: Mutex<Vec<PlannedCommand>>,
    fail_with: Option<String>,
}

impl RecordingRunner {
    fn failing(stderr: &str) -> Self {
        Self {
            fail_with: Some(stderr.to_string()),
            ..Default::default()
        }
    }

    fn commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.command.clone())
            .collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, planned: &PlannedCommand) -> Result<CommandOutput, CommandError> {
        self.commands.lock().unwrap().push(planned.clone());
        match &self.fail_with {
            Some(stderr) => Err(CommandError::Failed {
                command: planned.command.clone(),
                status: "exit status: 1".to_string(),
                stderr: stderr.clone(),
            }),
            None => Ok(CommandOutput::default()),
        }
    }
}

struct Harness {
    server: McpServer,
    weather: Arc<FakeWeather>,
    runner: Arc<RecordingRunner>,
}

fn harness_with(weather: FakeWeather, runner: RecordingRunner, set: ToolSet) -> Harness {
    let weather = Arc::new(weather);
    let runner = Arc::new(runner);
    let ctx = ToolContext::new(weather.clone(), runner.clone()).with_platform(Platform::Linux);
    Harness {
        server: McpServer::new(set, &ctx).unwrap(),
        weather,
        runner,
    }
}

fn harness() -> Harness {
    harness_with(FakeWeather::default(), RecordingRunner::default(), ToolSet::Full)
}

fn request(method: &str, params: Option<Value>) -> String {
    let req = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params
    });
    serde_json::to_string(&req).unwrap()
}

fn tool_call(name: &str, arguments: Value) -> String {
    request(
        "tools/call",
        Some(json!({
            "name": name,
            "arguments": arguments
        })),
    )
}

fn parse_response(response: &str) -> Value {
    serde_json::from_str(response).unwrap()
}

fn get_text_content(response: &Value) -> &str {
    response["result"]["content"][0]["text"]
        .as_str()
        .unwrap_or("")
}

fn call(h: &Harness, line: &str) -> Value {
    parse_response(&h.server.handle_request(line).unwrap())
}

// ============================================================================
// Protocol
// ============================================================================

#[test]
fn initialize_returns_server_info() {
    let json = call(&harness(), &request("initialize", Some(json!({}))));

    assert_eq!(json["jsonrpc"], "2.0");
    assert_eq!(json["result"]["serverInfo"]["name"], "weather-mcp");
    assert!(json["result"]["serverInfo"]["version"].as_str().is_some());
    assert!(json["result"]["protocolVersion"].as_str().is_some());
    assert!(json["result"]["capabilities"]["tools"].is_object());
}

#[test]
fn initialized_notification_returns_nothing() {
    let h = harness();
    let resp = h
        .server
        .handle_request(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#);
    assert!(resp.is_none());
}

#[test]
fn ping_returns_empty_object() {
    let json = call(&harness(), &request("ping", None));
    assert_eq!(json["result"], json!({}));
}

#[test]
fn tools_list_returns_all_tools_in_order() {
    let json = call(&harness(), &request("tools/list", None));

    let names: Vec<&str> = json["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(
        names,
        [
            "get_alerts",
            "get_forecast",
            "shutdown_system",
            "open_browser_search",
            "capture_screenshot",
            "get_system_time"
        ]
    );
}

#[test]
fn minimal_tool_set_lists_four_tools() {
    let h = harness_with(
        FakeWeather::default(),
        RecordingRunner::default(),
        ToolSet::Minimal,
    );
    let json = call(&h, &request("listTools", None));

    assert_eq!(json["result"]["tools"].as_array().unwrap().len(), 4);
}

#[test]
fn discovery_aliases_return_identical_lists() {
    let h = harness();
    let first = call(&h, &request("tools/list", None));
    let second = call(&h, &request("tools/list", None));
    assert_eq!(first, second);

    for alias in ["mcp.server.listTools", "listTools", "mcp.listTools"] {
        assert_eq!(call(&h, &request(alias, None)), first, "alias {}", alias);
    }
}

#[test]
fn tool_schemas_describe_constraints() {
    let json = call(&harness(), &request("tools/list", None));
    let tools = json["result"]["tools"].as_array().unwrap();

    let alerts = &tools[0]["inputSchema"];
    assert_eq!(alerts["required"], json!(["state"]));
    assert_eq!(alerts["properties"]["state"]["minLength"], 2);

    let search = &tools[3]["inputSchema"];
    assert_eq!(
        search["properties"]["browser"]["enum"],
        json!(["default", "chrome", "firefox", "safari", "edge"])
    );
    assert_eq!(search["properties"]["autoFindUrl"]["default"], true);
}

#[test]
fn unknown_method_returns_error() {
    let json = call(&harness(), &request("unknown/method", None));

    assert!(json["error"].is_object());
    assert_eq!(json["error"]["code"], -32601);
    assert_eq!(json["error"]["message"], "Method not found");
    assert!(json.get("result").is_none());
}

#[test]
fn invalid_json_returns_parse_error() {
    let json = call(&harness(), "not valid json");

    assert_eq!(json["error"]["code"], -32700);
    assert_eq!(json["id"], Value::Null);
}

#[test]
fn chunk_with_list_and_garbage_answers_both_in_order() {
    let h = harness();
    let chunk = format!("{}\n{{broken\n", request("tools/list", None));
    let responses: Vec<Value> = h
        .server
        .handle_chunk(&chunk)
        .iter()
        .map(|r| parse_response(r))
        .collect();

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["result"]["tools"].as_array().unwrap().len(), 6);
    assert_eq!(responses[1]["error"]["code"], -32700);
}

#[test]
fn chunk_with_list_then_initialize() {
    let h = harness();
    let chunk = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/list","params":{}}"#,
        "\r\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"initialize","params":{"protocolVersion":"2024-11-05"}}"#,
        "\n"
    );
    let responses = h.server.handle_chunk(chunk);

    assert_eq!(responses.len(), 2);
    assert_eq!(parse_response(&responses[0])["id"], 1);
    assert_eq!(parse_response(&responses[1])["id"], 2);
}

#[test]
fn serve_loop_round_trip() {
    let h = harness();
    let input = format!(
        "{}\n\n{}\n",
        request("ping", None),
        request("mcp.listTools", None)
    );
    let mut out = Vec::new();
    h.server.serve(input.as_bytes(), &mut out).unwrap();

    let lines: Vec<Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(parse_response)
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["result"]["tools"].as_array().unwrap().len(), 6);
}

#[test]
fn direct_invocation_matches_tools_call() {
    let direct = call(&harness(), &request("get_alerts", Some(json!({"state": "ny"}))));
    let wrapped = call(&harness(), &tool_call("get_alerts", json!({"state": "ny"})));

    assert_eq!(direct, wrapped);
}

#[test]
fn non_object_params_are_rejected() {
    let json = call(&harness(), &request("get_system_time", Some(json!([1, 2]))));
    assert_eq!(json["error"]["code"], -32602);
}

// ============================================================================
// Weather
// ============================================================================

fn alerts_body() -> Value {
    json!({
        "features": [
            {"properties": {
                "event": "Red Flag Warning",
                "areaDesc": "Kern County",
                "severity": "Severe",
                "status": "Actual",
                "headline": "Red Flag Warning until 8 PM"
            }},
            {"properties": {"event": "Wind Advisory"}}
        ]
    })
}

#[test]
fn get_alerts_formats_each_alert() {
    let weather = FakeWeather::default().with(&format!("{}/alerts?area=CA", BASE), alerts_body());
    let h = harness_with(weather, RecordingRunner::default(), ToolSet::Full);

    let json = call(&h, &tool_call("get_alerts", json!({"state": "ca"})));
    let text = get_text_content(&json);

    assert!(text.starts_with("Active alerts for CA:\n\nEvent: Red Flag Warning\nArea: Kern County"));
    assert!(text.contains("Headline: Red Flag Warning until 8 PM\n---\nEvent: Wind Advisory"));
    assert!(text.ends_with("Headline: No headline\n---"));
    assert_eq!(h.weather.requested(), [format!("{}/alerts?area=CA", BASE)]);
}

#[test]
fn get_alerts_without_features() {
    let weather =
        FakeWeather::default().with(&format!("{}/alerts?area=TX", BASE), json!({"features": []}));
    let h = harness_with(weather, RecordingRunner::default(), ToolSet::Full);

    let json = call(&h, &tool_call("get_alerts", json!({"state": "TX"})));
    assert_eq!(get_text_content(&json), "No active alerts for TX");
}

#[test]
fn get_alerts_fetch_failure_is_text() {
    let h = harness();
    let json = call(&h, &tool_call("get_alerts", json!({"state": "WA"})));

    assert!(json.get("error").is_none());
    assert_eq!(get_text_content(&json), "Failed to retrieve alerts data");
    assert_eq!(json["result"]["isError"], true);
}

#[test]
fn get_alerts_rejects_bad_state_before_fetching() {
    let h = harness();
    let json = call(&h, &tool_call("get_alerts", json!({"state": "CAL"})));

    assert_eq!(json["error"]["code"], -32602);
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid params:"));
    assert!(h.weather.requested().is_empty());
}

#[test]
fn get_forecast_follows_grid_point() {
    let points_url = format!("{}/points/40.7128,-74.0060", BASE);
    let forecast_url = "https://nws.test/gridpoints/OKX/33,35/forecast";
    let weather = FakeWeather::default()
        .with(&points_url, json!({"properties": {"forecast": forecast_url}}))
        .with(
            forecast_url,
            json!({"properties": {"periods": [
                {"name": "Today", "temperature": 72, "temperatureUnit": "F",
                 "windSpeed": "10 mph", "windDirection": "SW", "shortForecast": "Sunny"},
                {"name": "Tonight", "temperature": 60, "temperatureUnit": "F",
                 "windSpeed": "5 mph", "windDirection": "S", "shortForecast": "Clear"}
            ]}}),
        );
    let h = harness_with(weather, RecordingRunner::default(), ToolSet::Full);

    let json = call(
        &h,
        &tool_call("get_forecast", json!({"latitude": 40.7128, "longitude": -74.006})),
    );

    assert_eq!(
        get_text_content(&json),
        "Forecast for 40.7128, -74.006:\n\n\
         Today:\nTemperature: 72°F\nWind: 10 mph SW\nSunny\n---\n\
         Tonight:\nTemperature: 60°F\nWind: 5 mph S\nClear\n---"
    );
    assert_eq!(h.weather.requested(), [points_url, forecast_url.to_string()]);
}

#[test]
fn get_forecast_rejects_latitude_out_of_range() {
    let h = harness();
    let json = call(
        &h,
        &tool_call("get_forecast", json!({"latitude": 91, "longitude": 0})),
    );

    assert_eq!(json["error"]["code"], -32602);
    assert!(h.weather.requested().is_empty());
}

#[test]
fn get_forecast_outside_us() {
    let h = harness();
    let json = call(
        &h,
        &tool_call("get_forecast", json!({"latitude": 48.8566, "longitude": 2.3522})),
    );

    assert_eq!(
        get_text_content(&json),
        "Failed to retrieve grid point data for coordinates: 48.8566, 2.3522. \
         This location may not be supported by the NWS API (only US locations are supported)."
    );
}

#[test]
fn get_forecast_without_forecast_url() {
    let weather = FakeWeather::default().with(
        &format!("{}/points/10.0000,10.0000", BASE),
        json!({"properties": {}}),
    );
    let h = harness_with(weather, RecordingRunner::default(), ToolSet::Full);

    let json = call(
        &h,
        &tool_call("get_forecast", json!({"latitude": 10, "longitude": 10})),
    );
    assert_eq!(
        get_text_content(&json),
        "Failed to get forecast URL from grid point data"
    );
}

#[test]
fn get_forecast_reports_failed_forecast_fetch() {
    let weather = FakeWeather::default().with(
        &format!("{}/points/39.7456,-97.0892", BASE),
        json!({"properties": {"forecast": "https://nws.test/gridpoints/TOP/31,80/forecast"}}),
    );
    let h = harness_with(weather, RecordingRunner::default(), ToolSet::Full);

    let json = call(
        &h,
        &tool_call("get_forecast", json!({"latitude": 39.7456, "longitude": -97.0892})),
    );

    assert_eq!(get_text_content(&json), "Failed to retrieve forecast data");
    assert_eq!(json["result"]["isError"], true);
    assert_eq!(h.weather.requested().len(), 2);
}

#[test]
fn get_forecast_without_periods() {
    let forecast_url = "https://nws.test/gridpoints/TOP/31,80/forecast";
    let weather = FakeWeather::default()
        .with(
            &format!("{}/points/39.7456,-97.0892", BASE),
            json!({"properties": {"forecast": forecast_url}}),
        )
        .with(forecast_url, json!({"properties": {"periods": []}}));
    let h = harness_with(weather, RecordingRunner::default(), ToolSet::Full);

    let json = call(
        &h,
        &tool_call("get_forecast", json!({"latitude": 39.7456, "longitude": -97.0892})),
    );

    assert_eq!(get_text_content(&json), "No forecast periods available");
}

// ============================================================================
// Shutdown
// ============================================================================

#[test]
fn shutdown_defaults_to_plain_shutdown() {
    let h = harness();
    let json = call(&h, &tool_call("shutdown_system", json!({})));

    assert_eq!(
        get_text_content(&json),
        "Shutdown command executed. The system will shut down."
    );
    assert_eq!(h.runner.commands(), ["shutdown -h +0"]);
}

#[test]
fn shutdown_restart_with_delay() {
    let h = harness();
    let json = call(
        &h,
        &tool_call("shutdown_system", json!({"restart": true, "delay": 120})),
    );

    assert_eq!(
        get_text_content(&json),
        "Shutdown command executed. The system will restart after 120 seconds."
    );
    assert_eq!(h.runner.commands(), ["shutdown -r +2"]);
}

#[test]
fn shutdown_rejects_negative_delay() {
    let h = harness();
    let json = call(&h, &tool_call("shutdown_system", json!({"delay": -1})));

    assert_eq!(json["error"]["code"], -32602);
    assert!(h.runner.commands().is_empty());
}

#[test]
fn delayed_macos_shutdown_does_not_block() {
    let runner = Arc::new(RecordingRunner::default());
    let ctx = ToolContext::new(Arc::new(FakeWeather::default()), runner.clone())
        .with_platform(Platform::MacOs);
    let server = McpServer::new(ToolSet::Full, &ctx).unwrap();

    let resp = server
        .handle_request(&tool_call("shutdown_system", json!({"delay": 3})))
        .unwrap();
    assert_eq!(
        get_text_content(&parse_response(&resp)),
        "Shutdown command executed. The system will shut down after 3 seconds."
    );

    let planned = runner.commands.lock().unwrap()[0].clone();
    assert!(planned.command.starts_with("sleep 3 && osascript "));
    assert_eq!(planned.execution, Execution::Detach);
}

#[test]
fn shutdown_delay_has_upper_bound() {
    let h = harness();
    let json = call(&h, &tool_call("shutdown_system", json!({"delay": 1e300})));
    assert_eq!(json["error"]["code"], -32602);

    let json = call(&h, &tool_call("shutdown_system", json!({"delay": 315360000})));
    assert_eq!(
        get_text_content(&json),
        "Shutdown command executed. The system will shut down after 315360000 seconds."
    );
    assert_eq!(h.runner.commands(), ["shutdown -h +5256000"]);
}

#[test]
fn shutdown_failure_is_text() {
    let h = harness_with(
        FakeWeather::default(),
        RecordingRunner::failing("must be root"),
        ToolSet::Full,
    );
    let json = call(&h, &tool_call("shutdown_system", json!({"force": true})));

    let text = get_text_content(&json);
    assert!(text.starts_with("Failed to execute shutdown command:"));
    assert!(text.contains("must be root"));
    assert_eq!(h.runner.commands(), ["shutdown -h now"]);
}

// ============================================================================
// Browser search
// ============================================================================

#[test]
fn browser_search_uses_site_from_term() {
    let h = harness();
    let json = call(
        &h,
        &tool_call("open_browser_search", json!({"searchTerm": "google rust"})),
    );

    assert_eq!(
        get_text_content(&json),
        "Opened default browser with search \"google rust\" (https://www.google.com/search?q=rust)"
    );
    assert_eq!(
        h.runner.commands(),
        ["xdg-open 'https://www.google.com/search?q=rust'"]
    );
}

#[test]
fn browser_search_with_explicit_url_and_browser() {
    let h = harness();
    let json = call(
        &h,
        &tool_call(
            "open_browser_search",
            json!({"searchTerm": "tokio", "url": "docs.rs", "browser": "firefox"}),
        ),
    );

    assert_eq!(
        get_text_content(&json),
        "Opened firefox with search \"tokio\" (https://docs.rs)"
    );
    assert_eq!(
        h.runner.commands(),
        ["xdg-open 'https://docs.rs' || firefox 'https://docs.rs'"]
    );
}

#[test]
fn browser_search_falls_back_to_configured_engine() {
    let weather = Arc::new(FakeWeather::default());
    let runner = Arc::new(RecordingRunner::default());
    let ctx = ToolContext::new(weather, runner.clone())
        .with_platform(Platform::MacOs)
        .with_url_finder(UrlFinder::new("https://duckduckgo.com/?q={query}"));
    let server = McpServer::new(ToolSet::Minimal, &ctx).unwrap();

    let resp = server
        .handle_request(&tool_call(
            "open_browser_search",
            json!({"searchTerm": "google rust", "autoFindUrl": false}),
        ))
        .unwrap();

    assert!(get_text_content(&parse_response(&resp))
        .ends_with("(https://duckduckgo.com/?q=google%20rust)"));
    assert_eq!(
        runner.commands(),
        ["open 'https://duckduckgo.com/?q=google%20rust'"]
    );
}

#[test]
fn browser_search_failure_is_text() {
    let h = harness_with(
        FakeWeather::default(),
        RecordingRunner::failing("no display"),
        ToolSet::Full,
    );
    let json = call(
        &h,
        &tool_call("open_browser_search", json!({"searchTerm": "rust"})),
    );

    let text = get_text_content(&json);
    assert!(text.starts_with("Failed to open browser:"));
    assert!(text.contains("no display"));
    assert_eq!(json["result"]["isError"], true);
}

#[test]
fn browser_search_rejects_unknown_browser() {
    let h = harness();
    let json = call(
        &h,
        &tool_call(
            "open_browser_search",
            json!({"searchTerm": "x", "browser": "lynx"}),
        ),
    );

    assert_eq!(json["error"]["code"], -32602);
    assert!(h.runner.commands().is_empty());
}

#[test]
fn browser_search_requires_term() {
    let json = call(&harness(), &tool_call("open_browser_search", json!({})));
    assert_eq!(json["error"]["code"], -32602);
}

// ============================================================================
// Screenshot and time
// ============================================================================

#[test]
fn screenshot_creates_parent_directory() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("shots/desk");
    let h = harness();

    let json = call(
        &h,
        &tool_call(
            "capture_screenshot",
            json!({"savePath": target.to_string_lossy()}),
        ),
    );

    let expected = dir.path().join("shots/desk.png");
    assert_eq!(
        get_text_content(&json),
        format!("Screenshot saved to {}", expected.display())
    );
    assert!(dir.path().join("shots").is_dir());

    let commands = h.runner.commands();
    assert_eq!(commands.len(), 1);
    assert!(commands[0].starts_with("gnome-screenshot -f "));
    assert!(commands[0].contains(&*expected.to_string_lossy()));
}

#[test]
fn screenshot_failure_is_text() {
    let dir = TempDir::new().unwrap();
    let h = harness_with(
        FakeWeather::default(),
        RecordingRunner::failing("no screen"),
        ToolSet::Full,
    );

    let json = call(
        &h,
        &tool_call(
            "capture_screenshot",
            json!({"savePath": dir.path().join("shot.png").to_string_lossy()}),
        ),
    );

    let text = get_text_content(&json);
    assert!(text.starts_with("Failed to capture screenshot:"));
    assert!(text.contains("no screen"));
    assert_eq!(json["result"]["isError"], true);
}

#[test]
fn screenshot_is_not_in_minimal_set() {
    let h = harness_with(
        FakeWeather::default(),
        RecordingRunner::default(),
        ToolSet::Minimal,
    );
    let json = call(&h, &tool_call("capture_screenshot", json!({})));
    assert_eq!(json["error"]["code"], -32601);
}

#[test]
fn system_time_reports_clock() {
    let json = call(&harness(), &tool_call("get_system_time", json!({})));
    let snapshot: Value = serde_json::from_str(get_text_content(&json)).unwrap();

    assert!(snapshot["unixTimestamp"].is_i64());
    assert!(snapshot["utcTime"].as_str().unwrap().ends_with("+00:00"));
    assert!(snapshot["os"].is_string());
}

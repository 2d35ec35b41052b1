pub mod config;
pub mod host;
pub mod logging;
pub mod nws;
pub mod server;
pub mod shell;
pub mod tools;
pub mod transport;
pub mod url_finder;

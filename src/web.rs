#![cfg(not(tarpaulin_include))]

use sheetbook::app;
use sheetbook::config::{self, SheetConfig};

/// Main entry point for the sync server
///
/// Hosts the static front end and the CORS-safe append proxy for a configured
/// backing spreadsheet.
///
/// # Arguments
/// * Optional port number as the first command line argument (default 3000)
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let mut port = 3000;
    if args.len() >= 2 {
        port = args[1].parse().unwrap_or(3000);
    }

    config::init_database(config::DEFAULT_DATABASE_DIR)?;
    let config = SheetConfig::load()?;

    app::run(config, port).await
}

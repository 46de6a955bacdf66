use serde::{Deserialize, Serialize};
use std::env;
use std::fs::{File, create_dir_all};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::transport::{ProxyTransport, SheetsTransport, Transport};

/// Values API endpoint of the backing spreadsheet service.
pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Directory holding the config file and the durable queue.
pub const DEFAULT_DATABASE_DIR: &str = "database";

const CONFIG_FILE: &str = "config.json";
const QUEUE_FILE: &str = "pending.bin.gz";

/// Connection settings for the backing spreadsheet.
///
/// Loaded from `database/config.json` with environment-variable overrides, so
/// a deployment can keep tokens out of the file entirely.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SheetConfig {
    /// Identifier of the backing spreadsheet.
    #[serde(default)]
    pub spreadsheet_id: String,

    /// Base URL of the values API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Bearer token for the service-account access path.
    #[serde(default)]
    pub service_token: Option<String>,

    /// Bearer token for the OAuth access path.
    #[serde(default)]
    pub oauth_token: Option<String>,

    /// Base URL of the same-origin append proxy.
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// Directory for local state (config file, pending queue).
    #[serde(default = "default_database_dir")]
    pub database_dir: String,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_database_dir() -> String {
    DEFAULT_DATABASE_DIR.to_string()
}

impl Default for SheetConfig {
    fn default() -> Self {
        SheetConfig {
            spreadsheet_id: String::new(),
            api_base: default_api_base(),
            service_token: None,
            oauth_token: None,
            proxy_url: None,
            database_dir: default_database_dir(),
        }
    }
}

/// Initialize the local state directory.
///
/// Creates the database directory and a default config file if they don't
/// exist. This should be called before loading the configuration for the
/// first time.
pub fn init_database(dir: &str) -> std::io::Result<()> {
    if !Path::new(dir).exists() {
        create_dir_all(dir)?;
    }

    let config_path = Path::new(dir).join(CONFIG_FILE);
    if !config_path.exists() {
        let mut defaults = SheetConfig::default();
        defaults.database_dir = dir.to_string();
        let json = serde_json::to_string_pretty(&defaults)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        let mut file = File::create(config_path)?;
        file.write_all(json.as_bytes())?;
    }

    Ok(())
}

impl SheetConfig {
    /// Load configuration from the default database directory.
    pub fn load() -> Result<Self, String> {
        Self::load_from(DEFAULT_DATABASE_DIR)
    }

    /// Load configuration from `{dir}/config.json`, then apply environment
    /// overrides. A missing file yields the defaults, so a deployment can be
    /// configured purely through the environment.
    pub fn load_from(dir: &str) -> Result<Self, String> {
        let config_path = Path::new(dir).join(CONFIG_FILE);

        let mut config = if config_path.exists() {
            let mut file = match File::open(&config_path) {
                Ok(file) => file,
                Err(_) => return Err("Failed to open config file".to_string()),
            };

            let mut contents = String::new();
            if file.read_to_string(&mut contents).is_err() {
                return Err("Failed to read config file".to_string());
            }

            match serde_json::from_str::<SheetConfig>(&contents) {
                Ok(config) => config,
                Err(e) => return Err(format!("Failed to parse config file: {}", e)),
            }
        } else {
            let mut defaults = SheetConfig::default();
            defaults.database_dir = dir.to_string();
            defaults
        };

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(value) = env::var("SHEETBOOK_SPREADSHEET_ID") {
            self.spreadsheet_id = value;
        }
        if let Ok(value) = env::var("SHEETBOOK_API_BASE") {
            self.api_base = value;
        }
        if let Ok(value) = env::var("SHEETBOOK_SERVICE_TOKEN") {
            self.service_token = Some(value);
        }
        if let Ok(value) = env::var("SHEETBOOK_OAUTH_TOKEN") {
            self.oauth_token = Some(value);
        }
        if let Ok(value) = env::var("SHEETBOOK_PROXY_URL") {
            self.proxy_url = Some(value);
        }
        if let Ok(value) = env::var("SHEETBOOK_DATABASE_DIR") {
            self.database_dir = value;
        }
    }

    /// Check for hard configuration errors.
    ///
    /// A missing spreadsheet id or the absence of any usable access path is
    /// reported immediately; these abort operations instead of degrading.
    pub fn validate(&self) -> Result<(), String> {
        if self.spreadsheet_id.trim().is_empty() {
            return Err("No spreadsheet id configured".to_string());
        }
        if self.service_token.is_none() && self.proxy_url.is_none() && self.oauth_token.is_none() {
            return Err(
                "No transport configured: set a service token, proxy url or oauth token"
                    .to_string(),
            );
        }
        Ok(())
    }

    /// Location of the durable queue file.
    pub fn queue_path(&self) -> PathBuf {
        Path::new(&self.database_dir).join(QUEUE_FILE)
    }

    /// Build the configured transports in preference order: the direct
    /// service-credential path first, the same-origin proxy second, the
    /// OAuth path last.
    pub fn build_transports(&self) -> Result<Vec<Box<dyn Transport>>, String> {
        let mut transports: Vec<Box<dyn Transport>> = Vec::new();

        if let Some(token) = &self.service_token {
            transports.push(Box::new(SheetsTransport::service(
                &self.api_base,
                &self.spreadsheet_id,
                token,
            )?));
        }
        if let Some(proxy_url) = &self.proxy_url {
            transports.push(Box::new(ProxyTransport::new(proxy_url)?));
        }
        if let Some(token) = &self.oauth_token {
            transports.push(Box::new(SheetsTransport::oauth(
                &self.api_base,
                &self.spreadsheet_id,
                token,
            )?));
        }

        Ok(transports)
    }
}

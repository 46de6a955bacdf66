use log::info;
use serde::Deserialize;
use std::time::Duration;

use crate::codec::PositionalRow;

const HTTP_TIMEOUT_SECS: u64 = 30;

/// One access path capable of reading and writing the backing spreadsheet.
///
/// Transports are tried in a fixed preference order by the fallback helpers
/// below; a transport that cannot serve a read (the append-only proxy) simply
/// returns an error and the next one is tried.
pub trait Transport: Send + Sync {
    /// Short name used in logs.
    fn label(&self) -> &str;

    /// Read a range of cells, outer vector is rows, inner is cells.
    fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, String>;

    /// Append rows to the end of a dataset's tab. The whole batch lands or
    /// none of it does, and row order is preserved.
    fn append_rows(&self, dataset: &str, rows: &[PositionalRow]) -> Result<usize, String>;
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct ProxyResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

fn cell_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Transport talking directly to the spreadsheet values API with a bearer
/// token. Used for both the service-credential and the OAuth access paths;
/// they differ only in where the token came from.
pub struct SheetsTransport {
    label: String,
    api_base: String,
    spreadsheet_id: String,
    token: String,
    client: reqwest::blocking::Client,
}

impl SheetsTransport {
    fn build(
        label: &str,
        api_base: &str,
        spreadsheet_id: &str,
        token: &str,
    ) -> Result<Self, String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| format!("failed to build http client: {}", e))?;

        Ok(SheetsTransport {
            label: label.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            token: token.to_string(),
            client,
        })
    }

    /// Access path using a service-account token.
    pub fn service(api_base: &str, spreadsheet_id: &str, token: &str) -> Result<Self, String> {
        Self::build("service", api_base, spreadsheet_id, token)
    }

    /// Access path using a user OAuth token.
    pub fn oauth(api_base: &str, spreadsheet_id: &str, token: &str) -> Result<Self, String> {
        Self::build("oauth", api_base, spreadsheet_id, token)
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/{}/values/{}",
            self.api_base,
            self.spreadsheet_id,
            urlencoding::encode(range)
        )
    }
}

impl Transport for SheetsTransport {
    fn label(&self) -> &str {
        &self.label
    }

    fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, String> {
        let response = self
            .client
            .get(self.values_url(range))
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| format!("{}: {}", self.label, e))?;

        if !response.status().is_success() {
            return Err(format!("{}: HTTP {}", self.label, response.status()));
        }

        let value_range: ValueRange = response
            .json()
            .map_err(|e| format!("{}: bad response body: {}", self.label, e))?;

        Ok(value_range
            .values
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    fn append_rows(&self, dataset: &str, rows: &[PositionalRow]) -> Result<usize, String> {
        let url = format!(
            "{}:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS",
            self.values_url(&format!("{}!A1", dataset))
        );
        let body = serde_json::json!({ "values": rows });

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .map_err(|e| format!("{}: {}", self.label, e))?;

        if !response.status().is_success() {
            return Err(format!("{}: HTTP {}", self.label, response.status()));
        }

        Ok(rows.len())
    }
}

/// Transport posting appends to the same-origin proxy endpoint.
///
/// The proxy exists for exactly one job, a CORS-safe append, so reads are not
/// served here and fall through to the next access path.
pub struct ProxyTransport {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl ProxyTransport {
    pub fn new(base_url: &str) -> Result<Self, String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| format!("failed to build http client: {}", e))?;

        Ok(ProxyTransport {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

impl Transport for ProxyTransport {
    fn label(&self) -> &str {
        "proxy"
    }

    fn read_range(&self, _range: &str) -> Result<Vec<Vec<String>>, String> {
        Err("proxy: append-only endpoint".to_string())
    }

    fn append_rows(&self, dataset: &str, rows: &[PositionalRow]) -> Result<usize, String> {
        let url = format!("{}/api/append_rows", self.base_url);
        let body = serde_json::json!({ "dataset": dataset, "rows": rows });

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .map_err(|e| format!("proxy: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("proxy: HTTP {}", response.status()));
        }

        let parsed: ProxyResponse = response
            .json()
            .map_err(|e| format!("proxy: bad response body: {}", e))?;
        if parsed.status != "ok" {
            return Err(format!(
                "proxy: {}",
                parsed.message.unwrap_or_else(|| parsed.status.clone())
            ));
        }

        Ok(rows.len())
    }
}

/// Read a range through the first transport that can serve it.
pub fn read_with_fallback(
    transports: &[Box<dyn Transport>],
    range: &str,
) -> Result<Vec<Vec<String>>, String> {
    let mut failures = Vec::new();
    for transport in transports {
        match transport.read_range(range) {
            Ok(rows) => return Ok(rows),
            Err(reason) => {
                info!("read of {} via {} failed: {}", range, transport.label(), reason);
                failures.push(reason);
            }
        }
    }
    Err(describe_exhaustion("read", range, &failures))
}

/// Append rows through the first transport that accepts them.
pub fn append_with_fallback(
    transports: &[Box<dyn Transport>],
    dataset: &str,
    rows: &[PositionalRow],
) -> Result<usize, String> {
    let mut failures = Vec::new();
    for transport in transports {
        match transport.append_rows(dataset, rows) {
            Ok(count) => return Ok(count),
            Err(reason) => {
                info!(
                    "append to {} via {} failed: {}",
                    dataset,
                    transport.label(),
                    reason
                );
                failures.push(reason);
            }
        }
    }
    Err(describe_exhaustion("append", dataset, &failures))
}

fn describe_exhaustion(operation: &str, target: &str, failures: &[String]) -> String {
    if failures.is_empty() {
        format!("no transports configured for {} of {}", operation, target)
    } else {
        format!(
            "all transports failed for {} of {}: {}",
            operation,
            target,
            failures.join("; ")
        )
    }
}

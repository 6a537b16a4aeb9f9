//! Country population density lookups against the World Bank API.
//!
//! Queries the `EN.POP.DNST` indicator (population density, people per km²)
//! and returns the newest non-null value within a fixed lookback window. The
//! payload is positional JSON: a two-element array of metadata followed by
//! the data entries.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::population::PopulationDensityProvider;

const WORLD_BANK_BASE_URL: &str = "https://api.worldbank.org/v2";
const INDICATOR: &str = "EN.POP.DNST";

/// How many yearly entries to inspect before giving up.
const LOOKBACK_YEARS: usize = 20;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Extract the newest non-null indicator value from a World Bank payload.
fn first_density_value(payload: &Value) -> Option<f64> {
    let entries = payload.as_array()?.get(1)?.as_array()?;
    entries
        .iter()
        .filter_map(|entry| entry.get("value"))
        .find_map(Value::as_f64)
}

/// Client for the World Bank population density indicator.
#[derive(Debug, Clone)]
pub struct WorldBankClient {
    client: Client,
    base_url: String,
}

impl WorldBankClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(WORLD_BANK_BASE_URL)
    }

    /// Build a client against an alternate base URL for tests.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(Error::Http)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn unavailable(country_code: &str, message: impl Into<String>) -> Error {
        Error::PopulationDensityUnavailable {
            country_code: country_code.to_string(),
            message: message.into(),
        }
    }
}

impl PopulationDensityProvider for WorldBankClient {
    fn lookup(&self, country_code: &str) -> Result<f64> {
        let trimmed = country_code.trim().to_lowercase();
        if trimmed.is_empty() {
            return Err(Self::unavailable(
                country_code,
                "country code required for population density lookup",
            ));
        }
        let country: String = trimmed.chars().take(2).collect();

        let url = format!(
            "{base}/country/{country}/indicator/{INDICATOR}",
            base = self.base_url
        );
        let per_page = LOOKBACK_YEARS.to_string();
        let payload: Value = self
            .client
            .get(&url)
            .query(&[("format", "json"), ("per_page", per_page.as_str())])
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json())
            .map_err(|err| Self::unavailable(country_code, format!("request failed: {err}")))?;

        if !matches!(payload.as_array(), Some(array) if array.len() >= 2) {
            return Err(Self::unavailable(
                country_code,
                "unexpected World Bank response structure",
            ));
        }

        match first_density_value(&payload) {
            Some(density) => {
                debug!(country = %country, density, "resolved country population density");
                Ok(density)
            }
            None => Err(Self::unavailable(
                country_code,
                "no population density value available",
            )),
        }
    }
}

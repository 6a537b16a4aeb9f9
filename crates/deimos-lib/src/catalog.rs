//! NASA Small-Body Database (SBDB) catalog client.
//!
//! Fetches the potentially-hazardous-asteroid summary table and per-object
//! detail records, normalizes the loosely typed payloads into strongly typed
//! records, and caches both on disk so repeated lookups stay off the
//! network. Palermo and Torino hazard figures pass through unmodified.
//!
//! SBDB numeric fields frequently arrive as strings carrying units or
//! uncertainty text; [`parse_loose_float`] extracts the leading numeric
//! token.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::simulation::AsteroidParameters;

const SUMMARY_URL: &str = "https://ssd-api.jpl.nasa.gov/sbdb_query.api";
const DETAIL_URL: &str = "https://ssd-api.jpl.nasa.gov/sbdb.api";
const SUMMARY_FIELDS: &str = "full_name,spkid,a,e,q,i,w,per,per_y,n,H,diameter,GM,density,albedo";

/// Environment override for the on-disk catalog cache location.
const CACHE_DIR_ENV: &str = "DEIMOS_CACHE_DIR";

const SUMMARY_CACHE_FILE: &str = "pha_summary.json";
const DETAIL_CACHE_DIR: &str = "details";

/// Cached catalog payloads older than this are refetched.
const CACHE_MAX_AGE: Duration = Duration::from_secs(12 * 3600);

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Data-quality fallbacks applied when catalog records lack physical
/// parameters. These stand in for missing measurements, they are not physics.
pub mod defaults {
    /// Assumed bulk density for bodies without a measured one (kg/m³).
    pub const DENSITY_KGM3: f64 = 3000.0;
    /// Assumed impact velocity (km/s).
    pub const VELOCITY_KMS: f64 = 20.0;
    /// Assumed diameter (m).
    pub const DIAMETER_M: f64 = 100.0;
    /// Assumed entry angle (degrees).
    pub const ANGLE_DEG: f64 = 45.0;
}

/// One row of the PHA summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub spkid: String,
    pub full_name: String,
    pub absolute_magnitude_h: Option<f64>,
    pub diameter_km: Option<f64>,
    pub density_gcm3: Option<f64>,
    pub impact_probability: Option<f64>,
    pub palermo_scale: Option<f64>,
    pub torino_scale: Option<f64>,
    pub pha: Option<String>,
}

/// One virtual-impactor entry from the detail payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualImpactor {
    pub date: Option<String>,
    pub impact_probability: Option<f64>,
    pub palermo_scale: Option<f64>,
    pub torino_scale: Option<f64>,
    pub energy_megatons: Option<f64>,
    pub distance_au: Option<f64>,
    pub v_inf_kms: Option<f64>,
    pub v_imp_kms: Option<f64>,
    pub h_mag: Option<f64>,
    pub diameter_m: Option<f64>,
    pub mass_kg: Option<f64>,
}

/// Normalized physical record for one catalog object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDetail {
    pub spkid: String,
    pub full_name: String,
    pub pha: Option<bool>,
    pub absolute_magnitude_h: Option<f64>,
    pub diameter_km: Option<f64>,
    pub diameter_m: Option<f64>,
    pub density_kgm3: Option<f64>,
    pub velocity_kms: Option<f64>,
    pub impact_probability: Option<f64>,
    pub palermo_scale: Option<f64>,
    pub torino_scale: Option<f64>,
    pub reported_energy_megatons: Option<f64>,
    pub reported_mass_kg: Option<f64>,
    pub vi_data: Vec<VirtualImpactor>,
    pub source: String,
}

impl CatalogDetail {
    /// Simulation parameters for this object, with the [`defaults`] applied
    /// to missing or non-positive fields.
    pub fn asteroid_parameters(&self) -> AsteroidParameters {
        AsteroidParameters {
            diameter_m: positive_or(self.diameter_m, defaults::DIAMETER_M),
            density_kgm3: positive_or(self.density_kgm3, defaults::DENSITY_KGM3),
            velocity_kms: positive_or(self.velocity_kms, defaults::VELOCITY_KMS),
            angle_deg: defaults::ANGLE_DEG,
        }
    }
}

fn positive_or(value: Option<f64>, fallback: f64) -> f64 {
    match value {
        Some(value) if value > 0.0 => value,
        _ => fallback,
    }
}

/// Read access to the asteroid catalog.
pub trait AsteroidCatalogProvider: Send + Sync {
    fn summary(&self) -> Result<Vec<SummaryRecord>>;
    fn detail(&self, designation: &str) -> Result<CatalogDetail>;
}

/// Extract the leading floating-point token from free-form numeric text.
///
/// Handles thousands separators, trailing units, and uncertainty suffixes
/// ("3.5 g/cm^3", "1.2e-3 km", "7.5±0.2").
pub fn parse_loose_float(value: &Value) -> Option<f64> {
    if let Some(number) = value.as_f64() {
        return Some(number);
    }
    value.as_str().and_then(leading_float)
}

fn leading_float(text: &str) -> Option<f64> {
    let cleaned = text.trim().replace(',', "");
    let bytes = cleaned.as_bytes();
    let mut start = cleaned.find(|c: char| c.is_ascii_digit())?;
    if start > 0 && bytes[start - 1] == b'.' {
        start -= 1;
    }
    if start > 0 && (bytes[start - 1] == b'+' || bytes[start - 1] == b'-') {
        start -= 1;
    }
    let tail = &cleaned[start..];
    let end = tail
        .char_indices()
        .find(|&(_, c)| !matches!(c, '0'..='9' | '.' | 'e' | 'E' | '+' | '-'))
        .map(|(index, _)| index)
        .unwrap_or(tail.len());

    let mut candidate = &tail[..end];
    while !candidate.is_empty() {
        if let Ok(value) = candidate.parse::<f64>() {
            return Some(value);
        }
        candidate = &candidate[..candidate.len() - 1];
    }
    None
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn parse_pha_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim() {
            "Y" | "y" | "true" => Some(true),
            "N" | "n" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Normalize the summary payload (parallel `fields`/`data` arrays) into
/// records. Rows without both a spkid and a full name are dropped.
pub fn normalize_summary(payload: &Value) -> Vec<SummaryRecord> {
    let fields: Vec<&str> = payload
        .get("fields")
        .and_then(Value::as_array)
        .map(|fields| fields.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let rows = payload
        .get("data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut records = Vec::new();
    for row in rows {
        let Some(cells) = row.as_array() else {
            continue;
        };
        let mapping: HashMap<&str, &Value> = fields.iter().copied().zip(cells.iter()).collect();
        let field = |names: &[&str]| names.iter().find_map(|name| mapping.get(name).copied());

        let Some(spkid) = field(&["spkid"]).and_then(value_to_string) else {
            continue;
        };
        let Some(full_name) = field(&["full_name"]).and_then(value_to_string) else {
            continue;
        };

        records.push(SummaryRecord {
            spkid,
            full_name,
            absolute_magnitude_h: field(&["H", "h"]).and_then(parse_loose_float),
            diameter_km: field(&["diameter"]).and_then(parse_loose_float),
            density_gcm3: field(&["density"]).and_then(parse_loose_float),
            impact_probability: field(&["ip"]).and_then(parse_loose_float),
            palermo_scale: field(&["ps"]).and_then(parse_loose_float),
            torino_scale: field(&["ts"]).and_then(parse_loose_float),
            pha: field(&["pha", "PHA"]).and_then(value_to_string),
        });
    }
    records
}

fn normalize_vi_data(raw: Option<&Value>) -> Vec<VirtualImpactor> {
    let Some(entries) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter(|entry| entry.is_object())
        .map(|entry| {
            let number = |key: &str| entry.get(key).and_then(parse_loose_float);
            VirtualImpactor {
                date: entry.get("date").and_then(value_to_string),
                impact_probability: number("ip"),
                palermo_scale: number("ps"),
                torino_scale: number("ts"),
                energy_megatons: number("energy"),
                distance_au: number("dist"),
                v_inf_kms: number("v_inf"),
                v_imp_kms: number("v_imp"),
                h_mag: number("h"),
                diameter_m: number("diam"),
                mass_kg: number("mass"),
            }
        })
        .collect()
}

/// The primary virtual impactor is the entry with the highest impact
/// probability.
fn select_primary_vi(entries: &[VirtualImpactor]) -> Option<&VirtualImpactor> {
    entries.iter().max_by(|a, b| {
        let a = a.impact_probability.unwrap_or(0.0);
        let b = b.impact_probability.unwrap_or(0.0);
        a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
    })
}

fn phys_par_value(raw: &Value, key: &str) -> Option<f64> {
    let phys = raw.get("phys_par")?;
    if let Some(map) = phys.as_object() {
        return map.get(key).and_then(parse_loose_float);
    }
    if let Some(list) = phys.as_array() {
        for item in list {
            let name = item
                .get("name")
                .or_else(|| item.get("key"))
                .and_then(Value::as_str);
            if name == Some(key) {
                return item
                    .get("value")
                    .or_else(|| item.get("val"))
                    .and_then(parse_loose_float);
            }
        }
    }
    None
}

/// Normalize a raw detail payload into a [`CatalogDetail`].
pub fn normalize_detail(raw: &Value, spkid: &str) -> CatalogDetail {
    let object = raw.get("object");
    let object_field = |key: &str| object.and_then(|obj| obj.get(key));

    let full_name = object_field("fullname")
        .or_else(|| raw.get("fullname"))
        .or_else(|| object_field("full-name"))
        .and_then(value_to_string)
        .unwrap_or_else(|| spkid.to_string());

    let vi_data = normalize_vi_data(raw.get("vi_data"));
    let primary = select_primary_vi(&vi_data).cloned();

    let mut diameter_km = phys_par_value(raw, "diameter");
    let diameter_m = match diameter_km {
        Some(km) => Some(km * 1_000.0),
        None => {
            let from_vi = primary.as_ref().and_then(|vi| vi.diameter_m);
            if let Some(m) = from_vi {
                diameter_km = Some(m / 1_000.0);
            }
            from_vi
        }
    };

    // SBDB densities are expressed in g/cm^3; convert to kg/m^3
    let density_kgm3 = phys_par_value(raw, "density").map(|gcm3| gcm3 * 1_000.0);

    let velocity_kms = primary
        .as_ref()
        .and_then(|vi| vi.v_imp_kms.or(vi.v_inf_kms));

    CatalogDetail {
        spkid: spkid.to_string(),
        full_name,
        pha: object_field("pha").and_then(parse_pha_flag),
        absolute_magnitude_h: object_field("h")
            .or_else(|| object_field("H"))
            .and_then(parse_loose_float),
        diameter_km,
        diameter_m,
        density_kgm3,
        velocity_kms,
        impact_probability: primary.as_ref().and_then(|vi| vi.impact_probability),
        palermo_scale: primary.as_ref().and_then(|vi| vi.palermo_scale),
        torino_scale: primary.as_ref().and_then(|vi| vi.torino_scale),
        reported_energy_megatons: primary.as_ref().and_then(|vi| vi.energy_megatons),
        reported_mass_kg: primary.as_ref().and_then(|vi| vi.mass_kg),
        vi_data,
        source: "NASA SBDB".to_string(),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedSummary {
    items: Vec<SummaryRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedDetail {
    raw: Value,
    normalized: CatalogDetail,
}

/// Resolve the catalog cache directory, honoring the env override.
pub fn default_cache_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os(CACHE_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let dirs = ProjectDirs::from("com", "deimos", "deimos").ok_or(Error::CacheDirsUnavailable)?;
    Ok(dirs.cache_dir().join("sbdb"))
}

fn is_fresh(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    metadata
        .modified()
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .map(|age| age < CACHE_MAX_AGE)
        .unwrap_or(false)
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn save_json<T: Serialize>(path: &Path, payload: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(payload)?)?;
    Ok(())
}

/// Client for the SBDB summary and detail endpoints with an on-disk cache.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    summary_url: String,
    detail_url: String,
    cache_dir: PathBuf,
}

impl CatalogClient {
    pub fn new() -> Result<Self> {
        Self::with_endpoints(SUMMARY_URL, DETAIL_URL)
    }

    /// Build a client against alternate endpoints for tests.
    pub fn with_endpoints(summary_url: &str, detail_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(format!("deimos-lib/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Http)?;
        Ok(Self {
            client,
            summary_url: summary_url.to_string(),
            detail_url: detail_url.to_string(),
            cache_dir: default_cache_dir()?,
        })
    }

    /// Override the cache directory, so tests can isolate their cache state.
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    fn summary_cache_path(&self) -> PathBuf {
        self.cache_dir.join(SUMMARY_CACHE_FILE)
    }

    fn detail_cache_path(&self, spkid: &str) -> PathBuf {
        self.cache_dir
            .join(DETAIL_CACHE_DIR)
            .join(format!("{spkid}.json"))
    }

    /// Fetch the PHA summary table, serving from the cache when fresh.
    pub fn fetch_summary(&self, refresh: bool) -> Result<Vec<SummaryRecord>> {
        let cache_path = self.summary_cache_path();
        if !refresh && is_fresh(&cache_path) {
            if let Ok(cached) = load_json::<CachedSummary>(&cache_path) {
                debug!(path = %cache_path.display(), "serving catalog summary from cache");
                return Ok(cached.items);
            }
        }

        info!(url = %self.summary_url, "fetching PHA summary from SBDB");
        let payload: Value = self
            .client
            .get(&self.summary_url)
            .query(&[("fields", SUMMARY_FIELDS), ("sb-group", "pha")])
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json())
            .map_err(|err| Error::Catalog {
                message: format!("SBDB summary request failed: {err}"),
            })?;

        let records = normalize_summary(&payload);
        if records.is_empty() {
            return Err(Error::Catalog {
                message: "no asteroid data retrieved from SBDB".to_string(),
            });
        }
        save_json(&cache_path, &CachedSummary {
            items: records.clone(),
        })?;
        Ok(records)
    }

    /// Fetch and normalize one object's detail record, serving from the
    /// cache when fresh.
    pub fn fetch_detail(&self, designation: &str, refresh: bool) -> Result<CatalogDetail> {
        if designation.trim().is_empty() {
            return Err(Error::Catalog {
                message: "a designation is required for detail lookups".to_string(),
            });
        }

        let cache_path = self.detail_cache_path(designation);
        if !refresh && is_fresh(&cache_path) {
            if let Ok(cached) = load_json::<CachedDetail>(&cache_path) {
                debug!(designation, "serving catalog detail from cache");
                return Ok(cached.normalized);
            }
        }

        info!(designation, url = %self.detail_url, "fetching object detail from SBDB");
        let response = self
            .client
            .get(&self.detail_url)
            .query(&[
                ("sstr", designation),
                ("phys-par", "1"),
                ("vi-data", "1"),
                ("discovery", "1"),
            ])
            .send()
            .map_err(|err| Error::Catalog {
                message: format!("SBDB detail request failed: {err}"),
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::CatalogObjectNotFound {
                designation: designation.to_string(),
            });
        }
        let payload: Value = response
            .error_for_status()
            .and_then(|response| response.json())
            .map_err(|err| Error::Catalog {
                message: format!("SBDB detail request failed: {err}"),
            })?;

        if let Some(message) = payload.get("message").and_then(Value::as_str) {
            if message.to_lowercase().contains("not found") {
                return Err(Error::CatalogObjectNotFound {
                    designation: designation.to_string(),
                });
            }
        }

        let normalized = normalize_detail(&payload, designation);
        save_json(&cache_path, &CachedDetail {
            raw: payload,
            normalized: normalized.clone(),
        })?;
        Ok(normalized)
    }
}

impl AsteroidCatalogProvider for CatalogClient {
    fn summary(&self) -> Result<Vec<SummaryRecord>> {
        self.fetch_summary(false)
    }

    fn detail(&self, designation: &str) -> Result<CatalogDetail> {
        self.fetch_detail(designation, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leading_float_handles_units_and_separators() {
        assert_eq!(leading_float("3.5 g/cm^3"), Some(3.5));
        assert_eq!(leading_float("1.2e-3 km"), Some(1.2e-3));
        assert_eq!(leading_float("7.5±0.2"), Some(7.5));
        assert_eq!(leading_float("1,234.5"), Some(1234.5));
        assert_eq!(leading_float("-0.44"), Some(-0.44));
        assert_eq!(leading_float("n/a"), None);
        assert_eq!(leading_float(""), None);
    }

    #[test]
    fn parse_loose_float_accepts_numbers_and_strings() {
        assert_eq!(parse_loose_float(&json!(2.5)), Some(2.5));
        assert_eq!(parse_loose_float(&json!("2.5 km")), Some(2.5));
        assert_eq!(parse_loose_float(&json!(null)), None);
        assert_eq!(parse_loose_float(&json!({"value": 1})), None);
    }

    #[test]
    fn summary_rows_map_by_field_name() {
        let payload = json!({
            "fields": ["full_name", "spkid", "H", "diameter", "density"],
            "data": [
                ["  99942 Apophis (2004 MN4)", 2099942, "19.7", "0.340", null],
                [null, 123, "20.0", null, null]
            ]
        });
        let records = normalize_summary(&payload);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.spkid, "2099942");
        assert_eq!(record.full_name, "99942 Apophis (2004 MN4)");
        assert_eq!(record.absolute_magnitude_h, Some(19.7));
        assert_eq!(record.diameter_km, Some(0.34));
        assert_eq!(record.density_gcm3, None);
    }

    #[test]
    fn detail_normalization_converts_units_and_picks_primary_vi() {
        let payload = json!({
            "object": {"fullname": "101955 Bennu (1999 RQ36)", "pha": true, "h": "20.19"},
            "phys_par": [
                {"name": "diameter", "value": "0.490"},
                {"name": "density", "value": "1.26 g/cm^3"}
            ],
            "vi_data": [
                {"date": "2178-09-24", "ip": "1.0e-5", "v_imp": "12.68", "energy": "1.4e+3"},
                {"date": "2196-09-24", "ip": "3.0e-4", "v_imp": "12.7", "ps": "-1.59", "energy": "1.45e+3"}
            ]
        });
        let detail = normalize_detail(&payload, "2101955");
        assert_eq!(detail.full_name, "101955 Bennu (1999 RQ36)");
        assert_eq!(detail.pha, Some(true));
        assert_eq!(detail.diameter_km, Some(0.49));
        assert!((detail.diameter_m.unwrap() - 490.0).abs() < 1e-9);
        assert!((detail.density_kgm3.unwrap() - 1260.0).abs() < 1e-9);
        // the 2196 entry has the higher impact probability
        assert_eq!(detail.velocity_kms, Some(12.7));
        assert_eq!(detail.impact_probability, Some(3.0e-4));
        assert_eq!(detail.palermo_scale, Some(-1.59));
        assert_eq!(detail.vi_data.len(), 2);
    }

    #[test]
    fn detail_diameter_falls_back_to_primary_vi() {
        let payload = json!({
            "object": {"fullname": "2010 RF12"},
            "vi_data": [{"ip": "0.1", "diam": "7.0"}]
        });
        let detail = normalize_detail(&payload, "3550232");
        assert_eq!(detail.diameter_m, Some(7.0));
        assert_eq!(detail.diameter_km, Some(0.007));
    }

    #[test]
    fn missing_physical_parameters_take_data_quality_defaults() {
        let detail = normalize_detail(&json!({"object": {}}), "370");
        let parameters = detail.asteroid_parameters();
        assert_eq!(parameters.diameter_m, defaults::DIAMETER_M);
        assert_eq!(parameters.density_kgm3, defaults::DENSITY_KGM3);
        assert_eq!(parameters.velocity_kms, defaults::VELOCITY_KMS);
        assert_eq!(parameters.angle_deg, defaults::ANGLE_DEG);
        assert!(parameters.validate().is_ok());
    }

    #[test]
    fn fresh_cache_serves_summary_without_network() {
        let temp = tempfile::tempdir().unwrap();
        let client = CatalogClient::with_endpoints("http://127.0.0.1:1", "http://127.0.0.1:1")
            .unwrap()
            .with_cache_dir(temp.path());

        let cached = CachedSummary {
            items: vec![SummaryRecord {
                spkid: "2099942".to_string(),
                full_name: "99942 Apophis".to_string(),
                absolute_magnitude_h: Some(19.7),
                diameter_km: Some(0.34),
                density_gcm3: None,
                impact_probability: None,
                palermo_scale: None,
                torino_scale: None,
                pha: Some("Y".to_string()),
            }],
        };
        save_json(&temp.path().join(SUMMARY_CACHE_FILE), &cached).unwrap();

        let records = client.fetch_summary(false).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].spkid, "2099942");
    }

    #[test]
    fn stale_or_missing_cache_is_not_fresh() {
        let temp = tempfile::tempdir().unwrap();
        assert!(!is_fresh(&temp.path().join("absent.json")));
    }

    #[test]
    fn empty_designation_is_rejected_without_network() {
        let client = CatalogClient::with_endpoints("http://127.0.0.1:1", "http://127.0.0.1:1")
            .unwrap()
            .with_cache_dir("/tmp/deimos-unused");
        assert!(matches!(
            client.fetch_detail("  ", false),
            Err(Error::Catalog { .. })
        ));
    }
}

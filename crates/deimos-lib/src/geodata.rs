//! Terrain and landform profile client.
//!
//! Builds a [`SiteEnvironment`] for an impact coordinate from two public
//! datasets: OpenTopoData (etopo1) for elevation, slope, and roughness, and
//! the OpenStreetMap Nominatim reverse geocoder for landform and country.
//! Elevation failures make the whole profile unavailable; Nominatim failures
//! only degrade the profile to "no landform/country".

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::environment::{SiteEnvironment, SiteProfileProvider, TerrainKind};
use crate::error::{Error, Result};

const OPENTOPODATA_URL: &str = "https://api.opentopodata.org/v1/etopo1";
const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/reverse";

/// Offset of the four neighbor samples from the center, in degrees.
const DEFAULT_SAMPLE_DELTA_DEG: f64 = 0.01;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Elevation samples around a site: center plus the four cardinal neighbors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationSamples {
    pub center: f64,
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// Meters per degree of latitude and longitude at the given latitude.
///
/// Series expansion of the WGS-84 meridian arc for latitude; the longitude
/// figure shrinks with cos(lat) and is floored at 1 m to keep the central
/// difference finite at the poles.
pub fn meters_per_degree(lat: f64) -> (f64, f64) {
    let lat_rad = lat.to_radians();
    let meters_per_deg_lat =
        111_132.0 - 559.82 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos();
    let meters_per_deg_lon = (111_320.0 * lat_rad.cos()).max(1.0);
    (meters_per_deg_lat, meters_per_deg_lon)
}

/// Slope (degrees) and roughness (m) from the five-point elevation stencil.
///
/// Slope is the gradient magnitude from central differences; roughness is
/// the RMS deviation of the four neighbors from their mean.
pub fn slope_and_roughness(samples: &ElevationSamples, lat: f64, delta_deg: f64) -> (f64, f64) {
    let (meters_per_deg_lat, meters_per_deg_lon) = meters_per_degree(lat);
    let dz_dy = (samples.north - samples.south) / (2.0 * meters_per_deg_lat * delta_deg);
    let dz_dx = (samples.east - samples.west) / (2.0 * meters_per_deg_lon * delta_deg);
    let gradient = (dz_dx.powi(2) + dz_dy.powi(2)).sqrt();
    let slope_deg = gradient.atan().to_degrees();

    let neighbors = [samples.north, samples.south, samples.east, samples.west];
    let mean = neighbors.iter().sum::<f64>() / neighbors.len() as f64;
    let variance =
        neighbors.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / neighbors.len() as f64;
    (slope_deg, variance.sqrt())
}

#[derive(Debug, Deserialize)]
struct ElevationResponse {
    status: String,
    #[serde(default)]
    results: Vec<ElevationResult>,
}

#[derive(Debug, Deserialize)]
struct ElevationResult {
    elevation: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ReversePayload {
    category: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    name: Option<String>,
    display_name: Option<String>,
    address: Option<ReverseAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct ReverseAddress {
    country_code: Option<String>,
}

fn landform_from_payload(payload: &ReversePayload) -> Option<String> {
    if let (Some(category), Some(kind)) = (&payload.category, &payload.kind) {
        return Some(format!("{category}:{kind}").replace('_', " "));
    }
    if let Some(name) = payload.name.as_deref().filter(|name| !name.is_empty()) {
        return Some(name.to_string());
    }
    payload
        .display_name
        .as_deref()
        .and_then(|display| display.split(',').next())
        .map(|segment| segment.trim().to_string())
        .filter(|segment| !segment.is_empty())
}

fn country_code_from_payload(payload: &ReversePayload) -> Option<String> {
    payload
        .address
        .as_ref()
        .and_then(|address| address.country_code.as_deref())
        .filter(|code| !code.is_empty())
        .map(|code| code.to_uppercase())
}

/// Client for the terrain and reverse-geocoding datasets.
#[derive(Debug, Clone)]
pub struct GeoDataClient {
    client: Client,
    elevation_url: String,
    reverse_url: String,
    sample_delta_deg: f64,
}

impl GeoDataClient {
    pub fn new() -> Result<Self> {
        Self::with_endpoints(OPENTOPODATA_URL, NOMINATIM_URL)
    }

    /// Build a client against alternate endpoints, so tests can point at a
    /// local server instead of the public datasets.
    pub fn with_endpoints(elevation_url: &str, reverse_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            elevation_url: elevation_url.to_string(),
            reverse_url: reverse_url.to_string(),
            sample_delta_deg: DEFAULT_SAMPLE_DELTA_DEG,
        })
    }

    fn fetch_elevations(&self, lat: f64, lon: f64) -> Result<ElevationSamples> {
        let delta = self.sample_delta_deg;
        let points = [
            (lat, lon),
            (lat + delta, lon),
            (lat - delta, lon),
            (lat, lon + delta),
            (lat, lon - delta),
        ];
        let locations = points
            .iter()
            .map(|(lat, lon)| format!("{lat:.6},{lon:.6}"))
            .collect::<Vec<_>>()
            .join("|");

        let payload: ElevationResponse = self
            .client
            .get(&self.elevation_url)
            .query(&[("locations", locations.as_str())])
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json())
            .map_err(|err| Error::GeoDataUnavailable {
                message: format!("OpenTopoData request failed: {err}"),
            })?;

        if payload.status != "OK" {
            return Err(Error::GeoDataUnavailable {
                message: format!("OpenTopoData returned status {:?}", payload.status),
            });
        }
        if payload.results.len() != points.len() {
            return Err(Error::GeoDataUnavailable {
                message: "incomplete elevation samples returned by OpenTopoData".to_string(),
            });
        }

        let elevation = |index: usize| payload.results[index].elevation.unwrap_or(0.0);
        Ok(ElevationSamples {
            center: elevation(0),
            north: elevation(1),
            south: elevation(2),
            east: elevation(3),
            west: elevation(4),
        })
    }

    /// Reverse-geocode landform and country. Failures here never fail the
    /// profile; they just leave both fields empty.
    fn fetch_landform(&self, lat: f64, lon: f64) -> (Option<String>, Option<String>) {
        let result = self
            .client
            .get(&self.reverse_url)
            .query(&[
                ("format", "jsonv2"),
                ("lat", &format!("{lat:.6}")),
                ("lon", &format!("{lon:.6}")),
                ("zoom", "10"),
                ("namedetails", "0"),
                ("addressdetails", "1"),
            ])
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json::<ReversePayload>());

        match result {
            Ok(payload) => (
                landform_from_payload(&payload),
                country_code_from_payload(&payload),
            ),
            Err(err) => {
                warn!(lat, lon, error = %err, "reverse geocoding failed, continuing without landform");
                (None, None)
            }
        }
    }
}

impl SiteProfileProvider for GeoDataClient {
    fn resolve(&self, lat: f64, lon: f64) -> Result<SiteEnvironment> {
        let samples = self.fetch_elevations(lat, lon)?;
        let (slope_deg, roughness_m) = slope_and_roughness(&samples, lat, self.sample_delta_deg);

        let terrain = if samples.center < 0.0 {
            TerrainKind::Water
        } else {
            TerrainKind::Land
        };
        let water_depth_m = terrain.is_water().then(|| samples.center.abs());

        let (landform, country_code) = self.fetch_landform(lat, lon);
        let mut data_sources = vec!["OpenTopoData etopo1".to_string()];
        if landform.is_some() || country_code.is_some() {
            data_sources.push("OpenStreetMap Nominatim".to_string());
        }

        debug!(
            lat,
            lon,
            elevation = samples.center,
            slope = slope_deg,
            ?terrain,
            "resolved site profile"
        );

        Ok(SiteEnvironment {
            elevation_m: samples.center,
            slope_deg,
            roughness_m,
            terrain,
            landform,
            country_code,
            water_depth_m,
            data_sources,
        })
    }
}

fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(user_agent())
        .build()
        .map_err(Error::Http)
}

fn user_agent() -> String {
    format!(
        "deimos-lib/{version} (+{repo})",
        version = env!("CARGO_PKG_VERSION"),
        repo = "https://github.com/deimos-sim/deimos-rs"
    )
}

//! Impact-site environment resolution.
//!
//! Maps an externally sourced terrain profile onto the target-side physical
//! parameters the physics engine needs: target material density, local
//! gravity, and slope. When no profile is available the resolver falls back
//! to a flat continental-crust baseline, so a simulation never requires
//! terrain data to proceed.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::physics::{constants, gravity_at_elevation_ms2};

/// Dense-rock-equivalent density assumed for built-up urban ground (kg/m³).
const URBAN_DENSITY_KGM3: f64 = 2400.0;

/// Loose regolith density for desert and sand terrain (kg/m³).
const DESERT_DENSITY_KGM3: f64 = 2000.0;

/// Intermediate density for forested soil (kg/m³).
const FOREST_DENSITY_KGM3: f64 = 2200.0;

/// Denser rock assumed above the high-altitude threshold (kg/m³).
const HIGH_ALTITUDE_DENSITY_KGM3: f64 = 2600.0;

/// Surface classification for an impact site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainKind {
    Land,
    Water,
}

impl TerrainKind {
    pub fn is_water(self) -> bool {
        matches!(self, TerrainKind::Water)
    }
}

/// Externally sourced description of the terrain around an impact site.
///
/// Absence of a profile is a valid, expected state: every consumer branches
/// on `Option<SiteEnvironment>` explicitly rather than on sentinel values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteEnvironment {
    pub elevation_m: f64,
    pub slope_deg: f64,
    pub roughness_m: f64,
    pub terrain: TerrainKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    /// Present only for water terrain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_depth_m: Option<f64>,
    /// Names of the upstream datasets that contributed to this profile.
    #[serde(default)]
    pub data_sources: Vec<String>,
}

/// Resolves terrain profiles for impact coordinates.
///
/// Failures are reported as [`crate::Error::GeoDataUnavailable`]; the
/// simulation treats them as "no profile", not as request failures.
pub trait SiteProfileProvider: Send + Sync {
    fn resolve(&self, lat: f64, lon: f64) -> Result<SiteEnvironment>;
}

/// Target-side physical parameters resolved from a site profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceContext {
    pub target_density_kgm3: f64,
    pub gravity_ms2: f64,
    pub slope_deg: f64,
}

impl Default for SurfaceContext {
    /// Baseline used when no terrain profile is available: continental crust
    /// under standard gravity on flat ground.
    fn default() -> Self {
        Self {
            target_density_kgm3: constants::CONTINENTAL_CRUST_DENSITY_KGM3,
            gravity_ms2: constants::EARTH_GRAVITY_MS2,
            slope_deg: 0.0,
        }
    }
}

/// Effective target material density for a site.
///
/// Resolution order: water terrain wins outright; then landform keyword
/// families; then elevation thresholds (the sub-sea-level check guards
/// against profiles that lack a terrain classification); finally the
/// continental-crust default.
pub fn target_density_for_site(
    terrain: Option<TerrainKind>,
    elevation_m: f64,
    landform: Option<&str>,
) -> f64 {
    if terrain == Some(TerrainKind::Water) {
        return constants::SEAWATER_DENSITY_KGM3;
    }
    if let Some(landform) = landform {
        let lf = landform.to_lowercase();
        if lf.contains("ice") || lf.contains("glacier") {
            return constants::ICE_DENSITY_KGM3;
        }
        if lf.contains("urban") || lf.contains("city") {
            return URBAN_DENSITY_KGM3;
        }
        if lf.contains("desert") || lf.contains("sand") {
            return DESERT_DENSITY_KGM3;
        }
        if lf.contains("forest") {
            return FOREST_DENSITY_KGM3;
        }
    }
    if elevation_m > 2_500.0 {
        return HIGH_ALTITUDE_DENSITY_KGM3;
    }
    if elevation_m < -100.0 {
        return constants::SEAWATER_DENSITY_KGM3;
    }
    constants::CONTINENTAL_CRUST_DENSITY_KGM3
}

/// Resolve the surface context for a simulation.
///
/// Gravity always derives from elevation, independent of the material rule
/// that fired. Without a profile the [`SurfaceContext::default`] baseline is
/// returned.
pub fn resolve_surface_context(profile: Option<&SiteEnvironment>) -> SurfaceContext {
    match profile {
        Some(profile) => SurfaceContext {
            target_density_kgm3: target_density_for_site(
                Some(profile.terrain),
                profile.elevation_m,
                profile.landform.as_deref(),
            ),
            gravity_ms2: gravity_at_elevation_ms2(profile.elevation_m),
            slope_deg: profile.slope_deg,
        },
        None => SurfaceContext::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn land_profile() -> SiteEnvironment {
        SiteEnvironment {
            elevation_m: 300.0,
            slope_deg: 4.0,
            roughness_m: 12.0,
            terrain: TerrainKind::Land,
            landform: None,
            country_code: Some("CL".to_string()),
            water_depth_m: None,
            data_sources: vec!["OpenTopoData etopo1".to_string()],
        }
    }

    #[test]
    fn water_terrain_wins_over_landform_and_elevation() {
        let density = target_density_for_site(Some(TerrainKind::Water), 3000.0, Some("city"));
        assert_eq!(density, constants::SEAWATER_DENSITY_KGM3);
    }

    #[test]
    fn landform_keyword_families_select_materials() {
        let cases = [
            ("tidewater glacier", constants::ICE_DENSITY_KGM3),
            ("boundary:city", URBAN_DENSITY_KGM3),
            ("sand dunes", DESERT_DENSITY_KGM3),
            ("boreal forest", FOREST_DENSITY_KGM3),
        ];
        for (landform, expected) in cases {
            let density = target_density_for_site(Some(TerrainKind::Land), 0.0, Some(landform));
            assert_eq!(density, expected, "landform {landform:?}");
        }
    }

    #[test]
    fn elevation_thresholds_apply_without_landform() {
        assert_eq!(
            target_density_for_site(Some(TerrainKind::Land), 3_200.0, None),
            HIGH_ALTITUDE_DENSITY_KGM3
        );
        assert_eq!(
            target_density_for_site(None, -400.0, None),
            constants::SEAWATER_DENSITY_KGM3
        );
        assert_eq!(
            target_density_for_site(Some(TerrainKind::Land), 150.0, None),
            constants::CONTINENTAL_CRUST_DENSITY_KGM3
        );
    }

    #[test]
    fn missing_profile_resolves_to_baseline() {
        let context = resolve_surface_context(None);
        assert_eq!(context, SurfaceContext::default());
    }

    #[test]
    fn profile_drives_gravity_and_slope() {
        let mut profile = land_profile();
        profile.elevation_m = 8_000.0;
        let context = resolve_surface_context(Some(&profile));
        assert!(context.gravity_ms2 < constants::EARTH_GRAVITY_MS2);
        assert_eq!(context.slope_deg, 4.0);
        assert_eq!(
            context.target_density_kgm3,
            HIGH_ALTITUDE_DENSITY_KGM3
        );
    }
}

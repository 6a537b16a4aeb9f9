//! Affected-population estimation.
//!
//! Converts the affected-area geometry of an impact into an estimated number
//! of affected people, using a priority chain of density sources and a
//! capping policy that must never overstate the affected population.

use serde::Serialize;
use tracing::debug;

use crate::environment::{SiteEnvironment, TerrainKind};
use crate::error::Result;

/// Density assumed for city/town/suburb/residential landforms (people/km²).
const URBAN_DENSITY_KM2: f64 = 1200.0;

/// Density assumed for village/hamlet landforms (people/km²).
const VILLAGE_DENSITY_KM2: f64 = 200.0;

/// Density assumed for airport/industrial landforms (people/km²).
const INDUSTRIAL_DENSITY_KM2: f64 = 150.0;

/// Density assumed for steep, sparsely inhabited terrain (people/km²).
const STEEP_TERRAIN_DENSITY_KM2: f64 = 15.0;

/// Default rural baseline density (people/km²).
const RURAL_DENSITY_KM2: f64 = 80.0;

/// Slope above which terrain is treated as sparsely inhabited (degrees).
const STEEP_SLOPE_THRESHOLD_DEG: f64 = 20.0;

/// World-scale demographic constants used by the estimator.
///
/// Passed in at construction rather than read from process-wide statics so
/// tests can substitute alternate world models.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldModel {
    pub total_population: f64,
    pub land_area_km2: f64,
    /// Fraction of a water-impact-affected area assumed inhabited
    /// (shoreline proximity proxy).
    pub coastal_habitation_fraction: f64,
}

impl Default for WorldModel {
    fn default() -> Self {
        Self {
            total_population: 8_100_000_000.0,
            land_area_km2: 148_940_000.0,
            coastal_habitation_fraction: 0.4,
        }
    }
}

impl WorldModel {
    /// Global average population density over land (people/km²).
    pub fn average_density_km2(&self) -> f64 {
        if self.land_area_km2 > 0.0 {
            self.total_population / self.land_area_km2
        } else {
            0.0
        }
    }
}

/// Looks up country-level population density (people/km²).
///
/// Failures are reported as
/// [`crate::Error::PopulationDensityUnavailable`]; the estimator falls
/// through to its local heuristic.
pub trait PopulationDensityProvider: Send + Sync {
    fn lookup(&self, country_code: &str) -> Result<f64>;
}

/// Candidate impact radii from which the affected area is derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactFootprint {
    pub shock_radius_km: f64,
    pub thermal_radius_km: f64,
}

impl ImpactFootprint {
    /// Affected area: a disc with the larger of the two radii.
    pub fn affected_area_km2(&self) -> f64 {
        let dominant = self.shock_radius_km.max(self.thermal_radius_km);
        std::f64::consts::PI * dominant.powi(2)
    }
}

/// Which source produced the population density used in an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DensitySource {
    /// Global coastal-average density for ocean-surface impacts.
    CoastalAverage,
    /// Country-level indicator from the external density provider.
    CountryIndicator,
    /// Terrain/landform/slope heuristic.
    LocalHeuristic,
}

/// Result of a population estimate, with enough detail to explain itself.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationEstimate {
    pub affected_people: u64,
    pub area_km2: f64,
    pub density_km2: f64,
    pub source: DensitySource,
    pub coastal_fraction: f64,
    /// The affected area reached the total global land surface.
    pub land_area_capped: bool,
    /// The land-fraction population cap undercut the raw area-density
    /// estimate.
    pub land_fraction_cap_applied: bool,
}

/// Local density heuristic for land sites without a usable country indicator.
pub fn local_density_heuristic(
    terrain: Option<TerrainKind>,
    slope_deg: f64,
    landform: Option<&str>,
) -> f64 {
    if terrain == Some(TerrainKind::Water) {
        return 0.0;
    }
    if let Some(landform) = landform {
        let lf = landform.to_lowercase();
        if ["city", "town", "suburb", "residential"]
            .iter()
            .any(|token| lf.contains(token))
        {
            return URBAN_DENSITY_KM2;
        }
        if lf.contains("village") || lf.contains("hamlet") {
            return VILLAGE_DENSITY_KM2;
        }
        if lf.contains("airport") || lf.contains("industrial") {
            return INDUSTRIAL_DENSITY_KM2;
        }
    }
    if slope_deg > STEEP_SLOPE_THRESHOLD_DEG {
        return STEEP_TERRAIN_DENSITY_KM2;
    }
    RURAL_DENSITY_KM2
}

/// Estimates affected population from impact geometry and site context.
#[derive(Debug, Clone)]
pub struct PopulationEstimator {
    world: WorldModel,
}

impl PopulationEstimator {
    pub fn new(world: WorldModel) -> Self {
        Self { world }
    }

    pub fn world(&self) -> &WorldModel {
        &self.world
    }

    /// Run the density priority chain and the capping policy.
    ///
    /// Density sources, first usable value wins: ocean surfaces use the
    /// global coastal average with the coastal habitation fraction applied;
    /// land sites with a known country code consult the external indicator
    /// (non-positive or failed lookups fall through); everything else uses
    /// the local heuristic.
    ///
    /// The capping order matters and is preserved exactly: the area is first
    /// clamped to the global land surface, the raw area-density product is
    /// then capped by the land-fraction share of world population, and the
    /// absolute world population is the final backstop.
    pub fn estimate(
        &self,
        footprint: &ImpactFootprint,
        water_surface: bool,
        profile: Option<&SiteEnvironment>,
        density_provider: &dyn PopulationDensityProvider,
    ) -> PopulationEstimate {
        let area_km2 = footprint.affected_area_km2();

        let mut coastal_fraction = 1.0;
        let (density_km2, source) = if water_surface {
            coastal_fraction = self.world.coastal_habitation_fraction;
            (self.world.average_density_km2(), DensitySource::CoastalAverage)
        } else {
            let indicator = profile
                .and_then(|p| p.country_code.as_deref())
                .and_then(|code| match density_provider.lookup(code) {
                    Ok(density) if density > 0.0 => Some(density),
                    Ok(density) => {
                        debug!(country = code, density, "unusable country density, falling through");
                        None
                    }
                    Err(err) => {
                        debug!(country = code, error = %err, "country density lookup failed");
                        None
                    }
                });
            match indicator {
                Some(density) => (density, DensitySource::CountryIndicator),
                None => {
                    let density = local_density_heuristic(
                        profile.map(|p| p.terrain),
                        profile.map(|p| p.slope_deg).unwrap_or(0.0),
                        profile.and_then(|p| p.landform.as_deref()),
                    );
                    (density, DensitySource::LocalHeuristic)
                }
            }
        };

        let land_limited_area = area_km2.min(self.world.land_area_km2);
        let land_fraction = if self.world.land_area_km2 > 0.0 {
            (land_limited_area / self.world.land_area_km2).min(1.0)
        } else {
            0.0
        };
        let raw_estimate = land_limited_area * density_km2.max(0.0) * coastal_fraction;
        let population_cap = self.world.total_population * land_fraction * coastal_fraction;

        let affected = raw_estimate
            .max(0.0)
            .min(population_cap)
            .min(self.world.total_population);

        let land_area_capped = land_fraction >= 1.0;
        let land_fraction_cap_applied = !land_area_capped && population_cap < raw_estimate;

        PopulationEstimate {
            affected_people: affected.floor().max(0.0) as u64,
            area_km2,
            density_km2,
            source,
            coastal_fraction,
            land_area_capped,
            land_fraction_cap_applied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct FixedDensity(f64);

    impl PopulationDensityProvider for FixedDensity {
        fn lookup(&self, _country_code: &str) -> crate::error::Result<f64> {
            Ok(self.0)
        }
    }

    struct FailingDensity;

    impl PopulationDensityProvider for FailingDensity {
        fn lookup(&self, country_code: &str) -> crate::error::Result<f64> {
            Err(Error::PopulationDensityUnavailable {
                country_code: country_code.to_string(),
                message: "offline".to_string(),
            })
        }
    }

    fn profile_with_country(code: &str) -> SiteEnvironment {
        SiteEnvironment {
            elevation_m: 120.0,
            slope_deg: 2.0,
            roughness_m: 5.0,
            terrain: TerrainKind::Land,
            landform: None,
            country_code: Some(code.to_string()),
            water_depth_m: None,
            data_sources: Vec::new(),
        }
    }

    fn footprint(radius_km: f64) -> ImpactFootprint {
        ImpactFootprint {
            shock_radius_km: radius_km,
            thermal_radius_km: radius_km / 2.0,
        }
    }

    #[test]
    fn affected_area_uses_dominant_radius() {
        let fp = ImpactFootprint {
            shock_radius_km: 3.0,
            thermal_radius_km: 10.0,
        };
        assert!((fp.affected_area_km2() - std::f64::consts::PI * 100.0).abs() < 1e-9);
    }

    #[test]
    fn heuristic_landform_buckets() {
        assert_eq!(
            local_density_heuristic(Some(TerrainKind::Land), 0.0, Some("suburb")),
            URBAN_DENSITY_KM2
        );
        assert_eq!(
            local_density_heuristic(Some(TerrainKind::Land), 0.0, Some("hamlet")),
            VILLAGE_DENSITY_KM2
        );
        assert_eq!(
            local_density_heuristic(Some(TerrainKind::Land), 0.0, Some("industrial park")),
            INDUSTRIAL_DENSITY_KM2
        );
        assert_eq!(
            local_density_heuristic(Some(TerrainKind::Land), 30.0, None),
            STEEP_TERRAIN_DENSITY_KM2
        );
        assert_eq!(
            local_density_heuristic(None, 0.0, None),
            RURAL_DENSITY_KM2
        );
        assert_eq!(local_density_heuristic(Some(TerrainKind::Water), 0.0, None), 0.0);
    }

    #[test]
    fn country_indicator_wins_when_usable() {
        let estimator = PopulationEstimator::new(WorldModel::default());
        let profile = profile_with_country("CL");
        let estimate = estimator.estimate(&footprint(10.0), false, Some(&profile), &FixedDensity(26.0));
        assert_eq!(estimate.source, DensitySource::CountryIndicator);
        assert_eq!(estimate.density_km2, 26.0);
    }

    #[test]
    fn non_positive_indicator_falls_through_to_heuristic() {
        let estimator = PopulationEstimator::new(WorldModel::default());
        let profile = profile_with_country("AQ");
        let estimate = estimator.estimate(&footprint(10.0), false, Some(&profile), &FixedDensity(0.0));
        assert_eq!(estimate.source, DensitySource::LocalHeuristic);
        assert_eq!(estimate.density_km2, RURAL_DENSITY_KM2);
    }

    #[test]
    fn failed_lookup_falls_through_to_heuristic() {
        let estimator = PopulationEstimator::new(WorldModel::default());
        let profile = profile_with_country("CL");
        let estimate = estimator.estimate(&footprint(10.0), false, Some(&profile), &FailingDensity);
        assert_eq!(estimate.source, DensitySource::LocalHeuristic);
    }

    #[test]
    fn water_surface_uses_coastal_average_and_fraction() {
        let world = WorldModel::default();
        let estimator = PopulationEstimator::new(world.clone());
        let estimate = estimator.estimate(&footprint(10.0), true, None, &FailingDensity);
        assert_eq!(estimate.source, DensitySource::CoastalAverage);
        assert_eq!(estimate.coastal_fraction, world.coastal_habitation_fraction);
        assert!((estimate.density_km2 - world.average_density_km2()).abs() < 1e-9);
    }

    #[test]
    fn estimate_never_exceeds_caps() {
        let world = WorldModel::default();
        let estimator = PopulationEstimator::new(world.clone());
        // absurdly large footprint: half the planet
        let estimate = estimator.estimate(&footprint(20_000.0), false, None, &FailingDensity);
        assert!(estimate.affected_people as f64 <= world.total_population);
        let land_fraction =
            (estimate.area_km2.min(world.land_area_km2)) / world.land_area_km2;
        let prorated = world.total_population * land_fraction.min(1.0) * estimate.coastal_fraction;
        assert!(estimate.affected_people as f64 <= prorated + 1.0);
    }

    #[test]
    fn cap_flags_are_distinguishable() {
        // small world model so caps fire on modest footprints
        let world = WorldModel {
            total_population: 1_000.0,
            land_area_km2: 1_000.0,
            coastal_habitation_fraction: 0.4,
        };
        let estimator = PopulationEstimator::new(world);

        // area beyond the entire land surface: land-area clamp fires
        let saturated = estimator.estimate(&footprint(1_000.0), false, None, &FailingDensity);
        assert!(saturated.land_area_capped);
        assert!(!saturated.land_fraction_cap_applied);

        // area below the land surface but dense enough that the prorated
        // population cap undercuts the raw estimate (density 80 > 1 person/km²)
        let capped = estimator.estimate(&footprint(10.0), false, None, &FailingDensity);
        assert!(!capped.land_area_capped);
        assert!(capped.land_fraction_cap_applied);
    }

    #[test]
    fn alternate_world_model_changes_caps() {
        let sparse = WorldModel {
            total_population: 1e6,
            land_area_km2: 1e6,
            coastal_habitation_fraction: 1.0,
        };
        let estimator = PopulationEstimator::new(sparse);
        let estimate = estimator.estimate(&footprint(100.0), false, None, &FailingDensity);
        assert!(estimate.affected_people <= 1_000_000);
    }

    #[test]
    fn zero_radius_footprint_affects_nobody() {
        let estimator = PopulationEstimator::new(WorldModel::default());
        let estimate = estimator.estimate(&footprint(0.0), false, None, &FailingDensity);
        assert_eq!(estimate.affected_people, 0);
        assert!(!estimate.land_area_capped);
        assert!(!estimate.land_fraction_cap_applied);
    }
}

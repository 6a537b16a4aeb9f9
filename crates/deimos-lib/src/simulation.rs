//! Impact simulation orchestration.
//!
//! One linear pass per request: attempt the terrain profile, resolve the
//! surface context, run the physics engine, estimate the affected
//! population, and assemble the effect record together with an ordered list
//! of rationale notes describing which fallbacks and sources were used.
//! External lookup failures degrade to documented defaults; only input
//! validation can fail a request.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::environment::{resolve_surface_context, SiteEnvironment, SiteProfileProvider};
use crate::error::{Error, Result};
use crate::physics::{self, constants, CraterParams, TsunamiParams};
use crate::population::{
    DensitySource, ImpactFootprint, PopulationDensityProvider, PopulationEstimator, WorldModel,
};

/// Physical parameters of an impacting asteroid.
///
/// Validated on construction; [`Simulator::simulate`] re-checks them so
/// directly constructed values cannot bypass the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsteroidParameters {
    pub diameter_m: f64,
    pub density_kgm3: f64,
    pub velocity_kms: f64,
    pub angle_deg: f64,
}

impl AsteroidParameters {
    pub fn new(diameter_m: f64, density_kgm3: f64, velocity_kms: f64, angle_deg: f64) -> Result<Self> {
        let parameters = Self {
            diameter_m,
            density_kgm3,
            velocity_kms,
            angle_deg,
        };
        parameters.validate()?;
        Ok(parameters)
    }

    pub fn validate(&self) -> Result<()> {
        let strictly_positive = [
            (self.diameter_m, "diameter_m"),
            (self.density_kgm3, "density_kgm3"),
            (self.velocity_kms, "velocity_kms"),
        ];
        for (value, field) in strictly_positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::invalid(field, "must be a finite positive number"));
            }
        }
        if !self.angle_deg.is_finite() || !(0.0..=90.0).contains(&self.angle_deg) {
            return Err(Error::invalid("angle_deg", "must be within 0..=90 degrees"));
        }
        Ok(())
    }
}

/// Geographic impact location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactSite {
    pub lat: f64,
    pub lon: f64,
}

impl ImpactSite {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        let site = Self { lat, lon };
        site.validate()?;
        Ok(site)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(Error::invalid("lat", "must be within -90..=90 degrees"));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(Error::invalid("lon", "must be within -180..=180 degrees"));
        }
        Ok(())
    }
}

/// Computed physical and demographic consequences of one impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectResult {
    pub energy_megatons: f64,
    pub kinetic_energy_j: f64,
    pub asteroid_mass_kg: f64,
    pub crater_diameter_km: f64,
    pub shock_radius_km: f64,
    pub thermal_radius_km: f64,
    pub thermal_flux_at_100km_jm2: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seismic_magnitude: Option<f64>,
    /// Present only for water-surface impacts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tsunami_height_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub est_affected_people: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_survival_prob: Option<f64>,
}

/// Full result of one simulation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationOutcome {
    pub effects: EffectResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<SiteEnvironment>,
    /// Ordered rationale notes; order reflects the causal sequence of
    /// resolution decisions.
    pub notes: Vec<String>,
}

/// Site-profile provider for degraded (offline) operation: every resolution
/// reports geodata as unavailable, so simulations run on baseline defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSiteProfiles;

impl SiteProfileProvider for OfflineSiteProfiles {
    fn resolve(&self, _lat: f64, _lon: f64) -> Result<SiteEnvironment> {
        Err(Error::GeoDataUnavailable {
            message: "offline mode".to_string(),
        })
    }
}

/// Density provider counterpart of [`OfflineSiteProfiles`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineDensity;

impl PopulationDensityProvider for OfflineDensity {
    fn lookup(&self, country_code: &str) -> Result<f64> {
        Err(Error::PopulationDensityUnavailable {
            country_code: country_code.to_string(),
            message: "offline mode".to_string(),
        })
    }
}

/// Stateless simulation pipeline over pluggable data providers.
#[derive(Clone)]
pub struct Simulator {
    site_profiles: Arc<dyn SiteProfileProvider>,
    population_density: Arc<dyn PopulationDensityProvider>,
    estimator: PopulationEstimator,
}

impl Simulator {
    pub fn new(
        site_profiles: Arc<dyn SiteProfileProvider>,
        population_density: Arc<dyn PopulationDensityProvider>,
    ) -> Self {
        Self::with_world_model(site_profiles, population_density, WorldModel::default())
    }

    pub fn with_world_model(
        site_profiles: Arc<dyn SiteProfileProvider>,
        population_density: Arc<dyn PopulationDensityProvider>,
        world: WorldModel,
    ) -> Self {
        Self {
            site_profiles,
            population_density,
            estimator: PopulationEstimator::new(world),
        }
    }

    /// Simulator wired to the offline providers; runs entirely on baseline
    /// defaults and local heuristics.
    pub fn offline() -> Self {
        Self::new(Arc::new(OfflineSiteProfiles), Arc::new(OfflineDensity))
    }

    /// Run one impact simulation.
    ///
    /// `ocean` forces a water-surface impact regardless of the resolved
    /// terrain; otherwise the surface is water when the terrain profile says
    /// so. Input validation failures abort the request; every external
    /// lookup failure degrades to a default and is recorded in the notes.
    pub fn simulate(
        &self,
        asteroid: &AsteroidParameters,
        site: &ImpactSite,
        ocean: bool,
    ) -> Result<SimulationOutcome> {
        asteroid.validate()?;
        site.validate()?;

        let mut notes = vec![
            "Impact effects follow Purdue-style crater and energy scaling laws.".to_string(),
            "Thermal footprint assumes a 15 kJ/m2 severe-burn flux threshold.".to_string(),
        ];

        let profile = match self.site_profiles.resolve(site.lat, site.lon) {
            Ok(profile) => Some(profile),
            Err(err) => {
                debug!(lat = site.lat, lon = site.lon, error = %err, "site profile unavailable");
                None
            }
        };
        match &profile {
            Some(_) => notes
                .push("Surface parameters adjusted with terrain and landform data.".to_string()),
            None => notes.push(
                "Topographic data unavailable; continental-crust defaults applied.".to_string(),
            ),
        }

        let surface = resolve_surface_context(profile.as_ref());
        let water_surface = ocean || profile.as_ref().is_some_and(|p| p.terrain.is_water());

        let mass_kg = physics::mass_from_diameter(asteroid.diameter_m, asteroid.density_kgm3);
        let energy_j = physics::kinetic_energy_joules(
            asteroid.diameter_m,
            asteroid.density_kgm3,
            asteroid.velocity_kms,
        );
        let energy_megatons = energy_j / constants::JOULES_PER_MEGATON;

        let crater_diameter_km = physics::crater_diameter_km(
            asteroid.diameter_m,
            asteroid.density_kgm3,
            asteroid.velocity_kms,
            asteroid.angle_deg,
            &CraterParams {
                ocean: water_surface,
                target_density_kgm3: surface.target_density_kgm3,
                gravity_ms2: surface.gravity_ms2,
                slope_deg: surface.slope_deg,
            },
        );

        let density_factor =
            surface.target_density_kgm3 / constants::CONTINENTAL_CRUST_DENSITY_KGM3;
        let shock_radius_km = physics::shock_radius_km(energy_j, density_factor);
        let thermal_radius_km = physics::thermal_radius_km(energy_j);
        let thermal_flux_at_100km_jm2 = physics::thermal_flux_at_distance_jm2(energy_j, 100.0);

        let tsunami_height_m = water_surface.then(|| {
            physics::tsunami_height_m(
                energy_j,
                &TsunamiParams {
                    water_depth_m: profile.as_ref().and_then(|p| p.water_depth_m),
                    ..TsunamiParams::default()
                },
            )
        });

        let footprint = ImpactFootprint {
            shock_radius_km,
            thermal_radius_km,
        };
        let estimate = self.estimator.estimate(
            &footprint,
            water_surface,
            profile.as_ref(),
            self.population_density.as_ref(),
        );

        notes.push(
            match estimate.source {
                DensitySource::CoastalAverage => {
                    "Ocean-surface impact: global coastal-average population density applied."
                }
                DensitySource::CountryIndicator => {
                    "Population density sourced from the country-level density indicator."
                }
                DensitySource::LocalHeuristic => {
                    "Population density estimated from local terrain heuristics."
                }
            }
            .to_string(),
        );
        if estimate.land_area_capped {
            notes.push("Affected area clamped to the total global land surface.".to_string());
        } else if estimate.land_fraction_cap_applied {
            notes.push(
                "Land-fraction population cap applied to avoid overstating exposure.".to_string(),
            );
        }
        if estimate.coastal_fraction > 0.0 && estimate.coastal_fraction < 1.0 {
            notes.push(
                "Only the coastal fraction of the affected area is treated as inhabited."
                    .to_string(),
            );
        }

        let seismic_magnitude = physics::seismic_magnitude(energy_j);
        let global_survival_prob = physics::global_survival_probability(
            asteroid.diameter_m,
            estimate.affected_people as f64,
            self.estimator.world().total_population,
        );

        Ok(SimulationOutcome {
            effects: EffectResult {
                energy_megatons,
                kinetic_energy_j: energy_j,
                asteroid_mass_kg: mass_kg,
                crater_diameter_km,
                shock_radius_km,
                thermal_radius_km,
                thermal_flux_at_100km_jm2,
                seismic_magnitude: Some(seismic_magnitude),
                tsunami_height_m,
                est_affected_people: Some(estimate.affected_people),
                global_survival_prob: Some(global_survival_prob),
            },
            environment: profile,
            notes,
        })
    }
}

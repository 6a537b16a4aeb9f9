use std::sync::Arc;

use deimos_lib::environment::{SiteEnvironment, SiteProfileProvider, TerrainKind};
use deimos_lib::error::{Error, Result};
use deimos_lib::population::PopulationDensityProvider;
use deimos_lib::{AsteroidParameters, ImpactSite, Simulator};

/// Profile provider returning a fixed environment, for wiring the pipeline
/// without network access.
struct FixedProfile(SiteEnvironment);

impl SiteProfileProvider for FixedProfile {
    fn resolve(&self, _lat: f64, _lon: f64) -> Result<SiteEnvironment> {
        Ok(self.0.clone())
    }
}

struct FixedDensity(f64);

impl PopulationDensityProvider for FixedDensity {
    fn lookup(&self, _country_code: &str) -> Result<f64> {
        Ok(self.0)
    }
}

struct FailingDensity;

impl PopulationDensityProvider for FailingDensity {
    fn lookup(&self, country_code: &str) -> Result<f64> {
        Err(Error::PopulationDensityUnavailable {
            country_code: country_code.to_string(),
            message: "unavailable".to_string(),
        })
    }
}

fn reference_asteroid() -> AsteroidParameters {
    AsteroidParameters::new(100.0, 3000.0, 20.0, 45.0).expect("valid parameters")
}

fn reference_site() -> ImpactSite {
    ImpactSite::new(-33.45, -70.66).expect("valid site")
}

fn land_profile() -> SiteEnvironment {
    SiteEnvironment {
        elevation_m: 520.0,
        slope_deg: 3.0,
        roughness_m: 14.0,
        terrain: TerrainKind::Land,
        landform: Some("boundary:administrative".to_string()),
        country_code: Some("CL".to_string()),
        water_depth_m: None,
        data_sources: vec!["OpenTopoData etopo1".to_string()],
    }
}

fn ocean_profile() -> SiteEnvironment {
    SiteEnvironment {
        elevation_m: -3_800.0,
        slope_deg: 0.5,
        roughness_m: 30.0,
        terrain: TerrainKind::Water,
        landform: None,
        country_code: None,
        water_depth_m: Some(3_800.0),
        data_sources: vec!["OpenTopoData etopo1".to_string()],
    }
}

#[test]
fn reference_land_impact_without_profile() {
    let simulator = Simulator::offline();
    let outcome = simulator
        .simulate(&reference_asteroid(), &reference_site(), false)
        .expect("simulation succeeds");
    let effects = &outcome.effects;

    let within = |value: f64, expected: f64| (value - expected).abs() / expected < 0.01;
    assert!(within(effects.kinetic_energy_j, 3.14e17));
    assert!(within(effects.energy_megatons, 75.1));
    assert!(within(effects.crater_diameter_km, 1.84));
    assert!(within(effects.shock_radius_km, 7.6));
    assert!(within(effects.thermal_radius_km, 100.0));
    assert!(within(effects.thermal_flux_at_100km_jm2, 15_000.0));
    assert!(within(effects.seismic_magnitude.unwrap(), 5.85));
    assert!(effects.tsunami_height_m.is_none());
    assert!(within(effects.est_affected_people.unwrap() as f64, 1.7e6));
    assert!((effects.global_survival_prob.unwrap() - 0.9998).abs() < 0.001);

    assert!(outcome.environment.is_none());
    assert!(outcome
        .notes
        .iter()
        .any(|note| note.contains("Topographic data unavailable")));
}

#[test]
fn ocean_impact_produces_tsunami_and_coastal_density() {
    let simulator = Simulator::offline();
    let land = simulator
        .simulate(&reference_asteroid(), &reference_site(), false)
        .unwrap();
    let ocean = simulator
        .simulate(&reference_asteroid(), &reference_site(), true)
        .unwrap();

    let height = ocean.effects.tsunami_height_m.expect("tsunami present");
    assert!(height > 0.0);

    assert!(ocean
        .notes
        .iter()
        .any(|note| note.contains("coastal-average population density")));
    assert!(ocean
        .notes
        .iter()
        .any(|note| note.contains("coastal fraction of the affected area")));

    // The 0.4 coastal habitation fraction dominates: the ocean estimate must
    // come in below the equivalent land impact at the rural 80/km² baseline.
    let ocean_people = ocean.effects.est_affected_people.unwrap();
    let land_people = land.effects.est_affected_people.unwrap();
    assert!(ocean_people < land_people);
    assert!(ocean_people > 0);
}

#[test]
fn water_terrain_profile_forces_water_surface_without_ocean_flag() {
    let simulator = Simulator::new(
        Arc::new(FixedProfile(ocean_profile())),
        Arc::new(FailingDensity),
    );
    let outcome = simulator
        .simulate(&reference_asteroid(), &reference_site(), false)
        .unwrap();

    assert!(outcome.effects.tsunami_height_m.is_some());
    let environment = outcome.environment.expect("profile attached");
    assert_eq!(environment.terrain, TerrainKind::Water);
    assert_eq!(environment.water_depth_m, Some(3_800.0));
}

#[test]
fn country_indicator_density_is_used_when_available() {
    let simulator = Simulator::new(
        Arc::new(FixedProfile(land_profile())),
        Arc::new(FixedDensity(26.0)),
    );
    let outcome = simulator
        .simulate(&reference_asteroid(), &reference_site(), false)
        .unwrap();

    assert!(outcome
        .notes
        .iter()
        .any(|note| note.contains("country-level density indicator")));
    assert!(outcome
        .notes
        .iter()
        .any(|note| note.contains("terrain and landform data")));
}

#[test]
fn failed_indicator_falls_back_to_local_heuristics() {
    let simulator = Simulator::new(
        Arc::new(FixedProfile(land_profile())),
        Arc::new(FailingDensity),
    );
    let outcome = simulator
        .simulate(&reference_asteroid(), &reference_site(), false)
        .unwrap();

    assert!(outcome
        .notes
        .iter()
        .any(|note| note.contains("local terrain heuristics")));
}

#[test]
fn invalid_parameters_abort_without_partial_output() {
    let simulator = Simulator::offline();
    let invalid = AsteroidParameters {
        diameter_m: 100.0,
        density_kgm3: -3000.0,
        velocity_kms: 20.0,
        angle_deg: 45.0,
    };
    let err = simulator
        .simulate(&invalid, &reference_site(), false)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidParameter {
            field: "density_kgm3",
            ..
        }
    ));
}

#[test]
fn larger_impactors_strictly_increase_energy_and_crater() {
    let simulator = Simulator::offline();
    let site = reference_site();

    let mut previous_energy = 0.0;
    let mut previous_crater = 0.0;
    for diameter in [50.0, 100.0, 200.0, 400.0] {
        let asteroid = AsteroidParameters::new(diameter, 3000.0, 20.0, 45.0).unwrap();
        let outcome = simulator.simulate(&asteroid, &site, false).unwrap();
        assert!(outcome.effects.kinetic_energy_j > previous_energy);
        assert!(outcome.effects.crater_diameter_km > previous_crater);
        previous_energy = outcome.effects.kinetic_energy_j;
        previous_crater = outcome.effects.crater_diameter_km;
    }
}

#[test]
fn survival_probability_is_always_within_bounds() {
    let simulator = Simulator::offline();
    let site = reference_site();
    for diameter in [10.0, 100.0, 1_500.0, 8_000.0, 25_000.0] {
        let asteroid = AsteroidParameters::new(diameter, 3000.0, 20.0, 45.0).unwrap();
        let outcome = simulator.simulate(&asteroid, &site, false).unwrap();
        let probability = outcome.effects.global_survival_prob.unwrap();
        assert!(
            (0.0001..=1.0).contains(&probability),
            "diameter {diameter}: probability {probability}"
        );
    }
}

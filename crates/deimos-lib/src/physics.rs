//! Impact physics engine.
//!
//! Pure scalar functions converting asteroid and impact-site parameters into
//! kinetic energy, crater dimensions, blast/thermal/seismic footprints, and
//! tsunami heights, following published power-law scaling relations rather
//! than first-principles simulation.
//!
//! Degenerate inputs (zero or negative diameters, velocities, energies) are
//! not errors here: a sub-threshold event has no effect, so these functions
//! return `0.0` and stay total over the full floating-point domain. Input
//! validation belongs to the simulation boundary.

/// Physical constants for impact calculations.
pub mod constants {
    /// Standard surface gravity (m/s²)
    pub const EARTH_GRAVITY_MS2: f64 = 9.80665;

    /// Mean Earth radius (m)
    pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

    /// Average continental crust density (kg/m³), the reference target material
    pub const CONTINENTAL_CRUST_DENSITY_KGM3: f64 = 2700.0;

    /// Mean seawater density (kg/m³)
    pub const SEAWATER_DENSITY_KGM3: f64 = 1025.0;

    /// Glacial ice density (kg/m³)
    pub const ICE_DENSITY_KGM3: f64 = 917.0;

    /// Fraction of kinetic energy radiated as thermal energy
    pub const THERMAL_EFFICIENCY: f64 = 3e-3;

    /// Severe-burn thermal flux threshold (J/m²)
    pub const THERMAL_FLUX_THRESHOLD_JM2: f64 = 15e3;

    /// TNT-equivalent joules in one megaton
    pub const JOULES_PER_MEGATON: f64 = 4.184e15;
}

use constants::*;

/// Spherical mass approximation from diameter (m) and bulk density (kg/m³).
///
/// Returns 0.0 for non-positive diameter or density.
pub fn mass_from_diameter(diameter_m: f64, density_kgm3: f64) -> f64 {
    if diameter_m <= 0.0 || density_kgm3 <= 0.0 {
        return 0.0;
    }
    let radius = diameter_m / 2.0;
    let volume = (4.0 / 3.0) * std::f64::consts::PI * radius.powi(3);
    density_kgm3 * volume
}

/// Impact kinetic energy in joules.
///
/// Follows the standard impact-energy scaling:
/// ```text
/// E = (π/12) · ρ · d³ · v²
/// ```
/// with `d` in meters and `v` converted from km/s to m/s. Returns 0.0 for
/// non-positive diameter, density, or velocity.
pub fn kinetic_energy_joules(diameter_m: f64, density_kgm3: f64, velocity_kms: f64) -> f64 {
    if diameter_m <= 0.0 || density_kgm3 <= 0.0 || velocity_kms <= 0.0 {
        return 0.0;
    }
    let velocity_ms = velocity_kms * 1_000.0;
    (std::f64::consts::PI / 12.0) * density_kgm3 * diameter_m.powi(3) * velocity_ms.powi(2)
}

/// Impact kinetic energy in megatons of TNT equivalent.
pub fn kinetic_energy_megatons(diameter_m: f64, density_kgm3: f64, velocity_kms: f64) -> f64 {
    kinetic_energy_joules(diameter_m, density_kgm3, velocity_kms) / JOULES_PER_MEGATON
}

/// Surface gravity at the given elevation above mean radius (m/s²).
///
/// Uses the inverse-square falloff `g₀ · (R / (R + h))²`. The effective
/// radius is floored at 0.9·R so deeply negative elevations cannot drive the
/// expression toward the singularity at the planet's center.
pub fn gravity_at_elevation_ms2(elevation_m: f64) -> f64 {
    let radius = (EARTH_RADIUS_M + elevation_m).max(EARTH_RADIUS_M * 0.9);
    EARTH_GRAVITY_MS2 * (EARTH_RADIUS_M / radius).powi(2)
}

/// Target-side parameters for the crater scaling law.
///
/// Replaces a long tail of optional arguments with an explicit struct so call
/// sites stay self-describing. The defaults describe a flat continental-crust
/// target under standard gravity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CraterParams {
    /// Whether the impact surface is water (selects the ocean scaling constant).
    pub ocean: bool,
    /// Target material density (kg/m³).
    pub target_density_kgm3: f64,
    /// Local surface gravity (m/s²).
    pub gravity_ms2: f64,
    /// Local terrain slope in degrees.
    pub slope_deg: f64,
}

impl Default for CraterParams {
    fn default() -> Self {
        Self {
            ocean: false,
            target_density_kgm3: CONTINENTAL_CRUST_DENSITY_KGM3,
            gravity_ms2: EARTH_GRAVITY_MS2,
            slope_deg: 0.0,
        }
    }
}

/// Transient crater diameter in kilometers.
///
/// Pi-group scaling law:
/// ```text
/// D = C · (ρᵢ/ρₜ)^⅓ · d^0.78 · v^0.44 · g^-0.22 · sin(θ)^⅓ · slope_factor
/// ```
/// with `C` = 1.365 for water targets and 1.161 for land, and
/// `slope_factor = max(cos(min(|slope|, 75°)), 0.5)` damping craters on steep
/// terrain. Returns 0.0 when diameter, velocity, or angle is non-positive.
pub fn crater_diameter_km(
    diameter_m: f64,
    impactor_density_kgm3: f64,
    velocity_kms: f64,
    angle_deg: f64,
    params: &CraterParams,
) -> f64 {
    if diameter_m <= 0.0 || velocity_kms <= 0.0 || angle_deg <= 0.0 {
        return 0.0;
    }

    let scaling_const = if params.ocean { 1.365 } else { 1.161 };
    let velocity_ms = velocity_kms * 1_000.0;
    let density_term = (impactor_density_kgm3 / params.target_density_kgm3).powf(1.0 / 3.0);
    let diameter_term = diameter_m.powf(0.78);
    let velocity_term = velocity_ms.powf(0.44);
    let gravity_term = params.gravity_ms2.powf(-0.22);
    let angle_term = angle_deg.to_radians().sin().powf(1.0 / 3.0);
    let slope_factor = params
        .slope_deg
        .abs()
        .min(75.0)
        .to_radians()
        .cos()
        .max(0.5);

    let crater_m = scaling_const
        * density_term
        * diameter_term
        * velocity_term
        * gravity_term
        * angle_term
        * slope_factor;
    crater_m / 1_000.0
}

/// Severe-overpressure shock radius in kilometers.
///
/// Cube-root yield scaling, weakly corrected for target material:
/// ```text
/// R = 1.8 · (E / 4.184e15)^⅓ · density_factor^-0.1
/// ```
/// `density_factor` is the target density relative to continental crust and
/// is floored at 0.5. Returns 0.0 when energy is non-positive.
pub fn shock_radius_km(energy_j: f64, density_factor: f64) -> f64 {
    if energy_j <= 0.0 {
        return 0.0;
    }
    let density_factor = density_factor.max(0.5);
    1.8 * (energy_j / JOULES_PER_MEGATON).powf(1.0 / 3.0) * density_factor.powf(-0.1)
}

/// Radius within which the radiated thermal flux exceeds the severe-burn
/// threshold, in kilometers.
pub fn thermal_radius_km(energy_j: f64) -> f64 {
    if energy_j <= 0.0 {
        return 0.0;
    }
    let radius_m = ((THERMAL_EFFICIENCY * energy_j)
        / (2.0 * std::f64::consts::PI * THERMAL_FLUX_THRESHOLD_JM2))
        .sqrt();
    radius_m / 1_000.0
}

/// Thermal flux (J/m²) received at the given distance from the impact point.
///
/// Hemispherical radiation model: `η·E / (2π·r²)` with `r` in meters.
pub fn thermal_flux_at_distance_jm2(energy_j: f64, distance_km: f64) -> f64 {
    if energy_j <= 0.0 || distance_km <= 0.0 {
        return 0.0;
    }
    let distance_m = distance_km * 1_000.0;
    (THERMAL_EFFICIENCY * energy_j) / (2.0 * std::f64::consts::PI * distance_m.powi(2))
}

/// Equivalent seismic moment magnitude of the impact.
///
/// `M = 0.67·log10(E) − 5.87`, 0.0 for non-positive energy.
pub fn seismic_magnitude(energy_j: f64) -> f64 {
    if energy_j <= 0.0 {
        return 0.0;
    }
    0.67 * energy_j.log10() - 5.87
}

/// Observation parameters for the tsunami height estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TsunamiParams {
    /// Distance from the impact point at which the wave height is evaluated.
    pub distance_km: f64,
    /// Water depth at the impact site, when known.
    pub water_depth_m: Option<f64>,
}

impl Default for TsunamiParams {
    fn default() -> Self {
        Self {
            distance_km: 50.0,
            water_depth_m: None,
        }
    }
}

/// Tsunami wave height in meters for a water-surface impact.
///
/// Sub-megaton impacts produce a fixed 0.5 m disturbance. Above that:
/// ```text
/// H = min(80, 0.12 · √E_mt · depth_factor · (50 / max(r, 1))^0.5)
/// ```
/// where `depth_factor = clamp(depth / 4000, 0.35, 1.0)` when the water depth
/// is known, else 1.0. Only meaningful for water-surface impacts; the caller
/// decides whether the surface is water.
pub fn tsunami_height_m(energy_j: f64, params: &TsunamiParams) -> f64 {
    if energy_j <= 0.0 {
        return 0.0;
    }
    let energy_mt = energy_j / JOULES_PER_MEGATON;
    if energy_mt < 1.0 {
        return 0.5;
    }
    let depth_factor = match params.water_depth_m {
        Some(depth) => (depth / 4_000.0).clamp(0.35, 1.0),
        None => 1.0,
    };
    let distance_term = (50.0 / params.distance_km.max(1.0)).sqrt();
    (0.12 * energy_mt.sqrt() * depth_factor * distance_term).min(80.0)
}

/// Coarse global survival probability heuristic.
///
/// The base value is bracketed by impactor diameter (<1 km: 0.9999, <5 km:
/// 0.99, <10 km: 0.95, else 0.80). When both population figures are positive
/// the base is scaled by `√(1 − affected/total)` and floored at 0.0001.
///
/// This is a severity heuristic, not an empirically validated casualty model;
/// the brackets and scaling are preserved as calibrated.
pub fn global_survival_probability(
    diameter_m: f64,
    affected_people: f64,
    total_population: f64,
) -> f64 {
    let base = if diameter_m < 1_000.0 {
        0.9999
    } else if diameter_m < 5_000.0 {
        0.99
    } else if diameter_m < 10_000.0 {
        0.95
    } else {
        0.80
    };

    if total_population > 0.0 && affected_people > 0.0 {
        let fraction = (affected_people / total_population).clamp(0.0, 1.0);
        let scaling = (1.0 - fraction).max(0.0);
        (base * scaling.sqrt()).max(0.0001)
    } else {
        base
    }
}

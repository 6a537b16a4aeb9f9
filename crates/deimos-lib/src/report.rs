use std::fmt::Write;

use crate::simulation::SimulationOutcome;

/// Render a simulation outcome as a plain-text report for terminal output.
///
/// Optional effects render only when present; the rationale notes are
/// appended in their causal order.
pub fn render_plain(outcome: &SimulationOutcome) -> String {
    let effects = &outcome.effects;
    let mut buffer = String::new();

    let _ = writeln!(
        buffer,
        "Impact energy: {:.1} Mt ({:.3e} J), mass {:.3e} kg",
        effects.energy_megatons, effects.kinetic_energy_j, effects.asteroid_mass_kg
    );
    let _ = writeln!(
        buffer,
        "Crater diameter: {:.2} km",
        effects.crater_diameter_km
    );
    let _ = writeln!(
        buffer,
        "Shock radius: {:.1} km, thermal radius: {:.1} km ({:.0} J/m2 at 100 km)",
        effects.shock_radius_km, effects.thermal_radius_km, effects.thermal_flux_at_100km_jm2
    );
    if let Some(magnitude) = effects.seismic_magnitude {
        let _ = writeln!(buffer, "Seismic magnitude: {:.2}", magnitude);
    }
    if let Some(height) = effects.tsunami_height_m {
        let _ = writeln!(buffer, "Tsunami height: {:.1} m", height);
    }
    if let Some(people) = effects.est_affected_people {
        let _ = writeln!(buffer, "Estimated affected population: {}", people);
    }
    if let Some(probability) = effects.global_survival_prob {
        let _ = writeln!(buffer, "Global survival probability: {:.4}", probability);
    }

    if let Some(environment) = &outcome.environment {
        let _ = writeln!(
            buffer,
            "Site: elevation {:.0} m, slope {:.1} deg, terrain {:?}",
            environment.elevation_m, environment.slope_deg, environment.terrain
        );
    }

    if !outcome.notes.is_empty() {
        let _ = writeln!(buffer, "Notes:");
        for note in &outcome.notes {
            let _ = writeln!(buffer, "- {note}");
        }
    }

    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{AsteroidParameters, ImpactSite, Simulator};

    #[test]
    fn report_lists_effects_and_notes() {
        let simulator = Simulator::offline();
        let asteroid = AsteroidParameters::new(100.0, 3000.0, 20.0, 45.0).unwrap();
        let site = ImpactSite::new(10.0, 10.0).unwrap();
        let outcome = simulator.simulate(&asteroid, &site, false).unwrap();

        let report = render_plain(&outcome);
        assert!(report.contains("Impact energy"));
        assert!(report.contains("Crater diameter"));
        assert!(report.contains("Estimated affected population"));
        assert!(report.contains("Notes:"));
        assert!(!report.contains("Tsunami height"));
    }

    #[test]
    fn ocean_report_includes_tsunami_line() {
        let simulator = Simulator::offline();
        let asteroid = AsteroidParameters::new(100.0, 3000.0, 20.0, 45.0).unwrap();
        let site = ImpactSite::new(0.0, -140.0).unwrap();
        let outcome = simulator.simulate(&asteroid, &site, true).unwrap();
        assert!(render_plain(&outcome).contains("Tsunami height"));
    }
}

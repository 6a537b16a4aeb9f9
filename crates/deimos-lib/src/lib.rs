//! DEIMOS library entry points.
//!
//! This crate estimates the physical consequences of an asteroid impact:
//! kinetic energy, crater size, blast/thermal/seismic/tsunami footprints,
//! affected population, and a coarse survival probability. Higher-level
//! consumers (CLI, services) should only depend on the types exported here
//! instead of reimplementing behavior.
//!

#![deny(warnings)]

pub mod catalog;
pub mod environment;
pub mod error;
pub mod geodata;
pub mod physics;
pub mod population;
pub mod report;
pub mod simulation;
pub mod worldbank;

pub use catalog::{AsteroidCatalogProvider, CatalogClient, CatalogDetail, SummaryRecord};
pub use environment::{SiteEnvironment, SiteProfileProvider, TerrainKind};
pub use error::{Error, Result};
pub use geodata::GeoDataClient;
pub use population::{PopulationDensityProvider, PopulationEstimator, WorldModel};
pub use simulation::{
    AsteroidParameters, EffectResult, ImpactSite, OfflineDensity, OfflineSiteProfiles,
    SimulationOutcome, Simulator,
};
pub use worldbank::WorldBankClient;

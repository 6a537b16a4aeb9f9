use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use deimos_lib::{
    report, AsteroidParameters, CatalogClient, GeoDataClient, ImpactSite, Simulator,
    WorldBankClient,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Asteroid impact simulation utilities")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate an asteroid impact at a geographic location.
    Simulate(SimulateArgs),
    /// Query the NASA SBDB potentially hazardous asteroid catalog.
    Asteroids {
        #[command(subcommand)]
        command: AsteroidsCommand,
    },
}

#[derive(Args, Debug)]
#[command(allow_negative_numbers = true)]
struct SimulateArgs {
    /// Catalog designation (spkid or name) to pull parameters from.
    #[arg(long, conflicts_with_all = ["diameter_m", "velocity_kms"])]
    asteroid: Option<String>,

    /// Asteroid diameter in meters.
    #[arg(long, required_unless_present = "asteroid")]
    diameter_m: Option<f64>,

    /// Asteroid bulk density in kg/m3.
    #[arg(long, default_value_t = 3000.0)]
    density_kgm3: f64,

    /// Impact velocity in km/s.
    #[arg(long, required_unless_present = "asteroid")]
    velocity_kms: Option<f64>,

    /// Entry angle in degrees from horizontal.
    #[arg(long, default_value_t = 45.0)]
    angle_deg: f64,

    /// Impact latitude in degrees.
    #[arg(long)]
    lat: f64,

    /// Impact longitude in degrees.
    #[arg(long)]
    lon: f64,

    /// Force a water-surface impact regardless of the resolved terrain.
    #[arg(long)]
    ocean: bool,

    /// Skip terrain and population lookups and run on baseline defaults.
    #[arg(long)]
    offline: bool,

    /// Bypass the catalog cache when resolving --asteroid.
    #[arg(long)]
    refresh: bool,

    /// Emit the outcome as JSON instead of a plain-text report.
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum AsteroidsCommand {
    /// List the potentially hazardous asteroid summary table.
    List {
        /// Maximum number of rows to print.
        #[arg(long)]
        limit: Option<usize>,
        /// Bypass the on-disk catalog cache.
        #[arg(long)]
        refresh: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show the normalized detail record for one object.
    Show {
        /// Catalog designation (spkid or name).
        designation: String,
        /// Bypass the on-disk catalog cache.
        #[arg(long)]
        refresh: bool,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Simulate(args) => handle_simulate(args),
        Command::Asteroids { command } => match command {
            AsteroidsCommand::List {
                limit,
                refresh,
                json,
            } => handle_list(limit, refresh, json),
            AsteroidsCommand::Show {
                designation,
                refresh,
                json,
            } => handle_show(&designation, refresh, json),
        },
    }
}

fn handle_simulate(args: SimulateArgs) -> Result<()> {
    let asteroid = match &args.asteroid {
        Some(designation) => {
            let catalog = CatalogClient::new().context("failed to build catalog client")?;
            let detail = catalog
                .fetch_detail(designation, args.refresh)
                .with_context(|| format!("failed to resolve asteroid {designation}"))?;
            detail.asteroid_parameters()
        }
        None => AsteroidParameters::new(
            args.diameter_m.expect("required by clap"),
            args.density_kgm3,
            args.velocity_kms.expect("required by clap"),
            args.angle_deg,
        )?,
    };
    let site = ImpactSite::new(args.lat, args.lon)?;

    let simulator = if args.offline {
        Simulator::offline()
    } else {
        Simulator::new(
            Arc::new(GeoDataClient::new().context("failed to build geodata client")?),
            Arc::new(WorldBankClient::new().context("failed to build population client")?),
        )
    };

    let outcome = simulator
        .simulate(&asteroid, &site, args.ocean)
        .context("simulation failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", report::render_plain(&outcome));
    }
    Ok(())
}

fn handle_list(limit: Option<usize>, refresh: bool, json: bool) -> Result<()> {
    let catalog = CatalogClient::new().context("failed to build catalog client")?;
    let mut records = catalog
        .fetch_summary(refresh)
        .context("failed to fetch the PHA summary")?;
    if let Some(limit) = limit {
        records.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    for record in &records {
        let diameter = record
            .diameter_km
            .map(|km| format!("{km:.3} km"))
            .unwrap_or_else(|| "unknown".to_string());
        println!("{:>10}  {:<40} {}", record.spkid, record.full_name, diameter);
    }
    println!("{} objects", records.len());
    Ok(())
}

fn handle_show(designation: &str, refresh: bool, json: bool) -> Result<()> {
    let catalog = CatalogClient::new().context("failed to build catalog client")?;
    let detail = catalog
        .fetch_detail(designation, refresh)
        .with_context(|| format!("failed to resolve asteroid {designation}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    println!("{} ({})", detail.full_name, detail.spkid);
    if let Some(diameter) = detail.diameter_m {
        println!("diameter: {diameter:.0} m");
    }
    if let Some(density) = detail.density_kgm3 {
        println!("density: {density:.0} kg/m3");
    }
    if let Some(velocity) = detail.velocity_kms {
        println!("impact velocity: {velocity:.2} km/s");
    }
    if let Some(probability) = detail.impact_probability {
        println!("impact probability: {probability:.3e}");
    }
    if let Some(palermo) = detail.palermo_scale {
        println!("palermo scale: {palermo:.2}");
    }
    if let Some(torino) = detail.torino_scale {
        println!("torino scale: {torino:.1}");
    }
    println!("virtual impactors: {}", detail.vi_data.len());
    println!("source: {}", detail.source);
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

//! Command line front end for the IBGE boundary fetcher and locator.
//!
//! Downloads boundaries as GeoJSON, looks points up across the six
//! territorial levels and renders layers to SVG.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use geodata::config::Config;
use geodata::coords::UtmZone;
use geodata::plot::{save_svg, PlotStyle};
use geodata::{
    BoundarySource, FetchRequest, GeoCoords, GeoLevel, GeoLocator, IbgeClient, LazyLocator,
    LocatedUnit, Quality, Scope,
};

#[derive(Parser, Debug)]
#[command(name = "geodata")]
#[command(about = "IBGE administrative boundaries and point lookups")]
#[command(allow_negative_numbers = true)]
struct Args {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Mesh quality (low, medium, high); overrides the config file
    #[arg(short, long, global = true)]
    quality: Option<Quality>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download one level as a GeoJSON FeatureCollection
    Fetch {
        #[arg(short, long)]
        level: GeoLevel,

        #[command(flatten)]
        scope: ScopeArgs,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the attribute rows of one level as JSON
    Metadata {
        #[arg(short, long)]
        level: GeoLevel,
    },

    /// Find the units containing a point
    Locate {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Only this level (loads a single layer)
        #[arg(short, long)]
        level: Option<GeoLevel>,
    },

    /// Render one level to an SVG file
    Plot {
        #[arg(short, long)]
        level: GeoLevel,

        #[command(flatten)]
        scope: ScopeArgs,

        #[arg(short, long, default_value = "boundaries.svg")]
        output: PathBuf,

        #[arg(long, default_value = "800")]
        width: u32,

        #[arg(long, default_value = "800")]
        height: u32,

        /// Unit ids to highlight (comma-separated)
        #[arg(long, value_delimiter = ',')]
        highlight: Vec<i64>,
    },

    /// Great-circle distance and initial bearing between two points
    Distance {
        /// Origin as "lat,lon"
        #[arg(long, allow_hyphen_values = true, value_parser = parse_coords)]
        from: GeoCoords,

        /// Destination as "lat,lon"
        #[arg(long, allow_hyphen_values = true, value_parser = parse_coords)]
        to: GeoCoords,
    },

    /// Convert between lat/lon and UTM
    Utm {
        /// Target projection, e.g. EPSG:31983
        #[arg(long)]
        crs: String,

        /// Point as "lat,lon" (forward conversion)
        #[arg(long, allow_hyphen_values = true, value_parser = parse_coords, conflicts_with = "inverse")]
        point: Option<GeoCoords>,

        /// Easting and northing (inverse conversion)
        #[arg(long, num_args = 2, allow_hyphen_values = true, value_names = ["EASTING", "NORTHING"])]
        inverse: Option<Vec<f64>>,
    },
}

#[derive(ClapArgs, Debug)]
struct ScopeArgs {
    /// Restrict to the subdivisions of one state (IBGE code)
    #[arg(long, conflicts_with = "region")]
    state: Option<u32>,

    /// Restrict to the subdivisions of one macro region (IBGE code)
    #[arg(long)]
    region: Option<u32>,
}

impl ScopeArgs {
    fn scope(&self) -> Scope {
        match (self.state, self.region) {
            (Some(id), _) => Scope::State(id),
            (None, Some(id)) => Scope::Region(id),
            (None, None) => Scope::Brazil,
        }
    }
}

fn parse_coords(raw: &str) -> std::result::Result<GeoCoords, String> {
    let (lat, lon) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected \"lat,lon\", got '{raw}'"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("latitude: {e}"))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("longitude: {e}"))?;
    GeoCoords::new(lat, lon).map_err(|e| e.to_string())
}

#[derive(Serialize)]
struct DistanceOutput {
    from: GeoCoords,
    to: GeoCoords,
    distance_km: f64,
    bearing_deg: f64,
}

#[derive(Serialize)]
struct UtmOutput {
    crs: String,
    easting: f64,
    northing: f64,
    lat: f64,
    lon: f64,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for JSON output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load_or_default(args.config.as_deref())?;
    let quality = args.quality.unwrap_or(config.locator.quality);

    match args.command {
        Command::Fetch {
            level,
            scope,
            output,
        } => {
            let client = IbgeClient::from_config(&config.api)?;
            let request = FetchRequest::new(level, quality).within(scope.scope());
            let layer = client.fetch_layer(&request)?;
            let body = layer.to_geojson_string();
            match output {
                Some(path) => {
                    write_output(&path, &body)?;
                    info!("Wrote {} {} units to {}", layer.len(), level, path.display());
                }
                None => println!("{body}"),
            }
        }

        Command::Metadata { level } => {
            let client = IbgeClient::from_config(&config.api)?;
            let rows = client.fetch_metadata(level)?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }

        Command::Locate { lat, lon, level } => {
            let coords = GeoCoords::new(lat, lon)?;
            let client = IbgeClient::from_config(&config.api)?;
            match level {
                Some(level) => {
                    let mut locator = LazyLocator::new(client, quality);
                    let unit = locator.locate(&coords, level)?.map(LocatedUnit::from_unit);
                    println!("{}", serde_json::to_string_pretty(&unit)?);
                }
                None => {
                    let locator = load_with_progress(client, quality)?;
                    let location = locator.locate_all(&coords);
                    println!("{}", serde_json::to_string_pretty(&location)?);
                }
            }
        }

        Command::Plot {
            level,
            scope,
            output,
            width,
            height,
            highlight,
        } => {
            let client = IbgeClient::from_config(&config.api)?;
            let request = FetchRequest::new(level, quality).within(scope.scope());
            let layer = client.fetch_layer(&request)?;
            let style = PlotStyle {
                width,
                height,
                highlight,
                ..PlotStyle::default()
            };
            save_svg(&layer, &style, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
        }

        Command::Distance { from, to } => {
            let output = DistanceOutput {
                from,
                to,
                distance_km: from.distance_to(&to),
                bearing_deg: from.bearing_to(&to),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Utm {
            crs,
            point,
            inverse,
        } => {
            let zone = UtmZone::from_epsg(&crs)?;
            let (coords, easting, northing) = match (point, inverse.as_deref()) {
                (Some(coords), _) => {
                    let (easting, northing) = coords.to_utm(&crs)?;
                    (coords, easting, northing)
                }
                (None, Some([easting, northing])) => {
                    (GeoCoords::from_utm(*easting, *northing, &crs)?, *easting, *northing)
                }
                _ => anyhow::bail!("either --point or --inverse is required"),
            };
            let output = UtmOutput {
                crs: zone.to_string(),
                easting,
                northing,
                lat: coords.lat(),
                lon: coords.lon(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Eagerly load all six levels with a progress bar on stderr
fn load_with_progress(client: IbgeClient, quality: Quality) -> Result<GeoLocator> {
    let pb = ProgressBar::new(GeoLevel::ALL.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let locator = GeoLocator::load_with(client, quality, |level, layer| {
        pb.set_message(format!("{} ({} units)", level, layer.len()));
        pb.inc(1);
    })
    .context("Failed to load boundary layers")?;

    pb.finish_with_message("Layers loaded");
    Ok(locator)
}

fn write_output(path: &Path, body: &str) -> Result<()> {
    fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))
}

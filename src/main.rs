//! trackmap - render a GeoJSON track or polygon as a map image.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trackmap::{
    Config, FsTileStore, Geometry, HttpTileFetcher, MosaicCompositor, TileCache,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(path) => {
            info!("Wrote {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let document = read_input(&config.input)?;
    let geometry = Geometry::from_geojson(&document)?;
    info!(
        points = geometry.point_count(),
        "parsed {} geometry",
        match geometry {
            Geometry::LineString(_) => "LineString",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    );

    let request = config.to_request(geometry)?;

    let cache = TileCache::new(
        HttpTileFetcher::new(),
        FsTileStore::new(&config.cache_dir),
    );
    let compositor = MosaicCompositor::new(cache);

    let output = compositor.render(&request).await?;

    let path = config.output_path(output.format);
    std::fs::write(&path, &output.data)?;
    Ok(path)
}

/// Read the GeoJSON document from a file, or from stdin for `-`.
fn read_input(path: &Path) -> Result<String, std::io::Error> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path)
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "trackmap=debug"
    } else {
        "trackmap=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

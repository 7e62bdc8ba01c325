use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ride_insights::{Config, RideAnalyzer, TrackFormat};

#[derive(Parser)]
#[command(
    name = "ride-insights",
    about = "Analyse a cycling track: metrics, weather, terrain and calories"
)]
struct Args {
    /// GPX or FIT file to analyse
    track: PathBuf,

    /// Rider weight in kilograms (defaults to DEFAULT_RIDER_WEIGHT_KG)
    #[arg(long)]
    weight: Option<f64>,

    /// Track format, when the file extension does not tell
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Pretty-print the JSON result
    #[arg(long)]
    pretty: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Gpx,
    Fit,
}

impl From<FormatArg> for TrackFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Gpx => TrackFormat::Gpx,
            FormatArg::Fit => TrackFormat::Fit,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ride_insights=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    let bytes = tokio::fs::read(&args.track)
        .await
        .with_context(|| format!("Failed to read {}", args.track.display()))?;
    let format = args.format.map(TrackFormat::from).or_else(|| {
        args.track
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(TrackFormat::from_filename)
    });
    let weight = args.weight.unwrap_or(config.default_rider_weight_kg);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling analysis");
            on_interrupt.cancel();
        }
    });

    let analyzer = RideAnalyzer::from_config(&config);
    let analysis = analyzer
        .analyze(&bytes, format, weight, &cancel)
        .await
        .with_context(|| format!("Failed to analyse {}", args.track.display()))?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&analysis)?
    } else {
        serde_json::to_string(&analysis)?
    };
    println!("{json}");
    Ok(())
}

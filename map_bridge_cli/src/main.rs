//! Command-line front end for the map bridge: loads a GeoJSON file into a
//! headless map host, optionally applies an update batch, and prints the
//! export.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use geojson::FeatureCollection;
use map_bridge::{EditorHost, HeadlessEngine, UpdateBatch, DEFAULT_MARKER_ASSET, DEFAULT_SOURCE};

#[derive(Parser)]
#[command(name = "map_bridge_cli", about = "Feature store and export tooling for the map bridge")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the full current GeoJSON of a loaded collection.
    Export {
        /// GeoJSON FeatureCollection file to load.
        #[arg(long)]
        input: String,
        /// Source name to load the collection into.
        #[arg(long, default_value = DEFAULT_SOURCE)]
        source: String,
    },
    /// Apply one add/update/remove batch and print the resulting GeoJSON.
    Apply {
        /// GeoJSON FeatureCollection file to load.
        #[arg(long)]
        input: String,
        /// Batch file: {"add": [...], "update": [...], "remove": [...]}.
        #[arg(long)]
        batch: String,
        /// Source name to load the collection into.
        #[arg(long, default_value = DEFAULT_SOURCE)]
        source: String,
    },
}

fn main() {
    env_logger::Builder::from_default_env().init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Export { input, source } => {
            let host = boot(&input, &source)?;
            print_export(&host)
        }
        Commands::Apply {
            input,
            batch,
            source,
        } => {
            let host = boot(&input, &source)?;
            let batch: UpdateBatch = serde_json::from_str(&std::fs::read_to_string(&batch)?)?;
            let store = host
                .features()
                .source(&source)
                .ok_or_else(|| format!("no source named {source}"))?;
            store.reconcile(&batch)?;
            print_export(&host)
        }
    }
}

fn boot(input: &str, source: &str) -> Result<EditorHost, Box<dyn std::error::Error>> {
    let engine = Arc::new(HeadlessEngine::new());
    engine.register_asset(DEFAULT_MARKER_ASSET, Vec::new());

    let host = EditorHost::new(engine);
    host.init();
    host.on_map_load()?;

    let text = std::fs::read_to_string(input)?;
    let collection: FeatureCollection = serde_json::from_str(&text)?;
    log::debug!(
        "loaded {} features from {input} into source {source}",
        collection.features.len()
    );
    match host.features().source(source) {
        Some(store) => store.replace(collection)?,
        None => {
            host.features().create(source, Some(collection));
        }
    }
    Ok(host)
}

fn print_export(host: &EditorHost) -> Result<(), Box<dyn std::error::Error>> {
    let exported = host.export_geojson();
    println!("{}", serde_json::to_string_pretty(&exported)?);
    Ok(())
}

use anyhow::{bail, Context, Result};
use clap::Parser;
use river_distance_core::prelude::*;
use std::path::PathBuf;

mod input;
mod output;
mod progress;

use input::{read_point_set, read_reference};
use output::{write_centerline_geojson, write_projected_geojson, write_table};
use progress::SpinnerFeedback;

#[derive(Parser, Debug)]
#[command(
    name = "river-distance",
    author,
    version,
    about = "Straight-line and along-river distances between paired point layers",
    long_about = "Pairs the points of two GeoJSON layers by an identifier field and writes, \
                  for every identifier, the straight-line distance between the two points \
                  and the distance between their projections on a river.\n\n\
                  The river may be a line layer (parts are merged end to end) or a polygon \
                  layer (its centre line is derived from a Voronoi skeleton). Identifiers \
                  present in only one layer are kept with empty distances."
)]
struct Args {
    /// First point layer (GeoJSON)
    #[arg(short = 'a', long)]
    input1: PathBuf,

    /// Identifier field of the first layer
    #[arg(long, default_value = "id")]
    id_field1: String,

    /// Second point layer (GeoJSON)
    #[arg(short = 'b', long)]
    input2: PathBuf,

    /// Identifier field of the second layer
    #[arg(long, default_value = "id")]
    id_field2: String,

    /// River layer (GeoJSON lines or polygons)
    #[arg(short, long)]
    river: PathBuf,

    /// Output delimited table
    #[arg(short, long)]
    output: PathBuf,

    /// Field delimiter of the output table
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// CRS of all layers: EPSG:<code>, a +proj string, or "engineering"
    #[arg(long, default_value = "EPSG:4326")]
    crs: String,

    /// CRS of the first layer, if different
    #[arg(long)]
    crs1: Option<String>,

    /// CRS of the second layer, if different
    #[arg(long)]
    crs2: Option<String>,

    /// CRS of the river layer, if different
    #[arg(long)]
    river_crs: Option<String>,

    /// Also write the derived centre line of a polygon river to this file
    #[arg(long)]
    centerline_output: Option<PathBuf>,

    /// Also write the projections of the first layer to this file
    #[arg(long)]
    projected1: Option<PathBuf>,

    /// Also write the projections of the second layer to this file
    #[arg(long)]
    projected2: Option<PathBuf>,

    /// Boundary densification spacing for polygon rivers, in map units
    #[arg(long, default_value = "0.1")]
    smoothness: f64,

    /// Dangle pruning length for polygon rivers (negative: centre line only)
    #[arg(long, default_value = "-1", allow_hyphen_values = true)]
    thin: f64,

    /// Decimal places of the distance columns
    #[arg(long, default_value = "2")]
    decimals: u32,

    /// Verbose output (show debug messages)
    #[arg(short, long)]
    verbose: bool,
}

fn parse_crs(value: &str) -> Result<Crs> {
    Crs::parse(value).with_context(|| format!("Invalid CRS: {}", value))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .format_timestamp(None)
    .init();

    log::info!("=== River Distance ===");
    log::info!("Points: {} / {}", args.input1.display(), args.input2.display());
    log::info!("River: {}", args.river.display());
    log::info!("Output: {}", args.output.display());

    for path in [&args.input1, &args.input2, &args.river] {
        if !path.exists() {
            bail!("Input file does not exist: {}", path.display());
        }
    }
    if !args.delimiter.is_ascii() {
        bail!("Delimiter must be a single ASCII character, got '{}'", args.delimiter);
    }
    if args.smoothness < 0.0 {
        bail!("Smoothness must not be negative");
    }

    let default_crs = parse_crs(&args.crs)?;
    let layer_crs = |value: &Option<String>| -> Result<Crs> {
        match value {
            Some(v) => parse_crs(v),
            None => Ok(default_crs.clone()),
        }
    };

    // Phase 1: Read layers
    log::info!("");
    log::info!("Phase 1: Reading layers...");
    let points1 = read_point_set(&args.input1, &args.id_field1, layer_crs(&args.crs1)?)?;
    let points2 = read_point_set(&args.input2, &args.id_field2, layer_crs(&args.crs2)?)?;
    let reference = read_reference(&args.river, layer_crs(&args.river_crs)?)?;
    log::info!("  {} points in '{}' ({})", points1.len(), points1.name, points1.crs);
    log::info!("  {} points in '{}' ({})", points2.len(), points2.name, points2.crs);
    log::info!("  {} river '{}' ({})", reference.kind(), reference.name, reference.crs);

    if args.centerline_output.is_some() && reference.kind() != GeometryKind::Polygon {
        log::warn!("  --centerline-output is only written for polygon rivers");
    }

    // Phase 2: Run pipeline
    log::info!("");
    log::info!("Phase 2: Computing distances...");
    let config = PipelineConfig {
        skeleton_smoothness: args.smoothness,
        skeleton_thin: args.thin,
        result_decimals: args.decimals,
        emit_centerline: args.centerline_output.is_some(),
        emit_projected: args.projected1.is_some() || args.projected2.is_some(),
        ..PipelineConfig::default()
    };
    let offset_field = config.offset_field.clone();

    // The table is kept in memory so a failed or canceled run leaves no file
    let mut table = InMemoryTable::new();
    let feedback = SpinnerFeedback::new();
    let inputs = PipelineInputs {
        points1,
        points2,
        reference,
    };
    let result = Pipeline::new(config)
        .run(inputs, &feedback, &mut table)
        .context("Distance computation failed")?;

    if result.status == RunStatus::Canceled {
        feedback.finish(format!("Canceled after {}", result.final_state));
        log::warn!("Run canceled, no table written");
        return Ok(());
    }
    feedback.finish(format!("{} rows", result.rows.len()));

    for skipped in &result.skipped {
        log::warn!("  Skipped point {} in '{}'", skipped.id, skipped.layer);
    }

    // Phase 3: Write optional layers
    log::info!("");
    log::info!("Phase 3: Writing output...");
    write_table(&table, args.delimiter as u8, args.decimals, &args.output)
        .context("Failed to write result table")?;
    if let (Some(path), Some(axis)) = (&args.centerline_output, &result.centerline) {
        write_centerline_geojson(axis, path).context("Failed to write centre line")?;
    }
    if let (Some(path), Some(set)) = (&args.projected1, &result.projected1) {
        write_projected_geojson(set, &offset_field, path)
            .context("Failed to write first projected layer")?;
    }
    if let (Some(path), Some(set)) = (&args.projected2, &result.projected2) {
        write_projected_geojson(set, &offset_field, path)
            .context("Failed to write second projected layer")?;
    }

    // Summary
    let matched = result
        .rows
        .iter()
        .filter(|r| r.id1.is_some() && r.id2.is_some())
        .count();
    log::info!("");
    log::info!("  {} rows, {} matched identifiers", result.rows.len(), matched);
    log::info!("Output written to: {}", args.output.display());
    log::info!("Done!");

    Ok(())
}

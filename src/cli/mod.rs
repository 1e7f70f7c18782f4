//! Command-line interface for the profiling pipeline.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::core::dataset::FieldId;
use crate::core::loaders;
use crate::core::writers;
use crate::processors::profile::{weighted_profile, BinSpacing, Profile, ProfileRequest};
use crate::processors::quantities;
use crate::processors::selection::{Center, RegionSelector};
use crate::visualization;

#[derive(Parser)]
#[command(name = "radial-profile")]
#[command(about = "Weighted radial profiling for particle datasets", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a dataset summary (particle count, fields, domain bounds)
    Info {
        /// Particle CSV file
        dataset: PathBuf,
    },

    /// Select a sphere and compute a weighted radial profile
    Profile {
        /// Particle CSV file
        dataset: PathBuf,
        /// Output CSV file for the profile
        output: PathBuf,
        /// Sphere center: "max" (densest particle) or "x,y,z"
        #[arg(long, default_value = "max")]
        center: String,
        /// Sphere radius in dataset units
        #[arg(short, long)]
        radius: Option<f64>,
        /// Field to profile (gas:velocity_magnitude is derived from the
        /// velocity components when not present in the dataset)
        #[arg(long, default_value = "gas:velocity_magnitude")]
        value_field: String,
        /// Weight field (defaults to the configured mass field)
        #[arg(long)]
        weight_field: Option<String>,
        /// Lower binning extremum (radius, dataset units)
        #[arg(long)]
        rmin: Option<f64>,
        /// Upper binning extremum (radius, dataset units)
        #[arg(long)]
        rmax: Option<f64>,
        /// Number of bins
        #[arg(short, long)]
        bins: Option<usize>,
        /// Use linear instead of log-spaced bins
        #[arg(long)]
        linear: bool,
        /// Keep velocities in the simulation frame instead of subtracting
        /// the region's bulk velocity
        #[arg(long)]
        no_bulk_correction: bool,
        /// Also render the profile to this PNG
        #[arg(long)]
        plot: Option<PathBuf>,
    },

    /// Render a saved profile CSV as a PNG
    Plot {
        /// Profile CSV file (as written by the profile command)
        profile_csv: PathBuf,
        /// Output PNG file path (defaults to the CSV name with .png)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Use linear instead of log-log axes
        #[arg(long)]
        linear: bool,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.len() > 39 {
            format!("{}...", &value[..36])
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    // Dispatch to subcommands
    match cli.command {
        Commands::Info { dataset } => {
            cmd_info(&dataset);
        }
        Commands::Profile {
            dataset,
            output,
            center,
            radius,
            value_field,
            weight_field,
            rmin,
            rmax,
            bins,
            linear,
            no_bulk_correction,
            plot,
        } => {
            let args = ProfileArgs {
                dataset,
                output,
                center,
                radius,
                value_field,
                weight_field,
                rmin,
                rmax,
                bins,
                linear,
                no_bulk_correction,
                plot,
            };
            cmd_profile(&args, &config);
        }
        Commands::Plot {
            profile_csv,
            output,
            linear,
        } => {
            cmd_plot(&profile_csv, output, linear, &config);
        }
    }
}

fn cmd_info(dataset_path: &PathBuf) {
    let start = Instant::now();
    let spinner = create_spinner("Loading particle dataset...");

    let dataset = match loaders::load_particle_csv(dataset_path) {
        Ok(ds) => ds,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Failed to load dataset: {}", e);
            std::process::exit(1);
        }
    };

    spinner.finish_and_clear();

    let domain = dataset.domain();
    let fields: Vec<String> = dataset.field_ids().map(|f| f.to_string()).collect();

    print_summary(
        "Dataset Summary",
        &[
            ("File", dataset_path.display().to_string()),
            ("Particles", dataset.len().to_string()),
            ("Fields", fields.join(", ")),
            (
                "Domain min",
                format!("[{:.3}, {:.3}, {:.3}]", domain.min[0], domain.min[1], domain.min[2]),
            ),
            (
                "Domain max",
                format!("[{:.3}, {:.3}, {:.3}]", domain.max[0], domain.max[1], domain.max[2]),
            ),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

struct ProfileArgs {
    dataset: PathBuf,
    output: PathBuf,
    center: String,
    radius: Option<f64>,
    value_field: String,
    weight_field: Option<String>,
    rmin: Option<f64>,
    rmax: Option<f64>,
    bins: Option<usize>,
    linear: bool,
    no_bulk_correction: bool,
    plot: Option<PathBuf>,
}

fn cmd_profile(args: &ProfileArgs, config: &PipelineConfig) {
    let start = Instant::now();
    let spinner = create_spinner("Computing radial profile...");

    match run_profile(args, config) {
        Ok((profile, n_selected, center)) => {
            spinner.finish_and_clear();

            let mut items = vec![
                ("Dataset", args.dataset.display().to_string()),
                (
                    "Center",
                    format!("[{:.3}, {:.3}, {:.3}]", center[0], center[1], center[2]),
                ),
                ("Samples selected", n_selected.to_string()),
                ("Samples binned", profile.total_count().to_string()),
                ("Bins", profile.n_bins().to_string()),
                ("Output CSV", args.output.display().to_string()),
            ];
            if let Some(plot) = &args.plot {
                items.push(("Output PNG", plot.display().to_string()));
            }
            items.push(("Duration", format!("{:.2?}", start.elapsed())));

            print_summary("Profile Complete", &items);
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Profile failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// The fallible body of the profile command: load, select, derive,
/// profile, write, and optionally plot.
fn run_profile(
    args: &ProfileArgs,
    config: &PipelineConfig,
) -> Result<(Profile, usize, [f64; 3])> {
    let dataset = loaders::load_particle_csv(&args.dataset)
        .with_context(|| format!("loading {}", args.dataset.display()))?;
    info!("Loaded {} particles", dataset.len());

    let value_field: FieldId = args
        .value_field
        .parse()
        .map_err(|e| anyhow!("bad --value-field: {}", e))?;
    let weight_field: FieldId = args
        .weight_field
        .as_deref()
        .unwrap_or(&config.selection.weight_field)
        .parse()
        .map_err(|e| anyhow!("bad --weight-field: {}", e))?;

    // The velocity magnitude is derived from components unless the
    // dataset already carries it as a column.
    let derive_velocity =
        value_field == FieldId::gas("velocity_magnitude") && !dataset.has_field(&value_field);

    let mut gather: Vec<FieldId> = if derive_velocity {
        quantities::velocity_fields().to_vec()
    } else {
        vec![value_field.clone()]
    };
    gather.push(weight_field.clone());
    gather.dedup();

    let selector = RegionSelector::new(&dataset);
    let center_spec = parse_center(&args.center, &config.selection.center_field)?;
    let center = selector.resolve_center(&center_spec)?;
    info!(
        "Sphere center resolved to [{:.3}, {:.3}, {:.3}]",
        center[0], center[1], center[2]
    );

    let radius = args.radius.unwrap_or(config.selection.radius);
    let mut samples = selector.select(center, radius, &gather, &weight_field)?;
    info!("Selected {} particles within radius {}", samples.len(), radius);

    if derive_velocity {
        let bulk = if args.no_bulk_correction {
            None
        } else {
            let bulk = quantities::bulk_velocity(&samples)?;
            info!(
                "Bulk velocity [{:.3}, {:.3}, {:.3}]",
                bulk[0], bulk[1], bulk[2]
            );
            Some(bulk)
        };
        quantities::attach_velocity_magnitude(&mut samples, bulk)?;
    }

    let spacing = if args.linear || !config.binning.log_spaced {
        BinSpacing::Linear
    } else {
        BinSpacing::Log
    };
    let request = ProfileRequest {
        bin_field: FieldId::radius(),
        value_field,
        weight_field: None,
        extrema: (
            args.rmin.unwrap_or(config.binning.extrema_low),
            args.rmax.unwrap_or(config.binning.extrema_high),
        ),
        n_bins: args.bins.unwrap_or(config.binning.n_bins),
        spacing,
    };

    let n_selected = samples.len();
    let profile = weighted_profile(&samples, &request)?;

    writers::write_profile_csv(&args.output, &profile)?;
    info!("Profile CSV -> {}", args.output.display());

    if let Some(plot_path) = &args.plot {
        let log_axes = !args.linear && config.plot.log_axes;
        visualization::plot_profile(plot_path, &profile, log_axes)?;
        info!("Profile PNG -> {}", plot_path.display());
    }

    Ok((profile, n_selected, center))
}

fn cmd_plot(
    profile_csv: &PathBuf,
    output: Option<PathBuf>,
    linear: bool,
    config: &PipelineConfig,
) {
    let start = Instant::now();

    // Default output path: same name with .png extension
    let output_path = output.unwrap_or_else(|| {
        let mut path = profile_csv.clone();
        path.set_extension("png");
        path
    });

    let spinner = create_spinner("Rendering profile plot...");

    let result = loaders::load_profile_csv(profile_csv)
        .map_err(anyhow::Error::from)
        .and_then(|table| {
            let log_axes = !linear && config.plot.log_axes;
            visualization::plot_profile_series(
                &output_path,
                &table.x,
                &table.mean,
                &table.stddev,
                log_axes,
            )
            .map_err(anyhow::Error::from)
            .map(|()| table.x.len())
        });

    match result {
        Ok(n_bins) => {
            spinner.finish_and_clear();
            print_summary(
                "Plot Complete",
                &[
                    ("Input CSV", profile_csv.display().to_string()),
                    ("Output PNG", output_path.display().to_string()),
                    ("Bins plotted", n_bins.to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Plot failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Parse a `--center` argument: `max` centers on the configured field's
/// global maximum, otherwise three comma-separated coordinates.
fn parse_center(spec: &str, center_field: &str) -> Result<Center> {
    if spec.eq_ignore_ascii_case("max") {
        let field: FieldId = center_field
            .parse()
            .map_err(|e| anyhow!("bad center field in config: {}", e))?;
        return Ok(Center::MaxField(field));
    }

    let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(anyhow!(
            "center must be 'max' or 'x,y,z', got '{}'",
            spec
        ));
    }
    let mut point = [0.0f64; 3];
    for (axis, part) in parts.iter().enumerate() {
        point[axis] = part
            .parse()
            .map_err(|_| anyhow!("bad center coordinate '{}'", part))?;
    }
    Ok(Center::Point(point))
}

use clap::{Parser, Subcommand};
use mapollage::cancel::CancelToken;
use mapollage::imaging::RustBackend;
use mapollage::metadata::ExifReader;
use mapollage::pipeline::RunOutcome;
use mapollage::scan::{self, Collected};
use mapollage::{config, output, pipeline};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "mapollage")]
#[command(about = "Turn geotagged photos into a KML map")]
#[command(long_about = "\
Turn geotagged photos into a KML map

Every photo with a GPS fix becomes a placemark whose balloon shows the photo.
Placemarks are grouped into folders by directory, date, or regex, and can be
joined by a travel path and outlined by convex-hull polygons.

Settings come from a TOML profile layered over the stock defaults:

  mapollage.toml
  ├── dest = \"trip.kml\"
  ├── [source]       dir, include glob, exclude substrings
  ├── [folder]       by = none | dir | date | regex
  ├── [path]         draw, draw_polygon, split_by
  ├── [placemark]    name_by, scale, zoom
  ├── [photo]        reference = absolute | absolute_path | relative | thumbnail
  ├── [description]  mode = none | static | custom | external
  └── [thumbnail]    border, border_color, quality

Run 'mapollage gen-config' to print a documented profile.")]
#[command(version = version_string())]
struct Cli {
    /// Profile file (stock defaults when missing)
    #[arg(long, default_value = "mapollage.toml", global = true)]
    profile: PathBuf,

    /// Log more (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Overrides for the profile's source and destination.
#[derive(clap::Args, Clone)]
struct PathArgs {
    /// Photo directory or single photo
    #[arg(long)]
    source: Option<PathBuf>,

    /// Output KML file
    #[arg(long)]
    dest: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Convert photos to KML
    Run(PathArgs),
    /// Validate the profile and list the files a run would read
    Check(PathArgs),
    /// Print a stock profile with all options documented
    GenConfig,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run(paths) => {
            let profile = resolve(&cli.profile, paths)?;
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_run_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let outcome = pipeline::run(
                &profile,
                &ExifReader::new(),
                &RustBackend::new(),
                &CancelToken::new(),
                Some(tx),
            );
            printer.join().ok();

            match outcome? {
                RunOutcome::Completed(report) => {
                    println!();
                    output::print_summary(&report.summary, &report.dest);
                }
                RunOutcome::Aborted { reason, summary } => {
                    eprintln!("{}", output::format_abort(&reason));
                    output::print_summary(&summary, &profile.dest);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Check(paths) => {
            let profile = resolve(&cli.profile, paths)?;
            println!("==> Checking {}", profile.source.dir.display());
            match scan::collect(&profile.source, &CancelToken::new())? {
                Collected::Complete(files) | Collected::Interrupted(files) => {
                    for file in &files {
                        println!("    {}", file.display());
                    }
                    println!("==> Profile is valid, {} files to read", files.len());
                }
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_profile_toml());
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Load the profile and apply command-line overrides.
fn resolve(path: &std::path::Path, paths: PathArgs) -> Result<config::Profile, config::ConfigError> {
    let mut profile = config::load_profile(path)?;
    if let Some(source) = paths.source {
        profile.source.dir = source;
    }
    if let Some(dest) = paths.dest {
        profile.dest = dest;
    }
    profile.validate()?;
    Ok(profile)
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mapollage={level}")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

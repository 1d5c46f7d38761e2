use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use gitlab_pkg_migrate::models::{PackageType, unique_package_types};
use gitlab_pkg_migrate::transfer::{PackageEntry, format_size};
use gitlab_pkg_migrate::{Config, TransferPipeline, TransferReport, init_tracing, run_migration};
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const BIN_NAME: &str = env!("CARGO_BIN_NAME");

#[derive(Parser, Debug)]
#[command(name = BIN_NAME)]
#[command(about = "Copy Maven and NuGet packages between GitLab package registries", long_about = None)]
#[command(version = VERSION)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Package type(s) to migrate, overrides migration.package_types
    #[arg(short = 't', long = "package-type", value_enum, global = true)]
    package_types: Vec<PackageTypeArg>,

    /// Color output mode (also respects NO_COLOR and FORCE_COLOR env vars)
    #[arg(
        long,
        visible_alias = "colour",
        value_enum,
        default_value = "auto",
        global = true
    )]
    color: ColorMode,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy package files from the source to the destination project (default)
    Migrate {
        /// Download and verify only, never upload
        #[arg(long, conflicts_with = "execute")]
        dry_run: bool,
        /// Upload to the destination, overrides migration.dry_run = true
        #[arg(long)]
        execute: bool,
        /// Compare MD5/SHA-256 digests of downloaded files
        #[arg(long)]
        verify_checksums: bool,
    },
    /// List the source project's packages and their files
    List,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PackageTypeArg {
    Maven,
    Nuget,
}

impl From<PackageTypeArg> for PackageType {
    fn from(arg: PackageTypeArg) -> Self {
        match arg {
            PackageTypeArg::Maven => PackageType::Maven,
            PackageTypeArg::Nuget => PackageType::Nuget,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorMode {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[tokio::main]
async fn main() {
    init_tracing();
    tracing::info!("{BIN_NAME} version {VERSION}");

    let args = Args::parse();
    configure_colors(args.color);

    let mut config = Config::load(args.config.as_deref()).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        process::exit(1);
    });

    if !args.package_types.is_empty() {
        config.migration.package_types =
            unique_package_types(args.package_types.iter().map(|&t| PackageType::from(t)));
    }

    match args.command.unwrap_or(Commands::Migrate {
        dry_run: false,
        execute: false,
        verify_checksums: false,
    }) {
        Commands::Migrate {
            dry_run,
            execute,
            verify_checksums,
        } => {
            if dry_run {
                config.migration.dry_run = true;
            } else if execute {
                config.migration.dry_run = false;
            }
            if verify_checksums {
                config.migration.verify_checksums = true;
            }
            run_migrate(&config).await;
        }
        Commands::List => run_list(&config).await,
    }
}

async fn run_migrate(config: &Config) {
    match run_migration(config).await {
        Ok(report) => print_summary(&report, config.migration.dry_run),
        Err(e) => {
            tracing::error!(error = %e, "Migration aborted");
            process::exit(1);
        }
    }
}

async fn run_list(config: &Config) {
    let entries = match TransferPipeline::new(config) {
        Ok(pipeline) => pipeline.inventory().await,
        Err(e) => Err(e),
    };

    match entries {
        Ok(entries) => print_packages_table(&entries),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list packages");
            process::exit(1);
        }
    }
}

fn configure_colors(mode: ColorMode) {
    // Check environment variables first (they take precedence)
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
        return;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        colored::control::set_override(true);
        return;
    }

    match mode {
        ColorMode::Auto => {}
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
    }
}

fn print_summary(report: &TransferReport, dry_run: bool) {
    println!("\n{}", "=".repeat(50));
    if dry_run {
        println!("{}", "Migration Summary (dry run)".bold());
    } else {
        println!("{}", "Migration Summary".bold());
    }
    println!("{}", "=".repeat(50));
    println!("  Packages:          {}", report.packages);
    println!("  Files:             {}", report.files);
    println!(
        "  Downloaded:        {}",
        format_size(report.bytes_downloaded).bright_black()
    );
    println!(
        "  Uploaded:          {}",
        report.uploaded.to_string().green()
    );
    if dry_run {
        println!(
            "  Skipped (dry run): {}",
            report.skipped_dry_run.to_string().yellow()
        );
    }
    let anomalies = report.anomalies.len().to_string();
    if report.anomalies.is_empty() {
        println!("  Anomalies:         {}", anomalies.green());
    } else {
        println!("  Anomalies:         {}", anomalies.red());
        for anomaly in &report.anomalies {
            println!("    - {anomaly}");
        }
    }
    println!("{}", "=".repeat(50));
    println!();
}

fn print_packages_table(entries: &[PackageEntry]) {
    if entries.is_empty() {
        println!("{}", "No packages found.".yellow());
        return;
    }

    let name_width = entries
        .iter()
        .map(|e| e.package.name.len())
        .max()
        .unwrap_or(4)
        .max(4);
    let version_width = entries
        .iter()
        .map(|e| e.package.version.len())
        .max()
        .unwrap_or(7)
        .max(7);

    println!(
        "{:>8}  {:name_width$}  {:version_width$}  {:5}  {:>5}  {:>10}",
        "ID".cyan().bold(),
        "NAME".cyan().bold(),
        "VERSION".cyan().bold(),
        "TYPE".cyan().bold(),
        "FILES".cyan().bold(),
        "SIZE".cyan().bold(),
    );
    println!(
        "{}",
        "-".repeat(8 + name_width + version_width + 5 + 5 + 10 + 10)
            .bright_black()
    );

    let mut total_files = 0;
    let mut total_size = 0;
    for entry in entries {
        let package = &entry.package;
        total_files += entry.files.len();
        total_size += entry.total_size();
        println!(
            "{:>8}  {:name_width$}  {:version_width$}  {:5}  {:>5}  {:>10}",
            package.id,
            package.name.green(),
            package.version.yellow(),
            package.package_type.as_path_segment(),
            entry.files.len(),
            format_size(entry.total_size()).bright_black(),
        );
    }

    println!();
    println!(
        "{} {} package(s), {} file(s), {}",
        "Total:".cyan().bold(),
        entries.len().to_string().yellow(),
        total_files,
        format_size(total_size)
    );
}

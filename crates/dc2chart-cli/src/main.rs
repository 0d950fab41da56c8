//! dc2chart CLI - Convert OpenShift DeploymentConfigs into Helm charts

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod error;
mod exit_codes;
mod logging;

use commands::convert::Overrides;

#[derive(Parser)]
#[command(name = "dc2chart")]
#[command(version)]
#[command(about = "Convert OpenShift DeploymentConfig manifests into Helm charts", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Configuration file (default: <config dir>/dc2chart/config.yaml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert manifests into one Helm chart per application
    Convert {
        /// Manifest file or directory of .yaml/.yml files
        input: PathBuf,

        /// Registry host prefixed to images derived from image-change triggers
        #[arg(long, env = "DC2CHART_REGISTRY")]
        registry: Option<String>,

        /// Directory the charts are written to
        #[arg(short, long, env = "DC2CHART_OUTPUT")]
        output: Option<PathBuf>,

        /// Keep each source document here, unmodified, as <name>_<kind>.yaml
        #[arg(long, env = "DC2CHART_WORK_DIR")]
        work_dir: Option<PathBuf>,

        /// Leave the image stream namespace out of derived images
        #[arg(long)]
        no_source_namespace: bool,

        /// Chart version (SemVer)
        #[arg(long)]
        chart_version: Option<String>,

        /// Chart appVersion
        #[arg(long)]
        app_version: Option<String>,

        /// Chart description
        #[arg(long)]
        description: Option<String>,

        /// Overwrite existing chart directories
        #[arg(long)]
        force: bool,

        /// Show what would be written without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Show informational notes too
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show how each document would be classified, without converting
    Inspect {
        /// Manifest file or directory of .yaml/.yml files
        input: PathBuf,
    },
}

fn main() {
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version come through here too
            let _ = err.print();
            let code = if err.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            std::process::exit(code);
        }
    };

    if let Err(err) = logging::setup_logging(cli.debug) {
        eprintln!("failed to set up logging: {err}");
    }

    let outcome = match cli.command {
        Commands::Convert {
            input,
            registry,
            output,
            work_dir,
            no_source_namespace,
            chart_version,
            app_version,
            description,
            force,
            dry_run,
            verbose,
        } => {
            let overrides = Overrides {
                registry,
                output,
                work_dir,
                no_source_namespace,
                chart_version,
                app_version,
                description,
                force,
                dry_run,
            };
            commands::convert::run(&input, cli.config.as_deref(), overrides, verbose)
        }

        Commands::Inspect { input } => commands::inspect::run(&input, cli.config.as_deref()),
    };

    let code = match outcome {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}

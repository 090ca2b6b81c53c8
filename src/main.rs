use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use covcheck::cli::{self, CheckOptions};
use covcheck::detect::ParserRegistry;

/// Multi-format coverage aggregation, patch coverage, and threshold checks
/// for CI.
#[derive(Parser)]
#[command(name = "covcheck", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse coverage reports, evaluate thresholds, and exit non-zero on a
    /// blocking failure.
    Check {
        /// Coverage report file (repeatable).
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,

        /// Override format detection (clover, cobertura, jacoco, lcov,
        /// istanbul, gocover, codecov).
        #[arg(long)]
        format: Option<String>,

        /// Unified diff to compute patch coverage against.
        #[arg(long)]
        diff_file: Option<PathBuf>,

        /// Prefix to prepend to diff paths when matching coverage paths.
        #[arg(long)]
        path_prefix: Option<String>,

        /// Base-branch results artifact (JSON) to compare against.
        #[arg(long)]
        base: Option<PathBuf>,

        /// JSON config file (status targets, ignore globs, comment mode).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the aggregated results artifact (JSON) here.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Name tag for this report.
        #[arg(long)]
        name: Option<String>,

        /// Flag tag for grouping (repeatable).
        #[arg(long = "flag")]
        flags: Vec<String>,

        /// Glob of paths to drop from results (repeatable).
        #[arg(long = "ignore")]
        ignore: Vec<String>,

        /// Skip files that fail to parse instead of aborting.
        #[arg(long)]
        skip_errors: bool,

        /// Project coverage target: a percentage or "auto".
        #[arg(long)]
        target: Option<String>,

        /// Allowed drop for an auto project target, e.g. "5%".
        #[arg(long)]
        threshold: Option<String>,

        /// Patch coverage target: a percentage or "auto".
        #[arg(long)]
        patch_target: Option<String>,

        /// Allowed drop for the patch check, e.g. "5%".
        #[arg(long)]
        patch_threshold: Option<String>,

        /// Report failures without failing the exit code.
        #[arg(long)]
        informational: bool,
    },

    /// Parse coverage reports and print aggregate totals.
    Summary {
        /// Coverage report files.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Override format detection.
        #[arg(long)]
        format: Option<String>,
    },

    /// Print the detected format of a coverage file.
    Detect {
        /// The file to sniff.
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let registry = ParserRegistry::new();

    match args.command {
        Commands::Check {
            files,
            format,
            diff_file,
            path_prefix,
            base,
            config,
            output,
            name,
            flags,
            ignore,
            skip_errors,
            target,
            threshold,
            patch_target,
            patch_threshold,
            informational,
        } => {
            let options = CheckOptions {
                files,
                format,
                diff_file,
                path_prefix,
                base_file: base,
                config_file: config,
                output_file: output,
                name,
                flags,
                ignore,
                skip_errors,
                target,
                threshold,
                patch_target,
                patch_threshold,
                informational,
            };
            let (out, failed) = cli::cmd_check(&registry, &options)?;
            print!("{out}");
            if failed {
                std::process::exit(1);
            }
        }
        Commands::Summary { files, format } => {
            print!("{}", cli::cmd_summary(&registry, &files, format.as_deref())?);
        }
        Commands::Detect { file } => {
            print!("{}", cli::cmd_detect(&registry, &file)?);
        }
    }

    Ok(())
}

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use kg_sweep::experiment::{ExperimentStore, RunConfig, RunFilter};
use kg_sweep::launcher::{DryRunRunner, Launcher, ProcessRunner, Runner, SweepReport};
use kg_sweep::results::{Dimension, ResultsTable};
use kg_sweep::sweep::{SweepConfig, SweepOverrides};

#[derive(Parser, Debug)]
#[command(name = "kg-sweep")]
#[command(about = "Grid-search training and evaluation driver for knowledge-graph embeddings")]
struct Cli {
    /// JSON sweep configuration; command-line options override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train every config of the grid that has no model yet
    Train {
        #[command(flatten)]
        sweep: SweepArgs,

        #[command(flatten)]
        launch: LaunchArgs,

        /// Arguments passed through to the trainer
        #[arg(last = true)]
        trainer_args: Vec<String>,
    },

    /// Train a single config from a dataset directory
    TrainOne {
        /// Dataset version directory; its last component is the version
        #[arg(long)]
        data_dir: PathBuf,

        /// Learning rate
        #[arg(long)]
        lr: f64,

        /// Batch size
        #[arg(long)]
        batch_size: u32,

        /// Epoch count
        #[arg(long)]
        epochs: u32,

        /// Directory holding one sub-directory per run
        #[arg(long)]
        output_root: Option<PathBuf>,

        #[command(flatten)]
        launch: LaunchArgs,

        /// Arguments passed through to the trainer
        #[arg(last = true)]
        trainer_args: Vec<String>,
    },

    /// Evaluate every finished run that has no metrics yet
    Eval {
        /// Directory holding one sub-directory per dataset version
        #[arg(long)]
        dataset_root: Option<PathBuf>,

        /// Directory holding one sub-directory per run
        #[arg(long)]
        output_root: Option<PathBuf>,

        #[command(flatten)]
        filter: FilterArgs,

        /// Stop at the first unsuccessful evaluation
        #[arg(long)]
        abort_on_failure: bool,

        #[command(flatten)]
        launch: LaunchArgs,
    },

    /// Aggregate run results into a CSV and print grouped counts
    Analyze {
        /// Directory holding one sub-directory per run
        #[arg(long)]
        output_root: Option<PathBuf>,

        #[command(flatten)]
        filter: FilterArgs,

        /// Directory the results CSV is written to
        #[arg(long, default_value = "results")]
        folder_out: PathBuf,
    },
}

#[derive(Args, Debug)]
struct SweepArgs {
    /// Directory holding one sub-directory per dataset version
    #[arg(long)]
    dataset_root: Option<PathBuf>,

    /// Directory holding one sub-directory per run
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Dataset versions (default: every version under the dataset root)
    #[arg(long, value_delimiter = ',')]
    versions: Option<Vec<String>>,

    /// Learning rates
    #[arg(long = "lr", value_delimiter = ',')]
    learning_rates: Option<Vec<f64>>,

    /// Epoch counts
    #[arg(long, value_delimiter = ',')]
    epochs: Option<Vec<u32>>,

    /// Batch sizes
    #[arg(long, value_delimiter = ',')]
    batch_sizes: Option<Vec<u32>>,

    /// Stop at the first unsuccessful training run
    #[arg(long)]
    abort_on_failure: bool,
}

#[derive(Args, Debug)]
struct LaunchArgs {
    /// Log the commands instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Write a JSON report of every launch
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Only consider runs whose name starts with this prefix
    #[arg(long)]
    prefix: Option<String>,

    /// Only consider runs whose name contains this substring (e.g. role_0)
    #[arg(long)]
    contains: Option<String>,
}

impl SweepArgs {
    fn into_overrides(self, trainer_args: Vec<String>) -> SweepOverrides {
        SweepOverrides {
            dataset_root: self.dataset_root,
            output_root: self.output_root,
            versions: self.versions,
            learning_rates: self.learning_rates,
            epochs: self.epochs,
            batch_sizes: self.batch_sizes,
            abort_on_failure: self.abort_on_failure,
            trainer_args,
        }
    }
}

impl FilterArgs {
    fn to_filter(&self) -> RunFilter {
        RunFilter::new()
            .with_prefix(self.prefix.clone().unwrap_or_default())
            .with_contains(self.contains.clone().unwrap_or_default())
    }
}

impl LaunchArgs {
    fn runner(&self) -> Box<dyn Runner> {
        if self.dry_run {
            Box::new(DryRunRunner)
        } else {
            Box::new(ProcessRunner)
        }
    }

    /// Log and write the report, then fail if the sweep was aborted.
    fn finish(&self, report: &SweepReport) -> Result<()> {
        info!(
            launched = report.launched.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped.len(),
            invalid = report.invalid.len(),
            aborted = report.aborted,
            "done"
        );
        if let Some(path) = &self.report {
            report
                .write_json(path)
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!(path = %path.display(), "wrote report");
        }
        report.check()?;
        Ok(())
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>, overrides: SweepOverrides) -> Result<SweepConfig> {
    let config = SweepConfig::load(path).context("loading sweep config")?;
    Ok(config.with_overrides(overrides))
}

/// Config for `train-one`, checked the same way a sweep grid is.
fn run_config_for(data_dir: &Path, lr: f64, batch_size: u32, epochs: u32) -> Result<RunConfig> {
    let Some(version) = data_dir.file_name().and_then(|v| v.to_str()) else {
        bail!("cannot take a dataset version from {}", data_dir.display());
    };
    if !data_dir.is_dir() {
        bail!("dataset directory {} does not exist", data_dir.display());
    }
    let run = RunConfig::new(version, lr, batch_size, epochs);
    run.validate()?;
    Ok(run)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Train {
            sweep,
            launch,
            trainer_args,
        } => {
            let config = load_config(cli.config.as_deref(), sweep.into_overrides(trainer_args))?;
            let grid = config.resolve()?;

            let store = ExperimentStore::new(&config.output_root);
            let mut launcher = Launcher::new(launch.runner(), store, &config.dataset_root)
                .abort_on_failure(config.abort_on_failure);
            let report = launcher.train_sweep(&grid, &config.trainer)?;
            launch.finish(&report)
        }

        Commands::TrainOne {
            data_dir,
            lr,
            batch_size,
            epochs,
            output_root,
            launch,
            trainer_args,
        } => {
            let run = run_config_for(&data_dir, lr, batch_size, epochs)?;
            let dataset_root = data_dir.parent().unwrap_or_else(|| Path::new("."));

            let config = load_config(
                cli.config.as_deref(),
                SweepOverrides {
                    output_root,
                    trainer_args,
                    ..SweepOverrides::default()
                },
            )?;

            let store = ExperimentStore::new(&config.output_root);
            let mut launcher = Launcher::new(launch.runner(), store, dataset_root);
            let record = launcher.train(&run, &config.trainer)?;
            launch.finish(&SweepReport {
                launched: vec![record],
                ..SweepReport::default()
            })
        }

        Commands::Eval {
            dataset_root,
            output_root,
            filter,
            abort_on_failure,
            launch,
        } => {
            let config = load_config(
                cli.config.as_deref(),
                SweepOverrides {
                    dataset_root,
                    output_root,
                    abort_on_failure,
                    ..SweepOverrides::default()
                },
            )?;

            let store = ExperimentStore::new(&config.output_root);
            let mut launcher = Launcher::new(launch.runner(), store, &config.dataset_root)
                .abort_on_failure(config.abort_on_failure);
            let report = launcher
                .eval_sweep(&filter.to_filter(), &config.evaluator)
                .with_context(|| {
                    format!("evaluating runs under {}", config.output_root.display())
                })?;
            launch.finish(&report)
        }

        Commands::Analyze {
            output_root,
            filter,
            folder_out,
        } => {
            let config = load_config(
                cli.config.as_deref(),
                SweepOverrides {
                    output_root,
                    ..SweepOverrides::default()
                },
            )?;

            let store = ExperimentStore::new(&config.output_root);
            let table = ResultsTable::aggregate(&store, &filter.to_filter())
                .with_context(|| format!("scanning {}", config.output_root.display()))?;

            println!("{}", table.format_group_counts(&Dimension::ALL)?);
            println!(
                "{} runs, {} finished, {} with metrics, {} skipped",
                table.len(),
                table.finished_count(),
                table.evaluated_count(),
                table.skipped().len()
            );
            for skipped in table.skipped() {
                println!("  skipped {}: {}", skipped.name, skipped.reason);
            }

            let path = folder_out.join("results.csv");
            table
                .write_csv(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_train_splits_comma_separated_lists() {
        let cli = Cli::try_parse_from([
            "kg-sweep",
            "train",
            "--versions",
            "v1,v2",
            "--lr",
            "1e-5,3e-5",
            "--epochs",
            "1",
            "--epochs",
            "10,50",
            "--batch-sizes",
            "256,512,1024",
            "--",
            "--seed",
            "7",
        ])
        .unwrap();

        match cli.command {
            Commands::Train {
                sweep,
                launch,
                trainer_args,
            } => {
                let overrides = sweep.into_overrides(trainer_args);
                assert_eq!(overrides.versions, Some(vec!["v1".into(), "v2".into()]));
                assert_eq!(overrides.learning_rates, Some(vec![1e-5, 3e-5]));
                assert_eq!(overrides.epochs, Some(vec![1, 10, 50]));
                assert_eq!(overrides.batch_sizes, Some(vec![256, 512, 1024]));
                assert_eq!(overrides.trainer_args, ["--seed", "7"]);
                assert!(!overrides.abort_on_failure);
                assert!(!launch.dry_run);
            }
            other => panic!("expected the train subcommand, got {other:?}"),
        }
    }

    #[test]
    fn test_train_without_lists_keeps_configured_values() {
        let cli = Cli::try_parse_from(["kg-sweep", "train", "--dry-run"]).unwrap();
        match cli.command {
            Commands::Train {
                sweep,
                launch,
                trainer_args,
            } => {
                let overrides = sweep.into_overrides(trainer_args);
                assert_eq!(overrides, SweepOverrides::default());
                assert!(launch.dry_run);
            }
            other => panic!("expected the train subcommand, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_list_entry_rejected() {
        for args in [
            ["kg-sweep", "train", "--batch-sizes", "256,x"],
            ["kg-sweep", "train", "--lr", "1e-5,,3e-5"],
            ["kg-sweep", "train", "--epochs", "-1"],
        ] {
            assert!(Cli::try_parse_from(args).is_err(), "{args:?}");
        }
    }

    #[test]
    fn test_train_one_rejects_unusable_values() {
        let root = tempfile::tempdir().unwrap();
        let data_dir = root.path().join("v1");
        std::fs::create_dir(&data_dir).unwrap();

        let run = run_config_for(&data_dir, 1e-5, 256, 10).unwrap();
        assert_eq!(run.run_name().as_str(), "v1_lr1e-05_bs256_ep10");

        for (lr, batch_size, epochs) in [(0.0, 256, 10), (f64::NAN, 256, 10), (1e-5, 0, 10)] {
            assert!(run_config_for(&data_dir, lr, batch_size, epochs).is_err());
        }
        assert!(run_config_for(&data_dir, 1e-5, 256, 0).is_err());
        let absent = root.path().join("absent");
        assert!(run_config_for(&absent, 1e-5, 256, 10).is_err());
    }
}

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{info, warn, LevelFilter};
use seg_prep::{
    pipeline, Config, Decider, FixedDecider, InterruptPolicy, SessionOutcome, StdinDecider,
    TrainingSession,
};
use std::{
    env,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

#[derive(Debug, Clone, Parser)]
/// Prepare tiled microscopy datasets and training sessions
struct Args {
    /// parameter file
    #[clap(long, value_name = "FILE", default_value = "params.json5")]
    pub config: PathBuf,
    /// preprocess images, enter `all` or a dataset name
    #[clap(long, value_name = "DATASET", conflicts_with = "train")]
    pub prep: Option<String>,
    /// set up a training session on a tiled dataset
    #[clap(long, value_name = "DATASET")]
    pub train: Option<String>,
    /// number of folds for k-fold cross-validation
    #[clap(long, value_name = "NUM_FOLDS", default_value = "1")]
    pub kfold: usize,
    /// overwrite existing output directories without asking
    #[clap(long, conflicts_with = "no")]
    pub yes: bool,
    /// keep existing output directories without asking
    #[clap(long)]
    pub no: bool,
    /// exit with an error when training setup is interrupted
    #[clap(long)]
    pub fail_on_interrupt: bool,
    /// verbose output
    #[clap(short, long)]
    pub verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match (&args.prep, &args.train) {
        (Some(dataset), _) => prep(&args, dataset)?,
        (None, Some(dataset)) => train(&args, dataset)?,
        (None, None) => {
            Args::command().print_help()?;
            println!();
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = pretty_env_logger::formatted_builder();
    builder
        .filter_level(LevelFilter::Warn)
        .filter_module("seg_prep", level)
        .filter_module("seg_tool", level);
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn load_config(args: &Args) -> Result<Config> {
    Config::open(&args.config).with_context(|| {
        format!(
            "failed to load config file '{}'",
            args.config.display()
        )
    })
}

fn prep(args: &Args, dataset: &str) -> Result<()> {
    let config = load_config(args)?.prep(args.verbose)?;

    let mut decider: Box<dyn Decider> = match (args.yes, args.no) {
        (true, _) => Box::new(FixedDecider(true)),
        (_, true) => Box::new(FixedDecider(false)),
        _ => Box::new(StdinDecider),
    };

    let reports = pipeline::run(&config, dataset, decider.as_mut())
        .with_context(|| format!("failed to preprocess '{}'", dataset))?;
    let tiles: usize = reports.iter().map(|report| report.tiles()).sum();
    info!("{} dataset(s) done, {} tile(s) written", reports.len(), tiles);

    Ok(())
}

fn train(args: &Args, dataset: &str) -> Result<()> {
    let config = load_config(args)?.train(args.verbose)?;

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))
            .context("failed to install the Ctrl-C handler")?;
    }

    let policy = if args.fail_on_interrupt {
        InterruptPolicy::Propagate
    } else {
        InterruptPolicy::Absorb
    };

    let outcome = TrainingSession::new(&config)
        .interrupt_flag(interrupted)
        .interrupt_policy(policy)
        .start(dataset, args.kfold)
        .with_context(|| format!("failed to set up training on '{}'", dataset))?;

    match outcome {
        SessionOutcome::Ready(checkpoint) => {
            info!(
                "hand over '{}' to the training loop ({} epochs, batch size {}, learning rate {})",
                checkpoint.dir.display(),
                config.hyper.epochs,
                config.hyper.batch_size,
                config.hyper.learning_rate
            );
            println!("{}", checkpoint.dir.display());
        }
        SessionOutcome::Interrupted => warn!("training setup was interrupted"),
    }

    Ok(())
}

//! Headless training run.
//!
//! Usage:
//!   train-field [OPTIONS]
//!
//! Examples:
//!   # Moons with Adam until the loss drops below 0.05
//!   train-field --dataset moons --optimizer adam --lr 0.02 --target-loss 0.05
//!
//!   # Start from a JSON config and print the learned field
//!   train-field --config run.json --field
//!
//!   # Print the effective config as JSON
//!   train-field --optimizer momentum --dump-config

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use boundary_mlp::shader::{self, DEFAULT_RESOLUTION};
use boundary_mlp::{
    DatasetKind, OptimizerKind, Scene, SceneSettings, Topology, TrainerConfig,
};

#[derive(Parser)]
#[command(name = "train-field")]
#[command(about = "Train the 2-H1-H2-2 classifier on a toy dataset and report the decision field")]
#[command(version)]
struct Args {
    /// JSON trainer config; flags below override its fields
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Dataset layout (blobs, circles, moons, xor, spirals)
    #[arg(short = 'd', long, default_value = "blobs")]
    dataset: String,

    /// Number of points
    #[arg(short = 'n', long, default_value = "1000")]
    points: usize,

    /// Blob radius or noise amplitude
    #[arg(long, default_value = "0.25")]
    spread: f32,

    /// Optimizer (sgd, momentum, adam)
    #[arg(short = 'o', long)]
    optimizer: Option<String>,

    /// Learning rate
    #[arg(short = 'l', long)]
    lr: Option<f32>,

    /// Batch size
    #[arg(short = 'b', long)]
    batch_size: Option<usize>,

    /// First hidden layer width
    #[arg(long)]
    hidden1: Option<usize>,

    /// Second hidden layer width
    #[arg(long)]
    hidden2: Option<usize>,

    /// Stop after this many steps (0 = no bound)
    #[arg(long)]
    max_steps: Option<u64>,

    /// Stop once the batch loss is at or below this value
    #[arg(long)]
    target_loss: Option<f32>,

    /// Ignore the target loss
    #[arg(long)]
    no_target: bool,

    /// Seed for parameter init and dataset generation
    #[arg(short = 's', long)]
    seed: Option<u64>,

    /// Log every N steps
    #[arg(long, default_value = "100")]
    log_every: u64,

    /// Print the learned decision field as text
    #[arg(long)]
    field: bool,

    /// Print the effective config as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

fn parse_dataset(s: &str) -> anyhow::Result<DatasetKind> {
    match s.to_lowercase().as_str() {
        "blobs" | "two-blobs" => Ok(DatasetKind::TwoBlobs),
        "circles" => Ok(DatasetKind::ConcentricCircles),
        "moons" | "two-moons" => Ok(DatasetKind::TwoMoons),
        "xor" => Ok(DatasetKind::XorQuads),
        "spirals" => Ok(DatasetKind::Spirals),
        _ => anyhow::bail!("Unknown dataset: {}. Use blobs, circles, moons, xor or spirals", s),
    }
}

fn parse_optimizer(s: &str) -> anyhow::Result<OptimizerKind> {
    match s.to_lowercase().as_str() {
        "sgd" => Ok(OptimizerKind::Sgd),
        "momentum" => Ok(OptimizerKind::Momentum),
        "adam" => Ok(OptimizerKind::Adam),
        _ => anyhow::bail!("Unknown optimizer: {}. Use sgd, momentum or adam", s),
    }
}

fn build_config(args: &Args) -> anyhow::Result<TrainerConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            TrainerConfig::from_json_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => TrainerConfig::default(),
    };

    if let Some(kind) = &args.optimizer {
        cfg.optimizer.kind = parse_optimizer(kind)?;
    }
    if let Some(lr) = args.lr {
        cfg.optimizer = cfg.optimizer.with_lr(lr);
    }
    if let Some(batch_size) = args.batch_size {
        cfg.batch_size = batch_size;
    }
    let hidden1 = args.hidden1.unwrap_or(cfg.topology.hidden1);
    let hidden2 = args.hidden2.unwrap_or(cfg.topology.hidden2);
    cfg.topology = Topology::new(hidden1, hidden2);
    if let Some(steps) = args.max_steps {
        cfg.auto_max_steps = steps;
    }
    if let Some(target) = args.target_loss {
        cfg.target_loss = target;
        cfg.target_loss_enabled = true;
    }
    if args.no_target {
        cfg.target_loss_enabled = false;
    }
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }
    Ok(cfg.clamped())
}

fn print_field(scene: &Scene) {
    const SHADES: [char; 5] = ['#', '+', '.', '-', 'o'];
    let res = DEFAULT_RESOLUTION / 2;
    let probs = shader::decision_grid(scene.trainer().network(), res);
    // Top row is y = +1.
    for j in (0..res).rev() {
        let line: String = probs[j * res..(j + 1) * res]
            .iter()
            .map(|&p| {
                let idx = ((p * SHADES.len() as f32) as usize).min(SHADES.len() - 1);
                SHADES[idx]
            })
            .collect();
        println!("{line}");
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = build_config(&args)?;
    if args.dump_config {
        println!("{}", cfg.to_json_string_pretty()?);
        return Ok(());
    }
    if cfg.auto_max_steps == 0 && !cfg.target_loss_enabled {
        anyhow::bail!("no stopping condition: set --max-steps or --target-loss");
    }

    let kind = parse_dataset(&args.dataset)?;
    let settings = SceneSettings {
        dataset_kind: kind,
        num_points: args.points,
        spread: args.spread,
        ..SceneSettings::default()
    };
    let mut scene = Scene::new(cfg, settings);

    info!(
        dataset = kind.name(),
        points = scene.dataset().len(),
        optimizer = cfg.optimizer.kind.name(),
        lr = cfg.optimizer.lr,
        batch_size = cfg.batch_size,
        hidden1 = cfg.topology.hidden1,
        hidden2 = cfg.topology.hidden2,
        "starting training"
    );

    scene.set_auto_train(true);
    while scene.is_auto_training() {
        scene.tick();
        let step = scene.step_count();
        if args.log_every > 0 && step % args.log_every == 0 {
            info!(
                step,
                loss = scene.last_loss(),
                accuracy = scene.last_accuracy(),
                "progress"
            );
        }
    }

    println!(
        "steps={} loss={:.5} accuracy={:.3}",
        scene.step_count(),
        scene.last_loss(),
        scene.last_accuracy()
    );
    if args.field {
        print_field(&scene);
    }
    Ok(())
}

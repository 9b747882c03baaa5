use causal_attention::{AttentionConfig, Batch, CausalSelfAttention, Matrix};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run causal self-attention over a small example batch and print the
/// context vectors.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON attention config; defaults to input_dim 3, output_dim 2, context_length 6
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for projection init and for dropout in --train mode
    #[arg(long, default_value_t = 123)]
    seed: u64,

    #[arg(long)]
    dropout: Option<f32>,

    #[arg(long)]
    qkv_bias: bool,

    /// Use random inputs instead of the six-token example
    #[arg(long)]
    random: bool,

    /// Apply dropout to the attention weights
    #[arg(long)]
    train: bool,

    #[arg(long)]
    show_weights: bool,
}

// "Your journey starts with one step"
const JOURNEY: [[f32; 3]; 6] = [
    [0.43, 0.15, 0.89],
    [0.55, 0.87, 0.66],
    [0.57, 0.85, 0.64],
    [0.22, 0.58, 0.33],
    [0.77, 0.25, 0.10],
    [0.05, 0.80, 0.55],
];

fn example_batch(
    config: &AttentionConfig,
    random: bool,
    rng: &mut StdRng,
) -> Result<Batch, Box<dyn std::error::Error>> {
    let sequence: Vec<Vec<f32>> = if random || config.input_dim != 3 {
        let seq_len = config.context_length.min(JOURNEY.len());
        (0..seq_len)
            .map(|_| {
                (0..config.input_dim)
                    .map(|_| rng.gen_range(0.0..1.0))
                    .collect()
            })
            .collect()
    } else {
        JOURNEY
            .iter()
            .take(config.context_length)
            .map(|row| row.to_vec())
            .collect()
    };
    let tokens = Matrix::from_rows(&sequence)?;
    Ok(Batch::new(vec![tokens.clone(), tokens])?)
}

fn print_batch(label: &str, batch: &Batch) {
    for (b, item) in batch.iter().enumerate() {
        println!("{label}[{b}]:");
        for row in item.to_rows() {
            let cells: Vec<String> = row.iter().map(|v| format!("{v:>8.4}")).collect();
            println!("  [{}]", cells.join(", "));
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => AttentionConfig::from_json_file(path)?,
        None => AttentionConfig::default(),
    };
    config.seed = Some(config.seed.unwrap_or(args.seed));
    if let Some(p) = args.dropout {
        config.dropout = p;
    }
    config.qkv_bias |= args.qkv_bias;

    let attn = CausalSelfAttention::new(config)?;
    let mut rng = StdRng::seed_from_u64(args.seed);
    let batch = example_batch(attn.config(), args.random, &mut rng)?;
    info!(shape = ?batch.shape(), train = args.train, "running attention");

    if args.train {
        let context = attn.forward_train(&batch, &mut rng)?;
        print_batch("context", &context);
    } else {
        let output = attn.forward_with_weights(&batch)?;
        if args.show_weights {
            print_batch("weights", &output.weights);
        }
        print_batch("context", &output.context);
    }
    info!(shape = ?batch.shape(), "done");
    Ok(())
}

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dh_chain::{Chain, ChainBuilder, ChainConfig, LengthTable, kinematics_ini, load_dh_rows};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dh-chain")]
#[command(about = "Build a robot arm kinematic chain from length and DH tables")]
struct Cli {
    /// CSV of link lengths: header, then `name,millimeters` rows
    #[arg(long)]
    lengths: PathBuf,

    /// CSV of DH parameters: header, then `segment,offset,d,a,alpha` rows
    #[arg(long)]
    dh: PathBuf,

    /// TOML chain configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Summary)]
    format: Format,

    /// Write the output to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Summary,
    Json,
    Ini,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ChainConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ChainConfig::default(),
    };

    let lengths = LengthTable::from_path_scaled(&cli.lengths, config.length_divisor)
        .with_context(|| format!("loading lengths {}", cli.lengths.display()))?;
    let rows = load_dh_rows(&cli.dh)
        .with_context(|| format!("loading DH table {}", cli.dh.display()))?;

    let builder = ChainBuilder::new(config)?;
    let chain = builder.build_chain(&lengths, &rows)?;

    let rendered = match cli.format {
        Format::Summary => summary(&chain),
        Format::Json => serde_json::to_string_pretty(&chain)?,
        Format::Ini => kinematics_ini(&chain)?,
    };

    match &cli.output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}

fn summary(chain: &Chain) -> String {
    let mut out = format!(
        "chain: {} segments, {} joints\n",
        chain.segment_count(),
        chain.joint_count()
    );
    for (i, segment) in chain.iter().enumerate() {
        let t = segment.tip.translation;
        let line = match segment.dh {
            Some(dh) => format!(
                "{i:>3} {:<12} {:<6} a={:.6} alpha={:.6} d={:.6} offset={:.6}\n",
                segment.name,
                segment.joint.kinematic_name(),
                dh.a,
                dh.alpha,
                dh.d,
                dh.theta
            ),
            None => format!(
                "{i:>3} {:<12} {:<6} xyz=({:.6}, {:.6}, {:.6})\n",
                segment.name,
                segment.joint.kinematic_name(),
                t.x,
                t.y,
                t.z
            ),
        };
        out.push_str(&line);
    }
    out
}

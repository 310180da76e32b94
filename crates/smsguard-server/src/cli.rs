use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "smsguard-server")]
#[command(author, version, about = "Spam/ham inference API and batch upload UI", long_about = None)]
pub struct Cli {
    /// Server configuration file (optional; defaults apply when missing)
    #[arg(short, long, default_value = "smsguard.yaml")]
    pub config: String,

    /// Model registry file (YAML or JSON)
    #[arg(short, long, env = "SMSGUARD_REGISTRY")]
    pub registry: Option<PathBuf>,

    /// Directory batch result files are written to
    #[arg(long)]
    pub results_dir: Option<PathBuf>,

    /// Directory of static UI files to serve at /
    #[arg(long)]
    pub frontend_dir: Option<PathBuf>,

    /// Load a model at startup instead of on first request (repeatable)
    #[arg(long = "preload", value_name = "MODEL_ID")]
    pub preload: Vec<String>,

    /// Listen address
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

mod config;
mod domain;
mod error;
mod run;

use clap::Parser;
use config::{Effective, SimArgs};

#[derive(Parser)]
#[command(name = "sensor-sim", about = "Posts simulated wearable sensor segments to the relay")]
struct Cli {
    #[command(flatten)]
    args: SimArgs,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let eff = match Effective::new(&cli.args) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run::run(&eff).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

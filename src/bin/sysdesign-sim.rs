use std::sync::Arc;
use std::time::Duration;

use sysdesign_sim::catalog::Catalog;
use sysdesign_sim::challenges;
use sysdesign_sim::config::{self, Command, FormatArg, RunArgs};
use sysdesign_sim::engine::Simulator;
use sysdesign_sim::error::Result;
use sysdesign_sim::faults;
use sysdesign_sim::feedback::provider_from_config;
use sysdesign_sim::output::{
    render_challenges, render_components, render_faults, render_scenario, Formatter,
    HumanFormatter, JsonFormatter, SummaryFormatter,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = config::parse_args()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Run(args) => run_scenario(args).await?,
        Command::ShowConfig(args) => {
            let scenario = config::load_scenario(&args)?;
            print!("{}", render_scenario(&scenario));
        }
        Command::ListComponents => print!("{}", render_components(&Catalog::standard())),
        Command::ListFaults => print!("{}", render_faults(&faults::presets())),
        Command::ListChallenges => print!("{}", render_challenges(&challenges::builtin())),
    }

    Ok(())
}

async fn run_scenario(args: RunArgs) -> Result<()> {
    let scenario = config::load_scenario(&args.scenario)?;
    let mut simulator = Simulator::new(Arc::new(Catalog::standard()))
        .with_policy(scenario.scoring.clone())
        .with_latency_model(scenario.latency_model);
    if !args.no_feedback {
        if let Some(provider) = provider_from_config(&scenario.feedback)? {
            simulator = simulator
                .with_feedback(provider, Duration::from_millis(scenario.feedback.timeout_ms));
        }
    }

    let result = simulator
        .simulate(&scenario.challenge, &scenario.design)
        .await;
    let formatter = formatter_for(&args.format);
    print!("{}", formatter.write(&result));

    Ok(())
}

fn formatter_for(format: &FormatArg) -> Box<dyn Formatter> {
    match format {
        FormatArg::Human => Box::new(HumanFormatter),
        FormatArg::Summary => Box::new(SummaryFormatter),
        FormatArg::Json => Box::new(JsonFormatter),
    }
}

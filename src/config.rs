use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::challenges;
use crate::error::{Error, Result};
use crate::faults::{find_preset, validate_event};
use crate::models::{
    Challenge, ChallengeRef, Design, FaultEvent, FaultRef, FeedbackConfig, LatencyModel,
    PlacedComponent, ScenarioConfig, Sla, TrafficProfile,
};
use crate::scoring::ScoringPolicy;

#[derive(Parser, Debug)]
#[command(
    name = "sysdesign-sim",
    about = "Score a system design against a challenge's SLA, budget and requirements"
)]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. info, sysdesign_sim=debug).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate a design and print its metrics and score.
    Run(RunArgs),
    /// Print the resolved scenario without simulating it.
    ShowConfig(ScenarioArgs),
    ListComponents,
    ListFaults,
    ListChallenges,
}

#[derive(Args, Debug, Clone)]
pub struct ScenarioArgs {
    #[arg(long)]
    pub config: PathBuf,
    /// Built-in challenge id; replaces the one in the config file.
    #[arg(long)]
    pub challenge: Option<String>,
    /// Fault preset to activate after the ones in the config file. Repeatable.
    #[arg(long = "fault")]
    pub faults: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,
    #[arg(long, value_enum, default_value_t = FormatArg::Human)]
    pub format: FormatArg,
    /// Skip the supplementary feedback provider; the local summary is still attached.
    #[arg(long)]
    pub no_feedback: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Human,
    Summary,
    Json,
}

/// A fully resolved and validated run.
#[derive(Clone, Debug)]
pub struct Scenario {
    pub challenge: Challenge,
    pub design: Design,
    pub latency_model: LatencyModel,
    pub scoring: ScoringPolicy,
    pub feedback: FeedbackConfig,
}

pub fn parse_args() -> Result<Cli> {
    Cli::try_parse().map_err(|err| Error::Cli(err.to_string()))
}

pub fn load_config(path: &Path) -> Result<ScenarioConfig> {
    let contents = fs::read_to_string(path).map_err(|err| {
        Error::ConfigIo(format!(
            "failed to read config '{}': {}",
            path.display(),
            err
        ))
    })?;
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .unwrap_or("");

    match ext {
        "toml" => toml::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse TOML: {}", err))),
        "json" => serde_json::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse JSON: {}", err))),
        "" => Err(Error::UnsupportedConfigFormat("unknown".to_string())),
        _ => Err(Error::UnsupportedConfigFormat(ext.to_string())),
    }
}

pub fn load_scenario(args: &ScenarioArgs) -> Result<Scenario> {
    let config = load_config(&args.config)?;
    build_scenario(config, args)
}

/// Resolves references, applies CLI overrides and validates the result.
pub fn build_scenario(config: ScenarioConfig, args: &ScenarioArgs) -> Result<Scenario> {
    let challenge_ref = match &args.challenge {
        Some(id) => Some(ChallengeRef::Builtin(id.clone())),
        None => config.challenge,
    };
    let challenge = match challenge_ref {
        Some(ChallengeRef::Builtin(id)) => {
            challenges::find(&id).ok_or(Error::UnknownChallenge(id))?
        }
        Some(ChallengeRef::Inline(challenge)) => challenge,
        None => return Err(Error::MissingChallenge),
    };

    let mut active_faults = Vec::with_capacity(config.faults.len() + args.faults.len());
    let cli_faults = args.faults.iter().cloned().map(FaultRef::Preset);
    for fault in config.faults.into_iter().chain(cli_faults) {
        active_faults.push(resolve_fault(fault)?);
    }

    let scenario = Scenario {
        challenge,
        design: Design {
            components: config.components,
            connections: config.connections,
            active_faults,
            traffic: config.traffic,
        },
        latency_model: config.latency_model,
        scoring: config.scoring,
        feedback: config.feedback,
    };
    validate_scenario(&scenario)?;
    Ok(scenario)
}

fn resolve_fault(fault: FaultRef) -> Result<FaultEvent> {
    match fault {
        FaultRef::Preset(id) => find_preset(&id).ok_or(Error::UnknownFault(id)),
        FaultRef::Custom(event) => Ok(event),
    }
}

pub fn validate_scenario(scenario: &Scenario) -> Result<()> {
    validate_challenge(&scenario.challenge)?;
    if let Some(traffic) = &scenario.design.traffic {
        validate_traffic(traffic)?;
    }
    validate_components(&scenario.design.components)?;
    validate_policy(&scenario.scoring)?;
    for event in &scenario.design.active_faults {
        validate_event(event).map_err(|reason| Error::InvalidFault {
            id: event.id.clone(),
            reason,
        })?;
    }
    Ok(())
}

pub fn validate_challenge(challenge: &Challenge) -> Result<()> {
    validate_traffic(&challenge.traffic)?;
    validate_sla(&challenge.sla)?;
    if !(challenge.budget >= 0.0) {
        return Err(Error::InvalidBudget(challenge.budget));
    }
    Ok(())
}

pub fn validate_traffic(traffic: &TrafficProfile) -> Result<()> {
    if !(traffic.rps >= 0.0) {
        return Err(Error::InvalidTraffic(format!(
            "rps must be >= 0 (got {})",
            traffic.rps
        )));
    }
    if !(0.0..=1.0).contains(&traffic.read_ratio) {
        return Err(Error::InvalidTraffic(format!(
            "read_ratio must be within [0, 1] (got {})",
            traffic.read_ratio
        )));
    }
    if !(traffic.payload_size >= 0.0) {
        return Err(Error::InvalidTraffic(format!(
            "payload_size must be >= 0 (got {})",
            traffic.payload_size
        )));
    }
    if !(traffic.peak_multiplier >= 1.0) {
        return Err(Error::InvalidTraffic(format!(
            "peak_multiplier must be >= 1 (got {})",
            traffic.peak_multiplier
        )));
    }
    Ok(())
}

pub fn validate_sla(sla: &Sla) -> Result<()> {
    if !(sla.max_latency > 0.0) {
        return Err(Error::InvalidSla(format!(
            "max_latency must be > 0 (got {})",
            sla.max_latency
        )));
    }
    if !(0.0..=1.0).contains(&sla.min_availability) {
        return Err(Error::InvalidSla(format!(
            "min_availability must be within [0, 1] (got {})",
            sla.min_availability
        )));
    }
    Ok(())
}

/// Ids must be non-empty and unique, and an explicit `replicas` must be a finite number >= 1.
/// Unknown type ids are left to the design audit.
pub fn validate_components(components: &[PlacedComponent]) -> Result<()> {
    let mut seen = HashSet::new();
    for component in components {
        if component.id.trim().is_empty() {
            return Err(Error::EmptyComponentId);
        }
        if !seen.insert(component.id.as_str()) {
            return Err(Error::DuplicateComponentId(component.id.clone()));
        }
        if let Some(replicas) = component.params.number("replicas") {
            if !(replicas.is_finite() && replicas >= 1.0) {
                return Err(Error::InvalidComponent {
                    id: component.id.clone(),
                    reason: format!("replicas must be >= 1 (got {})", replicas),
                });
            }
        }
    }
    Ok(())
}

/// Largest value any single rubric weight may take.
pub const MAX_SCORING_WEIGHT: i32 = 1_000;

/// Every weight must lie within `0..=MAX_SCORING_WEIGHT`; penalties are written as positive
/// amounts.
pub fn validate_policy(policy: &ScoringPolicy) -> Result<()> {
    for (name, value) in policy.weights() {
        if !(0..=MAX_SCORING_WEIGHT).contains(&value) {
            return Err(Error::InvalidScoring(format!(
                "{} must be within [0, {}] (got {})",
                name, MAX_SCORING_WEIGHT, value
            )));
        }
    }
    Ok(())
}

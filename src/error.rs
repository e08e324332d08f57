use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no challenge selected: set 'challenge' in the config or pass --challenge")]
    MissingChallenge,
    #[error("unknown challenge '{0}'")]
    UnknownChallenge(String),
    #[error("unknown fault event '{0}'")]
    UnknownFault(String),
    #[error("duplicate component id '{0}'")]
    DuplicateComponentId(String),
    #[error("component id must not be empty")]
    EmptyComponentId,
    #[error("duplicate component type '{0}' in catalog")]
    DuplicateComponentType(String),
    #[error("invalid traffic profile: {0}")]
    InvalidTraffic(String),
    #[error("invalid SLA: {0}")]
    InvalidSla(String),
    #[error("budget must be >= 0 (got {0})")]
    InvalidBudget(f64),
    #[error("invalid scoring policy: {0}")]
    InvalidScoring(String),
    #[error("invalid component '{id}': {reason}")]
    InvalidComponent { id: String, reason: String },
    #[error("invalid fault event '{id}': {reason}")]
    InvalidFault { id: String, reason: String },
    #[error("feedback provider 'http' requires an endpoint")]
    MissingFeedbackEndpoint,
    #[error("failed to build feedback client: {0}")]
    FeedbackClient(String),
    #[error("{0}")]
    ConfigIo(String),
    #[error("{0}")]
    ConfigParse(String),
    #[error("unsupported config format '{0}'")]
    UnsupportedConfigFormat(String),
    #[error("{0}")]
    Cli(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the supplementary feedback collaborator. None of these are fatal to a simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedbackError {
    #[error("feedback credentials are not configured")]
    MissingCredentials,
    #[error("feedback request budget exhausted ({0} requests)")]
    RateLimited(u32),
    #[error("feedback skipped: {0}")]
    Skipped(String),
    #[error("feedback timed out after {0}ms")]
    Timeout(u64),
    #[error("feedback transport error: {0}")]
    Transport(String),
    #[error("feedback service returned status {0}")]
    Status(u16),
    #[error("malformed feedback response: {0}")]
    Malformed(String),
}

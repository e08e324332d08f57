use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::scoring::ScoringPolicy;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ComponentCategory {
    Edge,
    App,
    Storage,
    Integration,
    Search,
    Cdn,
    Security,
    Monitoring,
    Ai,
    Gaming,
}

impl fmt::Display for ComponentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ComponentCategory::Edge => "edge",
            ComponentCategory::App => "app",
            ComponentCategory::Storage => "storage",
            ComponentCategory::Integration => "integration",
            ComponentCategory::Search => "search",
            ComponentCategory::Cdn => "cdn",
            ComponentCategory::Security => "security",
            ComponentCategory::Monitoring => "monitoring",
            ComponentCategory::Ai => "ai",
            ComponentCategory::Gaming => "gaming",
        };
        write!(f, "{}", value)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Flag(value) => write!(f, "{}", value),
            ParamValue::Number(value) => write!(f, "{}", value),
            ParamValue::Text(value) => write!(f, "{}", value),
        }
    }
}

/// Named sizing/config values for a component. Ordered so rendering is stable.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: ParamValue) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    pub fn with_number(self, key: &str, value: f64) -> Self {
        self.with(key, ParamValue::Number(value))
    }

    pub fn with_text(self, key: &str, value: &str) -> Self {
        self.with(key, ParamValue::Text(value.to_string()))
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(ParamValue::Number(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn number_or(&self, key: &str, fallback: f64) -> f64 {
        self.number(key).unwrap_or(fallback)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(ParamValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Returns `self` layered on top of `defaults`; keys in `self` win.
    pub fn merged_over(&self, defaults: &Params) -> Params {
        let mut merged = defaults.0.clone();
        for (key, value) in &self.0 {
            merged.insert(key.clone(), value.clone());
        }
        Params(merged)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Tcp,
    Udp,
    Grpc,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct TrafficProfile {
    pub rps: f64,
    #[serde(default = "default_read_ratio")]
    pub read_ratio: f64,
    #[serde(default = "default_payload_size")]
    pub payload_size: f64,
    #[serde(default = "default_peak_multiplier")]
    pub peak_multiplier: f64,
}

fn default_read_ratio() -> f64 {
    0.8
}

fn default_payload_size() -> f64 {
    1024.0
}

fn default_peak_multiplier() -> f64 {
    1.0
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PlacedComponent {
    pub id: String,
    pub type_id: String,
    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl PlacedComponent {
    pub fn new(id: &str, type_id: &str) -> Self {
        Self {
            id: id.to_string(),
            type_id: type_id.to_string(),
            params: Params::new(),
            position: None,
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Connection {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub protocol: Protocol,
    /// Requests/sec; advisory only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,
}

impl Connection {
    pub fn new(id: &str, from: &str, to: &str) -> Self {
        Self {
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            protocol: Protocol::Http,
            capacity: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Sla {
    /// Milliseconds, compared against p95.
    pub max_latency: f64,
    pub min_availability: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Challenge {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "traffic_profile")]
    pub traffic: TrafficProfile,
    /// Dollars per month.
    pub budget: f64,
    pub sla: Sla,
    #[serde(default)]
    pub must_haves: Vec<String>,
    #[serde(default)]
    pub anti_patterns: Vec<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{}", value)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct FaultEffects {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_reduction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_multiplier: Option<f64>,
    /// Informational only; effects apply to the whole system.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_components: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct FaultEvent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    #[serde(default)]
    pub effects: FaultEffects,
}

/// A snapshot of the user's design at simulation time.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Design {
    #[serde(default)]
    pub components: Vec<PlacedComponent>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Evaluated in activation order.
    #[serde(default)]
    pub active_faults: Vec<FaultEvent>,
    /// Replaces the challenge's traffic profile when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic: Option<TrafficProfile>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LatencyModel {
    #[default]
    DominantPath,
    CriticalPath,
}

impl fmt::Display for LatencyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            LatencyModel::DominantPath => "dominant-path",
            LatencyModel::CriticalPath => "critical-path",
        };
        write!(f, "{}", value)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ChallengeRef {
    Builtin(String),
    Inline(Challenge),
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FaultRef {
    Preset(String),
    Custom(FaultEvent),
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FeedbackProviderKind {
    #[default]
    None,
    Local,
    Http,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FeedbackConfig {
    #[serde(default)]
    pub provider: FeedbackProviderKind,
    #[serde(default = "default_feedback_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_feedback_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub bypass_gates: bool,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            provider: FeedbackProviderKind::None,
            timeout_ms: default_feedback_timeout_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            max_requests: default_max_requests(),
            endpoint: None,
            model: default_feedback_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            bypass_gates: false,
        }
    }
}

fn default_feedback_timeout_ms() -> u64 {
    5_000
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_max_requests() -> u32 {
    10
}

fn default_feedback_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_api_key_env() -> String {
    "SYSDESIGN_FEEDBACK_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    1500
}

fn default_temperature() -> f64 {
    0.2
}

/// On-disk scenario: a challenge, a design and the knobs for one run.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub challenge: Option<ChallengeRef>,
    #[serde(default)]
    pub traffic: Option<TrafficProfile>,
    #[serde(default)]
    pub faults: Vec<FaultRef>,
    #[serde(default)]
    pub latency_model: LatencyModel,
    #[serde(default)]
    pub components: Vec<PlacedComponent>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub scoring: ScoringPolicy,
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

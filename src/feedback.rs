//! Supplementary qualitative feedback.
//!
//! The external collaborator (typically a hosted language model) is consulted best-effort:
//! it is gated, rate-limited, cached and may fail at any point. Nothing it returns is ever
//! folded back into the rubric score. When it is unavailable the engine attaches a
//! deterministic summary synthesised from the already-computed rubric instead.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::{Error, FeedbackError, Result};
use crate::models::{
    Challenge, Connection, FeedbackConfig, FeedbackProviderKind, PlacedComponent,
};
use crate::state::SimulationCore;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 90 => Grade::A,
            s if s >= 80 => Grade::B,
            s if s >= 70 => Grade::C,
            s if s >= 60 => Grade::D,
            _ => Grade::F,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        write!(f, "{}", value)
    }
}

/// Prose analysis of a design. Carries no score the engine would trust.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupplementaryFeedback {
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
    #[serde(default)]
    pub detailed_analysis: String,
    #[serde(default)]
    pub optimal_solution: String,
    pub architecture_grade: Grade,
    #[serde(default)]
    pub cost_optimization: String,
    #[serde(default)]
    pub scalability_notes: String,
    #[serde(default)]
    pub security_considerations: String,
}

/// Everything a provider may look at. Borrowed; providers must not retain it.
#[derive(Clone, Copy, Debug)]
pub struct FeedbackRequest<'a> {
    pub challenge: &'a Challenge,
    pub catalog: &'a Catalog,
    pub placed: &'a [PlacedComponent],
    pub connections: &'a [Connection],
    pub core: &'a SimulationCore,
}

impl FeedbackRequest<'_> {
    /// Challenge id plus the sorted multiset of placed type ids.
    pub fn cache_key(&self) -> String {
        let mut type_ids: Vec<&str> = self
            .placed
            .iter()
            .map(|component| component.type_id.as_str())
            .collect();
        type_ids.sort_unstable();
        format!("{}-{}", self.challenge.id, type_ids.join(","))
    }
}

#[async_trait]
pub trait FeedbackProvider: Send + Sync {
    async fn supplementary_feedback(
        &self,
        request: &FeedbackRequest<'_>,
    ) -> std::result::Result<SupplementaryFeedback, FeedbackError>;

    /// Whether the provider has the credentials it needs to answer at all.
    fn is_configured(&self) -> bool {
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

/// Keyword-level read of what a design contains, based on placed type ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SystemAnalysis {
    pub has_load_balancer: bool,
    pub has_database: bool,
    pub has_caching: bool,
    pub has_monitoring: bool,
    pub has_security: bool,
    pub has_redundancy: bool,
    pub component_count: usize,
    pub connection_count: usize,
    pub complexity: Complexity,
}

impl SystemAnalysis {
    pub fn of(placed: &[PlacedComponent], connections: &[Connection]) -> Self {
        let any_type = |keywords: &[&str]| {
            placed.iter().any(|component| {
                keywords
                    .iter()
                    .any(|keyword| component.type_id.contains(keyword))
            })
        };
        let mut type_counts: HashMap<&str, usize> = HashMap::new();
        for component in placed {
            *type_counts.entry(component.type_id.as_str()).or_insert(0) += 1;
        }
        let weight = placed.len() as f64 + connections.len() as f64 * 0.5;
        let complexity = if weight < 5.0 {
            Complexity::Simple
        } else if weight < 10.0 {
            Complexity::Moderate
        } else {
            Complexity::Complex
        };

        Self {
            has_load_balancer: any_type(&["load-balancer", "api-gateway"]),
            has_database: any_type(&["database", "db", "cache"]),
            has_caching: any_type(&["cache", "redis", "memcached"]),
            has_monitoring: any_type(&["monitoring", "metrics", "logging"]),
            has_security: any_type(&["auth", "security", "firewall", "waf"]),
            has_redundancy: type_counts.values().any(|count| *count > 1),
            component_count: placed.len(),
            connection_count: connections.len(),
            complexity,
        }
    }
}

/// Deterministic summary built only from the analysis and the rubric result.
pub fn local_summary(request: &FeedbackRequest<'_>) -> SupplementaryFeedback {
    let analysis = SystemAnalysis::of(request.placed, request.connections);
    let mut pros = Vec::new();
    let mut cons = Vec::new();
    let mut grade_points = request.core.score.score as i32;

    if analysis.has_database {
        pros.push("Includes a data persistence layer".to_string());
    } else {
        cons.push("Missing a database layer".to_string());
        grade_points -= 5;
    }
    if analysis.has_load_balancer {
        pros.push("Includes load balancing".to_string());
    } else if analysis.component_count > 3 {
        cons.push("Consider adding a load balancer for scalability".to_string());
        grade_points -= 3;
    }
    if analysis.has_caching {
        pros.push("Includes a caching layer".to_string());
    } else {
        cons.push("Consider adding caching for read-heavy paths".to_string());
    }
    if analysis.has_redundancy {
        pros.push("Shows redundancy awareness".to_string());
    } else if analysis.component_count > 4 {
        cons.push("Consider redundant instances for high availability".to_string());
        grade_points -= 3;
    }
    if analysis.component_count < 3 {
        cons.push("System is too simple for the challenge".to_string());
        grade_points -= 10;
    }

    let complexity = match analysis.complexity {
        Complexity::Simple => "simple",
        Complexity::Moderate => "moderate",
        Complexity::Complex => "complex",
    };
    let within_budget = request.core.metrics.cost <= request.challenge.budget;

    SupplementaryFeedback {
        pros,
        cons,
        detailed_analysis: format!(
            "Basic analysis: {} components, {} connections, {} complexity.",
            analysis.component_count, analysis.connection_count, complexity
        ),
        optimal_solution: "A strong design for this challenge pairs a load balancer with \
                           replicated application servers, a replicated database behind a \
                           cache, plus monitoring and security components."
            .to_string(),
        architecture_grade: Grade::from_score(grade_points.clamp(0, 100)),
        cost_optimization: if within_budget {
            "Within budget".to_string()
        } else {
            "Over budget".to_string()
        },
        scalability_notes: if analysis.has_load_balancer {
            "Good scalability foundation".to_string()
        } else {
            "Consider scalability improvements".to_string()
        },
        security_considerations: if analysis.has_security {
            "Security components present".to_string()
        } else {
            "Consider adding security layers".to_string()
        },
    }
}

/// Provider that answers with [`local_summary`]. Never fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFeedbackProvider;

#[async_trait]
impl FeedbackProvider for LocalFeedbackProvider {
    async fn supplementary_feedback(
        &self,
        request: &FeedbackRequest<'_>,
    ) -> std::result::Result<SupplementaryFeedback, FeedbackError> {
        Ok(local_summary(request))
    }
}

/// Decides whether a design is worth an external call at all.
fn gate(request: &FeedbackRequest<'_>) -> std::result::Result<(), FeedbackError> {
    let analysis = SystemAnalysis::of(request.placed, request.connections);
    if analysis.component_count < 3 {
        return Err(FeedbackError::Skipped(format!(
            "need at least 3 components, have {}",
            analysis.component_count
        )));
    }
    let wants_database = request.challenge.must_haves.iter().any(|requirement| {
        let requirement = requirement.to_lowercase();
        requirement.contains("database") || requirement.contains("db")
    });
    if wants_database && !analysis.has_database {
        return Err(FeedbackError::Skipped(
            "required database component is missing".to_string(),
        ));
    }
    if analysis.complexity == Complexity::Simple && analysis.component_count < 5 {
        return Err(FeedbackError::Skipped(format!(
            "simple designs need at least 5 components, have {}",
            analysis.component_count
        )));
    }
    Ok(())
}

struct CachedFeedback {
    feedback: SupplementaryFeedback,
    stored_at: Instant,
}

/// Wraps a provider with gating, a per-session request budget and a TTL cache.
pub struct FeedbackService<P> {
    inner: P,
    ttl: Duration,
    max_requests: u32,
    bypass_gates: bool,
    cache: Mutex<HashMap<String, CachedFeedback>>,
    requests: Mutex<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    pub requests_used: u32,
    pub requests_remaining: u32,
    pub cache_size: usize,
}

impl<P: FeedbackProvider> FeedbackService<P> {
    pub fn new(inner: P, ttl: Duration, max_requests: u32) -> Self {
        Self {
            inner,
            ttl,
            max_requests,
            bypass_gates: false,
            cache: Mutex::new(HashMap::new()),
            requests: Mutex::new(0),
        }
    }

    /// Keeps only the request budget check in front of the provider.
    pub fn bypass_gates(mut self, bypass: bool) -> Self {
        self.bypass_gates = bypass;
        self
    }

    pub fn usage(&self) -> UsageStats {
        let used = *self.requests.lock();
        UsageStats {
            requests_used: used,
            requests_remaining: self.max_requests.saturating_sub(used),
            cache_size: self.cache.lock().len(),
        }
    }

    /// Starts a new session: clears the cache and the request budget.
    pub fn reset(&self) {
        *self.requests.lock() = 0;
        self.cache.lock().clear();
    }

    fn cached(&self, key: &str) -> Option<SupplementaryFeedback> {
        let mut cache = self.cache.lock();
        let entry = cache.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            return Some(entry.feedback.clone());
        }
        cache.remove(key);
        None
    }

    fn reserve_request(&self) -> std::result::Result<u32, FeedbackError> {
        let mut requests = self.requests.lock();
        if *requests >= self.max_requests {
            return Err(FeedbackError::RateLimited(self.max_requests));
        }
        *requests += 1;
        Ok(*requests)
    }
}

#[async_trait]
impl<P: FeedbackProvider> FeedbackProvider for FeedbackService<P> {
    async fn supplementary_feedback(
        &self,
        request: &FeedbackRequest<'_>,
    ) -> std::result::Result<SupplementaryFeedback, FeedbackError> {
        let key = request.cache_key();
        if let Some(feedback) = self.cached(&key) {
            debug!(%key, "using cached feedback");
            return Ok(feedback);
        }
        if !self.inner.is_configured() {
            return Err(FeedbackError::MissingCredentials);
        }
        if !self.bypass_gates {
            gate(request)?;
        }
        let request_number = self.reserve_request()?;
        info!(%key, request_number, "requesting supplementary feedback");

        let feedback = self.inner.supplementary_feedback(request).await?;
        self.cache.lock().insert(
            key,
            CachedFeedback {
                feedback: feedback.clone(),
                stored_at: Instant::now(),
            },
        );
        Ok(feedback)
    }

    fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }
}

/// Calls a hosted language model through a messages-style HTTP API.
pub struct HttpFeedbackProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f64,
}

impl HttpFeedbackProvider {
    pub fn from_config(config: &FeedbackConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or(Error::MissingFeedbackEndpoint)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| Error::FeedbackClient(err.to_string()))?;
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl FeedbackProvider for HttpFeedbackProvider {
    async fn supplementary_feedback(
        &self,
        request: &FeedbackRequest<'_>,
    ) -> std::result::Result<SupplementaryFeedback, FeedbackError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(FeedbackError::MissingCredentials)?;
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": build_prompt(request) }],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|err| FeedbackError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "feedback service rejected request");
            return Err(FeedbackError::Status(status.as_u16()));
        }
        let payload: MessagesResponse = response
            .json()
            .await
            .map_err(|err| FeedbackError::Malformed(err.to_string()))?;
        let text = payload
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| FeedbackError::Malformed("no text content".to_string()))?;
        parse_feedback_text(&text)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Extracts the outermost JSON object from model output.
pub fn parse_feedback_text(text: &str) -> std::result::Result<SupplementaryFeedback, FeedbackError> {
    let start = text.find('{');
    let end = text.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => return Err(FeedbackError::Malformed("no JSON object in response".to_string())),
    };
    serde_json::from_str(json).map_err(|err| FeedbackError::Malformed(err.to_string()))
}

fn build_prompt(request: &FeedbackRequest<'_>) -> String {
    let challenge = request.challenge;
    let metrics = &request.core.metrics;
    let components = request
        .placed
        .iter()
        .map(|component| {
            let name = request
                .catalog
                .get(&component.type_id)
                .map(|component_type| component_type.name.as_str())
                .unwrap_or(component.type_id.as_str());
            let replicas = component.params.number("replicas").unwrap_or(1.0);
            format!("{} ({} replicas)", name, replicas)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are reviewing a system design as an experienced architect.\n\n\
         CHALLENGE: {title}\n\
         DESCRIPTION: {description}\n\
         REQUIREMENTS: {must_haves}\n\
         ANTI-PATTERNS: {anti_patterns}\n\
         SLA: p95 latency <= {max_latency}ms, availability >= {min_availability:.1}%\n\
         BUDGET: ${budget}/month\n\n\
         DESIGN:\n\
         - Components: {components}\n\
         - Connections: {connections}\n\
         - Metrics: p95 {p95:.1}ms, availability {availability:.2}%, cost ${cost:.0}/month\n\
         - Rubric score: {score}/100\n\n\
         Respond with only a JSON object with the keys \"pros\" (3-5 strings), \"cons\" \
         (3-5 strings), \"detailedAnalysis\", \"optimalSolution\", \"architectureGrade\" \
         (one of A, B, C, D, F), \"costOptimization\", \"scalabilityNotes\" and \
         \"securityConsiderations\".",
        title = challenge.title,
        description = challenge.description,
        must_haves = challenge.must_haves.join(", "),
        anti_patterns = challenge.anti_patterns.join(", "),
        max_latency = challenge.sla.max_latency,
        min_availability = challenge.sla.min_availability * 100.0,
        budget = challenge.budget,
        components = components,
        connections = request.connections.len(),
        p95 = metrics.latency.p95,
        availability = metrics.availability * 100.0,
        cost = metrics.cost,
        score = request.core.score.score,
    )
}

/// Builds the provider a scenario asks for; `None` disables supplementary feedback.
pub fn provider_from_config(config: &FeedbackConfig) -> Result<Option<Arc<dyn FeedbackProvider>>> {
    let provider: Arc<dyn FeedbackProvider> = match config.provider {
        FeedbackProviderKind::None => return Ok(None),
        FeedbackProviderKind::Local => Arc::new(LocalFeedbackProvider),
        FeedbackProviderKind::Http => Arc::new(
            FeedbackService::new(
                HttpFeedbackProvider::from_config(config)?,
                Duration::from_secs(config.cache_ttl_secs),
                config.max_requests,
            )
            .bypass_gates(config.bypass_gates),
        ),
    };
    Ok(Some(provider))
}

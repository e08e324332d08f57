//! The scoring rubric: additive credits and penalties over a design and its metrics,
//! clamped into [0, 100] once every step has been applied.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Catalog, ComponentType};
use crate::metrics::Metrics;
use crate::models::{Challenge, Connection, PlacedComponent};

pub const EMPTY_DESIGN_VIOLATION: &str = "No components placed: the system is empty";
pub const DISCONNECTED_VIOLATION: &str = "Components are not connected";

const LATENCY_RECOMMENDATION: &str =
    "Reduce p95 latency: put a cache or CDN in front of slow components and trim hops on the request path";
const AVAILABILITY_RECOMMENDATION: &str =
    "Raise availability: add replicas to single-instance components";
const BUDGET_RECOMMENDATION: &str =
    "Cut cost: right-size replica counts and remove components the challenge does not need";
const FAULT_RECOMMENDATIONS: [&str; 2] = [
    "Spread critical components across availability zones to survive infrastructure faults",
    "Add circuit breakers and retries with backoff to contain cascading failures",
];

/// How must-have and anti-pattern phrases are matched against placed components.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RequirementMatching {
    /// Case-sensitive substring of the catalog display name.
    #[default]
    Substring,
    /// Case-insensitive exact match against the type's capability tags.
    Capability,
}

/// Point weights for the rubric. Defaults are the tuned product values.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ScoringPolicy {
    pub matching: RequirementMatching,
    pub points_per_component: i32,
    pub max_component_points: i32,
    pub points_per_connection: i32,
    pub max_connection_points: i32,
    pub disconnected_penalty: i32,
    pub must_have_points: i32,
    pub anti_pattern_penalty: i32,
    pub latency_sla_points: i32,
    pub availability_sla_points: i32,
    pub sla_miss_penalty: i32,
    pub budget_points: i32,
    pub budget_miss_penalty: i32,
    pub load_balancer_bonus: i32,
    pub storage_bonus: i32,
    pub caching_bonus: i32,
    pub monitoring_bonus: i32,
    pub max_quality_bonus: i32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            matching: RequirementMatching::Substring,
            points_per_component: 4,
            max_component_points: 40,
            points_per_connection: 2,
            max_connection_points: 20,
            disconnected_penalty: 10,
            must_have_points: 5,
            anti_pattern_penalty: 10,
            latency_sla_points: 8,
            availability_sla_points: 7,
            sla_miss_penalty: 5,
            budget_points: 10,
            budget_miss_penalty: 5,
            load_balancer_bonus: 3,
            storage_bonus: 3,
            caching_bonus: 2,
            monitoring_bonus: 2,
            max_quality_bonus: 10,
        }
    }
}

impl ScoringPolicy {
    /// Every weight by its config key.
    pub fn weights(&self) -> [(&'static str, i32); 17] {
        [
            ("points_per_component", self.points_per_component),
            ("max_component_points", self.max_component_points),
            ("points_per_connection", self.points_per_connection),
            ("max_connection_points", self.max_connection_points),
            ("disconnected_penalty", self.disconnected_penalty),
            ("must_have_points", self.must_have_points),
            ("anti_pattern_penalty", self.anti_pattern_penalty),
            ("latency_sla_points", self.latency_sla_points),
            ("availability_sla_points", self.availability_sla_points),
            ("sla_miss_penalty", self.sla_miss_penalty),
            ("budget_points", self.budget_points),
            ("budget_miss_penalty", self.budget_miss_penalty),
            ("load_balancer_bonus", self.load_balancer_bonus),
            ("storage_bonus", self.storage_bonus),
            ("caching_bonus", self.caching_bonus),
            ("monitoring_bonus", self.monitoring_bonus),
            ("max_quality_bonus", self.max_quality_bonus),
        ]
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ScoreCard {
    pub score: u32,
    pub feedback: Vec<String>,
    pub violations: Vec<String>,
    pub recommendations: Vec<String>,
}

struct Tally {
    points: i32,
    card: ScoreCard,
}

impl Tally {
    fn credit(&mut self, points: i32, message: String) {
        self.points = self.points.saturating_add(points);
        self.card.feedback.push(message);
    }

    fn penalise(&mut self, points: i32, message: String) {
        self.points = self.points.saturating_sub(points);
        self.card.violations.push(message);
    }

    fn recommend(&mut self, message: &str) {
        self.card.recommendations.push(message.to_string());
    }
}

pub fn score_design(
    challenge: &Challenge,
    catalog: &Catalog,
    placed: &[PlacedComponent],
    connections: &[Connection],
    metrics: &Metrics,
    faults_active: bool,
    policy: &ScoringPolicy,
) -> ScoreCard {
    if placed.is_empty() {
        return ScoreCard {
            score: 0,
            violations: vec![EMPTY_DESIGN_VIOLATION.to_string()],
            ..ScoreCard::default()
        };
    }

    let types: Vec<&ComponentType> = placed
        .iter()
        .filter_map(|component| catalog.get(&component.type_id))
        .collect();
    let mut tally = Tally {
        points: 0,
        card: ScoreCard::default(),
    };

    let component_points = capped_points(
        policy.points_per_component,
        placed.len(),
        policy.max_component_points,
    );
    tally.credit(
        component_points,
        format!("{} components placed (+{})", placed.len(), component_points),
    );

    let connection_points = capped_points(
        policy.points_per_connection,
        connections.len(),
        policy.max_connection_points,
    );
    if !connections.is_empty() {
        tally.credit(
            connection_points,
            format!("{} connections (+{})", connections.len(), connection_points),
        );
    }
    if placed.len() > 1 && connections.is_empty() {
        tally.penalise(policy.disconnected_penalty, DISCONNECTED_VIOLATION.to_string());
    }

    for requirement in &challenge.must_haves {
        if requirement_met(&types, requirement, policy.matching) {
            tally.credit(
                policy.must_have_points,
                format!("Includes required component: {}", requirement),
            );
        } else {
            tally
                .card
                .violations
                .push(format!("Missing required component: {}", requirement));
        }
    }

    for pattern in &challenge.anti_patterns {
        if requirement_met(&types, pattern, policy.matching) {
            tally.penalise(
                policy.anti_pattern_penalty,
                format!("Anti-pattern present: {}", pattern),
            );
        }
    }

    let sla = &challenge.sla;
    if metrics.latency.p95 <= sla.max_latency {
        tally.credit(
            policy.latency_sla_points,
            format!(
                "P95 latency {:.1}ms meets the {:.0}ms SLA",
                metrics.latency.p95, sla.max_latency
            ),
        );
    } else {
        tally.penalise(
            policy.sla_miss_penalty,
            format!(
                "P95 latency {:.1}ms exceeds the {:.0}ms SLA",
                metrics.latency.p95, sla.max_latency
            ),
        );
        tally.recommend(LATENCY_RECOMMENDATION);
    }

    if metrics.availability >= sla.min_availability {
        tally.credit(
            policy.availability_sla_points,
            format!(
                "Availability {:.3}% meets the {:.3}% SLA",
                metrics.availability * 100.0,
                sla.min_availability * 100.0
            ),
        );
    } else {
        tally.penalise(
            policy.sla_miss_penalty,
            format!(
                "Availability {:.3}% is below the {:.3}% SLA",
                metrics.availability * 100.0,
                sla.min_availability * 100.0
            ),
        );
        tally.recommend(AVAILABILITY_RECOMMENDATION);
    }

    if metrics.cost <= challenge.budget {
        tally.credit(
            policy.budget_points,
            format!(
                "Monthly cost ${:.2} is within the ${:.2} budget",
                metrics.cost, challenge.budget
            ),
        );
    } else {
        tally.penalise(
            policy.budget_miss_penalty,
            format!(
                "Monthly cost ${:.2} exceeds the ${:.2} budget",
                metrics.cost, challenge.budget
            ),
        );
        tally.recommend(BUDGET_RECOMMENDATION);
    }

    let names: Vec<String> = types
        .iter()
        .map(|component_type| component_type.name.to_lowercase())
        .collect();
    let quality = [
        (
            &["load balancer", "gateway"][..],
            policy.load_balancer_bonus,
            "Load balancing in place",
        ),
        (
            &["database", "db", "cache"][..],
            policy.storage_bonus,
            "Persistent storage in place",
        ),
        (
            &["cache", "redis", "memcached"][..],
            policy.caching_bonus,
            "Caching layer in place",
        ),
        (
            &["monitoring", "metrics", "logging"][..],
            policy.monitoring_bonus,
            "Observability in place",
        ),
    ];
    let mut bonus = 0;
    for (keywords, points, label) in quality {
        let present = names
            .iter()
            .any(|name| keywords.iter().any(|keyword| name.contains(keyword)));
        let awarded = points
            .min(policy.max_quality_bonus.saturating_sub(bonus))
            .max(0);
        if present && awarded > 0 {
            bonus = bonus.saturating_add(awarded);
            tally.credit(awarded, format!("{} (+{})", label, awarded));
        }
    }

    if faults_active {
        for recommendation in FAULT_RECOMMENDATIONS {
            tally.recommend(recommendation);
        }
    }

    let Tally { points, mut card } = tally;
    card.score = points.clamp(0, 100) as u32;
    debug!(
        raw_points = points,
        score = card.score,
        violations = card.violations.len(),
        "scored design"
    );
    card
}

fn capped_points(per_item: i32, count: usize, cap: i32) -> i32 {
    let count = i32::try_from(count).unwrap_or(i32::MAX);
    per_item.saturating_mul(count).min(cap)
}

fn requirement_met(types: &[&ComponentType], phrase: &str, matching: RequirementMatching) -> bool {
    match matching {
        RequirementMatching::Substring => types
            .iter()
            .any(|component_type| component_type.name.contains(phrase)),
        RequirementMatching::Capability => {
            let wanted = phrase.trim().to_lowercase();
            types
                .iter()
                .any(|component_type| component_type.provides.contains(&wanted))
        }
    }
}

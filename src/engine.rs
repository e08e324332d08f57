use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::FeedbackError;
use crate::feedback::{local_summary, FeedbackProvider, FeedbackRequest, SupplementaryFeedback};
use crate::graph::audit;
use crate::metrics::compute_metrics_with_model;
use crate::models::{Challenge, Design, LatencyModel};
use crate::scoring::{score_design, ScoringPolicy};
use crate::state::{RunMetadata, SimulationCore, SimulationResult};

pub const DEFAULT_FEEDBACK_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Runs the metrics/scoring pipeline and attaches best-effort supplementary feedback.
pub struct Simulator {
    catalog: Arc<Catalog>,
    policy: ScoringPolicy,
    latency_model: LatencyModel,
    feedback: Option<Arc<dyn FeedbackProvider>>,
    feedback_timeout: Duration,
}

impl Simulator {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            policy: ScoringPolicy::default(),
            latency_model: LatencyModel::default(),
            feedback: None,
            feedback_timeout: DEFAULT_FEEDBACK_TIMEOUT,
        }
    }

    pub fn with_policy(mut self, policy: ScoringPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_latency_model(mut self, model: LatencyModel) -> Self {
        self.latency_model = model;
        self
    }

    pub fn with_feedback(mut self, provider: Arc<dyn FeedbackProvider>, timeout: Duration) -> Self {
        self.feedback = Some(provider);
        self.feedback_timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Metrics, rubric and audit for one design. Pure: same inputs, same output.
    pub fn evaluate(&self, challenge: &Challenge, design: &Design) -> SimulationCore {
        let traffic = design.traffic.as_ref().unwrap_or(&challenge.traffic);
        let breakdown = compute_metrics_with_model(
            &self.catalog,
            &design.components,
            &design.connections,
            traffic,
            &design.active_faults,
            self.latency_model,
        );
        let card = score_design(
            challenge,
            &self.catalog,
            &design.components,
            &design.connections,
            &breakdown.metrics,
            !design.active_faults.is_empty(),
            &self.policy,
        );
        let warnings = audit(&self.catalog, &design.components, &design.connections);
        for warning in &warnings {
            debug!(%warning, "design warning");
        }

        let metadata = RunMetadata {
            challenge_id: challenge.id.clone(),
            latency_model: self.latency_model,
            active_faults: design
                .active_faults
                .iter()
                .map(|event| event.id.clone())
                .collect(),
            main_path: breakdown
                .main_path
                .iter()
                .map(|id| id.to_string())
                .collect(),
        };
        info!(
            challenge = %challenge.id,
            score = card.score,
            violations = card.violations.len(),
            warnings = warnings.len(),
            "design evaluated"
        );

        SimulationCore {
            metrics: breakdown.metrics,
            score: card,
            warnings,
            metadata,
        }
    }

    /// Never fails: collaborator problems degrade to the local summary.
    pub async fn simulate(&self, challenge: &Challenge, design: &Design) -> SimulationResult {
        let core = self.evaluate(challenge, design);
        let resolved = {
            let request = FeedbackRequest {
                challenge,
                catalog: &self.catalog,
                placed: &design.components,
                connections: &design.connections,
                core: &core,
            };
            match self.request_feedback(&request).await {
                Ok(feedback) => Ok(feedback),
                Err(err) => Err((local_summary(&request), err)),
            }
        };

        match resolved {
            Ok(feedback) => SimulationResult::with_supplementary(core, feedback),
            Err((summary, err)) => {
                SimulationResult::with_local_summary(core, summary, err.map(|err| err.to_string()))
            }
        }
    }

    /// `Err(None)` means no provider is configured.
    async fn request_feedback(
        &self,
        request: &FeedbackRequest<'_>,
    ) -> std::result::Result<SupplementaryFeedback, Option<FeedbackError>> {
        let Some(provider) = self.feedback.as_ref() else {
            return Err(None);
        };
        let outcome =
            match tokio::time::timeout(self.feedback_timeout, provider.supplementary_feedback(request))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(FeedbackError::Timeout(millis(self.feedback_timeout))),
            };
        outcome.map_err(|err| {
            match &err {
                FeedbackError::Skipped(_) | FeedbackError::RateLimited(_) => {
                    info!(error = %err, "supplementary feedback unavailable")
                }
                _ => warn!(error = %err, "supplementary feedback failed"),
            }
            Some(err)
        })
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::Grade;
    use crate::models::{
        Connection, FaultEffects, FaultEvent, PlacedComponent, Severity, Sla, TrafficProfile,
    };
    use crate::scoring::EMPTY_DESIGN_VIOLATION;
    use async_trait::async_trait;

    fn challenge() -> Challenge {
        Challenge {
            id: "t1".to_string(),
            title: "Test".to_string(),
            description: String::new(),
            traffic: TrafficProfile {
                rps: 1000.0,
                read_ratio: 0.8,
                payload_size: 1024.0,
                peak_multiplier: 2.0,
            },
            budget: 1000.0,
            sla: Sla {
                max_latency: 200.0,
                min_availability: 0.99,
            },
            must_haves: Vec::new(),
            anti_patterns: Vec::new(),
        }
    }

    fn design() -> Design {
        Design {
            components: vec![
                PlacedComponent::new("gw", "api-gateway"),
                PlacedComponent::new("app", "web"),
                PlacedComponent::new("db", "db"),
            ],
            connections: vec![
                Connection::new("c1", "gw", "app"),
                Connection::new("c2", "app", "db"),
            ],
            ..Design::default()
        }
    }

    fn simulator() -> Simulator {
        Simulator::new(Arc::new(Catalog::standard()))
    }

    fn canned_feedback() -> SupplementaryFeedback {
        SupplementaryFeedback {
            pros: vec!["clear tiers".to_string()],
            cons: Vec::new(),
            detailed_analysis: "solid".to_string(),
            optimal_solution: String::new(),
            architecture_grade: Grade::A,
            cost_optimization: String::new(),
            scalability_notes: String::new(),
            security_considerations: String::new(),
        }
    }

    struct Canned;

    #[async_trait]
    impl FeedbackProvider for Canned {
        async fn supplementary_feedback(
            &self,
            _request: &FeedbackRequest<'_>,
        ) -> std::result::Result<SupplementaryFeedback, FeedbackError> {
            Ok(canned_feedback())
        }
    }

    struct Failing;

    #[async_trait]
    impl FeedbackProvider for Failing {
        async fn supplementary_feedback(
            &self,
            _request: &FeedbackRequest<'_>,
        ) -> std::result::Result<SupplementaryFeedback, FeedbackError> {
            Err(FeedbackError::Malformed("not json".to_string()))
        }
    }

    struct Slow;

    #[async_trait]
    impl FeedbackProvider for Slow {
        async fn supplementary_feedback(
            &self,
            _request: &FeedbackRequest<'_>,
        ) -> std::result::Result<SupplementaryFeedback, FeedbackError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(canned_feedback())
        }
    }

    #[test]
    fn evaluate_is_deterministic() {
        let simulator = simulator();
        let first = simulator.evaluate(&challenge(), &design());
        let second = simulator.evaluate(&challenge(), &design());
        assert_eq!(first, second);
        assert_eq!(first.metadata.main_path, vec!["gw", "app", "db"]);
        assert_eq!(first.metadata.challenge_id, "t1");
    }

    #[test]
    fn evaluate_does_not_mutate_inputs() {
        let simulator = simulator();
        let challenge = challenge();
        let mut design = design();
        design.active_faults.push(FaultEvent {
            id: "slow".to_string(),
            name: "Slow".to_string(),
            description: String::new(),
            severity: Severity::Low,
            effects: FaultEffects {
                latency_multiplier: Some(2.0),
                ..FaultEffects::default()
            },
        });
        let before = (challenge.clone(), design.clone());

        let core = simulator.evaluate(&challenge, &design);

        assert_eq!(before, (challenge, design));
        assert_eq!(core.metadata.active_faults, vec!["slow".to_string()]);
    }

    #[test]
    fn design_traffic_overrides_challenge_traffic() {
        let simulator = simulator();
        let mut heavy = design();
        heavy.traffic = Some(TrafficProfile {
            rps: 100_000.0,
            read_ratio: 0.8,
            payload_size: 1024.0,
            peak_multiplier: 1.0,
        });
        let base = simulator.evaluate(&challenge(), &design());
        let loaded = simulator.evaluate(&challenge(), &heavy);
        assert!(loaded.metrics.latency.p95 > base.metrics.latency.p95);
        assert!(loaded.metrics.cost > base.metrics.cost);
    }

    #[tokio::test]
    async fn empty_design_scores_zero() {
        let result = simulator().simulate(&challenge(), &Design::default()).await;
        assert_eq!(result.score, 0);
        assert_eq!(result.violations, vec![EMPTY_DESIGN_VIOLATION.to_string()]);
        assert_eq!(result.metrics.availability, 0.0);
        assert!(!result.supplementary_feedback_available);
        assert!(result.local_summary.is_some());
    }

    #[tokio::test]
    async fn supplementary_feedback_never_changes_score() {
        let plain = simulator().simulate(&challenge(), &design()).await;
        let enriched = simulator()
            .with_feedback(Arc::new(Canned), DEFAULT_FEEDBACK_TIMEOUT)
            .simulate(&challenge(), &design())
            .await;

        assert!(enriched.supplementary_feedback_available);
        assert_eq!(enriched.supplementary_feedback, Some(canned_feedback()));
        assert!(enriched.local_summary.is_none());
        assert_eq!(enriched.score, plain.score);
        assert_eq!(enriched.feedback, plain.feedback);
        assert_eq!(enriched.violations, plain.violations);
        assert_eq!(enriched.recommendations, plain.recommendations);
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_local_summary() {
        let result = simulator()
            .with_feedback(Arc::new(Failing), DEFAULT_FEEDBACK_TIMEOUT)
            .simulate(&challenge(), &design())
            .await;
        assert!(!result.supplementary_feedback_available);
        assert!(result.supplementary_feedback.is_none());
        assert!(result.local_summary.is_some());
        assert_eq!(
            result.supplementary_feedback_error.as_deref(),
            Some("malformed feedback response: not json")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let simulator =
            simulator().with_feedback(Arc::new(Slow), Duration::from_millis(250));
        let baseline = simulator.evaluate(&challenge(), &design());
        let result = simulator.simulate(&challenge(), &design()).await;

        assert!(!result.supplementary_feedback_available);
        assert_eq!(
            result.supplementary_feedback_error.as_deref(),
            Some("feedback timed out after 250ms")
        );
        assert_eq!(result.score, baseline.score.score);
    }

    #[test]
    fn timeout_millis_saturate() {
        assert_eq!(millis(Duration::from_millis(250)), 250);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }
}

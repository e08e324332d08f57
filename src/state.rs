use serde::Serialize;

use crate::feedback::SupplementaryFeedback;
use crate::graph::DesignWarning;
use crate::metrics::Metrics;
use crate::models::LatencyModel;
use crate::scoring::ScoreCard;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunMetadata {
    pub challenge_id: String,
    pub latency_model: LatencyModel,
    pub active_faults: Vec<String>,
    /// Component ids latency was accumulated along.
    pub main_path: Vec<String>,
}

/// The deterministic part of a run: everything except supplementary feedback.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationCore {
    pub metrics: Metrics,
    pub score: ScoreCard,
    pub warnings: Vec<DesignWarning>,
    pub metadata: RunMetadata,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationResult {
    pub metrics: Metrics,
    pub score: u32,
    pub feedback: Vec<String>,
    pub violations: Vec<String>,
    pub recommendations: Vec<String>,
    pub warnings: Vec<DesignWarning>,
    pub metadata: RunMetadata,
    pub supplementary_feedback_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplementary_feedback: Option<SupplementaryFeedback>,
    /// Why supplementary feedback is missing, when it was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplementary_feedback_error: Option<String>,
    /// Present whenever supplementary feedback is not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_summary: Option<SupplementaryFeedback>,
}

impl SimulationResult {
    pub fn with_supplementary(core: SimulationCore, feedback: SupplementaryFeedback) -> Self {
        let mut result = Self::bare(core);
        result.supplementary_feedback_available = true;
        result.supplementary_feedback = Some(feedback);
        result
    }

    pub fn with_local_summary(
        core: SimulationCore,
        summary: SupplementaryFeedback,
        error: Option<String>,
    ) -> Self {
        let mut result = Self::bare(core);
        result.local_summary = Some(summary);
        result.supplementary_feedback_error = error;
        result
    }

    fn bare(core: SimulationCore) -> Self {
        Self {
            metrics: core.metrics,
            score: core.score.score,
            feedback: core.score.feedback,
            violations: core.score.violations,
            recommendations: core.score.recommendations,
            warnings: core.warnings,
            metadata: core.metadata,
            supplementary_feedback_available: false,
            supplementary_feedback: None,
            supplementary_feedback_error: None,
            local_summary: None,
        }
    }
}

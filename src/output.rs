use std::fmt::Write as _;

use crate::catalog::Catalog;
use crate::config::Scenario;
use crate::feedback::SupplementaryFeedback;
use crate::models::{Challenge, FaultEvent};
use crate::state::SimulationResult;

pub trait Formatter {
    fn write(&self, result: &SimulationResult) -> String;
}

pub struct HumanFormatter;
pub struct SummaryFormatter;
pub struct JsonFormatter;

impl Formatter for HumanFormatter {
    fn write(&self, result: &SimulationResult) -> String {
        let mut output = String::new();
        write_metadata(&mut output, result);
        write_metrics(&mut output, result);
        let _ = writeln!(output, "Score: {}/100", result.score);
        write_list(&mut output, "Feedback", &result.feedback);
        write_list(&mut output, "Violations", &result.violations);
        write_list(&mut output, "Recommendations", &result.recommendations);
        let warnings: Vec<String> = result.warnings.iter().map(|w| w.to_string()).collect();
        write_list(&mut output, "Warnings", &warnings);

        match (&result.supplementary_feedback, &result.local_summary) {
            (Some(feedback), _) => write_qualitative(&mut output, "Supplementary feedback", feedback),
            (None, Some(summary)) => {
                if let Some(reason) = &result.supplementary_feedback_error {
                    let _ = writeln!(output, "Supplementary feedback unavailable: {}", reason);
                }
                write_qualitative(&mut output, "Local summary", summary);
            }
            (None, None) => {}
        }
        output
    }
}

impl Formatter for SummaryFormatter {
    fn write(&self, result: &SimulationResult) -> String {
        let mut output = String::new();
        write_metadata(&mut output, result);
        write_metrics(&mut output, result);
        let _ = writeln!(output, "Score: {}/100", result.score);
        let _ = writeln!(
            output,
            "Violations: {} | Warnings: {}",
            result.violations.len(),
            result.warnings.len()
        );
        output
    }
}

impl Formatter for JsonFormatter {
    fn write(&self, result: &SimulationResult) -> String {
        match serde_json::to_string_pretty(result) {
            Ok(mut json) => {
                json.push('\n');
                json
            }
            Err(err) => format!("{{\"error\": \"failed to serialize result: {}\"}}\n", err),
        }
    }
}

fn write_metadata(output: &mut String, result: &SimulationResult) {
    let metadata = &result.metadata;
    let _ = writeln!(output, "Metadata:");
    let _ = writeln!(output, "challenge: {}", metadata.challenge_id);
    let _ = writeln!(output, "latency_model: {}", metadata.latency_model);
    let faults = if metadata.active_faults.is_empty() {
        "none".to_string()
    } else {
        metadata.active_faults.join(", ")
    };
    let _ = writeln!(output, "faults: {}", faults);
    let path = if metadata.main_path.is_empty() {
        "none".to_string()
    } else {
        metadata.main_path.join(" -> ")
    };
    let _ = writeln!(output, "main_path: {}", path);
}

fn write_metrics(output: &mut String, result: &SimulationResult) {
    let metrics = &result.metrics;
    let _ = writeln!(output, "Metrics:");
    let _ = writeln!(
        output,
        "latency: p50 {:.1}ms, p95 {:.1}ms, p99 {:.1}ms",
        metrics.latency.p50, metrics.latency.p95, metrics.latency.p99
    );
    let _ = writeln!(output, "throughput: {:.0} rps", metrics.throughput);
    let _ = writeln!(output, "availability: {:.3}%", metrics.availability * 100.0);
    let _ = writeln!(output, "cost: ${:.2}/month", metrics.cost);
}

fn write_list(output: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(output, "{}:", title);
    for item in items {
        let _ = writeln!(output, "- {}", item);
    }
}

fn write_qualitative(output: &mut String, title: &str, feedback: &SupplementaryFeedback) {
    let _ = writeln!(output, "{} (grade {}):", title, feedback.architecture_grade);
    for pro in &feedback.pros {
        let _ = writeln!(output, "+ {}", pro);
    }
    for con in &feedback.cons {
        let _ = writeln!(output, "- {}", con);
    }
    if !feedback.detailed_analysis.is_empty() {
        let _ = writeln!(output, "{}", feedback.detailed_analysis);
    }
}

pub fn render_components(catalog: &Catalog) -> String {
    let mut output = String::new();
    for component_type in catalog.iter() {
        let _ = writeln!(
            output,
            "{} ({}, {})",
            component_type.id, component_type.name, component_type.category
        );
    }
    output
}

pub fn render_faults(events: &[FaultEvent]) -> String {
    let mut output = String::new();
    for event in events {
        let _ = writeln!(output, "{} [{}]: {}", event.id, event.severity, event.name);
    }
    output
}

pub fn render_challenges(challenges: &[Challenge]) -> String {
    let mut output = String::new();
    for challenge in challenges {
        let _ = writeln!(
            output,
            "{}: {} ({} rps, budget ${:.0})",
            challenge.id, challenge.title, challenge.traffic.rps, challenge.budget
        );
    }
    output
}

pub fn render_scenario(scenario: &Scenario) -> String {
    let challenge = &scenario.challenge;
    let traffic = scenario
        .design
        .traffic
        .as_ref()
        .unwrap_or(&challenge.traffic);
    let mut output = String::new();
    let _ = writeln!(output, "Challenge: {} ({})", challenge.id, challenge.title);
    let _ = writeln!(
        output,
        "SLA: p95 <= {}ms, availability >= {:.3}%",
        challenge.sla.max_latency,
        challenge.sla.min_availability * 100.0
    );
    let _ = writeln!(output, "Budget: ${:.2}/month", challenge.budget);
    let _ = writeln!(
        output,
        "Traffic: {} rps (read ratio {}, peak x{})",
        traffic.rps, traffic.read_ratio, traffic.peak_multiplier
    );
    let _ = writeln!(output, "Latency model: {}", scenario.latency_model);
    let _ = writeln!(output, "Components:");
    for component in &scenario.design.components {
        if component.params.is_empty() {
            let _ = writeln!(output, "- {} ({})", component.id, component.type_id);
        } else {
            let params: Vec<String> = component
                .params
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect();
            let _ = writeln!(
                output,
                "- {} ({}; {})",
                component.id,
                component.type_id,
                params.join(", ")
            );
        }
    }
    let _ = writeln!(output, "Connections:");
    for connection in &scenario.design.connections {
        let _ = writeln!(
            output,
            "- {}: {} -> {}",
            connection.id, connection.from, connection.to
        );
    }
    let faults: Vec<&str> = scenario
        .design
        .active_faults
        .iter()
        .map(|event| event.id.as_str())
        .collect();
    let _ = writeln!(
        output,
        "Faults: {}",
        if faults.is_empty() {
            "none".to_string()
        } else {
            faults.join(", ")
        }
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DesignWarning;
    use crate::metrics::{LatencyPercentiles, Metrics};
    use crate::scoring::ScoreCard;
    use crate::state::{RunMetadata, SimulationCore};

    fn core() -> SimulationCore {
        SimulationCore {
            metrics: Metrics {
                latency: LatencyPercentiles::from_base(6.0),
                throughput: 1000.0,
                availability: 0.9999,
                cost: 101.0,
            },
            score: ScoreCard {
                score: 32,
                feedback: vec!["1 components placed (+4)".to_string()],
                violations: Vec::new(),
                recommendations: Vec::new(),
            },
            warnings: vec![DesignWarning::DanglingConnection {
                connection: "e1".to_string(),
                endpoint: "ghost".to_string(),
            }],
            metadata: RunMetadata {
                challenge_id: "t1".to_string(),
                main_path: vec!["gw".to_string()],
                ..RunMetadata::default()
            },
        }
    }

    #[test]
    fn summary_format_is_compact() {
        let result = SimulationResult::with_supplementary(
            core(),
            SupplementaryFeedback {
                pros: Vec::new(),
                cons: Vec::new(),
                detailed_analysis: String::new(),
                optimal_solution: String::new(),
                architecture_grade: crate::feedback::Grade::B,
                cost_optimization: String::new(),
                scalability_notes: String::new(),
                security_considerations: String::new(),
            },
        );
        let expected = concat!(
            "Metadata:\n",
            "challenge: t1\n",
            "latency_model: dominant-path\n",
            "faults: none\n",
            "main_path: gw\n",
            "Metrics:\n",
            "latency: p50 4.8ms, p95 9.0ms, p99 12.0ms\n",
            "throughput: 1000 rps\n",
            "availability: 99.990%\n",
            "cost: $101.00/month\n",
            "Score: 32/100\n",
            "Violations: 0 | Warnings: 1\n",
        );
        assert_eq!(SummaryFormatter.write(&result), expected);
    }

    #[test]
    fn human_format_lists_warnings_and_fallback_reason() {
        let summary = SupplementaryFeedback {
            pros: vec!["Includes load balancing".to_string()],
            cons: Vec::new(),
            detailed_analysis: String::new(),
            optimal_solution: String::new(),
            architecture_grade: crate::feedback::Grade::F,
            cost_optimization: String::new(),
            scalability_notes: String::new(),
            security_considerations: String::new(),
        };
        let result = SimulationResult::with_local_summary(
            core(),
            summary,
            Some("feedback timed out after 5000ms".to_string()),
        );
        let output = HumanFormatter.write(&result);
        assert!(output.contains("Warnings:\n- connection 'e1' references missing component 'ghost'\n"));
        assert!(output.contains("Supplementary feedback unavailable: feedback timed out after 5000ms\n"));
        assert!(output.contains("Local summary (grade F):\n+ Includes load balancing\n"));
    }

    #[test]
    fn json_format_round_trips_through_serde_json() {
        let result = SimulationResult::with_local_summary(core(), local(), None);
        let json: serde_json::Value =
            serde_json::from_str(&JsonFormatter.write(&result)).expect("output should be JSON");
        assert_eq!(json["score"], 32);
        assert_eq!(json["supplementary_feedback_available"], false);
        assert_eq!(json["metadata"]["latency_model"], "dominant-path");
        assert_eq!(json["warnings"][0]["kind"], "dangling-connection");
        assert!(json.get("supplementary_feedback").is_none());
        assert_eq!(json["local_summary"]["architectureGrade"], "C");
    }

    fn local() -> SupplementaryFeedback {
        SupplementaryFeedback {
            pros: Vec::new(),
            cons: Vec::new(),
            detailed_analysis: String::new(),
            optimal_solution: String::new(),
            architecture_grade: crate::feedback::Grade::C,
            cost_optimization: String::new(),
            scalability_notes: String::new(),
            security_considerations: String::new(),
        }
    }

    #[test]
    fn list_renderers_are_line_per_item() {
        let faults = crate::faults::presets();
        let rendered = render_faults(&faults);
        assert_eq!(rendered.lines().count(), faults.len());
        assert!(rendered.starts_with("az-down [high]: Availability Zone Down\n"));

        let rendered = render_challenges(&crate::challenges::builtin());
        assert!(rendered.starts_with("c1: Design image sharing for 2M DAU (15000 rps, budget $3000)\n"));
    }
}

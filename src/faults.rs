use crate::models::{FaultEffects, FaultEvent, Severity};

/// Metric values that fault effects act on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Degradable {
    pub latency_ms: f64,
    pub availability: f64,
    pub cost: f64,
}

/// Applies every active event in activation order. Effects compound multiplicatively,
/// so two 30% availability reductions leave 49% of the original, not 40%.
pub fn apply_faults(base: Degradable, events: &[FaultEvent]) -> Degradable {
    events.iter().fold(base, |acc, event| apply_effects(acc, &event.effects))
}

fn apply_effects(mut metrics: Degradable, effects: &FaultEffects) -> Degradable {
    if let Some(multiplier) = effects.latency_multiplier {
        metrics.latency_ms *= multiplier;
    }
    if let Some(reduction) = effects.availability_reduction {
        metrics.availability *= 1.0 - reduction;
    }
    if let Some(multiplier) = effects.cost_multiplier {
        metrics.cost *= multiplier;
    }
    metrics
}

/// Checks an event's effect bounds; returns a reason on failure.
pub fn validate_event(event: &FaultEvent) -> Result<(), String> {
    let effects = &event.effects;
    if let Some(multiplier) = effects.latency_multiplier {
        if !(multiplier >= 1.0) || !multiplier.is_finite() {
            return Err(format!("latency_multiplier must be >= 1 (got {})", multiplier));
        }
    }
    if let Some(reduction) = effects.availability_reduction {
        if !(0.0..=1.0).contains(&reduction) {
            return Err(format!(
                "availability_reduction must be within [0, 1] (got {})",
                reduction
            ));
        }
    }
    if let Some(multiplier) = effects.cost_multiplier {
        if !(multiplier >= 1.0) || !multiplier.is_finite() {
            return Err(format!("cost_multiplier must be >= 1 (got {})", multiplier));
        }
    }
    Ok(())
}

fn preset(
    id: &str,
    name: &str,
    description: &str,
    severity: Severity,
    effects: FaultEffects,
    affected: &[&str],
) -> FaultEvent {
    FaultEvent {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        severity,
        effects: FaultEffects {
            affected_components: affected.iter().map(|id| id.to_string()).collect(),
            ..effects
        },
    }
}

/// The built-in chaos scenarios a user can toggle.
pub fn presets() -> Vec<FaultEvent> {
    vec![
        preset(
            "az-down",
            "Availability Zone Down",
            "An entire availability zone becomes unavailable",
            Severity::High,
            FaultEffects {
                availability_reduction: Some(0.3),
                latency_multiplier: Some(1.5),
                ..Default::default()
            },
            &["web", "db", "cache"],
        ),
        preset(
            "cache-miss-storm",
            "Cache Miss Storm",
            "Cache hit rate drops to 10% due to key expiration",
            Severity::Medium,
            FaultEffects {
                latency_multiplier: Some(2.0),
                cost_multiplier: Some(1.2),
                ..Default::default()
            },
            &["cache", "db"],
        ),
        preset(
            "database-failover",
            "Database Failover",
            "Primary database fails, triggering failover",
            Severity::High,
            FaultEffects {
                latency_multiplier: Some(3.0),
                availability_reduction: Some(0.1),
                ..Default::default()
            },
            &["db"],
        ),
        preset(
            "network-partition",
            "Network Partition",
            "Network connectivity issues between regions",
            Severity::Critical,
            FaultEffects {
                latency_multiplier: Some(5.0),
                availability_reduction: Some(0.5),
                ..Default::default()
            },
            &["api-gateway", "web", "db"],
        ),
        preset(
            "thundering-herd",
            "Thundering Herd",
            "Massive spike in requests overwhelms system",
            Severity::High,
            FaultEffects {
                latency_multiplier: Some(4.0),
                availability_reduction: Some(0.2),
                ..Default::default()
            },
            &["api-gateway", "web", "load-balancer"],
        ),
        preset(
            "disk-full",
            "Disk Space Exhausted",
            "Storage systems run out of disk space",
            Severity::Critical,
            FaultEffects {
                availability_reduction: Some(0.8),
                ..Default::default()
            },
            &["db", "object-store"],
        ),
        preset(
            "memory-leak",
            "Memory Leak",
            "Application memory usage grows continuously",
            Severity::Medium,
            FaultEffects {
                latency_multiplier: Some(1.8),
                cost_multiplier: Some(1.5),
                ..Default::default()
            },
            &["web", "api-gateway"],
        ),
        preset(
            "dns-outage",
            "DNS Outage",
            "DNS resolution fails for external services",
            Severity::High,
            FaultEffects {
                latency_multiplier: Some(2.5),
                availability_reduction: Some(0.3),
                ..Default::default()
            },
            &["api-gateway", "web"],
        ),
    ]
}

pub fn find_preset(id: &str) -> Option<FaultEvent> {
    presets().into_iter().find(|event| event.id == id)
}

use crate::models::{Challenge, Sla, TrafficProfile};

/// Applied to built-in challenges, which carry no SLA of their own.
pub const DEFAULT_MAX_LATENCY_MS: f64 = 200.0;
pub const DEFAULT_MIN_AVAILABILITY: f64 = 0.999;

fn sample(
    id: &str,
    title: &str,
    rps: f64,
    budget: f64,
    must_haves: &[&str],
    anti_patterns: &[&str],
) -> Challenge {
    Challenge {
        id: id.to_string(),
        title: title.to_string(),
        description: String::new(),
        traffic: TrafficProfile {
            rps,
            read_ratio: 0.8,
            payload_size: 1024.0,
            peak_multiplier: 1.0,
        },
        budget,
        sla: Sla {
            max_latency: DEFAULT_MAX_LATENCY_MS,
            min_availability: DEFAULT_MIN_AVAILABILITY,
        },
        must_haves: must_haves.iter().map(|value| value.to_string()).collect(),
        anti_patterns: anti_patterns.iter().map(|value| value.to_string()).collect(),
    }
}

pub fn builtin() -> Vec<Challenge> {
    vec![
        sample(
            "c1",
            "Design image sharing for 2M DAU",
            15_000.0,
            3_000.0,
            &["CDN", "Cache", "Read Replicas", "Queue"],
            &["Single-AZ DB"],
        ),
        sample(
            "c2",
            "Design feed for 10M DAU",
            50_000.0,
            5_000.0,
            &["Sharding", "Cache"],
            &["Cache-as-sole-storage"],
        ),
    ]
}

pub fn find(id: &str) -> Option<Challenge> {
    builtin().into_iter().find(|challenge| challenge.id == id)
}

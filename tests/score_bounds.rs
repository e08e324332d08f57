use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use sysdesign_sim::catalog::Catalog;
use sysdesign_sim::engine::Simulator;
use sysdesign_sim::faults::presets;
use sysdesign_sim::models::{
    Challenge, Connection, Design, LatencyModel, Params, PlacedComponent, Sla, TrafficProfile,
};
use sysdesign_sim::scoring::{RequirementMatching, ScoringPolicy};

const TYPE_IDS: &[&str] = &[
    "api-gateway",
    "load-balancer",
    "cdn",
    "web",
    "cache",
    "db",
    "read-replica",
    "queue",
    "monitoring",
    "not-a-type",
];
const PHRASES: &[&str] = &["CDN", "Cache", "Database", "Queue", "Sharding", "Single-AZ DB"];

fn random_design(rng: &mut StdRng) -> Design {
    let count = rng.gen_range(0..12);
    let components: Vec<PlacedComponent> = (0..count)
        .map(|idx| {
            let type_id = TYPE_IDS[rng.gen_range(0..TYPE_IDS.len())];
            let mut params = Params::new();
            if rng.gen_bool(0.5) {
                params = params.with_number("replicas", rng.gen_range(0..6) as f64);
            }
            PlacedComponent::new(&format!("n{}", idx), type_id).with_params(params)
        })
        .collect();

    let edge_count = if count == 0 { 0 } else { rng.gen_range(0..count * 2) };
    let connections = (0..edge_count)
        .map(|idx| {
            let from = format!("n{}", rng.gen_range(0..count + 1));
            let to = format!("n{}", rng.gen_range(0..count + 1));
            Connection::new(&format!("e{}", idx), &from, &to)
        })
        .collect();

    let all_faults = presets();
    let active_faults = (0..rng.gen_range(0..4))
        .map(|_| all_faults[rng.gen_range(0..all_faults.len())].clone())
        .collect();

    Design {
        components,
        connections,
        active_faults,
        traffic: None,
    }
}

fn random_challenge(rng: &mut StdRng) -> Challenge {
    let pick = |rng: &mut StdRng| -> Vec<String> {
        (0..rng.gen_range(0..4))
            .map(|_| PHRASES[rng.gen_range(0..PHRASES.len())].to_string())
            .collect()
    };
    Challenge {
        id: "random".to_string(),
        title: "Random".to_string(),
        description: String::new(),
        traffic: TrafficProfile {
            rps: rng.gen_range(0.0..100_000.0),
            read_ratio: rng.gen_range(0.0..=1.0),
            payload_size: rng.gen_range(0.0..1_000_000.0),
            peak_multiplier: rng.gen_range(1.0..5.0),
        },
        budget: rng.gen_range(0.0..10_000.0),
        sla: Sla {
            max_latency: rng.gen_range(1.0..500.0),
            min_availability: rng.gen_range(0.0..=1.0),
        },
        must_haves: pick(rng),
        anti_patterns: pick(rng),
    }
}

#[test]
fn random_designs_respect_metric_and_score_bounds() {
    let catalog = Arc::new(Catalog::standard());
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for round in 0..500 {
        let model = if round % 2 == 0 {
            LatencyModel::DominantPath
        } else {
            LatencyModel::CriticalPath
        };
        let policy = ScoringPolicy {
            matching: if round % 3 == 0 {
                RequirementMatching::Capability
            } else {
                RequirementMatching::Substring
            },
            ..ScoringPolicy::default()
        };
        let simulator = Simulator::new(Arc::clone(&catalog))
            .with_policy(policy)
            .with_latency_model(model);
        let design = random_design(&mut rng);
        let challenge = random_challenge(&mut rng);

        let core = simulator.evaluate(&challenge, &design);
        let metrics = &core.metrics;

        assert!(core.score.score <= 100, "round {}: score {}", round, core.score.score);
        assert!(
            (0.0..=1.0).contains(&metrics.availability),
            "round {}: availability {}",
            round,
            metrics.availability
        );
        assert!(metrics.latency.p50 <= metrics.latency.p95);
        assert!(metrics.latency.p95 <= metrics.latency.p99);
        assert!(metrics.cost >= 0.0);
        assert!(metrics.throughput <= challenge.traffic.rps);
        assert!(metrics.throughput >= 0.0);
        if design.components.is_empty() {
            assert_eq!(core.score.score, 0);
        }
        assert_eq!(core, simulator.evaluate(&challenge, &design), "round {}", round);
    }
}

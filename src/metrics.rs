use serde::Serialize;
use tracing::debug;

use crate::catalog::Catalog;
use crate::faults::{apply_faults, Degradable};
use crate::graph::{critical_path, dominant_path, path_latency};
use crate::models::{Connection, FaultEvent, LatencyModel, PlacedComponent, TrafficProfile};

/// Base latency reported when there is no usable request path.
pub const NO_PATH_LATENCY_MS: f64 = 1000.0;
/// Availability assumed for a component whose type is not in the catalog.
pub const UNKNOWN_COMPONENT_AVAILABILITY: f64 = 0.5;
/// Requests/sec one replica can serve.
pub const RPS_PER_REPLICA: f64 = 1000.0;

pub const P50_FACTOR: f64 = 0.8;
pub const P95_FACTOR: f64 = 1.5;
pub const P99_FACTOR: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LatencyPercentiles {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl LatencyPercentiles {
    /// Fixed multiples of the base latency, not a measured distribution.
    pub fn from_base(base_ms: f64) -> Self {
        Self {
            p50: base_ms * P50_FACTOR,
            p95: base_ms * P95_FACTOR,
            p99: base_ms * P99_FACTOR,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Metrics {
    pub latency: LatencyPercentiles,
    /// Requests/sec actually served.
    pub throughput: f64,
    pub availability: f64,
    /// Dollars per month.
    pub cost: f64,
}

/// Metrics plus the path latency was accumulated along.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricsBreakdown<'a> {
    pub metrics: Metrics,
    pub main_path: Vec<&'a str>,
}

pub fn compute_metrics(
    catalog: &Catalog,
    placed: &[PlacedComponent],
    connections: &[Connection],
    traffic: &TrafficProfile,
    active_faults: &[FaultEvent],
) -> Metrics {
    compute_metrics_with_model(
        catalog,
        placed,
        connections,
        traffic,
        active_faults,
        LatencyModel::DominantPath,
    )
    .metrics
}

pub fn compute_metrics_with_model<'a>(
    catalog: &Catalog,
    placed: &'a [PlacedComponent],
    connections: &[Connection],
    traffic: &TrafficProfile,
    active_faults: &[FaultEvent],
    model: LatencyModel,
) -> MetricsBreakdown<'a> {
    let main_path = match model {
        LatencyModel::DominantPath => dominant_path(catalog, placed, connections),
        LatencyModel::CriticalPath => critical_path(catalog, placed, connections, traffic),
    };

    let base_latency = if placed.is_empty() || main_path.is_empty() {
        NO_PATH_LATENCY_MS
    } else {
        path_latency(catalog, placed, &main_path, traffic)
    };

    let base = Degradable {
        latency_ms: base_latency,
        availability: series_availability(catalog, placed),
        cost: total_cost(catalog, placed, traffic),
    };
    let degraded = apply_faults(base, active_faults);
    let throughput = traffic.rps.min(bottleneck_capacity(catalog, placed));

    debug!(
        components = placed.len(),
        path_len = main_path.len(),
        base_latency_ms = base_latency,
        faults = active_faults.len(),
        "computed metrics"
    );

    MetricsBreakdown {
        metrics: Metrics {
            latency: LatencyPercentiles::from_base(degraded.latency_ms),
            throughput,
            availability: degraded.availability,
            cost: degraded.cost,
        },
        main_path,
    }
}

/// Every component in series, regardless of topology. Empty designs are unavailable.
pub fn series_availability(catalog: &Catalog, placed: &[PlacedComponent]) -> f64 {
    if placed.is_empty() {
        return 0.0;
    }
    placed
        .iter()
        .map(|component| match catalog.get(&component.type_id) {
            Some(component_type) => {
                let params = component.params.merged_over(&component_type.default_params);
                component_type.availability_of(&params)
            }
            None => UNKNOWN_COMPONENT_AVAILABILITY,
        })
        .product()
}

/// Monthly cost of every resolvable component.
pub fn total_cost(catalog: &Catalog, placed: &[PlacedComponent], traffic: &TrafficProfile) -> f64 {
    placed
        .iter()
        .filter_map(|component| {
            catalog.get(&component.type_id).map(|component_type| {
                let params = component.params.merged_over(&component_type.default_params);
                component_type.monthly_cost(&params, traffic)
            })
        })
        .sum()
}

/// Smallest replica count times [`RPS_PER_REPLICA`]; infinite for an empty design.
/// Replica counts below zero count as zero.
pub fn bottleneck_capacity(catalog: &Catalog, placed: &[PlacedComponent]) -> f64 {
    placed
        .iter()
        .map(|component| {
            let replicas = match catalog.get(&component.type_id) {
                Some(component_type) => component
                    .params
                    .merged_over(&component_type.default_params)
                    .number("replicas"),
                None => component.params.number("replicas"),
            };
            replicas.unwrap_or(1.0).max(0.0) * RPS_PER_REPLICA
        })
        .fold(f64::INFINITY, f64::min)
}

//! Path derivation over a placed design.
//!
//! Latency is accumulated along a single path rather than over the whole graph. The default
//! resolver ([`dominant_path`]) is an approximation: it starts at the first
//! edge-category component and greedily follows the first outgoing connection to a component
//! not yet on the path. Fan-out and redundant parallel paths are invisible to it.
//! [`critical_path`] is the slower alternative that searches every simple path for the
//! slowest one.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::catalog::Catalog;
use crate::models::{ComponentCategory, Connection, PlacedComponent, TrafficProfile};

/// Per-hop network overhead added between consecutive path members.
pub const HOP_OVERHEAD_MS: f64 = 5.0;

/// Placed components by id. The first component wins when ids repeat.
pub fn index_components(placed: &[PlacedComponent]) -> HashMap<&str, &PlacedComponent> {
    let mut index = HashMap::with_capacity(placed.len());
    for component in placed {
        index.entry(component.id.as_str()).or_insert(component);
    }
    index
}

/// Like [`index_components`], minus components whose type is not in the catalog.
fn resolved_components<'a>(
    catalog: &Catalog,
    placed: &'a [PlacedComponent],
) -> HashMap<&'a str, &'a PlacedComponent> {
    let mut index = index_components(placed);
    index.retain(|_, component| catalog.get(&component.type_id).is_some());
    index
}

fn entry_points<'a>(catalog: &Catalog, placed: &'a [PlacedComponent]) -> Vec<&'a PlacedComponent> {
    placed
        .iter()
        .filter(|component| {
            catalog
                .get(&component.type_id)
                .map(|component_type| component_type.category == ComponentCategory::Edge)
                .unwrap_or(false)
        })
        .collect()
}

/// Resolves the dominant request path as an ordered list of component ids.
///
/// Returns an empty path when no edge-category component is placed. Connections whose
/// target is not a placed component, or whose target type is not in the catalog, are skipped.
pub fn dominant_path<'a>(
    catalog: &Catalog,
    placed: &'a [PlacedComponent],
    connections: &[Connection],
) -> Vec<&'a str> {
    let Some(entry) = entry_points(catalog, placed).into_iter().next() else {
        return Vec::new();
    };
    let index = resolved_components(catalog, placed);

    let mut path = vec![entry.id.as_str()];
    let mut visited: HashSet<&str> = HashSet::from([entry.id.as_str()]);
    let mut current = entry.id.as_str();

    loop {
        let next = connections
            .iter()
            .filter(|connection| connection.from == current)
            .filter_map(|connection| index.get(connection.to.as_str()).copied())
            .map(|component| component.id.as_str())
            .find(|id| !visited.contains(id));
        match next {
            Some(id) => {
                visited.insert(id);
                path.push(id);
                current = id;
            }
            None => break,
        }
    }

    path
}

/// Latency of a path: every member's modelled latency plus [`HOP_OVERHEAD_MS`] per hop.
/// Members that are not placed or whose type does not resolve are skipped entirely, so they
/// add neither latency nor a hop.
pub fn path_latency(
    catalog: &Catalog,
    placed: &[PlacedComponent],
    path: &[&str],
    traffic: &TrafficProfile,
) -> f64 {
    let index = resolved_components(catalog, placed);
    let members: Vec<&PlacedComponent> = path
        .iter()
        .filter_map(|id| index.get(id).copied())
        .collect();
    let node_latency: f64 = members
        .iter()
        .map(|component| component_latency(catalog, component, traffic))
        .sum();
    node_latency + members.len().saturating_sub(1) as f64 * HOP_OVERHEAD_MS
}

pub(crate) fn component_latency(
    catalog: &Catalog,
    component: &PlacedComponent,
    traffic: &TrafficProfile,
) -> f64 {
    match catalog.get(&component.type_id) {
        Some(component_type) => {
            let params = component.params.merged_over(&component_type.default_params);
            component_type.latency_ms(&params, traffic)
        }
        None => 0.0,
    }
}

/// The slowest simple path starting at any edge-category component.
///
/// Exhaustive over simple paths, so only suitable for the small hand-built designs this
/// engine targets. Ties keep the first path found in placement/connection order.
/// Components whose type is not in the catalog are never path members.
pub fn critical_path<'a>(
    catalog: &Catalog,
    placed: &'a [PlacedComponent],
    connections: &[Connection],
    traffic: &TrafficProfile,
) -> Vec<&'a str> {
    let index = resolved_components(catalog, placed);
    let latencies: HashMap<&str, f64> = index
        .iter()
        .map(|(id, component)| (*id, component_latency(catalog, component, traffic)))
        .collect();
    let mut adjacency: HashMap<&str, Vec<&'a str>> = HashMap::new();
    for connection in connections {
        if let (Some(from), Some(to)) = (
            index.get(connection.from.as_str()).copied(),
            index.get(connection.to.as_str()).copied(),
        ) {
            adjacency
                .entry(from.id.as_str())
                .or_default()
                .push(to.id.as_str());
        }
    }

    let mut best: Vec<&'a str> = Vec::new();
    let mut best_latency = f64::NEG_INFINITY;
    for entry in entry_points(catalog, placed) {
        let mut search = PathSearch {
            adjacency: &adjacency,
            latencies: &latencies,
            path: vec![entry.id.as_str()],
            visited: HashSet::from([entry.id.as_str()]),
            best: &mut best,
            best_latency: &mut best_latency,
        };
        let start = latencies.get(entry.id.as_str()).copied().unwrap_or(0.0);
        search.explore(entry.id.as_str(), start);
    }
    best
}

struct PathSearch<'s, 'a> {
    adjacency: &'s HashMap<&'a str, Vec<&'a str>>,
    latencies: &'s HashMap<&'a str, f64>,
    path: Vec<&'a str>,
    visited: HashSet<&'a str>,
    best: &'s mut Vec<&'a str>,
    best_latency: &'s mut f64,
}

impl<'s, 'a> PathSearch<'s, 'a> {
    fn explore(&mut self, current: &'a str, latency: f64) {
        if latency > *self.best_latency {
            *self.best_latency = latency;
            *self.best = self.path.clone();
        }
        let adjacency = self.adjacency;
        let Some(next_ids) = adjacency.get(current) else {
            return;
        };
        for &next in next_ids {
            if self.visited.contains(next) {
                continue;
            }
            let step = self.latencies.get(next).copied().unwrap_or(0.0) + HOP_OVERHEAD_MS;
            self.visited.insert(next);
            self.path.push(next);
            self.explore(next, latency + step);
            self.path.pop();
            self.visited.remove(next);
        }
    }
}

/// A non-scoring problem found in a design.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DesignWarning {
    UnknownComponentType { component: String, type_id: String },
    DanglingConnection { connection: String, endpoint: String },
    DisallowedConnection { connection: String, from_type: String, to_type: String },
    TooManyConnections { component: String, count: usize, max: usize },
}

impl std::fmt::Display for DesignWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DesignWarning::UnknownComponentType { component, type_id } => {
                write!(f, "component '{}' has unknown type '{}'", component, type_id)
            }
            DesignWarning::DanglingConnection { connection, endpoint } => write!(
                f,
                "connection '{}' references missing component '{}'",
                connection, endpoint
            ),
            DesignWarning::DisallowedConnection {
                connection,
                from_type,
                to_type,
            } => write!(
                f,
                "connection '{}' from {} to {} is not a supported pairing",
                connection, from_type, to_type
            ),
            DesignWarning::TooManyConnections {
                component,
                count,
                max,
            } => write!(
                f,
                "component '{}' has {} outgoing connections (max {})",
                component, count, max
            ),
        }
    }
}

/// Checks references and catalog adjacency rules. Never fails; problems are reported.
pub fn audit(
    catalog: &Catalog,
    placed: &[PlacedComponent],
    connections: &[Connection],
) -> Vec<DesignWarning> {
    let index = index_components(placed);
    let mut warnings = Vec::new();

    for component in placed {
        if catalog.get(&component.type_id).is_none() {
            warnings.push(DesignWarning::UnknownComponentType {
                component: component.id.clone(),
                type_id: component.type_id.clone(),
            });
        }
    }

    let mut outgoing: HashMap<&str, usize> = HashMap::new();
    for connection in connections {
        let from = index.get(connection.from.as_str());
        let to = index.get(connection.to.as_str());
        for (endpoint, resolved) in [(&connection.from, from), (&connection.to, to)] {
            if resolved.is_none() {
                warnings.push(DesignWarning::DanglingConnection {
                    connection: connection.id.clone(),
                    endpoint: endpoint.clone(),
                });
            }
        }
        let (Some(from), Some(to)) = (from, to) else {
            continue;
        };
        *outgoing.entry(from.id.as_str()).or_insert(0) += 1;
        if let (Some(from_type), Some(_)) = (catalog.get(&from.type_id), catalog.get(&to.type_id)) {
            if !from_type.allows_connection_to(&to.type_id) {
                warnings.push(DesignWarning::DisallowedConnection {
                    connection: connection.id.clone(),
                    from_type: from.type_id.clone(),
                    to_type: to.type_id.clone(),
                });
            }
        }
    }

    for component in placed {
        let Some(max) = catalog
            .get(&component.type_id)
            .and_then(|component_type| component_type.max_connections)
        else {
            continue;
        };
        let count = outgoing.get(component.id.as_str()).copied().unwrap_or(0);
        if count > max {
            warnings.push(DesignWarning::TooManyConnections {
                component: component.id.clone(),
                count,
                max,
            });
        }
    }

    warnings
}

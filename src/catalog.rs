use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{ComponentCategory, Params, TrafficProfile};

pub type LatencyFn = Arc<dyn Fn(&Params, &TrafficProfile) -> f64 + Send + Sync>;
pub type CostFn = Arc<dyn Fn(&Params, &TrafficProfile) -> f64 + Send + Sync>;
pub type AvailabilityFn = Arc<dyn Fn(&Params) -> f64 + Send + Sync>;

/// A component type and its closed-form performance, cost and availability models.
#[derive(Clone)]
pub struct ComponentType {
    pub id: String,
    pub name: String,
    pub category: ComponentCategory,
    pub description: String,
    pub default_params: Params,
    pub max_connections: Option<usize>,
    /// Downstream type ids this type may connect to. Empty means unrestricted.
    pub allowed_connections: BTreeSet<String>,
    /// Lowercase capability tags used by capability-based requirement matching.
    pub provides: BTreeSet<String>,
    latency_fn: LatencyFn,
    cost_fn: CostFn,
    availability_fn: AvailabilityFn,
}

impl ComponentType {
    pub fn new(id: &str, name: &str, category: ComponentCategory) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category,
            description: String::new(),
            default_params: Params::new(),
            max_connections: None,
            allowed_connections: BTreeSet::new(),
            provides: BTreeSet::new(),
            latency_fn: Arc::new(|_, _| 0.0),
            cost_fn: Arc::new(|_, _| 0.0),
            availability_fn: Arc::new(|_| 1.0),
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn defaults(mut self, params: Params) -> Self {
        self.default_params = params;
        self
    }

    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    pub fn connects_to(mut self, type_ids: &[&str]) -> Self {
        self.allowed_connections = type_ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn provides(mut self, tags: &[&str]) -> Self {
        self.provides = tags.iter().map(|tag| tag.to_lowercase()).collect();
        self
    }

    pub fn latency<F>(mut self, f: F) -> Self
    where
        F: Fn(&Params, &TrafficProfile) -> f64 + Send + Sync + 'static,
    {
        self.latency_fn = Arc::new(f);
        self
    }

    pub fn cost<F>(mut self, f: F) -> Self
    where
        F: Fn(&Params, &TrafficProfile) -> f64 + Send + Sync + 'static,
    {
        self.cost_fn = Arc::new(f);
        self
    }

    pub fn availability<F>(mut self, f: F) -> Self
    where
        F: Fn(&Params) -> f64 + Send + Sync + 'static,
    {
        self.availability_fn = Arc::new(f);
        self
    }

    /// Milliseconds for one request through this component.
    pub fn latency_ms(&self, params: &Params, traffic: &TrafficProfile) -> f64 {
        (self.latency_fn)(params, traffic)
    }

    /// Dollars per month.
    pub fn monthly_cost(&self, params: &Params, traffic: &TrafficProfile) -> f64 {
        (self.cost_fn)(params, traffic)
    }

    /// Clamped into [0, 1].
    pub fn availability_of(&self, params: &Params) -> f64 {
        (self.availability_fn)(params).clamp(0.0, 1.0)
    }

    pub fn allows_connection_to(&self, type_id: &str) -> bool {
        self.allowed_connections.is_empty() || self.allowed_connections.contains(type_id)
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("default_params", &self.default_params)
            .field("max_connections", &self.max_connections)
            .field("allowed_connections", &self.allowed_connections)
            .field("provides", &self.provides)
            .finish_non_exhaustive()
    }
}

/// Immutable registry of component types, in registration order.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    types: Vec<ComponentType>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(types: Vec<ComponentType>) -> Result<Self> {
        let mut index = HashMap::with_capacity(types.len());
        for (idx, component_type) in types.iter().enumerate() {
            if index.insert(component_type.id.clone(), idx).is_some() {
                return Err(Error::DuplicateComponentType(component_type.id.clone()));
            }
        }
        Ok(Self { types, index })
    }

    pub fn get(&self, type_id: &str) -> Option<&ComponentType> {
        self.index.get(type_id).map(|idx| &self.types[*idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The built-in catalog used by the CLI.
    pub fn standard() -> Self {
        let types = standard_types();
        let index = types
            .iter()
            .enumerate()
            .map(|(idx, component_type)| (component_type.id.clone(), idx))
            .collect();
        Self { types, index }
    }
}

fn replicas(params: &Params) -> f64 {
    params.number_or("replicas", 1.0).max(1.0)
}

/// 1 - (1 - a)^n: n independent copies of a component with availability `a`.
fn redundant(single: f64, copies: f64) -> f64 {
    1.0 - (1.0 - single).powf(copies.max(1.0))
}

fn size_factor(params: &Params) -> f64 {
    match params.text("size") {
        Some("small") => 1.0,
        Some("large") => 4.0,
        _ => 2.0,
    }
}

fn standard_types() -> Vec<ComponentType> {
    use ComponentCategory::*;

    vec![
        ComponentType::new("api-gateway", "API Gateway", Edge)
            .describe("Entry point that routes, authenticates and rate-limits API traffic")
            .defaults(Params::new().with_number("replicas", 2.0))
            .connects_to(&["web", "auth", "cache", "queue", "search", "inference", "game-server"])
            .provides(&["gateway", "api gateway", "rate limiting"])
            .latency(|_, traffic| 5.0 + traffic.rps / 1000.0)
            .cost(|params, traffic| replicas(params) * 50.0 + traffic.rps * 0.001)
            .availability(|_| 0.9999),
        ComponentType::new("load-balancer", "Load Balancer", Edge)
            .describe("Layer 4/7 balancer spreading requests over app replicas")
            .defaults(Params::new().with_number("replicas", 2.0))
            .connects_to(&["web", "api-gateway", "game-server", "inference"])
            .provides(&["load balancer", "lb"])
            .latency(|_, traffic| 1.0 + traffic.rps / 5000.0)
            .cost(|params, traffic| replicas(params) * 25.0 + traffic.rps * 0.0005)
            .availability(|params| redundant(0.999, replicas(params))),
        ComponentType::new("cdn", "CDN", Cdn)
            .describe("Edge cache for static assets and media")
            .connects_to(&["load-balancer", "api-gateway", "object-store", "web"])
            .provides(&["cdn", "edge cache"])
            .latency(|_, traffic| 2.0 + traffic.payload_size / 1_000_000.0)
            .cost(|_, traffic| 20.0 + traffic.rps * traffic.payload_size * 2.5e-8)
            .availability(|_| 0.99999),
        ComponentType::new("web", "Web App", App)
            .describe("Stateless application tier")
            .defaults(Params::new().with_number("replicas", 2.0))
            .connects_to(&["cache", "db", "read-replica", "object-store", "queue", "search", "auth", "inference", "logging"])
            .provides(&["app server", "web"])
            .latency(|params, traffic| 10.0 + traffic.rps / (replicas(params) * 500.0))
            .cost(|params, _| replicas(params) * 80.0)
            .availability(|params| redundant(0.99, replicas(params))),
        ComponentType::new("cache", "Cache (Redis)", Storage)
            .describe("In-memory key/value cache")
            .defaults(Params::new().with_text("size", "small"))
            .connects_to(&["db", "read-replica"])
            .provides(&["cache", "redis"])
            .latency(|_, traffic| 1.0 + (1.0 - traffic.read_ratio) * 2.0)
            .cost(|params, _| 30.0 * size_factor(params))
            .availability(|_| 0.999),
        ComponentType::new("db", "Database (Primary)", Storage)
            .describe("Relational primary database")
            .defaults(
                Params::new()
                    .with_number("replicas", 1.0)
                    .with_number("readReplicas", 0.0),
            )
            .max_connections(4)
            .connects_to(&["read-replica", "logging"])
            .provides(&["database", "db", "sql"])
            .latency(|params, traffic| {
                let read_replicas = params.number_or("readReplicas", 0.0).max(0.0);
                let writes = traffic.rps * (1.0 - traffic.read_ratio);
                let reads = traffic.rps * traffic.read_ratio / (1.0 + read_replicas);
                5.0 + writes / 1000.0 + reads / 2000.0
            })
            .cost(|params, _| {
                replicas(params) * 100.0 + params.number_or("readReplicas", 0.0).max(0.0) * 60.0
            })
            .availability(|params| redundant(0.999, replicas(params))),
        ComponentType::new("read-replica", "Read Replicas", Storage)
            .describe("Asynchronous read-only database replicas")
            .defaults(Params::new().with_number("replicas", 2.0))
            .provides(&["read replicas", "database", "db"])
            .latency(|params, traffic| 4.0 + traffic.rps * traffic.read_ratio / (replicas(params) * 4000.0))
            .cost(|params, _| replicas(params) * 60.0)
            .availability(|params| redundant(0.999, replicas(params))),
        ComponentType::new("object-store", "Object Store", Storage)
            .describe("Blob storage for media and backups")
            .defaults(Params::new().with_text("region", "single"))
            .provides(&["object store", "blob storage"])
            .latency(|_, traffic| 20.0 + traffic.payload_size / 500_000.0)
            .cost(|_, traffic| 10.0 + traffic.rps * traffic.payload_size * 1e-8)
            .availability(|params| match params.text("region") {
                Some("multi") => 0.9999,
                _ => 0.999,
            }),
        ComponentType::new("queue", "Message Queue", Integration)
            .describe("Durable queue decoupling producers from consumers")
            .defaults(Params::new().with_number("partitions", 3.0).with_number("ttl", 3600.0))
            .connects_to(&["web", "db", "object-store", "search", "inference"])
            .provides(&["queue", "async processing"])
            .latency(|_, _| 3.0)
            .cost(|params, _| 40.0 + params.number_or("partitions", 1.0).max(1.0) * 10.0)
            .availability(|_| 0.9995),
        ComponentType::new("search", "Search Index", Search)
            .describe("Full-text search cluster")
            .defaults(Params::new().with_number("replicas", 2.0))
            .provides(&["search", "full-text search"])
            .latency(|params, traffic| 15.0 + traffic.rps / (replicas(params) * 1000.0))
            .cost(|params, _| replicas(params) * 120.0)
            .availability(|params| redundant(0.995, replicas(params))),
        ComponentType::new("auth", "Auth Service", Security)
            .describe("Identity and token verification")
            .connects_to(&["db", "cache"])
            .provides(&["auth", "authentication", "security"])
            .latency(|_, _| 3.0)
            .cost(|_, traffic| 30.0 + traffic.rps * 0.0002)
            .availability(|_| 0.9995),
        ComponentType::new("waf", "Web Application Firewall", Security)
            .describe("Filters malicious traffic before it reaches the edge")
            .connects_to(&["api-gateway", "load-balancer", "cdn"])
            .provides(&["waf", "firewall", "security"])
            .latency(|_, _| 1.0)
            .cost(|_, traffic| 25.0 + traffic.rps * 0.0003)
            .availability(|_| 0.9999),
        ComponentType::new("monitoring", "Monitoring", Monitoring)
            .describe("Metrics collection, dashboards and alerting")
            .provides(&["monitoring", "metrics", "alerting"])
            .cost(|_, _| 50.0),
        ComponentType::new("logging", "Logging", Monitoring)
            .describe("Centralized log aggregation")
            .provides(&["logging", "observability"])
            .cost(|_, traffic| 20.0 + traffic.rps * 0.0001),
        ComponentType::new("inference", "Inference Service", Ai)
            .describe("GPU-backed model serving")
            .defaults(Params::new().with_number("replicas", 1.0))
            .connects_to(&["cache", "object-store"])
            .provides(&["inference", "ml"])
            .latency(|params, traffic| 50.0 + traffic.rps / (replicas(params) * 200.0))
            .cost(|params, _| replicas(params) * 600.0)
            .availability(|params| redundant(0.99, replicas(params))),
        ComponentType::new("game-server", "Game Server", Gaming)
            .describe("Stateful realtime session host")
            .defaults(Params::new().with_number("replicas", 2.0))
            .connects_to(&["cache", "db", "queue"])
            .provides(&["game server", "realtime"])
            .latency(|params, traffic| 8.0 + traffic.rps / (replicas(params) * 800.0))
            .cost(|params, _| replicas(params) * 150.0)
            .availability(|params| redundant(0.99, replicas(params))),
    ]
}

//! App registry: routing rules, balancers and timelines for every app.
//!
//! # Data Flow
//! ```text
//! Control plane (register):
//!     AppConfig
//!     → app.rs (validate, normalize)           reject whole on error
//!     → per-app writer lock
//!     → build AppEntry, carrying over timelines of retained backends
//!     → RCU swap of RegistryState { router, apps }
//!
//! Data plane (resolve / record):
//!     RouteRequest
//!     → load RegistryState (lock-free)
//!     → router match → AppEntry → balancer select (timelines by id)
//!     → outcome recorded into the backend's timeline
//! ```
//!
//! # Design Decisions
//! - Router and app entries live in one immutable state swapped as a unit,
//!   so a route never points at an app whose timelines are missing
//! - Writers serialize per app name; readers never lock the registry
//! - Explicitly constructed and passed around; no global instance

pub mod app;
pub mod snapshot;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::error::ProxyError;
use crate::load_balancer::{Backend, BackendId, Balancer, TimelineTable};
use crate::observability::metrics;
use crate::resilience::{Clock, CircuitState, MonotonicClock, Outcome, Timeline, TimelineConfig};
use crate::routing::matcher::normalize_host;
use crate::routing::{Route, RouteRequest, Router};

pub use app::{App, AppConfig, BackendConfig, ValidationError, MAX_METHODS_PER_APP};
pub use snapshot::{AppSnapshot, BackendSnapshot, Registration};

/// Tuning applied to every app in a registry.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryOptions {
    pub timeline: TimelineConfig,
    /// Chance, in percent, that a HalfOpen backend is admitted per selection.
    pub half_open_weight_percent: u32,
    /// Consider every app when no app claims the request host.
    pub host_fallback: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            timeline: TimelineConfig::default(),
            half_open_weight_percent: 10,
            host_fallback: true,
        }
    }
}

/// Everything installed for one app.
#[derive(Debug)]
pub struct AppEntry {
    app: App,
    balancer: Balancer,
    timelines: TimelineTable,
}

impl AppEntry {
    /// Build an entry, reusing timelines of backends that `previous` already had.
    fn build(
        app: App,
        previous: Option<&AppEntry>,
        options: &RegistryOptions,
        now: Instant,
    ) -> (Self, Registration) {
        let mut timelines: TimelineTable = HashMap::with_capacity(app.backends.len());
        let mut retained = 0;

        for backend in &app.backends {
            let existing = previous.and_then(|p| p.timelines.get(backend.id()));
            let timeline = match existing {
                Some(timeline) => {
                    retained += 1;
                    timeline.clone()
                }
                None => Arc::new(Timeline::new(
                    app.domain.clone(),
                    backend.id().clone(),
                    options.timeline.clone(),
                    now,
                )),
            };
            timelines.insert(backend.id().clone(), timeline);
        }

        let previous_count = previous.map_or(0, |p| p.timelines.len());
        let registration = Registration {
            domain: app.domain.clone(),
            added: app.backends.len() - retained,
            retained,
            removed: previous_count - retained,
        };

        let balancer = Balancer::new(app.backends.clone(), options.half_open_weight_percent);
        let entry = Self {
            app,
            balancer,
            timelines,
        };
        (entry, registration)
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn timeline(&self, backend: &BackendId) -> Option<&Arc<Timeline>> {
        self.timelines.get(backend)
    }

    fn snapshot(&self, now: Instant) -> AppSnapshot {
        let backends = self
            .app
            .backends
            .iter()
            .filter_map(|backend| {
                let timeline = self.timelines.get(backend.id())?;
                let snap = timeline.snapshot(now);
                Some(BackendSnapshot {
                    host: backend.host().to_string(),
                    port: backend.port(),
                    weight: backend.weight(),
                    state: snap.state,
                    failure_rate: snap.failure_rate,
                    success_count: snap.counts.successes,
                    failure_count: snap.counts.failures,
                })
            })
            .collect();

        AppSnapshot {
            domain: self.app.domain.clone(),
            paths: self.app.paths.clone(),
            methods: self.app.methods.iter().map(|m| m.to_string()).collect(),
            backends,
        }
    }
}

/// Immutable registry contents, replaced wholesale on every registration.
#[derive(Debug, Clone)]
struct RegistryState {
    router: Router,
    apps: HashMap<String, Arc<AppEntry>>,
}

impl RegistryState {
    fn with_app(&self, entry: Arc<AppEntry>, route: Arc<Route>) -> Self {
        let mut apps = self.apps.clone();
        apps.insert(entry.app.domain.clone(), entry);
        Self {
            router: self.router.with_route(route),
            apps,
        }
    }
}

/// Backend chosen for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub app: String,
    pub backend: Backend,
}

/// Process-wide app state, shared by the data and control planes.
#[derive(Debug)]
pub struct Registry {
    state: ArcSwap<RegistryState>,
    writers: DashMap<String, Arc<Mutex<()>>>,
    options: RegistryOptions,
    clock: Arc<dyn Clock>,
}

impl Registry {
    pub fn new(options: RegistryOptions) -> Self {
        Self::with_clock(options, Arc::new(MonotonicClock))
    }

    /// Create a registry reading time from `clock`.
    pub fn with_clock(options: RegistryOptions, clock: Arc<dyn Clock>) -> Self {
        let state = RegistryState {
            router: Router::new(options.host_fallback),
            apps: HashMap::new(),
        };
        Self {
            state: ArcSwap::from_pointee(state),
            writers: DashMap::new(),
            options,
            clock,
        }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// Validate `config` and install it, replacing any app with the same domain.
    ///
    /// Timelines of backends present before and after are kept, so a refresh
    /// does not reset their health history.
    pub fn register(&self, config: &AppConfig) -> Result<Registration, ValidationError> {
        let app = match config.validate() {
            Ok(app) => app,
            Err(e) => {
                tracing::warn!(domain = %config.domain, error = %e, "Rejected app configuration");
                metrics::record_registration("rejected");
                return Err(e);
            }
        };

        let writer = self.writers.entry(app.domain.clone()).or_default().value().clone();
        let _guard = writer.lock().unwrap_or_else(PoisonError::into_inner);

        let previous = self.state.load().apps.get(&app.domain).cloned();
        let route = Arc::new(Route::new(app.domain.clone(), &app.paths, &app.methods));
        let (entry, registration) =
            AppEntry::build(app, previous.as_deref(), &self.options, self.clock.now());
        let entry = Arc::new(entry);

        self.state
            .rcu(|current| Arc::new(current.with_app(entry.clone(), route.clone())));

        tracing::info!(
            domain = %registration.domain,
            added = registration.added,
            retained = registration.retained,
            removed = registration.removed,
            "App registered"
        );
        metrics::record_registration("accepted");
        Ok(registration)
    }

    /// Route a request to an app and pick one of its healthy backends.
    pub fn resolve(&self, req: &RouteRequest<'_>) -> Result<Target, ProxyError> {
        let state = self.state.load();
        let route = state.router.match_request(req).ok_or_else(|| {
            ProxyError::NotFound(format!(
                "no app serves {} {}{}",
                req.method(),
                req.host().unwrap_or(""),
                req.path()
            ))
        })?;
        let entry = state
            .apps
            .get(route.app())
            .ok_or_else(|| ProxyError::NotFound(format!("app {} is not registered", route.app())))?;

        let backend = entry
            .balancer
            .select(&entry.timelines, self.clock.now())
            .ok_or_else(|| ProxyError::NoHealthyBackend(route.app().to_string()))?;

        Ok(Target {
            app: route.app().to_string(),
            backend: backend.clone(),
        })
    }

    /// Feed an outcome back into a backend's timeline.
    ///
    /// Returns the resulting state, or `None` if the app no longer has that
    /// backend (it was reconfigured away while the request was in flight).
    pub fn record(&self, app: &str, backend: &BackendId, outcome: Outcome) -> Option<CircuitState> {
        let entry = self.entry(app)?;
        match entry.timeline(backend) {
            Some(timeline) => Some(timeline.record(outcome, self.clock.now())),
            None => {
                tracing::debug!(app = %app, backend = %backend, "Discarding outcome for removed backend");
                None
            }
        }
    }

    /// Configuration plus live breaker state of an app.
    pub fn inspect(&self, name: &str) -> Result<AppSnapshot, ProxyError> {
        self.entry(name)
            .map(|entry| entry.snapshot(self.clock.now()))
            .ok_or_else(|| ProxyError::NotFound(format!("app {} is not registered", name)))
    }

    /// Registered app names, sorted.
    pub fn apps(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.load().apps.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.state.load().apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, name: &str) -> Option<Arc<AppEntry>> {
        let key = normalize_host(name)?;
        self.state.load().apps.get(&key).cloned()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryOptions::default())
    }
}

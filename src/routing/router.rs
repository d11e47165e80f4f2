//! Route lookup.
//!
//! # Responsibilities
//! - Store one compiled route per app
//! - Look up the app owning a request (host, path, method)
//! - Return the matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks); an update
//!   builds a new `Router` that is swapped in whole
//! - Apps claiming the request host are preferred; other apps are only
//!   considered when no app claims the host and fallback is enabled
//! - Longest path prefix wins, ties broken by app name
//! - O(n) scan over routes (acceptable for typical app counts)

use axum::http::Method;
use std::sync::Arc;

use crate::routing::matcher::{HostMatcher, Matcher, MethodMatcher, PathPrefixMatcher, RouteRequest};

/// Compiled matcher for one app.
#[derive(Debug)]
pub struct Route {
    app: String,
    host: HostMatcher,
    paths: Vec<PathPrefixMatcher>,
    methods: MethodMatcher,
}

impl Route {
    pub fn new(app: impl Into<String>, paths: &[String], methods: &[Method]) -> Self {
        let app = app.into();
        Self {
            host: HostMatcher::new(&app),
            paths: paths.iter().map(PathPrefixMatcher::new).collect(),
            methods: MethodMatcher::new(methods.to_vec()),
            app,
        }
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    fn claims_host(&self, req: &RouteRequest<'_>) -> bool {
        self.host.matches(req)
    }

    /// Longest matching prefix length, provided the method is allowed.
    fn score(&self, req: &RouteRequest<'_>) -> Option<usize> {
        if !self.methods.matches(req) {
            return None;
        }
        self.paths
            .iter()
            .filter_map(|p| p.matched_len(req.path()))
            .max()
    }
}

/// Immutable routing table.
#[derive(Debug, Clone, Default)]
pub struct Router {
    /// Sorted by app name.
    routes: Vec<Arc<Route>>,
    host_fallback: bool,
}

impl Router {
    pub fn new(host_fallback: bool) -> Self {
        Self {
            routes: Vec::new(),
            host_fallback,
        }
    }

    /// A copy of this router with `route` installed, replacing any route
    /// previously held for the same app.
    pub fn with_route(&self, route: Arc<Route>) -> Self {
        let mut routes = self.routes.clone();
        match routes.binary_search_by(|r| r.app().cmp(route.app())) {
            Ok(index) => routes[index] = route,
            Err(index) => routes.insert(index, route),
        }
        Self {
            routes,
            host_fallback: self.host_fallback,
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the route for a request.
    pub fn match_request(&self, req: &RouteRequest<'_>) -> Option<&Route> {
        let host_claimed = self.routes.iter().any(|r| r.claims_host(req));
        if !host_claimed && !self.host_fallback {
            return None;
        }

        let mut best: Option<(usize, &Route)> = None;
        for route in &self.routes {
            if host_claimed && !route.claims_host(req) {
                continue;
            }
            if let Some(score) = route.score(req) {
                if best.map_or(true, |(top, _)| score > top) {
                    best = Some((score, route.as_ref()));
                }
            }
        }
        best.map(|(_, route)| route)
    }
}

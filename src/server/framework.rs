//! Endpoint registration and lookup, and composition of the socket-level
//! handlers the server runs.

use crate::{
    http::{request::Request, response::Response, start_line::StartLine},
    limits::ServerConfig,
    server::connection::{HttpHandler, RedirectHandler},
    Verb,
};
use std::{collections::HashMap, sync::Arc, time::SystemTime};

/// An endpoint: a pure function from request to response.
pub type RequestHandler = Arc<dyn Fn(Request) -> Response + Send + Sync>;

/// Finds the endpoint for a start line, or nothing.
///
/// This is the richer handler shape: given the start line first, it decides
/// which `Request -> Response` function will run, enabling dispatch-time
/// decisions.  The framework's own router is one implementation of it.
pub type HandlerFinder = Arc<dyn Fn(&StartLine) -> Option<RequestHandler> + Send + Sync>;

/// The route tables: exact `(verb, path)` entries plus prefix entries.
///
/// Mutated only while endpoints register, before the server binds; the
/// lookup side sees it immutably ever after.
#[derive(Default)]
pub(crate) struct Router {
    registered_paths: HashMap<(Verb, String), RequestHandler>,
    registered_partial_paths: Vec<PartialRoute>,
}

struct PartialRoute {
    verb: Verb,
    prefix: String,
    handler: RequestHandler,
}

impl Router {
    /// Exact match first; on a miss, the longest registered prefix wins.
    fn find(&self, start_line: &StartLine) -> Option<RequestHandler> {
        let key = (
            start_line.verb(),
            start_line.path_details().isolated_path().to_string(),
        );

        match self.registered_paths.get(&key) {
            Some(handler) => Some(handler.clone()),
            None => self.find_by_partial_match(start_line),
        }
    }

    fn find_by_partial_match(&self, start_line: &StartLine) -> Option<RequestHandler> {
        let path = start_line.path_details().isolated_path();

        let mut best: Option<&PartialRoute> = None;
        for route in &self.registered_partial_paths {
            if route.verb != start_line.verb() || !path.starts_with(&route.prefix) {
                continue;
            }
            // Strictly longer, so same-length prefixes keep registration
            // order.
            if best.map_or(true, |current| route.prefix.len() > current.prefix.len()) {
                best = Some(route);
            }
        }

        best.map(|route| route.handler.clone())
    }
}

/// The web framework: endpoint registry plus handler composition.
///
/// Register endpoints, then turn the whole thing into a socket handler for
/// [`Server::builder`](crate::Server::builder).  The `date:` header's clock
/// is injectable so response serialization is deterministic under test.
pub struct WebFramework {
    config: ServerConfig,
    clock: Option<SystemTime>,
    router: Router,
}

impl WebFramework {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            clock: None,
            router: Router::default(),
        }
    }

    /// Like [`WebFramework::new`], with every response dated at `clock`.
    pub fn with_clock(config: ServerConfig, clock: SystemTime) -> Self {
        Self {
            config,
            clock: Some(clock),
            router: Router::default(),
        }
    }

    /// Registers an endpoint for exactly `verb` + `path`.
    ///
    /// `path` is the isolated form, without its leading slash:
    /// `add_two_numbers`, not `/add_two_numbers`.
    pub fn register_path<F>(&mut self, verb: Verb, path: &str, handler: F)
    where
        F: Fn(Request) -> Response + Send + Sync + 'static,
    {
        self.router
            .registered_paths
            .insert((verb, path.to_string()), Arc::new(handler));
    }

    /// Registers an endpoint for every path sharing `prefix`.
    ///
    /// Among several matching prefixes the longest wins.  A path equal to
    /// the prefix matches too - no trailing slash required.
    pub fn register_partial_path<F>(&mut self, verb: Verb, prefix: &str, handler: F)
    where
        F: Fn(Request) -> Response + Send + Sync + 'static,
    {
        self.router.registered_partial_paths.push(PartialRoute {
            verb,
            prefix: prefix.to_string(),
            handler: Arc::new(handler),
        });
    }

    /// The endpoint for this start line, if any is registered.
    pub fn find_endpoint_for_this_startline(
        &self,
        start_line: &StartLine,
    ) -> Option<RequestHandler> {
        self.router.find(start_line)
    }

    /// Only the prefix table - exact registrations are not consulted.
    pub fn find_handler_by_partial_match(
        &self,
        start_line: &StartLine,
    ) -> Option<RequestHandler> {
        self.router.find_by_partial_match(start_line)
    }

    /// The HTTP handler backed by this framework's own route tables.
    pub fn make_primary_http_handler(self) -> HttpHandler {
        let router = Arc::new(self.router);
        let finder: HandlerFinder = Arc::new(move |start_line| router.find(start_line));

        HttpHandler::new(self.config, self.clock, finder)
    }

    /// The HTTP handler backed by a caller-supplied finder.
    ///
    /// The finder receives each request's start line and returns the
    /// endpoint to run, bypassing the registered tables entirely.
    pub fn make_primary_http_handler_with<F>(self, finder: F) -> HttpHandler
    where
        F: Fn(&StartLine) -> Option<RequestHandler> + Send + Sync + 'static,
    {
        HttpHandler::new(self.config, self.clock, Arc::new(finder))
    }

    /// The single-shot HTTP-to-HTTPS redirect handler.
    pub fn make_redirect_handler(&self) -> RedirectHandler {
        RedirectHandler::new(self.config.clone())
    }
}

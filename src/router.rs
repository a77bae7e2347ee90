//! Ordered pattern router.
//!
//! Routes are kept in registration order and the first pattern that matches
//! wins. A pattern is a path in which `{name}` stands for exactly one
//! non-empty path segment (`/cars/{id}` matches `/cars/7`, never `/cars/7/x`).
//! Captured segments reach the handler positionally, in the order their
//! placeholders appear in the pattern.
//!
//! Two structures speed lookups up without changing which route wins:
//!
//! - a per-method index from pattern text to route position. Re-registering
//!   the same (method, pattern) replaces the handler in place, and a
//!   placeholder-free pattern equal to the request path is found directly;
//!   only routes registered before it still need a regex test.
//! - a resolution cache from (method, exact path) to the matched route and
//!   its captures. Any registration clears it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use regex::Regex;
use tracing::debug;

use crate::error::ApiError;
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// Resolutions kept before the cache starts over.
const CACHE_CAPACITY: usize = 1024;

// ── PathArgs ──────────────────────────────────────────────────────────────────

/// Path segments captured by a route pattern, in pattern order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PathArgs(Vec<String>);

impl PathArgs {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// The capture at `index`, or [`ApiError::HandlerNotFound`] when the
    /// matched pattern has no such placeholder.
    pub fn require(&self, index: usize) -> Result<&str, ApiError> {
        self.get(index).ok_or(ApiError::HandlerNotFound)
    }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for PathArgs {
    fn from(args: Vec<String>) -> Self { Self(args) }
}

// ── Route ─────────────────────────────────────────────────────────────────────

struct Route<S> {
    method: Method,
    pattern: String,
    matcher: Regex,
    literal: bool,
    handler: BoxedHandler<S>,
}

impl<S> Route<S> {
    fn captures(&self, path: &str) -> Option<PathArgs> {
        if self.literal {
            return (self.pattern == path).then(PathArgs::default);
        }
        let caps = self.matcher.captures(path)?;
        let args = caps.iter()
            .skip(1)
            .map(|m| m.map_or_else(String::new, |m| m.as_str().to_owned()))
            .collect::<Vec<_>>();
        Some(PathArgs(args))
    }
}

/// Compiles a `{name}` pattern into an anchored matcher.
///
/// Literal text is escaped, so a pattern can only ever match itself apart
/// from its placeholders. Returns the matcher and whether the pattern has no
/// placeholders at all.
pub(crate) fn compile_pattern(pattern: &str) -> Result<(Regex, bool), regex::Error> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');

    let mut literal = true;
    let mut rest = pattern;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|i| open + i) else { break };
        source.push_str(&regex::escape(&rest[..open]));
        source.push_str("([^/]+)");
        literal = false;
        rest = &rest[close + 1..];
    }
    source.push_str(&regex::escape(rest));
    source.push('$');

    Ok((Regex::new(&source)?, literal))
}

// ── Router ────────────────────────────────────────────────────────────────────

type Resolution = (usize, PathArgs);

/// The application router.
///
/// Build it once at startup, then hand it to [`Server::serve`](crate::Server::serve).
/// Every handler receives a clone of the router's state `S`, which is how
/// shared resources such as a database pool reach them.
pub struct Router<S = ()> {
    state: S,
    routes: Vec<Route<S>>,
    index: HashMap<Method, HashMap<String, usize>>,
    cache: RwLock<HashMap<(Method, String), Resolution>>,
}

impl Router<()> {
    pub fn new() -> Self {
        Self::with_state(())
    }
}

impl Default for Router<()> {
    fn default() -> Self { Self::new() }
}

impl<S> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn with_state(state: S) -> Self {
        Self {
            state,
            routes: Vec::new(),
            index: HashMap::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a handler for a method + pattern pair. Returns `self` for
    /// chaining.
    ///
    /// ```rust,no_run
    /// # use garage::{PathArgs, Request, Response, Router};
    /// # async fn show(_: (), _: Request, _: PathArgs) -> Response { Response::text("") }
    /// # async fn remove(_: (), _: Request, _: PathArgs) -> Response { Response::text("") }
    /// Router::new()
    ///     .get("/cars/{id}", show)
    ///     .delete("/cars/del/{id}", remove);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the pattern cannot be compiled. Routes are registered at
    /// startup, so a bad pattern is a programming error.
    pub fn on(mut self, method: Method, pattern: &str, handler: impl Handler<S>) -> Self {
        self.add(method, pattern, handler.into_boxed_handler());
        self
    }

    pub fn get(self, pattern: &str, handler: impl Handler<S>) -> Self {
        self.on(Method::Get, pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: impl Handler<S>) -> Self {
        self.on(Method::Post, pattern, handler)
    }

    pub fn put(self, pattern: &str, handler: impl Handler<S>) -> Self {
        self.on(Method::Put, pattern, handler)
    }

    pub fn delete(self, pattern: &str, handler: impl Handler<S>) -> Self {
        self.on(Method::Delete, pattern, handler)
    }

    fn add(&mut self, method: Method, pattern: &str, handler: BoxedHandler<S>) {
        self.clear_cache();

        let by_pattern = self.index.entry(method).or_default();
        if let Some(&position) = by_pattern.get(pattern) {
            debug!(%method, pattern, "replacing route handler");
            self.routes[position].handler = handler;
            return;
        }

        let (matcher, literal) = compile_pattern(pattern)
            .unwrap_or_else(|e| panic!("invalid route `{pattern}`: {e}"));
        by_pattern.insert(pattern.to_owned(), self.routes.len());
        self.routes.push(Route {
            method,
            pattern: pattern.to_owned(),
            matcher,
            literal,
            handler,
        });
    }

    /// Whether any route is registered for `method`.
    pub fn allows(&self, method: Method) -> bool {
        self.index.contains_key(&method)
    }

    /// Routes one request and produces one response.
    ///
    /// Never fails: an unregistered method is answered with `405`, a path no
    /// pattern matches with `404`.
    pub async fn dispatch(&self, req: Request) -> Response {
        if !self.allows(req.method()) {
            return ApiError::MethodNotAllowed.into_response();
        }
        match self.lookup(req.method(), req.path()) {
            Some((handler, args)) => handler.call(self.state.clone(), req, args).await,
            None => ApiError::UrlNotFound.into_response(),
        }
    }

    pub(crate) fn lookup(&self, method: Method, path: &str) -> Option<(BoxedHandler<S>, PathArgs)> {
        let (position, args) = match self.cached(method, path) {
            Some(hit) => hit,
            None => {
                let resolved = self.resolve(method, path)?;
                self.remember(method, path, &resolved);
                resolved
            }
        };
        Some((Arc::clone(&self.routes[position].handler), args))
    }

    fn resolve(&self, method: Method, path: &str) -> Option<Resolution> {
        // An exact literal hit only has to beat routes registered before it.
        let bound = self.index.get(&method)
            .and_then(|by_pattern| by_pattern.get(path))
            .copied()
            .filter(|&position| self.routes[position].literal);

        let candidates = &self.routes[..bound.unwrap_or(self.routes.len())];
        candidates.iter()
            .enumerate()
            .filter(|(_, route)| route.method == method)
            .find_map(|(position, route)| route.captures(path).map(|args| (position, args)))
            .or_else(|| bound.map(|position| (position, PathArgs::default())))
    }

    fn cached(&self, method: Method, path: &str) -> Option<Resolution> {
        let cache = self.cache.read().ok()?;
        cache.get(&(method, path.to_owned())).cloned()
    }

    fn remember(&self, method: Method, path: &str, resolved: &Resolution) {
        let Ok(mut cache) = self.cache.write() else { return };
        if cache.len() >= CACHE_CAPACITY {
            cache.clear();
        }
        cache.insert((method, path.to_owned()), resolved.clone());
    }

    fn clear_cache(&mut self) {
        match self.cache.get_mut() {
            Ok(cache) => cache.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    async fn request(method: Method, target: &str) -> Request {
        Request::parse(method, target, Vec::new(), Bytes::new()).await
    }

    fn echo(tag: &'static str) -> impl Handler<()> {
        move |_: (), _: Request, args: PathArgs| async move {
            let args: Vec<&str> = args.iter().collect();
            Response::text(format!("{tag}:{}", args.join(",")))
        }
    }

    fn text(resp: &Response) -> &str {
        std::str::from_utf8(resp.body()).unwrap()
    }

    #[test]
    fn compiles_placeholders_to_single_segments() {
        let (re, literal) = compile_pattern("/cars/{id}").unwrap();
        assert!(!literal);
        assert!(re.is_match("/cars/42"));
        assert!(!re.is_match("/cars/42/extra"));
        assert!(!re.is_match("/cars/"));
        assert!(!re.is_match("/xcars/42"));
    }

    #[test]
    fn literal_text_is_escaped() {
        let (re, literal) = compile_pattern("/v1.0/cars").unwrap();
        assert!(literal);
        assert!(re.is_match("/v1.0/cars"));
        assert!(!re.is_match("/v1x0/cars"));
    }

    #[tokio::test]
    async fn captures_are_positional() {
        let router = Router::new().get("/brands/{brand}/models/{model}", echo("m"));
        let resp = router.dispatch(request(Method::Get, "/brands/bmw/models/x5").await).await;
        assert_eq!(text(&resp), "m:bmw,x5");
    }

    #[tokio::test]
    async fn segment_with_slash_never_matches_placeholder() {
        let router = Router::new().get("/cars/{id}", echo("car"));
        let resp = router.dispatch(request(Method::Get, "/cars/1/2").await).await;
        assert_eq!(resp.status_code(), 404);
    }

    #[tokio::test]
    async fn first_registered_match_wins() {
        let router = Router::new()
            .get("/cars/{id}", echo("id"))
            .get("/cars/filter", echo("filter"));
        let resp = router.dispatch(request(Method::Get, "/cars/filter").await).await;
        assert_eq!(text(&resp), "id:filter");

        let router = Router::new()
            .get("/cars/filter", echo("filter"))
            .get("/cars/{id}", echo("id"));
        let resp = router.dispatch(request(Method::Get, "/cars/filter").await).await;
        assert_eq!(text(&resp), "filter:");
    }

    #[tokio::test]
    async fn unregistered_method_is_405_and_unknown_path_404() {
        let router = Router::new().get("/cars", echo("list"));

        let resp = router.dispatch(request(Method::Delete, "/cars").await).await;
        assert_eq!(resp.status_code(), 405);

        let resp = router.dispatch(request(Method::Get, "/trucks").await).await;
        assert_eq!(resp.status_code(), 404);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["message"], "URL Not Found");
    }

    #[tokio::test]
    async fn methods_do_not_share_routes() {
        let router = Router::new()
            .get("/cars", echo("get"))
            .post("/cars/add", echo("post"));
        let resp = router.dispatch(request(Method::Post, "/cars").await).await;
        assert_eq!(resp.status_code(), 404);
    }

    #[tokio::test]
    async fn re_registration_overwrites_in_place() {
        let router = Router::new()
            .get("/cars/{id}", echo("old"))
            .get("/cars/{slug}", echo("other"))
            .get("/cars/{id}", echo("new"));
        let resp = router.dispatch(request(Method::Get, "/cars/9").await).await;
        assert_eq!(text(&resp), "new:9");
        assert_eq!(router.routes.len(), 2);
    }

    #[tokio::test]
    async fn registration_invalidates_cached_hits() {
        let router = Router::new().get("/cars/{id}", echo("old"));
        let resp = router.dispatch(request(Method::Get, "/cars/5").await).await;
        assert_eq!(text(&resp), "old:5");

        let router = router.get("/cars/{id}", echo("new"));
        let resp = router.dispatch(request(Method::Get, "/cars/5").await).await;
        assert_eq!(text(&resp), "new:5");
    }

    #[tokio::test]
    async fn registration_makes_previous_misses_resolve() {
        let router = Router::new().get("/cars", echo("list"));
        let resp = router.dispatch(request(Method::Get, "/cars/5").await).await;
        assert_eq!(resp.status_code(), 404);

        let router = router.get("/cars/{id}", echo("show"));
        let resp = router.dispatch(request(Method::Get, "/cars/5").await).await;
        assert_eq!(text(&resp), "show:5");
    }

    #[tokio::test]
    async fn repeated_lookups_hit_the_cache() {
        let router = Router::new().get("/cars/{id}", echo("show"));
        for _ in 0..3 {
            let resp = router.dispatch(request(Method::Get, "/cars/3").await).await;
            assert_eq!(text(&resp), "show:3");
        }
        assert_eq!(router.cache.read().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn handlers_receive_state() {
        async fn count(n: usize, _: Request, _: PathArgs) -> String {
            n.to_string()
        }
        let router = Router::with_state(7usize).get("/", count);
        let resp = router.dispatch(request(Method::Get, "/").await).await;
        assert_eq!(text(&resp), "7");
    }

    #[test]
    fn require_reports_missing_capture_as_handler_not_found() {
        let args = PathArgs::from(vec!["1".to_owned()]);
        assert_eq!(args.require(0).unwrap(), "1");
        assert!(matches!(args.require(1), Err(ApiError::HandlerNotFound)));
    }
}

//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. The router is the
//! terminal stage of the middleware chain: a miss is not a special case in
//! the dispatcher, it is an [`HttpError::NotFound`](crate::HttpError) that
//! flows back through the chain to the error responder like any other
//! failure.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};

/// The application router.
///
/// One radix tree per HTTP method — O(path-length) lookup, no allocations on
/// the hot path. Build it once at startup; pass it to
/// [`Server::serve`](crate::Server::serve). Each registration returns `self`
/// so calls chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use strata::{Request, Response, Router};
    /// # use http::Method;
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/users/{id}", get_user)
    ///     .on(Method::POST, "/users",      create_user);
    /// ```
    pub fn on<M>(mut self, method: Method, path: &str, handler: impl Handler<M>) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// `GET` shorthand for [`Router::on`].
    pub fn get<M>(self, path: &str, handler: impl Handler<M>) -> Self {
        self.on(Method::GET, path, handler)
    }

    /// `POST` shorthand for [`Router::on`].
    pub fn post<M>(self, path: &str, handler: impl Handler<M>) -> Self {
        self.on(Method::POST, path, handler)
    }

    /// `PUT` shorthand for [`Router::on`].
    pub fn put<M>(self, path: &str, handler: impl Handler<M>) -> Self {
        self.on(Method::PUT, path, handler)
    }

    /// `DELETE` shorthand for [`Router::on`].
    pub fn delete<M>(self, path: &str, handler: impl Handler<M>) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    /// `PATCH` shorthand for [`Router::on`].
    pub fn patch<M>(self, path: &str, handler: impl Handler<M>) -> Self {
        self.on(Method::PATCH, path, handler)
    }

    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

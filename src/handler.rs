//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router needs to hold handlers of *different* types in a single
//! `HashMap<Method, Tree>`. Rust collections can only hold one concrete type,
//! so we use **trait objects** (`dyn ErasedHandler`) to hide the concrete
//! handler type behind a common interface and store everything uniformly.
//!
//! The chain from user code to vtable call is:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.get("/", hello)
//! hello.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                       ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req)  at request time               ← one vtable dispatch
//!        ↓
//! Box::pin(async { hello(req).await … })           ← HandlerFuture
//! ```
//!
//! # Why `Handler<M>` has a marker parameter
//!
//! Handlers come in two shapes — plain (`-> impl IntoResponse`) and fallible
//! (`-> Result<impl IntoResponse, HttpError>`). One blanket impl per shape
//! would overlap under coherence rules; the marker type splits them into two
//! distinct trait instantiations, and inference picks the right one from the
//! handler's return type. You never name the marker yourself.
//!
//! Either way the erased interface is the same: every handler resolves to
//! `Result<Response, HttpError>`, so failures propagate up the middleware
//! chain to the error responder instead of dying inside the handler.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::HttpError;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future resolving to the chain outcome.
///
/// `Pin<Box<…>>` is required because the async runtime must be able to poll
/// the future in-place — it cannot move it in memory after the first poll.
/// `Send + 'static` let tokio move the future across threads safely.
///
/// Public because [`Middleware::handle`](crate::middleware::Middleware)
/// returns it; build one with `Box::pin(async move { … })`.
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<Response, HttpError>> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
/// External crates cannot usefully interact with this trait.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> HandlerFuture;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
///
/// `Arc` gives cheap, thread-safe shared ownership (one atomic reference
/// count increment per request) without copying the handler.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Markers ───────────────────────────────────────────────────────────────────

/// Marker for handlers returning `impl IntoResponse`.
#[doc(hidden)]
pub struct Direct;

/// Marker for handlers returning `Result<impl IntoResponse, HttpError>`.
#[doc(hidden)]
pub struct Fallible;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with one of the signatures:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// async fn name(req: Request) -> Result<impl IntoResponse, HttpError>
/// ```
///
/// The trait is **sealed** (via the private `Sealed` supertrait): only the
/// blanket impls below can satisfy it. This prevents accidental misuse and
/// keeps the API surface stable across versions.
pub trait Handler<M>: private::Sealed<M> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

/// The sealing module. Because `Sealed` is private, external crates cannot
/// name it and therefore cannot implement `Handler` on their own types.
mod private {
    pub trait Sealed<M> {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed<Direct> for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler<Direct> for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(DirectHandler(self))
    }
}

impl<F, Fut, R> private::Sealed<Fallible> for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler<Fallible> for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FallibleHandler(self))
    }
}

// ── Concrete wrappers ─────────────────────────────────────────────────────────

/// Newtype wrapper holding a plain handler `F`, bridging the typed world to
/// the trait-object world.
struct DirectHandler<F>(F);

impl<F, Fut, R> ErasedHandler for DirectHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> HandlerFuture {
        let fut = (self.0)(req);
        Box::pin(async move { Ok(fut.await.into_response()) })
    }
}

/// Same bridge for fallible handlers; the `Err` arm flows untouched to the
/// error responder.
struct FallibleHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FallibleHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> HandlerFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.map(IntoResponse::into_response) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};

    async fn plain(_req: Request) -> Response {
        Response::text("plain")
    }

    async fn fallible(req: Request) -> Result<Response, HttpError> {
        match req.param("id") {
            Some(_) => Ok(Response::text("found")),
            None => Err(HttpError::not_found()),
        }
    }

    #[tokio::test]
    async fn direct_handler_wraps_into_ok() {
        let boxed = plain.into_boxed_handler();
        let res = boxed.call(Request::test(Method::GET, "/", &[])).await.unwrap();
        assert_eq!(res.body(), b"plain");
    }

    #[tokio::test]
    async fn fallible_handler_propagates_err() {
        let boxed = fallible.into_boxed_handler();
        let err = boxed
            .call(Request::test(Method::GET, "/", &[]))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}

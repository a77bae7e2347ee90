//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router needs to hold handlers of *different* types in one route list.
//! Rust collections can only hold one concrete type, so handlers are hidden
//! behind a trait object (`dyn ErasedHandler<S>`) and stored uniformly.
//!
//! ```text
//! async fn show(cars: CarRepository, req: Request, args: PathArgs) -> … ← user writes this
//!        ↓ router.get("/cars/{id}", show)
//! show.into_boxed_handler()                      ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(show))                      ← stored as BoxedHandler<S>
//!        ↓
//! handler.call(state, req, args)  at request time
//!        ↓
//! Box::pin(async { show(state, req, args).await.into_response() })
//! ```
//!
//! A handler receives, in order: a clone of the router's shared state, the
//! parsed [`Request`], and the segments captured by the route pattern as
//! positional [`PathArgs`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::PathArgs;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler<S> {
    fn call(&self, state: S, req: Request, args: PathArgs) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler<S> = Arc<dyn ErasedHandler<S> + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by any `async fn` with
/// the signature:
///
/// ```text
/// async fn name(state: S, req: Request, args: PathArgs) -> impl IntoResponse
/// ```
///
/// The trait is sealed: only the blanket impl below can satisfy it.
pub trait Handler<S>: private::Sealed<S> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler<S>;
}

mod private {
    pub trait Sealed<S> {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R, S> private::Sealed<S> for F
where
    F: Fn(S, Request, PathArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R, S> Handler<S> for F
where
    F: Fn(S, Request, PathArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
    S: 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler<S> {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete handler `F` to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R, S> ErasedHandler<S> for FnHandler<F>
where
    F: Fn(S, Request, PathArgs) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, state: S, req: Request, args: PathArgs) -> BoxFuture {
        let fut = (self.0)(state, req, args);
        Box::pin(async move { fut.await.into_response() })
    }
}

//! Request-processing capability shape.
//!
//! # Data Flow
//! ```text
//! caller
//!     → Service::call(req) (returns an owned future)
//!     → wrapped capability (possibly another decorator)
//!     → Result<Response, Error> back to the caller
//!
//! lifecycle owner
//!     → Closeable::close() (terminal signal)
//!     → capability rejects or fails later calls on its own
//! ```
//!
//! # Design Decisions
//! - Methods take `&self`; capabilities are shared via `Arc` across a chain
//! - Returned futures are `'static` so in-flight calls can outlive the handle
//! - `close` is split out so lifecycle code does not need to know the request type

pub mod adapter;

use std::sync::Arc;

pub use self::adapter::TowerAdapter;

/// Owned, sendable future returned by capabilities.
pub type BoxFuture<T> = futures_util::future::BoxFuture<'static, T>;

/// Lifecycle half of a capability.
pub trait Closeable: Send + Sync + 'static {
    /// Signal the capability to close. After this resolves, new calls are
    /// expected to be rejected by the capability itself.
    fn close(&self) -> BoxFuture<()>;

    /// Whether the capability is currently accepting calls.
    fn is_available(&self) -> bool {
        true
    }
}

/// An asynchronous request/response capability.
pub trait Service<Req>: Closeable {
    type Response: Send + 'static;
    type Error: Send + 'static;

    /// Start processing `req`.
    fn call(&self, req: Req) -> BoxFuture<Result<Self::Response, Self::Error>>;
}

impl<S: Closeable + ?Sized> Closeable for Arc<S> {
    fn close(&self) -> BoxFuture<()> {
        (**self).close()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

impl<Req, S: Service<Req> + ?Sized> Service<Req> for Arc<S> {
    type Response = S::Response;
    type Error = S::Error;

    fn call(&self, req: Req) -> BoxFuture<Result<Self::Response, Self::Error>> {
        (**self).call(req)
    }
}

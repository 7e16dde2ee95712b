//! Bridge from [`Service`] to `tower::Service`.

use std::sync::Arc;
use std::task::{Context, Poll};

use super::{BoxFuture, Service};

/// Exposes a capability as a `tower::Service` so it can be stacked with
/// `tower` middleware.
///
/// Readiness is always reported; a closed capability rejects the call itself.
#[derive(Debug)]
pub struct TowerAdapter<S> {
    inner: Arc<S>,
}

impl<S> TowerAdapter<S> {
    pub fn new(inner: S) -> Self {
        Self::from_arc(Arc::new(inner))
    }

    pub fn from_arc(inner: Arc<S>) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S> Clone for TowerAdapter<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S, Req> tower::Service<Req> for TowerAdapter<S>
where
    S: Service<Req>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        self.inner.call(req)
    }
}

//! Request instrumentation as a tower layer.
//!
//! Applied with `Router::layer`, so it wraps every route and the fallback
//! after routing has run: `MatchedPath` is already in the request extensions
//! when a route matched. The status code is only known once the inner service
//! has produced the response head, so labels are completed at that point.
//!
//! A request whose future is dropped (client went away, handler never
//! finished) records nothing. Metrics cover completed requests only.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use tower::{Layer, Service};

use crate::config::UnmatchedRoute;
use crate::obs::metrics::{HttpLabels, HttpMetrics};

/// Route label for requests that matched no route, in collapsed mode.
pub const UNMATCHED_ROUTE_LABEL: &str = "<unmatched>";

/// Wall-clock timer for one request.
#[derive(Debug, Clone, Copy)]
pub struct RequestTimer {
    start: Instant,
}

impl RequestTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed time in milliseconds. Monotonic clock, never negative.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Route label: matched pattern if routing resolved one, otherwise the raw
/// path (query excluded) or a fixed placeholder.
///
/// Raw paths are a cardinality risk: each distinct unknown path becomes a new
/// latency series.
pub fn route_label<B>(req: &Request<B>, unmatched: UnmatchedRoute) -> String {
    if let Some(matched) = req.extensions().get::<MatchedPath>() {
        return matched.as_str().to_owned();
    }
    match unmatched {
        UnmatchedRoute::Raw => req.uri().path().to_owned(),
        UnmatchedRoute::Collapsed => UNMATCHED_ROUTE_LABEL.to_owned(),
    }
}

// ============================================================================
// Layer
// ============================================================================

#[derive(Clone)]
pub struct InstrumentationLayer {
    metrics: HttpMetrics,
    unmatched: UnmatchedRoute,
}

impl InstrumentationLayer {
    pub fn new(metrics: HttpMetrics, unmatched: UnmatchedRoute) -> Self {
        Self { metrics, unmatched }
    }
}

impl<S> Layer<S> for InstrumentationLayer {
    type Service = InstrumentationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InstrumentationService {
            inner,
            metrics: self.metrics.clone(),
            unmatched: self.unmatched,
        }
    }
}

// ============================================================================
// Service
// ============================================================================

#[derive(Clone)]
pub struct InstrumentationService<S> {
    inner: S,
    metrics: HttpMetrics,
    unmatched: UnmatchedRoute,
}

type BoxFuture<T, E> = Pin<Box<dyn Future<Output = std::result::Result<T, E>> + Send>>;

impl<S, B, ResBody> Service<Request<B>> for InstrumentationService<S>
where
    S: Service<Request<B>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: 'static,
    B: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<Response<ResBody>, S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let timer = RequestTimer::start();
        let method = req.method().as_str().to_owned();
        let route = route_label(&req, self.unmatched);
        let metrics = self.metrics.clone();

        // Drive the instance that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let response = inner.call(req).await?;
            let labels = HttpLabels::new(method, route, response.status().as_u16());
            let elapsed_ms = timer.elapsed_ms();
            metrics.record(&labels, elapsed_ms);
            tracing::debug!(
                method = %labels.method,
                route = %labels.route,
                status = %labels.status_code,
                elapsed_ms,
                "request completed"
            );
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_is_non_negative_and_advances() {
        let t = RequestTimer::start();
        let a = t.elapsed_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = t.elapsed_ms();
        assert!(a >= 0.0);
        assert!(b >= 5.0);
        assert!(b >= a);
    }

    #[test]
    fn unmatched_route_uses_raw_path_without_query() {
        let req = Request::builder()
            .uri("/users/42?verbose=1")
            .body(())
            .unwrap();
        assert_eq!(route_label(&req, UnmatchedRoute::Raw), "/users/42");
        assert_eq!(route_label(&req, UnmatchedRoute::Collapsed), UNMATCHED_ROUTE_LABEL);
    }
}
